//! Tree traversal, filtering, and dispatch.
//!
//! A [`Query`] binds a traversal root (the "context") and walks its owned
//! children in pre-order: each child is tested before its subtree is
//! descended into, siblings in declaration order. The context itself is
//! never yielded. Matches come back as [`EntityProxy`] views scoped to the
//! component kinds the caller asked for.
//!
//! Traversal and filtering never fail: absence of a match is `None` or an
//! empty `Vec`, and errors only ever surface from dispatched handlers or
//! from typed component access on the results.

use crate::component::{Component, ComponentKind};
use crate::criteria::Criteria;
use crate::entity::Entity;
use crate::proxy::EntityProxy;

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// A mixed argument list of criteria and bare component kinds.
///
/// Bare kinds play a double role: they become implicit
/// [`HasComponent`](crate::criteria::HasComponent) tests when no explicit
/// criteria were supplied, and they always form the
/// scope of the [`EntityProxy`] returned for each match -- handlers receive
/// exactly the components they asked to be tested for.
///
/// Any single [`Criteria`] converts into a `Selector`, so
/// `query.filter(HasComponent::of::<Position>())` works directly.
#[derive(Default)]
pub struct Selector {
    criteria: Vec<Box<dyn Criteria>>,
    kinds: Vec<ComponentKind>,
}

impl Selector {
    /// An empty selector; matches every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criteria.
    pub fn criteria(mut self, criteria: impl Criteria + 'static) -> Self {
        self.criteria.push(Box::new(criteria));
        self
    }

    /// Add a bare component kind.
    pub fn component<T: Component>(mut self) -> Self {
        self.kinds.push(ComponentKind::of::<T>());
        self
    }

    /// The proxy scope for matched entities.
    pub fn scope(&self) -> &[ComponentKind] {
        &self.kinds
    }

    /// The AND-conjunction over this selector's effective criteria. With no
    /// criteria and no kinds, every entity matches.
    pub(crate) fn matches(&self, entity: &Entity) -> bool {
        if self.criteria.is_empty() {
            self.kinds.iter().all(|kind| entity.has_kind(*kind))
        } else {
            self.criteria.iter().all(|criteria| criteria.meet(entity))
        }
    }
}

impl<C: Criteria + 'static> From<C> for Selector {
    fn from(criteria: C) -> Self {
        Selector::new().criteria(criteria)
    }
}

// ---------------------------------------------------------------------------
// ActivePolicy
// ---------------------------------------------------------------------------

/// How traversal treats the `is_active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePolicy {
    /// Skip inactive entities and prune their entire subtree (the default).
    #[default]
    SkipInactive,
    /// Visit every entity regardless of the flag.
    VisitAll,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// The traversal/filter/dispatch engine bound to a root entity.
///
/// Stateless beyond the root reference and the active policy; cheap to copy
/// and many may coexist over the same or different contexts.
#[derive(Clone, Copy)]
pub struct Query<'a> {
    context: &'a Entity,
    policy: ActivePolicy,
}

impl<'a> Query<'a> {
    /// Bind a query to `context` with the default
    /// [`ActivePolicy::SkipInactive`].
    pub fn new(context: &'a Entity) -> Self {
        Self::with_policy(context, ActivePolicy::default())
    }

    /// Bind a query to `context` with an explicit policy.
    pub fn with_policy(context: &'a Entity, policy: ActivePolicy) -> Self {
        Self { context, policy }
    }

    /// The traversal root.
    pub fn context(&self) -> &'a Entity {
        self.context
    }

    /// The active-flag policy.
    pub fn policy(&self) -> ActivePolicy {
        self.policy
    }

    /// First entity in pre-order matching the selector, or `None`.
    pub fn get(&self, selector: impl Into<Selector>) -> Option<EntityProxy<'a>> {
        let selector = selector.into();
        self.find_in(self.context, &selector)
    }

    /// All entities in pre-order matching the selector.
    ///
    /// Every visited node is both tested and descended into: a matching
    /// parent does not prevent its children from matching too.
    pub fn filter(&self, selector: impl Into<Selector>) -> Vec<EntityProxy<'a>> {
        self.filter_with(&selector.into())
    }

    /// The AND-conjunction test directly, for callers already holding an
    /// entity reference.
    pub fn check(entity: &Entity, selector: impl Into<Selector>) -> bool {
        selector.into().matches(entity)
    }

    /// Bind `handler` to the selector, one-at-a-time: invoking the returned
    /// closure re-runs the traversal and calls `handler(&proxy, &args)` once
    /// per match, in traversal order.
    ///
    /// ```
    /// # use canopy_ecs::prelude::*;
    /// # #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    /// # struct Position { x: i32, y: i32 }
    /// # impl Component for Position { fn name() -> &'static str { "position" } }
    /// let mut scene = Entity::new("scene");
    /// scene.append(Entity::new("hero").with(Position { x: 50, y: 20 }));
    ///
    /// let query = Query::new(&scene);
    /// let mut move_right = query.call(
    ///     Selector::new().component::<Position>(),
    ///     |e: &EntityProxy, offset: &i32| e.get_mut::<Position>().unwrap().x += offset,
    /// );
    /// move_right(10);
    /// assert_eq!(scene.children()[0].get::<Position>().unwrap().x, 60);
    /// ```
    pub fn call<A, F>(&self, selector: impl Into<Selector>, mut handler: F) -> impl FnMut(A) + 'a
    where
        F: FnMut(&EntityProxy<'a>, &A) + 'a,
        A: 'a,
    {
        let query = *self;
        let selector = selector.into();
        move |args: A| {
            for proxy in &query.filter_with(&selector) {
                handler(proxy, &args);
            }
        }
    }

    /// Bind `handler` to the selector, all-at-once: invoking the returned
    /// closure runs the traversal once and hands `handler` the full ordered
    /// match list, letting it sort or batch before acting.
    pub fn call_all<A, F>(
        &self,
        selector: impl Into<Selector>,
        mut handler: F,
    ) -> impl FnMut(A) + 'a
    where
        F: FnMut(&mut [EntityProxy<'a>], &A) + 'a,
        A: 'a,
    {
        let query = *self;
        let selector = selector.into();
        move |args: A| {
            let mut matches = query.filter_with(&selector);
            handler(&mut matches, &args);
        }
    }

    /// Like [`call`](Self::call), but the query is supplied at invocation
    /// time: one bound handler can be applied to different contexts.
    pub fn decorate<A, F>(
        selector: impl Into<Selector>,
        mut handler: F,
    ) -> impl FnMut(&Query<'_>, A)
    where
        F: FnMut(&EntityProxy<'_>, &A),
    {
        let selector = selector.into();
        move |query: &Query<'_>, args: A| {
            for proxy in &query.filter_with(&selector) {
                handler(proxy, &args);
            }
        }
    }

    /// Like [`call_all`](Self::call_all), but the query is supplied at
    /// invocation time.
    pub fn decorate_all<A, F>(
        selector: impl Into<Selector>,
        mut handler: F,
    ) -> impl FnMut(&Query<'_>, A)
    where
        F: FnMut(&mut [EntityProxy<'_>], &A),
    {
        let selector = selector.into();
        move |query: &Query<'_>, args: A| {
            let mut matches = query.filter_with(&selector);
            handler(&mut matches, &args);
        }
    }

    // -- traversal ----------------------------------------------------------

    fn filter_with(&self, selector: &Selector) -> Vec<EntityProxy<'a>> {
        let mut matches = Vec::new();
        self.collect_in(self.context, selector, &mut matches);
        matches
    }

    fn collect_in(
        &self,
        node: &'a Entity,
        selector: &Selector,
        matches: &mut Vec<EntityProxy<'a>>,
    ) {
        for child in node.children() {
            if self.skips(child) {
                continue;
            }
            if selector.matches(child) {
                matches.push(EntityProxy::new(child, selector.scope().to_vec()));
            }
            self.collect_in(child, selector, matches);
        }
    }

    fn find_in(&self, node: &'a Entity, selector: &Selector) -> Option<EntityProxy<'a>> {
        for child in node.children() {
            if self.skips(child) {
                continue;
            }
            if selector.matches(child) {
                return Some(EntityProxy::new(child, selector.scope().to_vec()));
            }
            if let Some(found) = self.find_in(child, selector) {
                return Some(found);
            }
        }
        None
    }

    fn skips(&self, entity: &Entity) -> bool {
        self.policy == ActivePolicy::SkipInactive && !entity.is_active()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
