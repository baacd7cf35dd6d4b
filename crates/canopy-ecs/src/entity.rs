//! Entity tree nodes and component storage.
//!
//! An [`Entity`] is a node of a rooted ownership tree: it owns its
//! components (at most one per [`ComponentKind`], insertion-ordered for
//! display) and an ordered list of child entities. There are no parent
//! back-references; traversal is top-down only.
//!
//! Component storage uses interior mutability (`RefCell`) so that the
//! non-owning proxies handed out by queries can mutate component fields
//! through a shared borrow. The engine is single-threaded; `Entity` is not
//! `Sync`. Do not hold a `Ref`/`RefMut` from [`Entity::get`] or
//! [`Entity::get_mut`] across a call that inserts components on the same
//! entity.

use std::any::TypeId;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;

use indexmap::IndexMap;

use crate::component::{Component, ComponentKind, ErasedComponent};
use crate::proxy::EntityProxy;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// An ordered batch of components, consumed by [`Entity::update`] and
/// [`EntityProxy::update`](crate::proxy::EntityProxy::update).
#[derive(Debug, Default)]
pub struct ComponentSet {
    items: Vec<Box<dyn ErasedComponent>>,
}

impl ComponentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, builder style.
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.add(component);
        self
    }

    /// Add a component in place.
    pub fn add<T: Component>(&mut self, component: T) {
        self.items.push(Box::new(component));
    }

    /// Number of components in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Kinds of every component in the set, in insertion order.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.items.iter().map(|c| c.kind()).collect()
    }

    pub(crate) fn into_items(self) -> Vec<Box<dyn ErasedComponent>> {
        self.items
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A tree node owning a set of components and an ordered list of children.
///
/// The id is caller-supplied and not required to be unique across the tree.
/// The `is_active` flag defaults to `true`; whether inactive entities are
/// traversed is decided by the query's
/// [`ActivePolicy`](crate::query::ActivePolicy).
#[derive(Debug)]
pub struct Entity {
    id: String,
    active: Cell<bool>,
    components: RefCell<IndexMap<TypeId, Box<dyn ErasedComponent>>>,
    children: Vec<Entity>,
}

impl Entity {
    /// Create an entity with no components and no children.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: Cell::new(true),
            components: RefCell::new(IndexMap::new()),
            children: Vec::new(),
        }
    }

    /// The entity id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the entity is active.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Activate or deactivate the entity. Deactivation is soft: the entity
    /// stays in the tree and queries decide whether to skip it.
    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    // -- components ---------------------------------------------------------

    /// Insert a component, replacing any existing component of the same
    /// kind (last write wins, never an error). Chainable.
    pub fn add<T: Component>(&mut self, component: T) -> &mut Self {
        self.insert_boxed(Box::new(component));
        self
    }

    /// Builder form of [`add`](Self::add), consuming the entity.
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.add(component);
        self
    }

    /// Insert every component of `set`, replacing existing kinds. Chainable.
    pub fn update(&mut self, set: ComponentSet) -> &mut Self {
        for component in set.into_items() {
            self.insert_boxed(component);
        }
        self
    }

    /// Whether the entity has a component of type `T`.
    pub fn has<T: Component>(&self) -> bool {
        self.has_kind(ComponentKind::of::<T>())
    }

    /// Whether the entity has a component of the given kind.
    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.components.borrow().contains_key(&kind.type_id())
    }

    /// Borrow the component of type `T`.
    ///
    /// Fails with [`EcsError::MissingComponent`] if absent -- there is no
    /// silent default.
    pub fn get<T: Component>(&self) -> Result<Ref<'_, T>, EcsError> {
        Ref::filter_map(self.components.borrow(), |map| {
            map.get(&TypeId::of::<T>())
                .and_then(|c| c.as_any().downcast_ref::<T>())
        })
        .map_err(|_| EcsError::MissingComponent {
            entity: self.id.clone(),
            component: T::name(),
        })
    }

    /// Mutably borrow the component of type `T`.
    ///
    /// Fails with [`EcsError::MissingComponent`] if absent.
    pub fn get_mut<T: Component>(&self) -> Result<RefMut<'_, T>, EcsError> {
        RefMut::filter_map(self.components.borrow_mut(), |map| {
            map.get_mut(&TypeId::of::<T>())
                .and_then(|c| c.as_any_mut().downcast_mut::<T>())
        })
        .map_err(|_| EcsError::MissingComponent {
            entity: self.id.clone(),
            component: T::name(),
        })
    }

    /// Kinds of every component currently attached, in insertion order.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.components.borrow().values().map(|c| c.kind()).collect()
    }

    pub(crate) fn insert_boxed(&self, component: Box<dyn ErasedComponent>) {
        self.components
            .borrow_mut()
            .insert(component.kind().type_id(), component);
    }

    /// Value equality of the stored component against `expected`, or `None`
    /// if the entity has no component of that kind.
    pub(crate) fn component_value_eq(&self, expected: &dyn ErasedComponent) -> Option<bool> {
        self.components
            .borrow()
            .get(&expected.kind().type_id())
            .map(|actual| actual.value_eq(expected))
    }

    /// Structural JSON rendition of the first component with the given
    /// declared name, if any.
    pub(crate) fn component_json(&self, name: &str) -> Option<serde_json::Value> {
        self.components
            .borrow()
            .values()
            .find(|c| c.kind().name() == name)
            .map(|c| c.as_json())
    }

    // -- children -----------------------------------------------------------

    /// Append an owned child; insertion order is traversal order. Chainable.
    pub fn append(&mut self, child: Entity) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Append several owned children. Chainable.
    pub fn extend(&mut self, children: impl IntoIterator<Item = Entity>) -> &mut Self {
        self.children.extend(children);
        self
    }

    /// Builder form of [`append`](Self::append), consuming the entity.
    pub fn child(mut self, child: Entity) -> Self {
        self.append(child);
        self
    }

    /// The owned children, in insertion order.
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the entity has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    // -- copying ------------------------------------------------------------

    /// A copy preserving only the id: fresh empty component map, no
    /// children. The deep counterpart is [`Clone`].
    pub fn shallow_copy(&self) -> Entity {
        Entity::new(self.id.clone())
    }
}

/// Deep copy: every component is value-copied and every child is cloned
/// recursively, producing a fully independent subtree.
impl Clone for Entity {
    fn clone(&self) -> Self {
        let components = self
            .components
            .borrow()
            .iter()
            .map(|(type_id, c)| (*type_id, c.clone_box()))
            .collect();
        Self {
            id: self.id.clone(),
            active: Cell::new(self.active.get()),
            components: RefCell::new(components),
            children: self.children.clone(),
        }
    }
}

/// Deep structural equality: id, full component map, and full child
/// sequence. The `is_active` flag is not part of equality.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        if self.id != other.id || self.children != other.children {
            return false;
        }
        let ours = self.components.borrow();
        let theirs = other.components.borrow();
        ours.len() == theirs.len()
            && ours
                .iter()
                .all(|(type_id, c)| theirs.get(type_id).is_some_and(|o| c.value_eq(o.as_ref())))
    }
}

impl PartialEq<EntityProxy<'_>> for Entity {
    fn eq(&self, other: &EntityProxy<'_>) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.id)?;
        let components = self.components.borrow();
        if !components.is_empty() {
            write!(f, " : {{")?;
            for (i, c) in components.values().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {:?}", c.kind().name(), c)?;
            }
            write!(f, "}}")?;
        }
        if !self.children.is_empty() {
            write!(f, " => [")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child.id)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
