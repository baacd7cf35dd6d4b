//! Scoped, non-owning views over entities.
//!
//! An [`EntityProxy`] wraps a borrowed entity together with a whitelist of
//! component kinds. Every access is checked against the whitelist before
//! being forwarded, with an asymmetric contract: probing (`has`) degrades
//! softly to `false`, typed access (`get`/`get_mut`) fails hard, and batch
//! writes (`update`) are all-or-nothing. Code holding a proxy can probe
//! safely but cannot silently touch data it is not scoped to.

use std::cell::{Ref, RefMut};
use std::fmt;

use crate::component::{Component, ComponentKind};
use crate::entity::{ComponentSet, Entity};
use crate::EcsError;

/// A non-owning view over an [`Entity`], restricted to a set of component
/// kinds. Cannot outlive the entity it wraps.
pub struct EntityProxy<'a> {
    entity: &'a Entity,
    scope: Vec<ComponentKind>,
}

impl<'a> EntityProxy<'a> {
    /// Wrap `entity`, restricting access to `scope`. An empty scope means
    /// "every kind the entity currently has".
    pub fn new(entity: &'a Entity, scope: impl Into<Vec<ComponentKind>>) -> Self {
        let mut scope = scope.into();
        if scope.is_empty() {
            scope = entity.kinds();
        }
        Self { entity, scope }
    }

    /// The wrapped entity's id.
    pub fn id(&self) -> &'a str {
        self.entity.id()
    }

    /// The kinds this proxy may access.
    pub fn scope(&self) -> &[ComponentKind] {
        &self.scope
    }

    /// Whether the wrapped entity is active.
    pub fn is_active(&self) -> bool {
        self.entity.is_active()
    }

    /// Activate or deactivate the wrapped entity.
    pub fn set_active(&self, active: bool) {
        self.entity.set_active(active);
    }

    /// Whether the entity has a component of type `T`.
    ///
    /// If `T` is outside the proxy's scope this returns `false` and emits a
    /// warning instead of failing -- the caller still gets a usable boolean.
    pub fn has<T: Component>(&self) -> bool {
        let kind = ComponentKind::of::<T>();
        if !self.in_scope(kind) {
            tracing::warn!(
                entity = %self.entity.id(),
                component = kind.name(),
                "has: component is out of scope for this proxy"
            );
            return false;
        }
        self.entity.has::<T>()
    }

    /// Borrow the component of type `T`.
    ///
    /// Fails with [`EcsError::OutOfScope`] if `T` is outside the proxy's
    /// scope (no sensible default could be returned), and with
    /// [`EcsError::MissingComponent`] if the entity lacks it.
    ///
    /// Do not hold the returned `Ref` across a call that inserts components
    /// on the same entity.
    pub fn get<T: Component>(&self) -> Result<Ref<'a, T>, EcsError> {
        let kind = ComponentKind::of::<T>();
        if !self.in_scope(kind) {
            return Err(EcsError::OutOfScope {
                entity: self.entity.id().to_owned(),
                component: kind.name(),
            });
        }
        let entity: &'a Entity = self.entity;
        entity.get::<T>()
    }

    /// Mutably borrow the component of type `T`.
    ///
    /// Same failure contract as [`get`](Self::get).
    ///
    /// Do not hold the returned `RefMut` across any other component access
    /// on the same entity.
    pub fn get_mut<T: Component>(&self) -> Result<RefMut<'a, T>, EcsError> {
        let kind = ComponentKind::of::<T>();
        if !self.in_scope(kind) {
            return Err(EcsError::OutOfScope {
                entity: self.entity.id().to_owned(),
                component: kind.name(),
            });
        }
        let entity: &'a Entity = self.entity;
        entity.get_mut::<T>()
    }

    /// Insert every component of `set` into the entity, replacing existing
    /// kinds. All-or-nothing: if any component in the set is outside the
    /// proxy's scope the whole call is rejected, a warning is emitted, and
    /// the entity is left unchanged. Returns whether the update was applied.
    pub fn update(&self, set: ComponentSet) -> bool {
        if let Some(kind) = set.kinds().iter().find(|kind| !self.in_scope(**kind)) {
            tracing::warn!(
                entity = %self.entity.id(),
                component = kind.name(),
                "update rejected: component is out of scope for this proxy"
            );
            return false;
        }
        for component in set.into_items() {
            self.entity.insert_boxed(component);
        }
        true
    }

    fn in_scope(&self, kind: ComponentKind) -> bool {
        self.scope.contains(&kind)
    }
}

impl PartialEq for EntityProxy<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl PartialEq<Entity> for EntityProxy<'_> {
    fn eq(&self, other: &Entity) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for EntityProxy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("entity", &self.id())
            .field("scope", &self.scope)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Position {
        x: i32,
        y: i32,
    }

    impl Component for Position {
        fn name() -> &'static str {
            "position"
        }
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Sprite {
        texture: String,
    }

    impl Component for Sprite {
        fn name() -> &'static str {
            "sprite"
        }
    }

    fn hero() -> Entity {
        Entity::new("hero")
            .with(Position { x: 50, y: 20 })
            .with(Sprite {
                texture: "hero.png".to_owned(),
            })
    }

    #[test]
    fn default_scope_is_current_kinds() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![]);
        assert!(proxy.has::<Position>());
        assert!(proxy.has::<Sprite>());
        assert_eq!(proxy.scope().len(), 2);
    }

    #[test]
    fn has_out_of_scope_is_soft_false() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);
        assert!(proxy.has::<Position>());
        assert!(!proxy.has::<Sprite>());
    }

    #[test]
    fn get_out_of_scope_is_hard_error() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);
        assert!(proxy.get::<Position>().is_ok());
        let err = proxy.get::<Sprite>().unwrap_err();
        assert!(matches!(
            err,
            EcsError::OutOfScope { ref entity, component } if entity == "hero" && component == "sprite"
        ));
    }

    #[test]
    fn get_in_scope_but_absent_is_lookup_error() {
        let entity = Entity::new("ghost");
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);
        assert!(matches!(
            proxy.get::<Position>(),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn get_mut_writes_through() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);
        proxy.get_mut::<Position>().unwrap().x += 10;
        assert_eq!(entity.get::<Position>().unwrap().x, 60);
    }

    #[test]
    fn update_out_of_scope_rejects_whole_batch() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);

        let applied = proxy.update(
            ComponentSet::new()
                .with(Position { x: 0, y: 0 })
                .with(Sprite {
                    texture: "other.png".to_owned(),
                }),
        );
        assert!(!applied);
        // No partial update: both components are untouched.
        assert_eq!(*entity.get::<Position>().unwrap(), Position { x: 50, y: 20 });
        assert_eq!(entity.get::<Sprite>().unwrap().texture, "hero.png");
    }

    #[test]
    fn update_in_scope_applies() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![ComponentKind::of::<Position>()]);
        assert!(proxy.update(ComponentSet::new().with(Position { x: 1, y: 2 })));
        assert_eq!(*entity.get::<Position>().unwrap(), Position { x: 1, y: 2 });
    }

    #[test]
    fn proxy_compares_to_entity_by_id() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![]);
        assert_eq!(proxy, entity);
        assert_eq!(entity, proxy);
    }

    #[test]
    fn active_flag_forwarding() {
        let entity = hero();
        let proxy = EntityProxy::new(&entity, vec![]);
        assert!(proxy.is_active());
        proxy.set_active(false);
        assert!(!entity.is_active());
    }
}
