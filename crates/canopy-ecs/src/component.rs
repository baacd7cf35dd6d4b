//! Component identity and type erasure.
//!
//! Components are plain value types attached to entities. Each component
//! type declares a stable lowercase name; together with the Rust `TypeId`
//! this forms a [`ComponentKind`], the runtime identity used for presence
//! tests, proxy scoping, and sugar-criteria lookups. An entity holds at
//! most one component per kind.

use std::any::{Any, TypeId};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// Contract for attribute bundles that can be attached to an entity.
///
/// A component has no identity beyond its kind: it must be cloneable,
/// comparable by value, and serializable. Serialization is only used for
/// structural field lookup in sugar criteria -- the tree is never persisted.
///
/// ```
/// #[derive(Debug, Clone, PartialEq, serde::Serialize)]
/// struct Position { x: i32, y: i32 }
///
/// impl canopy_ecs::component::Component for Position {
///     fn name() -> &'static str { "position" }
/// }
/// ```
pub trait Component: Clone + PartialEq + Serialize + fmt::Debug + 'static {
    /// Stable lowercase identity for this component type.
    ///
    /// Two distinct Rust types may share a name; they remain distinct kinds.
    fn name() -> &'static str;
}

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Opaque runtime identity of a component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    /// The kind of component type `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::name(),
        }
    }

    /// The declared component name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKind({})", self.name)
    }
}

// ---------------------------------------------------------------------------
// ErasedComponent -- boxed component object stored on an entity
// ---------------------------------------------------------------------------

/// Object-safe view over a concrete component.
///
/// Implemented for every `T: Component` via the blanket impl below; the rest
/// of the crate stores components as `Box<dyn ErasedComponent>` and recovers
/// the concrete type by downcasting.
pub(crate) trait ErasedComponent: fmt::Debug {
    fn kind(&self) -> ComponentKind;
    fn clone_box(&self) -> Box<dyn ErasedComponent>;
    /// Value equality against another erased component. Differing concrete
    /// types compare unequal.
    fn value_eq(&self, other: &dyn ErasedComponent) -> bool;
    /// Structural JSON rendition, used for sugar-criteria field lookups.
    fn as_json(&self) -> serde_json::Value;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedComponent for T {
    fn kind(&self) -> ComponentKind {
        ComponentKind::of::<T>()
    }

    fn clone_box(&self) -> Box<dyn ErasedComponent> {
        Box::new(self.clone())
    }

    fn value_eq(&self, other: &dyn ErasedComponent) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|err| {
            tracing::warn!(
                component = T::name(),
                %err,
                "component is not representable as JSON; field lookups will see null"
            );
            serde_json::Value::Null
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
