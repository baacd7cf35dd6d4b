//! canopy-ecs -- a hierarchical entity-component runtime.
//!
//! Entities form a tree; each entity carries an id, an active flag, and a
//! set of typed components. Queries walk a subtree in pre-order, select
//! entities with a composable criteria algebra, and hand matches to handlers
//! as scoped proxies.
//!
//! # Quick start
//!
//! ```
//! use canopy_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize)]
//! struct Position { x: i32, y: i32 }
//!
//! impl Component for Position {
//!     fn name() -> &'static str { "position" }
//! }
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize)]
//! struct Health { hp: u32 }
//!
//! impl Component for Health {
//!     fn name() -> &'static str { "health" }
//! }
//!
//! let mut scene = Entity::new("scene");
//! scene.append(Entity::new("hero").with(Position { x: 50, y: 20 }).with(Health { hp: 100 }));
//! scene.append(Entity::new("rock").with(Position { x: 10, y: 10 }));
//!
//! let query = Query::new(&scene);
//!
//! // Bare component kinds select and scope at the same time.
//! let movable = query.filter(Selector::new().component::<Position>());
//! assert_eq!(movable.len(), 2);
//!
//! // Criteria compose; matches arrive in pre-order.
//! let hero = query
//!     .get(SugarCriteria::new().component::<Health>().field("position__x__gte", 20))
//!     .unwrap();
//! assert_eq!(hero.id(), "hero");
//!
//! // Handlers are bound once and invoked like systems.
//! let mut damage = query.call(
//!     Selector::new().component::<Health>(),
//!     |e: &EntityProxy, amount: &u32| e.get_mut::<Health>().unwrap().hp -= amount,
//! );
//! damage(30);
//! assert_eq!(scene.children()[0].get::<Health>().unwrap().hp, 70);
//! ```
//!
//! The runtime is single-threaded: entities use interior mutability so that
//! proxies returned from a query can mutate components while the tree is
//! only shared, and are therefore not `Sync`.

#![deny(unsafe_code)]

pub mod component;
pub mod criteria;
pub mod entity;
pub mod proxy;
pub mod query;

use thiserror::Error;

/// Errors surfaced by typed component access.
///
/// Traversal and filtering are infallible; only `get`/`get_mut` on entities
/// and proxies produce these.
#[derive(Debug, Error)]
pub enum EcsError {
    /// The entity has no component of the requested kind.
    #[error("entity '{entity}' has no '{component}' component")]
    MissingComponent {
        entity: String,
        component: &'static str,
    },

    /// The proxy is not scoped to the requested kind.
    #[error("component '{component}' is out of scope for the proxy over entity '{entity}'")]
    OutOfScope {
        entity: String,
        component: &'static str,
    },
}

pub mod prelude {
    //! Convenient glob import for the common surface.

    pub use crate::component::{Component, ComponentKind};
    pub use crate::criteria::{
        ById, Criteria, FilterCriteria, HasComponent, HasComponentValue, HasNotComponent,
        SugarCriteria,
    };
    pub use crate::entity::{ComponentSet, Entity};
    pub use crate::proxy::EntityProxy;
    pub use crate::query::{ActivePolicy, Query, Selector};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
