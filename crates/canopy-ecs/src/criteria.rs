//! Predicate algebra over entities.
//!
//! A [`Criteria`] is a pure, side-effect-free predicate over an entity.
//! Criteria compose by conjunction only: a sequence of criteria passed to a
//! filtering operation is ANDed, and an empty sequence matches every
//! entity. The only negative form is [`HasNotComponent`].

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::component::{Component, ComponentKind, ErasedComponent};
use crate::entity::Entity;

// ---------------------------------------------------------------------------
// Criteria trait
// ---------------------------------------------------------------------------

/// A predicate over an entity, used for filtering and matching.
pub trait Criteria {
    /// Whether `entity` meets this criteria.
    fn meet(&self, entity: &Entity) -> bool;
}

// ---------------------------------------------------------------------------
// ById
// ---------------------------------------------------------------------------

/// Matches entities with the given id.
#[derive(Debug, Clone)]
pub struct ById {
    id: String,
}

impl ById {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Criteria for ById {
    fn meet(&self, entity: &Entity) -> bool {
        entity.id() == self.id
    }
}

// ---------------------------------------------------------------------------
// HasComponent
// ---------------------------------------------------------------------------

/// Matches entities that have *every* listed component kind.
#[derive(Debug, Clone)]
pub struct HasComponent {
    kinds: Vec<ComponentKind>,
}

impl HasComponent {
    /// Require component type `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            kinds: vec![ComponentKind::of::<T>()],
        }
    }

    /// Additionally require component type `T`.
    pub fn and<T: Component>(mut self) -> Self {
        self.kinds.push(ComponentKind::of::<T>());
        self
    }

    /// Require every kind in `kinds`.
    pub fn from_kinds(kinds: Vec<ComponentKind>) -> Self {
        Self { kinds }
    }
}

impl Criteria for HasComponent {
    fn meet(&self, entity: &Entity) -> bool {
        self.kinds.iter().all(|kind| entity.has_kind(*kind))
    }
}

// ---------------------------------------------------------------------------
// HasNotComponent
// ---------------------------------------------------------------------------

/// Matches entities that have *none* of the listed component kinds.
#[derive(Debug, Clone)]
pub struct HasNotComponent {
    kinds: Vec<ComponentKind>,
}

impl HasNotComponent {
    /// Exclude component type `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            kinds: vec![ComponentKind::of::<T>()],
        }
    }

    /// Additionally exclude component type `T`.
    pub fn and<T: Component>(mut self) -> Self {
        self.kinds.push(ComponentKind::of::<T>());
        self
    }
}

impl Criteria for HasNotComponent {
    fn meet(&self, entity: &Entity) -> bool {
        !self.kinds.iter().any(|kind| entity.has_kind(*kind))
    }
}

// ---------------------------------------------------------------------------
// HasComponentValue
// ---------------------------------------------------------------------------

/// Matches entities whose stored component equals each listed instance.
///
/// An entity that *lacks* one of the listed kinds passes that check
/// vacuously: absence is not a mismatch. Pair with [`HasComponent`] when
/// presence must also hold.
pub struct HasComponentValue {
    expected: Vec<Box<dyn ErasedComponent>>,
}

impl HasComponentValue {
    /// Require the stored `T` (if any) to equal `component`.
    pub fn of<T: Component>(component: T) -> Self {
        Self {
            expected: vec![Box::new(component)],
        }
    }

    /// Additionally require the stored `T` (if any) to equal `component`.
    pub fn and<T: Component>(mut self, component: T) -> Self {
        self.expected.push(Box::new(component));
        self
    }
}

impl Criteria for HasComponentValue {
    fn meet(&self, entity: &Entity) -> bool {
        self.expected.iter().all(|expected| {
            entity
                .component_value_eq(expected.as_ref())
                .unwrap_or(true)
        })
    }
}

impl fmt::Debug for HasComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasComponentValue")
            .field("expected", &self.expected)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria
// ---------------------------------------------------------------------------

/// Wraps an arbitrary entity predicate function.
pub struct FilterCriteria {
    predicate: Box<dyn Fn(&Entity) -> bool>,
}

impl FilterCriteria {
    pub fn new(predicate: impl Fn(&Entity) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Criteria for FilterCriteria {
    fn meet(&self, entity: &Entity) -> bool {
        (self.predicate)(entity)
    }
}

// ---------------------------------------------------------------------------
// Field operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl FieldOp {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "gte" => Some(Self::Gte),
            _ => None,
        }
    }

    fn evaluate(self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::Ne => actual != expected,
            Self::Lt => json_cmp(actual, expected).is_some_and(Ordering::is_lt),
            Self::Gt => json_cmp(actual, expected).is_some_and(Ordering::is_gt),
            Self::Lte => json_cmp(actual, expected).is_some_and(Ordering::is_le),
            Self::Gte => json_cmp(actual, expected).is_some_and(Ordering::is_ge),
        }
    }
}

/// Natural ordering between two JSON values: numbers, strings, and booleans
/// order within their own kind; everything else (and mixed kinds) has no
/// ordering, so the ordered operators fail.
fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// A compiled `component[__field][__operator]` predicate.
///
/// The accessor is built once at construction and evaluated lazily per
/// entity: look up the component by declared name (absent means false),
/// read the field from its JSON rendition (or compare the whole component
/// when no field is given), and apply the operator.
struct FieldPredicate {
    component: String,
    field: String,
    op: FieldOp,
    expected: Value,
}

impl Criteria for FieldPredicate {
    fn meet(&self, entity: &Entity) -> bool {
        let Some(json) = entity.component_json(&self.component) else {
            return false;
        };
        let actual = if self.field.is_empty() {
            json
        } else {
            match json.get(self.field.as_str()) {
                Some(value) => value.clone(),
                None => return false,
            }
        };
        self.op.evaluate(&actual, &self.expected)
    }
}

// ---------------------------------------------------------------------------
// SugarCriteria
// ---------------------------------------------------------------------------

/// Compound criteria assembled from a sugar syntax.
///
/// Every part is ANDed. The `field` keys follow the
/// `component[__field][__operator]` convention:
///
/// ```
/// use canopy_ecs::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq, serde::Serialize)]
/// struct Position { x: i32, y: i32 }
/// impl Component for Position {
///     fn name() -> &'static str { "position" }
/// }
///
/// let hero = Entity::new("hero").with(Position { x: 50, y: 20 });
///
/// let criteria = SugarCriteria::new()
///     .id("hero")
///     .component::<Position>()
///     .field("position__x__gte", 40);
/// assert!(criteria.meet(&hero));
/// ```
#[derive(Default)]
pub struct SugarCriteria {
    parts: Vec<Box<dyn Criteria>>,
}

impl SugarCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass an already-built criteria through unchanged.
    pub fn criteria(mut self, criteria: impl Criteria + 'static) -> Self {
        self.parts.push(Box::new(criteria));
        self
    }

    /// Require component type `T` to be present.
    pub fn component<T: Component>(mut self) -> Self {
        self.parts.push(Box::new(HasComponent::of::<T>()));
        self
    }

    /// Require the stored `T` (if any) to equal `component`
    /// (see [`HasComponentValue`] for the vacuous-pass rule).
    pub fn value<T: Component>(mut self, component: T) -> Self {
        self.parts.push(Box::new(HasComponentValue::of(component)));
        self
    }

    /// Require the entity id to equal `id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.parts.push(Box::new(ById::new(id)));
        self
    }

    /// Require component type `T` to be absent.
    pub fn has_not<T: Component>(mut self) -> Self {
        self.parts.push(Box::new(HasNotComponent::of::<T>()));
        self
    }

    /// Add a `component[__field][__operator]` predicate.
    ///
    /// The key splits on `__` into up to three parts (extra parts are
    /// ignored). A middle token that is itself an operator keyword is
    /// reinterpreted as the operator with an empty field name, meaning
    /// "compare the whole component". An unrecognized or missing operator
    /// defaults to `eq`.
    pub fn field(mut self, key: &str, expected: impl Serialize) -> Self {
        let expected = serde_json::to_value(&expected).unwrap_or_else(|err| {
            tracing::warn!(key, %err, "expected value is not representable as JSON");
            Value::Null
        });

        let parts: Vec<&str> = key.split("__").collect();
        let component = parts[0];
        let (field, op_token) = match parts.len() {
            1 => ("", ""),
            2 if FieldOp::parse(parts[1]).is_some() => ("", parts[1]),
            2 => (parts[1], ""),
            _ => (parts[1], parts[2]),
        };
        let op = FieldOp::parse(op_token).unwrap_or(FieldOp::Eq);

        self.parts.push(Box::new(FieldPredicate {
            component: component.to_owned(),
            field: field.to_owned(),
            op,
            expected,
        }));
        self
    }
}

impl Criteria for SugarCriteria {
    fn meet(&self, entity: &Entity) -> bool {
        self.parts.iter().all(|criteria| criteria.meet(entity))
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

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Spatial {
        z: i32,
    }

    impl Component for Spatial {
        fn name() -> &'static str {
            "spatial"
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
    fn custom_criteria() {
        struct IsHero;
        impl Criteria for IsHero {
            fn meet(&self, entity: &Entity) -> bool {
                entity.id() == "hero"
            }
        }
        assert!(IsHero.meet(&hero()));
    }

    #[test]
    fn by_id() {
        assert!(ById::new("hero").meet(&hero()));
        assert!(!ById::new("logo").meet(&hero()));
    }

    #[test]
    fn has_component() {
        let hero = hero();
        assert!(HasComponent::of::<Position>().meet(&hero));
        assert!(HasComponent::of::<Position>().and::<Sprite>().meet(&hero));
        assert!(!HasComponent::of::<Position>().and::<Spatial>().meet(&hero));
    }

    #[test]
    fn has_not_component() {
        let hero = hero();
        assert!(HasNotComponent::of::<Spatial>().meet(&hero));
        assert!(!HasNotComponent::of::<Spatial>().and::<Sprite>().meet(&hero));
    }

    #[test]
    fn has_component_value() {
        let hero = hero();
        assert!(HasComponentValue::of(Position { x: 50, y: 20 }).meet(&hero));
        assert!(!HasComponentValue::of(Position { x: 1, y: 1 }).meet(&hero));
        assert!(HasComponentValue::of(Position { x: 50, y: 20 })
            .and(Sprite {
                texture: "hero.png".to_owned()
            })
            .meet(&hero));
    }

    #[test]
    fn has_component_value_passes_vacuously_when_absent() {
        // The entity lacks Spatial entirely, so the value check passes.
        assert!(HasComponentValue::of(Spatial { z: 7 }).meet(&hero()));
    }

    #[test]
    fn filter_criteria() {
        let hero = hero();
        assert!(FilterCriteria::new(|e| e.id().starts_with("he")).meet(&hero));
        assert!(!FilterCriteria::new(|_| false).meet(&hero));
    }

    #[test]
    fn sugar_empty_matches_everything() {
        assert!(SugarCriteria::new().meet(&hero()));
    }

    #[test]
    fn sugar_positional_parts() {
        let hero = hero();
        let criteria = SugarCriteria::new()
            .criteria(HasNotComponent::of::<Spatial>())
            .component::<Position>()
            .value(Sprite {
                texture: "hero.png".to_owned(),
            });
        assert!(criteria.meet(&hero));
    }

    #[test]
    fn sugar_field_equality_forms() {
        let hero = hero();
        assert!(SugarCriteria::new()
            .field("position", Position { x: 50, y: 20 })
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__eq", Position { x: 50, y: 20 })
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x", 50)
            .field("position__y", 20)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__eq", 50)
            .meet(&hero));
        assert!(!SugarCriteria::new().field("position__x", 51).meet(&hero));
    }

    #[test]
    fn sugar_field_ordering_operators() {
        let hero = hero();
        assert!(SugarCriteria::new()
            .field("position__ne", Position { x: 100, y: 80 })
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__ne", 100)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__lt", 51)
            .field("position__y__lt", 21)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__lte", 50)
            .field("position__y__lte", 80)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__gt", 49)
            .field("position__y__gt", 19)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__gte", 20)
            .field("position__y__gte", 10)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("sprite__texture__gt", "hero.pna")
            .meet(&hero));
    }

    #[test]
    fn sugar_unrecognized_operator_defaults_to_eq() {
        let hero = hero();
        // "fake" is not an operator: position.x == 25 is false, == 50 holds.
        assert!(!SugarCriteria::new()
            .field("position__x__fake", 25)
            .meet(&hero));
        assert!(SugarCriteria::new()
            .field("position__x__fake", 50)
            .meet(&hero));
    }

    #[test]
    fn sugar_missing_component_or_field_is_false() {
        let hero = hero();
        assert!(!SugarCriteria::new().field("spatial__z", 0).meet(&hero));
        assert!(!SugarCriteria::new()
            .field("position__missing", 0)
            .meet(&hero));
    }

    #[test]
    fn sugar_extra_key_segments_are_ignored() {
        assert!(SugarCriteria::new()
            .field("position__x__gte__junk", 40)
            .meet(&hero()));
    }

    #[test]
    fn sugar_keyword_parts() {
        let hero = hero();
        assert!(SugarCriteria::new().id("hero").meet(&hero));
        assert!(SugarCriteria::new()
            .component::<Position>()
            .component::<Sprite>()
            .meet(&hero));
        assert!(SugarCriteria::new()
            .has_not::<Spatial>()
            .meet(&hero));
        assert!(!SugarCriteria::new()
            .id("hero")
            .field("position__x__gte", 60)
            .meet(&hero));
    }

    #[test]
    fn ordered_operator_on_mixed_kinds_is_false() {
        // String vs number has no natural ordering.
        assert!(!SugarCriteria::new()
            .field("sprite__texture__lt", 10)
            .meet(&hero()));
    }
}
