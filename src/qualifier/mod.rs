//! Qualifier model
//!
//! A qualifier is the set of qualifying annotations that discriminates bindings
//! of the same type. Qualifiers are interned by [`QualifierFactory`], so equal
//! annotation sets share one instance and compare by pointer first.

use crate::types::{escape_identifier, to_identifier};
use dashmap::DashMap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Marker implied when a declaration carries no explicit qualifier.
pub const DEFAULT: &str = "Default";
/// Marker carried by every declared binding.
pub const ANY: &str = "Any";
/// Name-based qualifier; on its own it does not displace [`DEFAULT`].
pub const NAMED: &str = "Named";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum AnnotationRole {
    Qualifier,
    Other,
}

/// One annotation found on a declaration or injection point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    type_name: Arc<str>,
    values: BTreeMap<String, String>,
    role: AnnotationRole,
}

impl Annotation {
    /// An annotation that takes part in qualification.
    pub fn qualifier(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            values: BTreeMap::new(),
            role: AnnotationRole::Qualifier,
        }
    }

    /// Any other annotation (scopes, markers); ignored when building qualifiers.
    pub fn marker(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            values: BTreeMap::new(),
            role: AnnotationRole::Other,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::qualifier(NAMED).with_value("value", name)
    }

    pub fn default_marker() -> Self {
        Self::qualifier(DEFAULT)
    }

    pub fn any() -> Self {
        Self::qualifier(ANY)
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_qualifier(&self) -> bool {
        self.role == AnnotationRole::Qualifier
    }

    pub fn is_named(&self) -> bool {
        &*self.type_name == NAMED
    }

    /// Source-like rendering: `@Type` or `@Type(key=value, ...)`.
    pub fn literal(&self) -> String {
        if self.values.is_empty() {
            return format!("@{}", self.type_name);
        }
        let values: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("@{}({})", self.type_name, values.join(", "))
    }

    /// `{type}` followed by `_2{key}_2{value}` for each value; `_2` never
    /// occurs inside an encoded part.
    fn identifier(&self) -> String {
        let mut identifier = to_identifier(&self.type_name);
        for (key, value) in &self.values {
            identifier.push_str("_2");
            identifier.push_str(&escape_identifier(key));
            identifier.push_str("_2");
            identifier.push_str(&escape_identifier(value));
        }
        identifier
    }
}

impl Ord for Annotation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(&other.type_name)
            .then_with(|| self.literal().cmp(&other.literal()))
            .then_with(|| self.role.cmp(&other.role))
    }
}

impl PartialOrd for Annotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum QualifierKind {
    Universal,
    Annotations(BTreeSet<Annotation>),
}

/// An interned, order-irrelevant set of qualifying annotations.
#[derive(Clone)]
pub struct Qualifier(Arc<QualifierKind>);

impl Qualifier {
    /// True when `other` carries at least every annotation of `self`.
    ///
    /// The universal qualifier satisfies every request and is only satisfied by itself.
    pub fn is_satisfied_by(&self, other: &Qualifier) -> bool {
        match (&*self.0, &*other.0) {
            (QualifierKind::Universal, QualifierKind::Universal) => true,
            (QualifierKind::Universal, _) => false,
            (_, QualifierKind::Universal) => true,
            (QualifierKind::Annotations(requested), QualifierKind::Annotations(offered)) => {
                requested.is_subset(offered)
            }
        }
    }

    pub fn is_universal(&self) -> bool {
        matches!(&*self.0, QualifierKind::Universal)
    }

    /// Deterministic identifier usable inside generated names.
    pub fn identifier_safe_string(&self) -> String {
        match &*self.0 {
            QualifierKind::Universal => "Universal".to_string(),
            QualifierKind::Annotations(annotations) => annotations
                .iter()
                .map(Annotation::identifier)
                .collect::<Vec<_>>()
                .join("__"),
        }
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        let set = match &*self.0 {
            QualifierKind::Universal => None,
            QualifierKind::Annotations(annotations) => Some(annotations),
        };
        set.into_iter().flatten()
    }

    pub fn same_instance(&self, other: &Qualifier) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Qualifier {}

impl Hash for Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qualifier({self})")
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            QualifierKind::Universal => f.write_str("@Universal"),
            QualifierKind::Annotations(annotations) => {
                let literals: Vec<String> = annotations.iter().map(Annotation::literal).collect();
                f.write_str(&literals.join(" "))
            }
        }
    }
}

impl Serialize for Qualifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Interns qualifiers so equal annotation sets map to one instance.
///
/// Cloning the factory shares the underlying intern table.
#[derive(Clone)]
pub struct QualifierFactory {
    interned: Arc<DashMap<BTreeSet<Annotation>, Qualifier>>,
    universal: Qualifier,
}

impl Default for QualifierFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl QualifierFactory {
    pub fn new() -> Self {
        Self {
            interned: Arc::new(DashMap::new()),
            universal: Qualifier(Arc::new(QualifierKind::Universal)),
        }
    }

    /// Qualifier of a binding declaration.
    ///
    /// Adds `@Default` when no qualifier (or only `@Named`) is present, and always adds `@Any`.
    pub fn for_source(&self, annotations: &[Annotation]) -> Qualifier {
        let mut set: BTreeSet<Annotation> = annotations
            .iter()
            .filter(|a| a.is_qualifier())
            .cloned()
            .collect();
        if set.iter().all(Annotation::is_named) {
            set.insert(Annotation::default_marker());
        }
        set.insert(Annotation::any());
        self.intern(set)
    }

    /// Qualifier of an injection point; no qualifier means `@Default`.
    pub fn for_sink(&self, annotations: &[Annotation]) -> Qualifier {
        let mut set: BTreeSet<Annotation> = annotations
            .iter()
            .filter(|a| a.is_qualifier())
            .cloned()
            .collect();
        if set.is_empty() {
            set.insert(Annotation::default_marker());
        }
        self.intern(set)
    }

    /// The qualifier requested by an unannotated injection point.
    pub fn default_qualifier(&self) -> Qualifier {
        self.for_sink(&[])
    }

    pub fn universal(&self) -> Qualifier {
        self.universal.clone()
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }

    fn intern(&self, set: BTreeSet<Annotation>) -> Qualifier {
        let key = set.clone();
        self.interned
            .entry(key)
            .or_insert_with(|| Qualifier(Arc::new(QualifierKind::Annotations(set))))
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_ignores_order() {
        let factory = QualifierFactory::new();
        let a = factory.for_sink(&[Annotation::qualifier("Red"), Annotation::qualifier("Fast")]);
        let b = factory.for_sink(&[Annotation::qualifier("Fast"), Annotation::qualifier("Red")]);
        assert!(a.same_instance(&b));
        assert_eq!(a, b);
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_source_defaults() {
        let factory = QualifierFactory::new();

        let plain = factory.for_source(&[]);
        assert_eq!(plain.to_string(), "@Any @Default");

        let named = factory.for_source(&[Annotation::named("engine")]);
        assert_eq!(named.to_string(), "@Any @Default @Named(value=engine)");

        let red = factory.for_source(&[Annotation::qualifier("Red")]);
        assert_eq!(red.to_string(), "@Any @Red");

        let scoped = factory.for_source(&[Annotation::marker("ApplicationScoped")]);
        assert!(scoped.same_instance(&plain));
    }

    #[test]
    fn test_sink_defaults() {
        let factory = QualifierFactory::new();
        assert_eq!(factory.for_sink(&[]).to_string(), "@Default");
        assert_eq!(
            factory.for_sink(&[Annotation::named("x")]).to_string(),
            "@Named(value=x)"
        );
        assert!(factory.default_qualifier().same_instance(&factory.for_sink(&[])));
    }

    #[test]
    fn test_satisfaction() {
        let factory = QualifierFactory::new();
        let plain_source = factory.for_source(&[]);
        let red_source = factory.for_source(&[Annotation::qualifier("Red")]);
        let default_sink = factory.for_sink(&[]);
        let red_sink = factory.for_sink(&[Annotation::qualifier("Red")]);
        let any_sink = factory.for_sink(&[Annotation::any()]);

        assert!(default_sink.is_satisfied_by(&plain_source));
        assert!(!default_sink.is_satisfied_by(&red_source));
        assert!(red_sink.is_satisfied_by(&red_source));
        assert!(!red_sink.is_satisfied_by(&plain_source));
        assert!(any_sink.is_satisfied_by(&plain_source));
        assert!(any_sink.is_satisfied_by(&red_source));
    }

    #[test]
    fn test_universal_sentinel() {
        let factory = QualifierFactory::new();
        let universal = factory.universal();
        let red_sink = factory.for_sink(&[Annotation::qualifier("Red")]);

        assert!(red_sink.is_satisfied_by(&universal));
        assert!(universal.is_satisfied_by(&universal));
        assert!(!universal.is_satisfied_by(&red_sink));
        assert!(universal.is_universal());
        assert_eq!(universal.annotations().count(), 0);
    }

    #[test]
    fn test_identifier_safe_string_is_sorted_and_stable() {
        let factory = QualifierFactory::new();
        let q = factory.for_source(&[
            Annotation::qualifier("Zeta"),
            Annotation::qualifier("com.acme.Color").with_value("value", "red"),
            Annotation::qualifier("com.acme.Color").with_value("value", "blue"),
        ]);
        assert_eq!(
            q.identifier_safe_string(),
            "Any__Zeta__com_acme_Color_2value_2blue__com_acme_Color_2value_2red"
        );

        let rebuilt = QualifierFactory::new().for_source(&[
            Annotation::qualifier("com.acme.Color").with_value("value", "red"),
            Annotation::qualifier("Zeta"),
            Annotation::qualifier("com.acme.Color").with_value("value", "blue"),
        ]);
        assert_eq!(q.identifier_safe_string(), rebuilt.identifier_safe_string());
        assert_eq!(factory.universal().identifier_safe_string(), "Universal");
    }

    #[test]
    fn test_identifier_separates_values_from_names() {
        let factory = QualifierFactory::new();
        let valued = factory.for_sink(&[Annotation::qualifier("Color").with_value("value", "red")]);
        let flat = factory.for_sink(&[Annotation::qualifier("Color_value_red")]);
        let dotted = factory.for_sink(&[Annotation::qualifier("Color").with_value("value", "r.e_d")]);
        let underscored = factory.for_sink(&[Annotation::qualifier("Color").with_value("value", "r_e.d")]);

        assert_eq!(valued.identifier_safe_string(), "Color_2value_2red");
        assert_eq!(flat.identifier_safe_string(), "Color_1value_1red");
        assert_ne!(dotted.identifier_safe_string(), underscored.identifier_safe_string());
    }
}
