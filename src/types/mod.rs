//! Type model capability
//!
//! The resolver never inspects classes itself. Everything it needs to know about
//! a type (its supertypes and whether a proxy can be generated for it) comes
//! through [`TypeModel`], implemented by whatever collaborator scanned the
//! sources.

use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// An opaque, fully-qualified type name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(Arc<str>);

impl TypeRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The last path segment (`com.acme.Outer$Inner` -> `Inner`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(['.', '$']).next().unwrap_or(self.name())
    }

    /// The full name as an identifier; see [`to_identifier`].
    pub fn identifier_safe(&self) -> String {
        to_identifier(&self.0)
    }
}

/// Identifier form of a dotted name.
///
/// `.` becomes `_`, `_` becomes `_1` and every other character outside
/// `[A-Za-z0-9]` becomes `_0` followed by its UTF-16 units as four hex digits.
/// Distinct names map to distinct identifiers as long as no segment starts with
/// a digit, and the result never contains `__`.
pub(crate) fn to_identifier(raw: &str) -> String {
    encode(raw, true)
}

/// Like [`to_identifier`], but `.` is escaped as well, so any two distinct
/// strings stay distinct. After `_` the result only ever holds `0` or `1`.
pub(crate) fn escape_identifier(raw: &str) -> String {
    encode(raw, false)
}

fn encode(raw: &str, dotted: bool) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            c if c.is_ascii_alphanumeric() => encoded.push(c),
            '.' if dotted => encoded.push('_'),
            '_' => encoded.push_str("_1"),
            c => {
                for unit in c.encode_utf16(&mut [0; 2]) {
                    encoded.push_str(&format!("_0{unit:04x}"));
                }
            }
        }
    }
    encoded
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Structural facts about types, supplied by the scanning collaborator.
pub trait TypeModel: Send + Sync {
    /// The direct superclass, or `None` at the terminal root.
    fn superclass(&self, ty: &TypeRef) -> Option<TypeRef>;

    /// Interfaces directly implemented (or extended, for an interface).
    fn interfaces(&self, ty: &TypeRef) -> Vec<TypeRef>;

    fn is_interface(&self, ty: &TypeRef) -> bool;

    fn is_final(&self, ty: &TypeRef) -> bool;

    /// Whether the type has a constructor a generated proxy can call without arguments.
    fn is_default_instantiable(&self, ty: &TypeRef) -> bool;

    /// An interface, or a non-final class that can be default-instantiated.
    fn is_proxiable(&self, ty: &TypeRef) -> bool {
        self.is_interface(ty) || (!self.is_final(ty) && self.is_default_instantiable(ty))
    }

    /// The type itself followed by every type it is assignable to, breadth first.
    fn assignable_types(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([ty.clone()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parent) = self.superclass(&current) {
                queue.push_back(parent);
            }
            queue.extend(self.interfaces(&current));
            ordered.push(current);
        }

        ordered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeForm {
    Class,
    Interface,
}

/// Declaration of one type for [`StaticTypeModel`].
#[derive(Debug, Clone)]
pub struct TypeInfo {
    ty: TypeRef,
    form: TypeForm,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    is_final: bool,
    default_instantiable: bool,
}

impl TypeInfo {
    /// A non-final class with a default constructor.
    pub fn class(name: impl Into<TypeRef>) -> Self {
        Self {
            ty: name.into(),
            form: TypeForm::Class,
            superclass: None,
            interfaces: Vec::new(),
            is_final: false,
            default_instantiable: true,
        }
    }

    pub fn interface(name: impl Into<TypeRef>) -> Self {
        Self {
            ty: name.into(),
            form: TypeForm::Interface,
            superclass: None,
            interfaces: Vec::new(),
            is_final: false,
            default_instantiable: false,
        }
    }

    pub fn extends(mut self, parent: impl Into<TypeRef>) -> Self {
        match self.form {
            TypeForm::Class => self.superclass = Some(parent.into()),
            TypeForm::Interface => self.interfaces.push(parent.into()),
        }
        self
    }

    pub fn implements(mut self, iface: impl Into<TypeRef>) -> Self {
        self.interfaces.push(iface.into());
        self
    }

    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Marks the class as lacking a no-argument constructor.
    pub fn without_default_constructor(mut self) -> Self {
        self.default_instantiable = false;
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }
}

/// An in-memory [`TypeModel`].
///
/// Types that were never declared behave as non-final classes without a default
/// constructor, so they are never proxiable.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeModel {
    types: HashMap<TypeRef, TypeInfo>,
}

impl StaticTypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, info: TypeInfo) -> &mut Self {
        self.types.insert(info.ty.clone(), info);
        self
    }

    pub fn with(mut self, info: TypeInfo) -> Self {
        self.declare(info);
        self
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeModel for StaticTypeModel {
    fn superclass(&self, ty: &TypeRef) -> Option<TypeRef> {
        self.types.get(ty).and_then(|info| info.superclass.clone())
    }

    fn interfaces(&self, ty: &TypeRef) -> Vec<TypeRef> {
        self.types
            .get(ty)
            .map(|info| info.interfaces.clone())
            .unwrap_or_default()
    }

    fn is_interface(&self, ty: &TypeRef) -> bool {
        self.types
            .get(ty)
            .is_some_and(|info| info.form == TypeForm::Interface)
    }

    fn is_final(&self, ty: &TypeRef) -> bool {
        self.types.get(ty).is_some_and(|info| info.is_final)
    }

    fn is_default_instantiable(&self, ty: &TypeRef) -> bool {
        self.types
            .get(ty)
            .is_some_and(|info| info.default_instantiable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicles() -> StaticTypeModel {
        StaticTypeModel::new()
            .with(TypeInfo::interface("com.acme.Machine"))
            .with(TypeInfo::interface("com.acme.Movable").extends("com.acme.Machine"))
            .with(TypeInfo::class("com.acme.Vehicle").implements("com.acme.Movable"))
            .with(
                TypeInfo::class("com.acme.Car")
                    .extends("com.acme.Vehicle")
                    .implements("com.acme.Machine"),
            )
            .with(TypeInfo::class("com.acme.Locked").final_class())
            .with(TypeInfo::class("com.acme.NoCtor").without_default_constructor())
    }

    #[test]
    fn test_simple_name_and_identifier() {
        let ty = TypeRef::new("com.acme.Outer$Inner");
        assert_eq!(ty.simple_name(), "Inner");
        assert_eq!(ty.identifier_safe(), "com_acme_Outer_00024Inner");
        assert_eq!(TypeRef::new("Plain").simple_name(), "Plain");
    }

    #[test]
    fn test_identifiers_keep_names_apart() {
        let pairs = [
            ("a.b", "a_b"),
            ("Outer$Inner", "Outer_Inner"),
            ("Outer$1", "Outer_1"),
            ("com.acme.Fuel", "com_acme.Fuel"),
        ];
        for (left, right) in pairs {
            assert_ne!(to_identifier(left), to_identifier(right), "{left} vs {right}");
        }
        assert_eq!(to_identifier("com.acme.Engine"), "com_acme_Engine");
        assert_eq!(to_identifier("build_car"), "build_1car");
        assert_eq!(escape_identifier("a.b"), "a_0002eb");
        assert!(!to_identifier("com.my_app.Service$Impl").contains("__"));
    }

    #[test]
    fn test_assignable_types_are_transitive_and_unique() {
        let model = vehicles();
        let names: Vec<String> = model
            .assignable_types(&"com.acme.Car".into())
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "com.acme.Car",
                "com.acme.Vehicle",
                "com.acme.Machine",
                "com.acme.Movable",
            ]
        );
    }

    #[test]
    fn test_proxiability() {
        let model = vehicles();
        assert!(model.is_proxiable(&"com.acme.Machine".into()));
        assert!(model.is_proxiable(&"com.acme.Car".into()));
        assert!(!model.is_proxiable(&"com.acme.Locked".into()));
        assert!(!model.is_proxiable(&"com.acme.NoCtor".into()));
        assert!(!model.is_proxiable(&"com.acme.Unknown".into()));
    }
}
