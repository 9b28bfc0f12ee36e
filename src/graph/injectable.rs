use crate::graph::dependency::Dependency;
use crate::qualifier::Qualifier;
use crate::types::TypeRef;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

/// How a binding produces its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum InjectableKind {
    Type,
    Producer,
    Provider,
    ContextualProvider,
    JsType,
    Transient,
    Extension,
}

/// Flags the scanning collaborator attaches to a binding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize,
)]
pub enum WiringTag {
    NormalScopedBean,
    DependentBean,
    /// Implicitly dependent type that was never explicitly declared as a bean.
    Simpleton,
    AlternativeBean,
    JsTypeBean,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Dependent,
    Singleton,
    ApplicationScoped,
    /// Roots of the application; each one seeds a fragment.
    EntryPoint,
    Custom(Arc<str>),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Dependent => f.write_str("Dependent"),
            Scope::Singleton => f.write_str("Singleton"),
            Scope::ApplicationScoped => f.write_str("ApplicationScoped"),
            Scope::EntryPoint => f.write_str("EntryPoint"),
            Scope::Custom(name) => f.write_str(name),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Index of a concrete injectable in the builder's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InjectableId(pub(crate) usize);

impl InjectableId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an abstract injectable in the builder's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct AbstractId(pub(crate) usize);

/// Identity of a requested or offered binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InjectableHandle {
    ty: TypeRef,
    qualifier: Qualifier,
}

impl InjectableHandle {
    pub fn new(ty: TypeRef, qualifier: Qualifier) -> Self {
        Self { ty, qualifier }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }
}

impl fmt::Display for InjectableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.qualifier, self.ty)
    }
}

/// Where a transient binding was specialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectionSite {
    pub owner_factory: String,
    pub owner_type: TypeRef,
    pub member: String,
}

/// A declared, instantiable binding.
#[derive(Debug, Clone)]
pub(crate) struct ConcreteInjectable {
    handle: InjectableHandle,
    factory_name: String,
    kind: InjectableKind,
    scope: Scope,
    tags: BTreeSet<WiringTag>,
    dependencies: Vec<Dependency>,
    injection_site: Option<InjectionSite>,
}

impl ConcreteInjectable {
    pub(crate) fn new(
        handle: InjectableHandle,
        factory_name: String,
        kind: InjectableKind,
        scope: Scope,
        tags: &[WiringTag],
    ) -> Self {
        Self {
            handle,
            factory_name,
            kind,
            scope,
            tags: tags.iter().copied().collect(),
            dependencies: Vec::new(),
            injection_site: None,
        }
    }

    /// `{Kind}_factory__{type}__quals__{qualifier}`
    pub(crate) fn factory_name_for(kind: InjectableKind, handle: &InjectableHandle) -> String {
        format!(
            "{}_factory__{}__quals__{}",
            kind,
            handle.ty().identifier_safe(),
            handle.qualifier().identifier_safe_string()
        )
    }

    /// A copy of this binding bound to one injection site.
    ///
    /// Edges of the copy point at their declared references again, so the copy
    /// resolves (and specializes) its own dependencies.
    pub(crate) fn provided_at(&self, factory_name: String, site: InjectionSite) -> Self {
        let mut dependencies = self.dependencies.clone();
        dependencies.iter_mut().for_each(Dependency::reset);
        Self {
            factory_name,
            dependencies,
            injection_site: Some(site),
            ..self.clone()
        }
    }

    pub(crate) fn renamed(self, factory_name: String) -> Self {
        Self {
            factory_name,
            ..self
        }
    }

    pub(crate) fn handle(&self) -> &InjectableHandle {
        &self.handle
    }

    pub(crate) fn ty(&self) -> &TypeRef {
        self.handle.ty()
    }

    pub(crate) fn qualifier(&self) -> &Qualifier {
        self.handle.qualifier()
    }

    pub(crate) fn factory_name(&self) -> &str {
        &self.factory_name
    }

    pub(crate) fn kind(&self) -> InjectableKind {
        self.kind
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn tags(&self) -> &BTreeSet<WiringTag> {
        &self.tags
    }

    pub(crate) fn has_tag(&self, tag: WiringTag) -> bool {
        self.tags.contains(&tag)
    }

    pub(crate) fn is_normal_scoped(&self) -> bool {
        self.has_tag(WiringTag::NormalScopedBean)
    }

    pub(crate) fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut Vec<Dependency> {
        &mut self.dependencies
    }

    pub(crate) fn injection_site(&self) -> Option<&InjectionSite> {
        self.injection_site.as_ref()
    }
}

/// An unresolved `(type, qualifier)` reference shared by every dependency on it.
#[derive(Debug, Clone)]
pub(crate) struct AbstractInjectable {
    handle: InjectableHandle,
    linked_concretes: Vec<InjectableId>,
    linked_abstracts: Vec<AbstractId>,
}

impl AbstractInjectable {
    pub(crate) fn new(handle: InjectableHandle) -> Self {
        Self {
            handle,
            linked_concretes: Vec::new(),
            linked_abstracts: Vec::new(),
        }
    }

    pub(crate) fn handle(&self) -> &InjectableHandle {
        &self.handle
    }

    pub(crate) fn linked_concretes(&self) -> &[InjectableId] {
        &self.linked_concretes
    }

    pub(crate) fn linked_abstracts(&self) -> &[AbstractId] {
        &self.linked_abstracts
    }

    pub(crate) fn link_concrete(&mut self, id: InjectableId) {
        if !self.linked_concretes.contains(&id) {
            self.linked_concretes.push(id);
        }
    }

    pub(crate) fn link_abstract(&mut self, id: AbstractId) {
        if !self.linked_abstracts.contains(&id) {
            self.linked_abstracts.push(id);
        }
    }
}
