use crate::error::Result;
use crate::graph::dependency::DependencyKind;
use crate::graph::fragment::Fragment;
use crate::graph::injectable::{InjectableKind, InjectionSite, Scope, WiringTag};
use crate::qualifier::Qualifier;
use crate::types::TypeRef;
use serde::Serialize;
use std::collections::HashMap;

/// A dependency edge after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    kind: DependencyKind,
    member: String,
    requested_type: TypeRef,
    requested_qualifier: Qualifier,
    target: String,
    cyclic: bool,
}

impl ResolvedDependency {
    pub(crate) fn new(
        kind: DependencyKind,
        member: String,
        requested_type: TypeRef,
        requested_qualifier: Qualifier,
        target: String,
        cyclic: bool,
    ) -> Self {
        Self {
            kind,
            member,
            requested_type,
            requested_qualifier,
            target,
            cyclic,
        }
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn requested_type(&self) -> &TypeRef {
        &self.requested_type
    }

    pub fn requested_qualifier(&self) -> &Qualifier {
        &self.requested_qualifier
    }

    /// Factory name of the injectable this edge resolved to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the edge takes part in a dependency cycle.
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }
}

/// A resolved binding, ready for code generation.
#[derive(Debug, Clone, Serialize)]
pub struct Injectable {
    factory_name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    qualifier: Qualifier,
    kind: InjectableKind,
    scope: Scope,
    tags: Vec<WiringTag>,
    requires_proxy: bool,
    dependencies: Vec<ResolvedDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    injection_site: Option<InjectionSite>,
}

impl Injectable {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        factory_name: String,
        ty: TypeRef,
        qualifier: Qualifier,
        kind: InjectableKind,
        scope: Scope,
        tags: Vec<WiringTag>,
        requires_proxy: bool,
        dependencies: Vec<ResolvedDependency>,
        injection_site: Option<InjectionSite>,
    ) -> Self {
        Self {
            factory_name,
            ty,
            qualifier,
            kind,
            scope,
            tags,
            requires_proxy,
            dependencies,
            injection_site,
        }
    }

    pub fn factory_name(&self) -> &str {
        &self.factory_name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    pub fn kind(&self) -> InjectableKind {
        self.kind
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tags(&self) -> &[WiringTag] {
        &self.tags
    }

    pub fn has_tag(&self, tag: WiringTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn requires_proxy(&self) -> bool {
        self.requires_proxy
    }

    pub fn dependencies(&self) -> &[ResolvedDependency] {
        &self.dependencies
    }

    /// Set on transient bindings specialized for one injection site.
    pub fn injection_site(&self) -> Option<&InjectionSite> {
        self.injection_site.as_ref()
    }

    pub fn is_entry_point(&self) -> bool {
        self.scope == Scope::EntryPoint
    }

    pub fn is_simpleton(&self) -> bool {
        self.has_tag(WiringTag::Simpleton)
    }
}

/// The resolved, immutable dependency graph.
///
/// Injectables are kept in declaration order, with transient specializations
/// after the declarations they were created from.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    injectables: Vec<Injectable>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    fragments: Vec<Fragment>,
}

impl DependencyGraph {
    pub(crate) fn new(injectables: Vec<Injectable>, fragments: Vec<Fragment>) -> Self {
        let by_name = injectables
            .iter()
            .enumerate()
            .map(|(i, injectable)| (injectable.factory_name.clone(), i))
            .collect();
        Self {
            injectables,
            by_name,
            fragments,
        }
    }

    pub fn get_concrete_injectable(&self, factory_name: &str) -> Option<&Injectable> {
        self.by_name
            .get(factory_name)
            .map(|&i| &self.injectables[i])
    }

    /// Looks up the injectable a resolved edge points to.
    pub fn resolve(&self, dependency: &ResolvedDependency) -> Option<&Injectable> {
        self.get_concrete_injectable(dependency.target())
    }

    pub fn get_fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn contains(&self, factory_name: &str) -> bool {
        self.by_name.contains_key(factory_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Injectable> {
        self.injectables.iter()
    }

    pub fn len(&self) -> usize {
        self.injectables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injectables.is_empty()
    }

    /// JSON rendering consumed by code generators.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'a> IntoIterator for &'a DependencyGraph {
    type Item = &'a Injectable;
    type IntoIter = std::slice::Iter<'a, Injectable>;

    fn into_iter(self) -> Self::IntoIter {
        self.injectables.iter()
    }
}
