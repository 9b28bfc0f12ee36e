//! Dependency resolution
//!
//! A single depth-first walk over every concrete injectable, driven by an
//! explicit stack of frames instead of recursion so deep graphs cannot overflow
//! the call stack. Each frame remembers which of its dependencies comes next.
//!
//! While walking, every dependency edge is resolved to exactly one concrete
//! binding, cycles are detected as back edges onto the current path, and the
//! bindings that must be proxied for a cycle to be constructible are recorded.
//! Results are kept in side maps on [`Resolution`]; the registry itself is only
//! touched to register transient specializations.

use crate::error::{CycleViolation, GraphError, ResolutionPath, Result};
use crate::graph::dependency::DependencyKind;
use crate::graph::injectable::{
    AbstractId, ConcreteInjectable, InjectableHandle, InjectableId, InjectableKind,
    InjectionSite, WiringTag,
};
use crate::graph::registry::Registry;
use crate::types::{TypeModel, TypeRef, escape_identifier};
use std::collections::{HashMap, HashSet};
use strum_macros::{Display, EnumIter};

/// Precedence among candidates that structurally match a request.
///
/// Variants are ordered from highest to lowest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter)]
pub enum ResolutionPriority {
    Provided,
    EnabledAlternative,
    Normal,
    Extension,
    Simpleton,
}

impl ResolutionPriority {
    /// The tier of `concrete`, or `None` if it is an alternative that is not enabled.
    pub(crate) fn of(
        concrete: &ConcreteInjectable,
        enabled_alternatives: &HashSet<TypeRef>,
    ) -> Option<Self> {
        match concrete.kind() {
            InjectableKind::Provider | InjectableKind::ContextualProvider => {
                Some(ResolutionPriority::Provided)
            }
            _ if concrete.has_tag(WiringTag::AlternativeBean) => enabled_alternatives
                .contains(concrete.ty())
                .then_some(ResolutionPriority::EnabledAlternative),
            _ if concrete.has_tag(WiringTag::Simpleton) => Some(ResolutionPriority::Simpleton),
            InjectableKind::Type | InjectableKind::Producer | InjectableKind::JsType => {
                Some(ResolutionPriority::Normal)
            }
            InjectableKind::Transient | InjectableKind::Extension => {
                Some(ResolutionPriority::Extension)
            }
        }
    }
}

/// Everything the walk decided, keyed by arena handles.
#[derive(Debug, Default)]
pub(crate) struct Resolution {
    resolved: HashMap<AbstractId, InjectableId>,
    cyclic: HashSet<(InjectableId, usize)>,
    requires_proxy: HashSet<InjectableId>,
}

impl Resolution {
    pub(crate) fn target_of(&self, abstract_id: AbstractId) -> Option<InjectableId> {
        self.resolved.get(&abstract_id).copied()
    }

    pub(crate) fn is_cyclic(&self, owner: InjectableId, edge: usize) -> bool {
        self.cyclic.contains(&(owner, edge))
    }

    pub(crate) fn requires_proxy(&self, id: InjectableId) -> bool {
        self.requires_proxy.contains(&id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    concrete: InjectableId,
    next_dependency: usize,
}

/// Traversal state for one resolution run.
pub(crate) struct ResolutionContext<'a> {
    registry: &'a mut Registry,
    types: &'a dyn TypeModel,
    enabled_alternatives: &'a HashSet<TypeRef>,
    resolution: Resolution,
    visited: HashSet<InjectableId>,
    visiting: HashSet<InjectableId>,
    stack: Vec<Frame>,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(
        registry: &'a mut Registry,
        types: &'a dyn TypeModel,
        enabled_alternatives: &'a HashSet<TypeRef>,
    ) -> Self {
        Self {
            registry,
            types,
            enabled_alternatives,
            resolution: Resolution::default(),
            visited: HashSet::new(),
            visiting: HashSet::new(),
            stack: Vec::new(),
        }
    }

    /// Resolves every dependency of every concrete, in declaration order.
    pub(crate) fn resolve(mut self) -> Result<Resolution> {
        // Specializations registered during the walk are picked up by this loop too.
        let mut next_root = 0;
        while next_root < self.registry.concrete_count() {
            let root = InjectableId(next_root);
            next_root += 1;
            if self.visited.contains(&root) {
                continue;
            }
            self.push(root);
            self.drain()?;
        }

        tracing::debug!(
            "Resolved {} abstract references, {} cyclic edges, {} proxies required",
            self.resolution.resolved.len(),
            self.resolution.cyclic.len(),
            self.resolution.requires_proxy.len()
        );
        Ok(self.resolution)
    }

    fn push(&mut self, concrete: InjectableId) {
        tracing::trace!("Visiting {}", self.registry.concrete(concrete).factory_name());
        self.visiting.insert(concrete);
        self.stack.push(Frame {
            concrete,
            next_dependency: 0,
        });
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(top) = self.stack.last_mut() {
            let owner = top.concrete;
            let edge = top.next_dependency;

            if edge >= self.registry.concrete(owner).dependencies().len() {
                self.stack.pop();
                self.visiting.remove(&owner);
                self.visited.insert(owner);
                tracing::trace!("Visited {}", self.registry.concrete(owner).factory_name());
                continue;
            }
            top.next_dependency += 1;

            let resolved = self.resolve_edge(owner, edge)?;
            if self.visiting.contains(&resolved) {
                self.record_cycle(resolved)?;
            } else if !self.visited.contains(&resolved) {
                self.push(resolved);
            }
        }
        Ok(())
    }

    fn resolve_edge(&mut self, owner: InjectableId, edge: usize) -> Result<InjectableId> {
        let dependency = self.registry.concrete(owner).dependencies()[edge].clone();
        let target = dependency.target();

        let resolved = match self.resolution.resolved.get(&target) {
            Some(&cached) => cached,
            None => {
                let selected = self.select(target)?;
                self.resolution.resolved.insert(target, selected);
                selected
            }
        };

        let concrete = self.registry.concrete(resolved);
        if concrete.kind() == InjectableKind::Transient && concrete.injection_site().is_none() {
            return Ok(self.specialize(owner, edge, resolved));
        }
        Ok(resolved)
    }

    /// Picks the single best candidate for an abstract reference.
    fn select(&self, target: AbstractId) -> Result<InjectableId> {
        let handle = self.registry.abstract_node(target).handle();
        let mut best: Option<(ResolutionPriority, Vec<InjectableId>)> = None;

        for candidate in self.registry.candidates(target) {
            let concrete = self.registry.concrete(candidate);
            let Some(priority) = ResolutionPriority::of(concrete, self.enabled_alternatives) else {
                continue;
            };
            best = match best.take() {
                Some((tier, mut members)) if tier == priority => {
                    members.push(candidate);
                    Some((tier, members))
                }
                Some((tier, members)) if tier < priority => Some((tier, members)),
                _ => Some((priority, vec![candidate])),
            };
        }

        let Some((tier, members)) = best else {
            let err = GraphError::UnsatisfiedDependency {
                requested: handle.to_string(),
                path: self.path_to(handle),
            };
            tracing::error!("{}", err);
            return Err(err);
        };

        if let [single] = members.as_slice() {
            tracing::debug!(
                "Resolved {} to {} ({})",
                handle,
                self.registry.concrete(*single).factory_name(),
                tier
            );
            return Ok(*single);
        }

        // A concrete class request prefers the binding of exactly that class.
        if !self.types.is_interface(handle.ty()) {
            let exact: Vec<InjectableId> = members
                .iter()
                .copied()
                .filter(|&id| self.registry.concrete(id).ty() == handle.ty())
                .collect();
            if let [single] = exact.as_slice() {
                tracing::debug!(
                    "Resolved {} to {} by exact type among {} candidates",
                    handle,
                    self.registry.concrete(*single).factory_name(),
                    members.len()
                );
                return Ok(*single);
            }
        }

        let err = GraphError::AmbiguousDependency {
            requested: handle.to_string(),
            candidates: members
                .iter()
                .map(|&id| self.registry.concrete(id).factory_name().to_string())
                .collect(),
            path: self.path_to(handle),
        };
        tracing::error!("{}", err);
        Err(err)
    }

    /// Clones a transient binding for one injection site and rewires that edge to it.
    ///
    /// The copy is named `{type}__within__{site type}`. When that name is taken
    /// (the site owns several such edges, or other owners share its type) the
    /// member, then the owner's factory name, then a counter are appended.
    fn specialize(
        &mut self,
        owner: InjectableId,
        edge: usize,
        base: InjectableId,
    ) -> InjectableId {
        let owner_concrete = self.registry.concrete(owner);
        let dependency = &owner_concrete.dependencies()[edge];
        let handle = self.registry.abstract_node(dependency.target()).handle().clone();
        let site = InjectionSite {
            owner_factory: owner_concrete.factory_name().to_string(),
            owner_type: owner_concrete.ty().clone(),
            member: dependency.member().to_string(),
        };

        let preferred = format!(
            "{}__within__{}",
            self.registry.concrete(base).ty().identifier_safe(),
            site.owner_type.identifier_safe()
        );
        let member = escape_identifier(&site.member);
        let owner_factory = escape_identifier(&site.owner_factory);

        let mut provided = self
            .registry
            .concrete(base)
            .provided_at(preferred.clone(), site);
        let mut attempt = 0;
        let provided_id = loop {
            match self.registry.insert(provided) {
                Ok(id) => break id,
                Err(rejected) => {
                    attempt += 1;
                    let fallback = match attempt {
                        1 => format!("{preferred}__{member}"),
                        2 => format!("{preferred}__{owner_factory}__{member}"),
                        n => format!("{preferred}__{owner_factory}__{member}__{}", n - 1),
                    };
                    tracing::trace!(
                        "{} is taken, trying {}",
                        rejected.factory_name(),
                        fallback
                    );
                    provided = rejected.renamed(fallback);
                }
            }
        };

        let private = self.registry.private_abstract(handle);
        self.registry.retarget(owner, edge, private);
        self.resolution.resolved.insert(private, provided_id);

        tracing::debug!(
            "Specialized transient {} as {}",
            self.registry.concrete(base).factory_name(),
            self.registry.concrete(provided_id).factory_name()
        );
        provided_id
    }

    /// Validates the cycle closed by the edge just taken from the top frame back to `closing`.
    ///
    /// Proxies are assigned per edge, not minimized per cycle: every constructor
    /// target, every normal-scoped proxiable target and every producer behind a
    /// breakable producer-member edge is proxied, even if one proxy would already
    /// break the cycle.
    fn record_cycle(&mut self, closing: InjectableId) -> Result<()> {
        let Some(start) = self.stack.iter().position(|f| f.concrete == closing) else {
            return Ok(());
        };

        // (owner, edge index, target) for each edge of the cycle, in path order.
        let frames = &self.stack[start..];
        let edges: Vec<(InjectableId, usize, InjectableId)> = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let target = frames.get(i + 1).map_or(closing, |next| next.concrete);
                (frame.concrete, frame.next_dependency - 1, target)
            })
            .collect();

        let mut path = ResolutionPath::new();
        for &(owner, _, _) in &edges {
            let concrete = self.registry.concrete(owner);
            path.push(concrete.ty().to_string(), concrete.qualifier().to_string());
        }
        let closing_concrete = self.registry.concrete(closing);
        path.push(
            closing_concrete.ty().to_string(),
            closing_concrete.qualifier().to_string(),
        );
        tracing::debug!("Cycle detected: {}", path);

        for &(owner, edge, _) in &edges {
            self.resolution.cyclic.insert((owner, edge));
        }

        let mut proxied = Vec::new();
        let mut breakable = false;

        for &(owner, edge, target) in &edges {
            let kind = self.registry.concrete(owner).dependencies()[edge].kind();
            let target_concrete = self.registry.concrete(target);
            let target_proxiable = self.types.is_proxiable(target_concrete.ty());

            if kind == DependencyKind::Constructor {
                if !target_proxiable {
                    let err = GraphError::IllegalCycle {
                        violation: CycleViolation::NonProxiable {
                            type_name: target_concrete.ty().to_string(),
                        },
                        path,
                    };
                    tracing::error!("{}", err);
                    return Err(err);
                }
                proxied.push(target);
            }

            if target_concrete.is_normal_scoped() && target_proxiable {
                breakable = true;
                proxied.push(target);
            } else if kind == DependencyKind::ProducerMember
                && self.types.is_proxiable(self.registry.concrete(owner).ty())
            {
                breakable = true;
                proxied.push(owner);
            }
        }

        if !breakable {
            let err = GraphError::IllegalCycle {
                violation: CycleViolation::NoBreakableEdge,
                path,
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        for id in proxied {
            if self.resolution.requires_proxy.insert(id) {
                tracing::debug!(
                    "{} requires a proxy",
                    self.registry.concrete(id).factory_name()
                );
            }
        }
        Ok(())
    }

    /// Path from the traversal root through the current frame to `requested`.
    fn path_to(&self, requested: &InjectableHandle) -> ResolutionPath {
        let mut path = ResolutionPath::new();
        for frame in &self.stack {
            let concrete = self.registry.concrete(frame.concrete);
            path.push(concrete.ty().to_string(), concrete.qualifier().to_string());
        }
        path.push(requested.ty().to_string(), requested.qualifier().to_string());
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::injectable::Scope;
    use crate::qualifier::QualifierFactory;
    use strum::IntoEnumIterator;

    fn concrete(kind: InjectableKind, tags: &[WiringTag]) -> ConcreteInjectable {
        let qualifiers = QualifierFactory::new();
        let handle = InjectableHandle::new("Fuel".into(), qualifiers.for_source(&[]));
        let name = ConcreteInjectable::factory_name_for(kind, &handle);
        ConcreteInjectable::new(handle, name, kind, Scope::Dependent, tags)
    }

    #[test]
    fn test_priority_tiers() {
        let none = HashSet::new();
        let enabled = HashSet::from([TypeRef::new("Fuel")]);

        assert_eq!(
            ResolutionPriority::of(&concrete(InjectableKind::Provider, &[]), &none),
            Some(ResolutionPriority::Provided)
        );
        assert_eq!(
            ResolutionPriority::of(
                &concrete(InjectableKind::ContextualProvider, &[WiringTag::Simpleton]),
                &none
            ),
            Some(ResolutionPriority::Provided)
        );
        assert_eq!(
            ResolutionPriority::of(
                &concrete(InjectableKind::Type, &[WiringTag::AlternativeBean]),
                &enabled
            ),
            Some(ResolutionPriority::EnabledAlternative)
        );
        assert_eq!(
            ResolutionPriority::of(
                &concrete(InjectableKind::Type, &[WiringTag::AlternativeBean]),
                &none
            ),
            None
        );
        assert_eq!(
            ResolutionPriority::of(&concrete(InjectableKind::JsType, &[]), &none),
            Some(ResolutionPriority::Normal)
        );
        assert_eq!(
            ResolutionPriority::of(&concrete(InjectableKind::Extension, &[]), &none),
            Some(ResolutionPriority::Extension)
        );
        assert_eq!(
            ResolutionPriority::of(
                &concrete(InjectableKind::Type, &[WiringTag::Simpleton]),
                &none
            ),
            Some(ResolutionPriority::Simpleton)
        );
    }

    #[test]
    fn test_priority_order_is_highest_first() {
        let tiers: Vec<ResolutionPriority> = ResolutionPriority::iter().collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert!(ResolutionPriority::Provided < ResolutionPriority::Simpleton);
    }
}
