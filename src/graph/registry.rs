//! Arena of concrete and abstract injectables.
//!
//! Concretes are addressed by [`InjectableId`], abstract references by
//! [`AbstractId`]. Every concrete is linked into the abstract node of each type it
//! is assignable to, so looking up the candidates for a request only touches
//! the bindings that can possibly match.

use crate::graph::dependency::{Dependency, DependencyKind};
use crate::graph::injectable::{
    AbstractId, AbstractInjectable, ConcreteInjectable, InjectableHandle, InjectableId,
};
use crate::types::TypeRef;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct Registry {
    concretes: Vec<ConcreteInjectable>,
    names: HashMap<String, InjectableId>,
    abstracts: Vec<AbstractInjectable>,
    index: HashMap<InjectableHandle, AbstractId>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `concrete` and links it under every type in `assignable`.
    ///
    /// Hands the concrete back if its factory name is taken.
    pub(crate) fn add_concrete(
        &mut self,
        concrete: ConcreteInjectable,
        assignable: &[TypeRef],
    ) -> Result<InjectableId, ConcreteInjectable> {
        let qualifier = concrete.qualifier().clone();
        let id = self.insert(concrete)?;
        for ty in assignable {
            let abstract_id = self.abstract_for(InjectableHandle::new(ty.clone(), qualifier.clone()));
            self.abstracts[abstract_id.0].link_concrete(id);
        }
        Ok(id)
    }

    /// Stores `concrete` without indexing it; it can only be reached through
    /// edges rewired to it explicitly.
    pub(crate) fn insert(
        &mut self,
        concrete: ConcreteInjectable,
    ) -> Result<InjectableId, ConcreteInjectable> {
        if self.names.contains_key(concrete.factory_name()) {
            return Err(concrete);
        }
        let id = InjectableId(self.concretes.len());
        self.names.insert(concrete.factory_name().to_string(), id);
        self.concretes.push(concrete);
        Ok(id)
    }

    /// The shared abstract node for `handle`, created on first request.
    pub(crate) fn abstract_for(&mut self, handle: InjectableHandle) -> AbstractId {
        if let Some(&id) = self.index.get(&handle) {
            return id;
        }
        let id = AbstractId(self.abstracts.len());
        self.abstracts.push(AbstractInjectable::new(handle.clone()));
        self.index.insert(handle, id);
        id
    }

    /// A fresh abstract node for `handle` that is not shared through the index.
    pub(crate) fn private_abstract(&mut self, handle: InjectableHandle) -> AbstractId {
        let id = AbstractId(self.abstracts.len());
        self.abstracts.push(AbstractInjectable::new(handle));
        id
    }

    pub(crate) fn add_dependency(
        &mut self,
        owner: InjectableId,
        kind: DependencyKind,
        handle: InjectableHandle,
        member: &str,
    ) {
        let target = self.abstract_for(handle);
        self.concretes[owner.0]
            .dependencies_mut()
            .push(Dependency::new(kind, target, member));
    }

    pub(crate) fn retarget(&mut self, owner: InjectableId, edge: usize, target: AbstractId) {
        if let Some(dependency) = self.concretes[owner.0].dependencies_mut().get_mut(edge) {
            dependency.retarget(target);
        }
    }

    /// Links every abstract node to the same-typed nodes whose qualifier satisfies it.
    pub(crate) fn link_abstracts(&mut self) {
        let mut by_type: HashMap<TypeRef, Vec<AbstractId>> = HashMap::new();
        for (i, node) in self.abstracts.iter().enumerate() {
            by_type
                .entry(node.handle().ty().clone())
                .or_default()
                .push(AbstractId(i));
        }

        for i in 0..self.abstracts.len() {
            let handle = self.abstracts[i].handle().clone();
            let Some(same_type) = by_type.get(handle.ty()) else {
                continue;
            };
            for &other in same_type {
                if other.0 == i {
                    continue;
                }
                if handle
                    .qualifier()
                    .is_satisfied_by(self.abstracts[other.0].handle().qualifier())
                {
                    self.abstracts[i].link_abstract(other);
                }
            }
        }
    }

    /// Every concrete reachable through the linked chain of `start`, in link order.
    pub(crate) fn candidates(&self, start: AbstractId) -> Vec<InjectableId> {
        let mut seen_abstracts = HashSet::from([start]);
        let mut seen_concretes = HashSet::new();
        let mut pending = vec![start];
        let mut found = Vec::new();

        while let Some(current) = pending.pop() {
            let node = &self.abstracts[current.0];
            for &concrete in node.linked_concretes() {
                if seen_concretes.insert(concrete) {
                    found.push(concrete);
                }
            }
            for &linked in node.linked_abstracts().iter().rev() {
                if seen_abstracts.insert(linked) {
                    pending.push(linked);
                }
            }
        }

        found
    }

    pub(crate) fn concrete(&self, id: InjectableId) -> &ConcreteInjectable {
        &self.concretes[id.0]
    }

    pub(crate) fn abstract_node(&self, id: AbstractId) -> &AbstractInjectable {
        &self.abstracts[id.0]
    }

    pub(crate) fn concretes(&self) -> impl Iterator<Item = (InjectableId, &ConcreteInjectable)> {
        self.concretes
            .iter()
            .enumerate()
            .map(|(i, concrete)| (InjectableId(i), concrete))
    }

    pub(crate) fn contains_name(&self, factory_name: &str) -> bool {
        self.names.contains_key(factory_name)
    }

    pub(crate) fn concrete_count(&self) -> usize {
        self.concretes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::injectable::{InjectableKind, Scope};
    use crate::qualifier::{Annotation, QualifierFactory};
    use crate::types::{StaticTypeModel, TypeInfo, TypeModel};

    fn concrete(ty: &str, qualifiers: &QualifierFactory, annotations: &[Annotation]) -> ConcreteInjectable {
        let handle = InjectableHandle::new(ty.into(), qualifiers.for_source(annotations));
        let name = ConcreteInjectable::factory_name_for(InjectableKind::Type, &handle);
        ConcreteInjectable::new(handle, name, InjectableKind::Type, Scope::Dependent, &[])
    }

    #[test]
    fn test_duplicate_factory_name_is_rejected() {
        let qualifiers = QualifierFactory::new();
        let mut registry = Registry::new();
        registry
            .add_concrete(concrete("Fuel", &qualifiers, &[]), &["Fuel".into()])
            .unwrap();
        let rejected = registry
            .add_concrete(concrete("Fuel", &qualifiers, &[]), &["Fuel".into()])
            .unwrap_err();
        assert_eq!(rejected.factory_name(), "Type_factory__Fuel__quals__Any__Default");
        assert_eq!(registry.concrete_count(), 1);
    }

    #[test]
    fn test_concrete_is_indexed_under_supertypes() {
        let model = StaticTypeModel::new()
            .with(TypeInfo::interface("Energy"))
            .with(TypeInfo::class("Fuel").implements("Energy"));
        let qualifiers = QualifierFactory::new();
        let mut registry = Registry::new();
        let id = registry
            .add_concrete(
                concrete("Fuel", &qualifiers, &[]),
                &model.assignable_types(&"Fuel".into()),
            )
            .unwrap();

        let request = registry.abstract_for(InjectableHandle::new(
            "Energy".into(),
            qualifiers.for_sink(&[]),
        ));
        registry.link_abstracts();
        assert_eq!(registry.candidates(request), vec![id]);
    }

    #[test]
    fn test_qualified_request_only_links_satisfying_nodes() {
        let qualifiers = QualifierFactory::new();
        let mut registry = Registry::new();
        let plain = registry
            .add_concrete(concrete("Fuel", &qualifiers, &[]), &["Fuel".into()])
            .unwrap();
        let red = registry
            .add_concrete(
                concrete("Fuel", &qualifiers, &[Annotation::qualifier("Red")]),
                &["Fuel".into()],
            )
            .unwrap();

        let red_request = registry.abstract_for(InjectableHandle::new(
            "Fuel".into(),
            qualifiers.for_sink(&[Annotation::qualifier("Red")]),
        ));
        let any_request = registry.abstract_for(InjectableHandle::new(
            "Fuel".into(),
            qualifiers.for_sink(&[Annotation::any()]),
        ));
        registry.link_abstracts();

        assert_eq!(registry.candidates(red_request), vec![red]);
        assert_eq!(registry.candidates(any_request), vec![plain, red]);
    }

    #[test]
    fn test_private_abstract_is_not_shared() {
        let qualifiers = QualifierFactory::new();
        let mut registry = Registry::new();
        let handle = InjectableHandle::new("Token".into(), qualifiers.for_sink(&[]));
        let shared = registry.abstract_for(handle.clone());
        let private = registry.private_abstract(handle.clone());
        assert_ne!(shared, private);
        assert_eq!(registry.abstract_for(handle), shared);
    }
}
