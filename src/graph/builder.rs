use crate::config::GraphConfig;
use crate::error::{GraphError, ResolutionPath, Result};
use crate::graph::dependency::DependencyKind;
use crate::graph::dependency_graph::{DependencyGraph, Injectable, ResolvedDependency};
use crate::graph::fragment;
use crate::graph::injectable::{
    ConcreteInjectable, InjectableHandle, InjectableId, InjectableKind, Scope, WiringTag,
};
use crate::graph::pruner::{self, ReachabilityStrategy};
use crate::graph::registry::Registry;
use crate::graph::resolver::{Resolution, ResolutionContext};
use crate::module::Module;
use crate::qualifier::{Qualifier, QualifierFactory};
use crate::types::{TypeModel, TypeRef, escape_identifier};
use crate::worker::PartitionPool;
use std::sync::Arc;

/// Collects declarations and turns them into a resolved [`DependencyGraph`].
///
/// Declaring and resolving are two separate phases: every `add_*` call happens
/// on the builder, and [`create_graph`](Self::create_graph) consumes it.
///
/// # Example
/// ```
/// use wiregraph::prelude::*;
///
/// let types = StaticTypeModel::new()
///     .with(TypeInfo::class("Engine"))
///     .with(TypeInfo::class("Fuel"));
/// let mut builder = DependencyGraphBuilder::new(types);
/// let qualifiers = builder.qualifiers().clone();
///
/// let engine = builder
///     .add_concrete_injectable("Engine", qualifiers.for_source(&[]), Scope::EntryPoint, InjectableKind::Type, &[])
///     .unwrap();
/// builder
///     .add_concrete_injectable("Fuel", qualifiers.for_source(&[]), Scope::Dependent, InjectableKind::Type, &[])
///     .unwrap();
/// builder.add_constructor_dependency(engine, "Fuel", qualifiers.for_sink(&[]), "fuel");
///
/// let graph = builder.create_graph(true).unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
pub struct DependencyGraphBuilder {
    type_model: Arc<dyn TypeModel>,
    qualifiers: QualifierFactory,
    config: GraphConfig,
    registry: Registry,
}

impl DependencyGraphBuilder {
    pub fn new(type_model: impl TypeModel + 'static) -> Self {
        Self::with_type_model(Arc::new(type_model))
    }

    /// Builder over a type model shared with other components.
    pub fn with_type_model(type_model: Arc<dyn TypeModel>) -> Self {
        Self {
            type_model,
            qualifiers: QualifierFactory::new(),
            config: GraphConfig::default(),
            registry: Registry::new(),
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a factory shared with the scanning side so qualifiers intern to the same instances.
    pub fn with_qualifier_factory(mut self, qualifiers: QualifierFactory) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn qualifiers(&self) -> &QualifierFactory {
        &self.qualifiers
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Declares a binding of `ty` under `qualifier`.
    ///
    /// Fails with [`GraphError::DuplicateBinding`] if a binding with the same
    /// generated factory name already exists.
    pub fn add_concrete_injectable(
        &mut self,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        scope: Scope,
        kind: InjectableKind,
        tags: &[WiringTag],
    ) -> Result<InjectableId> {
        let handle = InjectableHandle::new(ty.into(), qualifier);
        let factory_name = ConcreteInjectable::factory_name_for(kind, &handle);
        self.declare(ConcreteInjectable::new(handle, factory_name, kind, scope, tags))
    }

    /// Declares a binding that is copied for every injection site using it.
    pub fn add_transient_injectable(
        &mut self,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        scope: Scope,
        tags: &[WiringTag],
    ) -> Result<InjectableId> {
        self.add_concrete_injectable(ty, qualifier, scope, InjectableKind::Transient, tags)
    }

    /// Declares a binding produced by `member` of the bean `(enclosing_type, enclosing_qualifier)`.
    ///
    /// The producer gets a [`DependencyKind::ProducerMember`] edge on its enclosing bean.
    #[allow(clippy::too_many_arguments)]
    pub fn add_producer_injectable(
        &mut self,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        scope: Scope,
        enclosing_type: impl Into<TypeRef>,
        enclosing_qualifier: Qualifier,
        member: &str,
        tags: &[WiringTag],
    ) -> Result<InjectableId> {
        let enclosing_type = enclosing_type.into();
        let handle = InjectableHandle::new(ty.into(), qualifier);
        let factory_name = format!(
            "{}__{}__{}",
            ConcreteInjectable::factory_name_for(InjectableKind::Producer, &handle),
            enclosing_type.identifier_safe(),
            escape_identifier(member)
        );
        let id = self.declare(ConcreteInjectable::new(
            handle,
            factory_name,
            InjectableKind::Producer,
            scope,
            tags,
        ))?;
        self.add_dependency(
            id,
            DependencyKind::ProducerMember,
            enclosing_type,
            enclosing_qualifier,
            member,
        );
        Ok(id)
    }

    fn declare(&mut self, concrete: ConcreteInjectable) -> Result<InjectableId> {
        let assignable = self.type_model.assignable_types(concrete.ty());
        match self.registry.add_concrete(concrete, &assignable) {
            Ok(id) => {
                tracing::trace!("Declared {}", self.registry.concrete(id).factory_name());
                Ok(id)
            }
            Err(rejected) => {
                let mut path = ResolutionPath::new();
                path.push(rejected.ty().to_string(), rejected.qualifier().to_string());
                let err = GraphError::DuplicateBinding {
                    factory_name: rejected.factory_name().to_string(),
                    path,
                };
                tracing::error!("{}", err);
                Err(err)
            }
        }
    }

    /// Appends a `kind` edge from `owner` to the reference `(ty, qualifier)`.
    ///
    /// `owner` must have been returned by this builder.
    pub fn add_dependency(
        &mut self,
        owner: InjectableId,
        kind: DependencyKind,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.registry.add_dependency(
            owner,
            kind,
            InjectableHandle::new(ty.into(), qualifier),
            member,
        );
        self
    }

    pub fn add_constructor_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::Constructor, ty, qualifier, member)
    }

    pub fn add_field_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::Field, ty, qualifier, member)
    }

    pub fn add_setter_parameter_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::SetterParameter, ty, qualifier, member)
    }

    pub fn add_producer_parameter_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::ProducerParameter, ty, qualifier, member)
    }

    pub fn add_producer_member_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::ProducerMember, ty, qualifier, member)
    }

    pub fn add_disposer_method_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::DisposerMethod, ty, qualifier, member)
    }

    pub fn add_disposer_parameter_dependency(
        &mut self,
        owner: InjectableId,
        ty: impl Into<TypeRef>,
        qualifier: Qualifier,
        member: &str,
    ) -> &mut Self {
        self.add_dependency(owner, DependencyKind::DisposerParameter, ty, qualifier, member)
    }

    /// Runs a module's declarations against this builder.
    pub fn register_module<M: Module>(&mut self) -> Result<&mut Self> {
        let before = self.registry.concrete_count();
        M::register(self)?;
        tracing::debug!(
            "Registered module {} ({} injectables)",
            std::any::type_name::<M>(),
            self.registry.concrete_count() - before
        );
        Ok(self)
    }

    pub fn concrete_count(&self) -> usize {
        self.registry.concrete_count()
    }

    pub fn factory_name(&self, id: InjectableId) -> Option<&str> {
        (id.0 < self.registry.concrete_count()).then(|| self.registry.concrete(id).factory_name())
    }

    /// Resolves every declaration.
    ///
    /// With `prune_unreachable`, implicit `Simpleton` bindings nothing depends on
    /// are dropped ([`ReachabilityStrategy::Annotated`]); otherwise everything is kept.
    pub fn create_graph(self, prune_unreachable: bool) -> Result<DependencyGraph> {
        let strategy = if prune_unreachable {
            ReachabilityStrategy::Annotated
        } else {
            ReachabilityStrategy::All
        };
        self.create_graph_with_strategy(strategy)
    }

    /// Resolves using the reachability strategy from the builder's [`GraphConfig`].
    pub fn create_graph_with_config(self) -> Result<DependencyGraph> {
        let strategy = self.config.reachability();
        self.create_graph_with_strategy(strategy)
    }

    pub fn create_graph_with_strategy(
        mut self,
        strategy: ReachabilityStrategy,
    ) -> Result<DependencyGraph> {
        tracing::info!(
            "Resolving dependency graph ({} declared injectables)",
            self.registry.concrete_count()
        );

        self.registry.link_abstracts();
        let resolution = ResolutionContext::new(
            &mut self.registry,
            &*self.type_model,
            self.config.enabled_alternatives(),
        )
        .resolve()?;

        let injectables = pruner::prune(self.assemble(&resolution)?, strategy);
        let pool = PartitionPool::new(self.config.partition_threads())?;
        let fragments = fragment::partition(&injectables, &pool);

        let graph = DependencyGraph::new(injectables, fragments);
        tracing::info!(
            "Dependency graph ready: {} injectables in {} fragments",
            graph.len(),
            graph.get_fragments().len()
        );
        Ok(graph)
    }

    /// Converts the arena into output injectables, naming edge targets by factory name.
    fn assemble(&self, resolution: &Resolution) -> Result<Vec<Injectable>> {
        let mut injectables = Vec::with_capacity(self.registry.concrete_count());

        for (id, concrete) in self.registry.concretes() {
            let mut dependencies = Vec::with_capacity(concrete.dependencies().len());
            for (edge, dependency) in concrete.dependencies().iter().enumerate() {
                let requested = self.registry.abstract_node(dependency.target()).handle();
                let Some(target) = resolution.target_of(dependency.target()) else {
                    let mut path = ResolutionPath::new();
                    path.push(concrete.ty().to_string(), concrete.qualifier().to_string());
                    path.push(requested.ty().to_string(), requested.qualifier().to_string());
                    let err = GraphError::UnsatisfiedDependency {
                        requested: requested.to_string(),
                        path,
                    };
                    tracing::error!("{}", err);
                    return Err(err);
                };
                dependencies.push(ResolvedDependency::new(
                    dependency.kind(),
                    dependency.member().to_string(),
                    requested.ty().clone(),
                    requested.qualifier().clone(),
                    self.registry.concrete(target).factory_name().to_string(),
                    resolution.is_cyclic(id, edge),
                ));
            }

            injectables.push(Injectable::new(
                concrete.factory_name().to_string(),
                concrete.ty().clone(),
                concrete.qualifier().clone(),
                concrete.kind(),
                concrete.scope().clone(),
                concrete.tags().iter().copied().collect(),
                resolution.requires_proxy(id),
                dependencies,
                concrete.injection_site().cloned(),
            ));
        }

        Ok(injectables)
    }
}
