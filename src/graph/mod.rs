//! Dependency graph construction
//!
//! Declarations go into a [`DependencyGraphBuilder`]; `create_graph` resolves
//! them into an immutable [`DependencyGraph`], prunes it and partitions it into
//! [`Fragment`]s.

pub mod builder;
pub mod dependency;
pub mod dependency_graph;
pub mod fragment;
pub mod injectable;
pub mod pruner;
pub(crate) mod registry;
pub mod resolver;

pub use builder::DependencyGraphBuilder;
pub use dependency::DependencyKind;
pub use dependency_graph::{DependencyGraph, Injectable, ResolvedDependency};
pub use fragment::{Fragment, ROOT_FRAGMENT};
pub use injectable::{InjectableHandle, InjectableId, InjectableKind, InjectionSite, Scope, WiringTag};
pub use pruner::{ReachabilityStrategy, reachable_factory_names};
pub use resolver::ResolutionPriority;
