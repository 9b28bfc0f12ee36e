//! # Wiregraph
//!
//! Build-time dependency graph resolution for generated dependency injection.
//!
//! A scanning collaborator declares bindings (concrete injectables) and the
//! dependencies between them. Wiregraph resolves every dependency to exactly
//! one binding, validates cycles, specializes transient bindings per injection
//! site, prunes what nothing uses and partitions the result into fragments a
//! code generator can emit independently.
//!
//! ## Features
//!
//! - **Qualifiers**: interned annotation sets with superset-based matching
//! - **Resolution Priority**: providers beat enabled alternatives, which beat ordinary bindings
//! - **Cycle Validation**: legal cycles are broken with proxies, illegal ones rejected
//! - **Transient Specialization**: one copy of a transient binding per injection site
//! - **Pruning & Fragments**: configurable reachability, parallel fragment partitioning
//!
//! ## Quick Start
//!
//! ```rust
//! use wiregraph::prelude::*;
//!
//! // 1. Describe the types the scanner found
//! let types = StaticTypeModel::new()
//!     .with(TypeInfo::class("com.acme.Engine"))
//!     .with(TypeInfo::interface("com.acme.Fuel"))
//!     .with(TypeInfo::class("com.acme.Diesel").implements("com.acme.Fuel"));
//!
//! // 2. Declare bindings and their dependencies
//! let mut builder = DependencyGraphBuilder::new(types);
//! let qualifiers = builder.qualifiers().clone();
//! let engine = builder
//!     .add_concrete_injectable(
//!         "com.acme.Engine",
//!         qualifiers.for_source(&[]),
//!         Scope::EntryPoint,
//!         InjectableKind::Type,
//!         &[],
//!     )
//!     .unwrap();
//! builder
//!     .add_concrete_injectable(
//!         "com.acme.Diesel",
//!         qualifiers.for_source(&[]),
//!         Scope::Singleton,
//!         InjectableKind::Type,
//!         &[WiringTag::NormalScopedBean],
//!     )
//!     .unwrap();
//! builder.add_constructor_dependency(engine, "com.acme.Fuel", qualifiers.for_sink(&[]), "fuel");
//!
//! // 3. Resolve
//! let graph = builder.create_graph(true).unwrap();
//! let engine = graph
//!     .get_concrete_injectable("Type_factory__com_acme_Engine__quals__Any__Default")
//!     .unwrap();
//! assert_eq!(
//!     engine.dependencies()[0].target(),
//!     "Type_factory__com_acme_Diesel__quals__Any__Default"
//! );
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod module;
pub mod qualifier;
pub mod types;
pub mod worker;

// Re-export core types
pub use config::{ConfigService, GraphConfig};
pub use error::{CycleViolation, GraphError, ResolutionPath, Result};
pub use graph::{DependencyGraph, DependencyGraphBuilder, Fragment, Injectable, ReachabilityStrategy};
pub use module::Module;

/// Prelude module for convenient imports
///
/// ```
/// use wiregraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, GraphConfig};
    pub use crate::error::{CycleViolation, GraphError, ResolutionPath, Result};
    pub use crate::graph::{
        DependencyGraph, DependencyGraphBuilder, DependencyKind, Fragment, Injectable,
        InjectableId, InjectableKind, ReachabilityStrategy, ResolvedDependency, Scope, WiringTag,
    };
    pub use crate::module::Module;
    pub use crate::qualifier::{Annotation, Qualifier, QualifierFactory};
    pub use crate::types::{StaticTypeModel, TypeInfo, TypeModel, TypeRef};
    pub use crate::worker::PartitionPool;
}
