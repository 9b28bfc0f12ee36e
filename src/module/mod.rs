use crate::error::Result;
use crate::graph::DependencyGraphBuilder;

/// A group of declarations registered together
///
/// Scanning collaborators implement this to feed what they discovered into a
/// builder before the graph is resolved.
///
/// # Example
/// ```
/// use wiregraph::prelude::*;
///
/// struct StorageModule;
///
/// impl Module for StorageModule {
///     fn register(builder: &mut DependencyGraphBuilder) -> Result<()> {
///         let qualifier = builder.qualifiers().for_source(&[]);
///         builder.add_concrete_injectable("DiskStore", qualifier, Scope::Singleton, InjectableKind::Type, &[])?;
///         Ok(())
///     }
/// }
///
/// let mut builder = DependencyGraphBuilder::new(StaticTypeModel::new().with(TypeInfo::class("DiskStore")));
/// builder.register_module::<StorageModule>().unwrap();
/// assert_eq!(builder.concrete_count(), 1);
/// ```
pub trait Module {
    /// Declare every injectable and dependency of this module
    fn register(builder: &mut DependencyGraphBuilder) -> Result<()>;
}
