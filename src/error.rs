use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unsatisfied dependency: no injectable matches {requested} (path: {path})")]
    UnsatisfiedDependency {
        requested: String,
        path: ResolutionPath,
    },

    #[error(
        "Ambiguous dependency: {requested} is satisfied by {} injectables [{}] (path: {path})",
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousDependency {
        requested: String,
        candidates: Vec<String>,
        path: ResolutionPath,
    },

    #[error("Illegal cycle: {violation} (cycle: {path})")]
    IllegalCycle {
        violation: CycleViolation,
        path: ResolutionPath,
    },

    #[error("Duplicate binding: factory name {factory_name} is already registered (path: {path})")]
    DuplicateBinding {
        factory_name: String,
        path: ResolutionPath,
    },

    #[error("Failed to build partition worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to serialize dependency graph: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a detected cycle cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleViolation {
    /// A constructor edge inside the cycle targets a type that cannot be proxied.
    #[error("{type_name} is constructor-injected inside a cycle but is not proxiable")]
    NonProxiable { type_name: String },

    #[error("no breakable edge (every edge targets a dependent or non-proxiable injectable)")]
    NoBreakableEdge,
}

/// One hop of a resolution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathElement {
    pub type_name: String,
    pub qualifier: String,
}

/// The chain of injectables from the traversal root to the point of failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPath {
    elements: Vec<PathElement>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, type_name: impl Into<String>, qualifier: impl Into<String>) {
        self.elements.push(PathElement {
            type_name: type_name.into(),
            qualifier: qualifier.into(),
        });
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("<root>");
        }
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{} {}", element.qualifier, element.type_name)?;
        }
        Ok(())
    }
}

impl GraphError {
    /// The resolution path attached to this error, if it is a resolution failure.
    pub fn path(&self) -> Option<&ResolutionPath> {
        match self {
            GraphError::UnsatisfiedDependency { path, .. }
            | GraphError::AmbiguousDependency { path, .. }
            | GraphError::IllegalCycle { path, .. }
            | GraphError::DuplicateBinding { path, .. } => Some(path),
            GraphError::WorkerPool(_) | GraphError::Serialization(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let mut path = ResolutionPath::new();
        path.push("com.acme.Engine", "@Default");
        path.push("com.acme.Fuel", "@Default");
        assert_eq!(
            path.to_string(),
            "@Default com.acme.Engine -> @Default com.acme.Fuel"
        );
        assert_eq!(ResolutionPath::new().to_string(), "<root>");
    }

    #[test]
    fn test_error_messages_include_path() {
        let mut path = ResolutionPath::new();
        path.push("A", "@Default");
        let err = GraphError::AmbiguousDependency {
            requested: "@Default B".to_string(),
            candidates: vec!["Type_factory__B1".to_string(), "Type_factory__B2".to_string()],
            path: path.clone(),
        };
        let message = err.to_string();
        assert!(message.contains("2 injectables"));
        assert!(message.contains("Type_factory__B1, Type_factory__B2"));
        assert!(message.contains("@Default A"));
        assert_eq!(err.path(), Some(&path));
    }
}
