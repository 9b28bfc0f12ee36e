use crate::graph::injectable::AbstractId;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// The member through which a dependency is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum DependencyKind {
    Constructor,
    Field,
    SetterParameter,
    ProducerParameter,
    /// Edge from a producer to the bean that declares the producing member.
    ProducerMember,
    DisposerMethod,
    DisposerParameter,
}

/// Edge from a concrete injectable to the abstract reference it requests.
#[derive(Debug, Clone)]
pub(crate) struct Dependency {
    kind: DependencyKind,
    target: AbstractId,
    /// The shared reference the edge was declared against, kept across retargeting.
    declared: AbstractId,
    member: String,
}

impl Dependency {
    pub(crate) fn new(kind: DependencyKind, target: AbstractId, member: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            declared: target,
            member: member.into(),
        }
    }

    pub(crate) fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub(crate) fn target(&self) -> AbstractId {
        self.target
    }

    pub(crate) fn member(&self) -> &str {
        &self.member
    }

    pub(crate) fn retarget(&mut self, target: AbstractId) {
        self.target = target;
    }

    /// Points the edge back at the reference it was declared against.
    pub(crate) fn reset(&mut self) {
        self.target = self.declared;
    }
}
