//! Reachability pruning
//!
//! Runs after resolution: walks resolved edges breadth first from a set of seed
//! injectables and drops everything the walk never reached.

use crate::graph::dependency_graph::Injectable;
use std::collections::{HashMap, HashSet, VecDeque};
use strum_macros::{Display, EnumIter, EnumString};

/// Which injectables seed the reachability walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReachabilityStrategy {
    /// Keep everything.
    All,
    /// Seed from every injectable not tagged `Simpleton`.
    #[default]
    Annotated,
    /// Seed from entry points only.
    Aggressive,
}

impl ReachabilityStrategy {
    fn is_seed(self, injectable: &Injectable) -> bool {
        match self {
            ReachabilityStrategy::All => true,
            ReachabilityStrategy::Annotated => !injectable.is_simpleton(),
            ReachabilityStrategy::Aggressive => injectable.is_entry_point(),
        }
    }
}

/// Factory names reachable from the strategy's seeds.
pub fn reachable_factory_names(
    injectables: &[Injectable],
    strategy: ReachabilityStrategy,
) -> HashSet<String> {
    let by_name: HashMap<&str, &Injectable> = injectables
        .iter()
        .map(|injectable| (injectable.factory_name(), injectable))
        .collect();

    let mut reachable: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<&Injectable> = VecDeque::new();

    for injectable in injectables {
        if strategy.is_seed(injectable) && reachable.insert(injectable.factory_name().to_string())
        {
            queue.push_back(injectable);
        }
    }

    while let Some(current) = queue.pop_front() {
        for dependency in current.dependencies() {
            let Some(&target) = by_name.get(dependency.target()) else {
                continue;
            };
            if reachable.insert(target.factory_name().to_string()) {
                queue.push_back(target);
            }
        }
    }

    reachable
}

/// Removes every injectable not reachable under `strategy`, keeping order.
pub(crate) fn prune(
    injectables: Vec<Injectable>,
    strategy: ReachabilityStrategy,
) -> Vec<Injectable> {
    if strategy == ReachabilityStrategy::All {
        return injectables;
    }

    let before = injectables.len();
    let reachable = reachable_factory_names(&injectables, strategy);
    let kept: Vec<Injectable> = injectables
        .into_iter()
        .filter(|injectable| reachable.contains(injectable.factory_name()))
        .collect();

    tracing::info!(
        "Pruned {} unreachable injectables ({} kept, strategy: {})",
        before - kept.len(),
        kept.len(),
        strategy
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dependency::DependencyKind;
    use crate::graph::dependency_graph::ResolvedDependency;
    use crate::graph::injectable::{InjectableKind, Scope, WiringTag};
    use crate::qualifier::QualifierFactory;
    use std::str::FromStr;

    fn injectable(name: &str, scope: Scope, tags: Vec<WiringTag>, deps: &[&str]) -> Injectable {
        let qualifiers = QualifierFactory::new();
        let dependencies = deps
            .iter()
            .map(|target| {
                ResolvedDependency::new(
                    DependencyKind::Field,
                    "f".to_string(),
                    (*target).into(),
                    qualifiers.for_sink(&[]),
                    (*target).to_string(),
                    false,
                )
            })
            .collect();
        Injectable::new(
            name.to_string(),
            name.into(),
            qualifiers.for_source(&[]),
            InjectableKind::Type,
            scope,
            tags,
            false,
            dependencies,
            None,
        )
    }

    fn fixture() -> Vec<Injectable> {
        vec![
            injectable("App", Scope::EntryPoint, vec![], &["Service"]),
            injectable("Service", Scope::Dependent, vec![WiringTag::Simpleton], &["Helper"]),
            injectable("Helper", Scope::Dependent, vec![WiringTag::Simpleton], &[]),
            injectable("Orphan", Scope::Dependent, vec![WiringTag::Simpleton], &[]),
            injectable("Declared", Scope::Singleton, vec![], &[]),
        ]
    }

    fn names(injectables: &[Injectable]) -> Vec<&str> {
        injectables.iter().map(|i| i.factory_name()).collect()
    }

    #[test]
    fn test_all_keeps_everything() {
        let kept = prune(fixture(), ReachabilityStrategy::All);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_annotated_drops_unreferenced_simpletons() {
        let kept = prune(fixture(), ReachabilityStrategy::Annotated);
        assert_eq!(names(&kept), vec!["App", "Service", "Helper", "Declared"]);
    }

    #[test]
    fn test_aggressive_keeps_only_entry_point_closure() {
        let kept = prune(fixture(), ReachabilityStrategy::Aggressive);
        assert_eq!(names(&kept), vec!["App", "Service", "Helper"]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            ReachabilityStrategy::from_str("Aggressive").unwrap(),
            ReachabilityStrategy::Aggressive
        );
        assert_eq!(
            ReachabilityStrategy::from_str("all").unwrap(),
            ReachabilityStrategy::All
        );
        assert!(ReachabilityStrategy::from_str("sometimes").is_err());
        assert_eq!(ReachabilityStrategy::Annotated.to_string(), "annotated");
        assert_eq!(ReachabilityStrategy::default(), ReachabilityStrategy::Annotated);
    }
}
