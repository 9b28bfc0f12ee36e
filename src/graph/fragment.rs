//! Fragment partitioning
//!
//! Every entry point flood-fills the resolved edges it can reach. Entry points
//! whose closures touch the same injectable are merged through a union-find of
//! representatives, so each resulting fragment is a self-contained unit for
//! partitioned output. Closures only read the finished graph and are computed
//! in parallel; merging happens afterwards in entry-point order so the result
//! is deterministic.

use crate::graph::dependency_graph::Injectable;
use crate::worker::PartitionPool;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Name of the fragment holding injectables no entry point reaches.
pub const ROOT_FRAGMENT: &str = "root";

/// A named group of injectables generated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    name: String,
    entry_points: Vec<String>,
    members: Vec<String>,
}

impl Fragment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Factory names of the entry points merged into this fragment.
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Factory names of every member, in graph order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, factory_name: &str) -> bool {
        self.members.iter().any(|m| m == factory_name)
    }
}

/// Union-find over entry-point indices; the smallest index represents its set.
struct Representatives {
    parent: Vec<usize>,
}

impl Representatives {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

fn closure(start: usize, injectables: &[Injectable], index: &HashMap<&str, usize>) -> Vec<usize> {
    let mut seen = HashSet::from([start]);
    let mut pending = vec![start];
    while let Some(current) = pending.pop() {
        for dependency in injectables[current].dependencies() {
            if let Some(&target) = index.get(dependency.target()) {
                if seen.insert(target) {
                    pending.push(target);
                }
            }
        }
    }
    let mut members: Vec<usize> = seen.into_iter().collect();
    members.sort_unstable();
    members
}

/// Groups `injectables` into fragments seeded by their entry points.
pub(crate) fn partition(injectables: &[Injectable], pool: &PartitionPool) -> Vec<Fragment> {
    let index: HashMap<&str, usize> = injectables
        .iter()
        .enumerate()
        .map(|(i, injectable)| (injectable.factory_name(), i))
        .collect();
    let entries: Vec<usize> = injectables
        .iter()
        .enumerate()
        .filter(|(_, injectable)| injectable.is_entry_point())
        .map(|(i, _)| i)
        .collect();

    let closures: Vec<Vec<usize>> = pool.install(|| {
        entries
            .par_iter()
            .map(|&entry| closure(entry, injectables, &index))
            .collect()
    });

    let mut representatives = Representatives::new(entries.len());
    let mut owner: HashMap<usize, usize> = HashMap::new();
    for (entry, members) in closures.iter().enumerate() {
        for &member in members {
            match owner.get(&member) {
                Some(&other) => representatives.union(entry, other),
                None => {
                    owner.insert(member, entry);
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>, Vec<usize>)> = Vec::new();
    let mut group_of: HashMap<usize, usize> = HashMap::new();
    for entry in 0..entries.len() {
        let rep = representatives.find(entry);
        let slot = *group_of.entry(rep).or_insert_with(|| {
            groups.push((rep, Vec::new(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(entries[entry]);
    }

    let mut unassigned = Vec::new();
    for i in 0..injectables.len() {
        match owner.get(&i) {
            Some(&entry) => {
                let rep = representatives.find(entry);
                if let Some(&slot) = group_of.get(&rep) {
                    groups[slot].2.push(i);
                }
            }
            None => unassigned.push(i),
        }
    }

    let name_of = |i: usize| injectables[i].factory_name().to_string();
    let mut fragments: Vec<Fragment> = groups
        .into_iter()
        .map(|(rep, entry_points, members)| Fragment {
            name: name_of(entries[rep]),
            entry_points: entry_points.into_iter().map(name_of).collect(),
            members: members.into_iter().map(name_of).collect(),
        })
        .collect();

    if !unassigned.is_empty() {
        fragments.push(Fragment {
            name: ROOT_FRAGMENT.to_string(),
            entry_points: Vec::new(),
            members: unassigned.into_iter().map(name_of).collect(),
        });
    }

    tracing::info!(
        "Partitioned {} injectables into {} fragments from {} entry points",
        injectables.len(),
        fragments.len(),
        entries.len()
    );
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dependency::DependencyKind;
    use crate::graph::dependency_graph::ResolvedDependency;
    use crate::graph::injectable::{InjectableKind, Scope};
    use crate::qualifier::QualifierFactory;

    fn injectable(name: &str, entry: bool, deps: &[&str]) -> Injectable {
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
        let scope = if entry { Scope::EntryPoint } else { Scope::Dependent };
        Injectable::new(
            name.to_string(),
            name.into(),
            qualifiers.for_source(&[]),
            InjectableKind::Type,
            scope,
            Vec::new(),
            false,
            dependencies,
            None,
        )
    }

    #[test]
    fn test_disjoint_entry_points_get_own_fragments() {
        let graph = vec![
            injectable("A", true, &["X"]),
            injectable("X", false, &[]),
            injectable("B", true, &["Y"]),
            injectable("Y", false, &[]),
            injectable("Lonely", false, &[]),
        ];
        let pool = PartitionPool::new(2).unwrap();
        let fragments = partition(&graph, &pool);

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].name(), "A");
        assert_eq!(fragments[0].members(), ["A", "X"]);
        assert_eq!(fragments[1].name(), "B");
        assert_eq!(fragments[1].members(), ["B", "Y"]);
        assert_eq!(fragments[2].name(), ROOT_FRAGMENT);
        assert_eq!(fragments[2].members(), ["Lonely"]);
    }

    #[test]
    fn test_colliding_closures_are_merged_transitively() {
        let graph = vec![
            injectable("A", true, &["Shared1"]),
            injectable("B", true, &["Shared1", "Shared2"]),
            injectable("C", true, &["Shared2"]),
            injectable("Shared1", false, &[]),
            injectable("Shared2", false, &[]),
            injectable("D", true, &[]),
        ];
        let pool = PartitionPool::new(4).unwrap();
        let fragments = partition(&graph, &pool);

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].name(), "A");
        assert_eq!(fragments[0].entry_points(), ["A", "B", "C"]);
        assert_eq!(fragments[0].members(), ["A", "B", "C", "Shared1", "Shared2"]);
        assert_eq!(fragments[1].name(), "D");
        assert!(fragments[1].contains("D"));
    }

    #[test]
    fn test_no_entry_points_yields_root_only() {
        let graph = vec![injectable("X", false, &[])];
        let pool = PartitionPool::new(1).unwrap();
        let fragments = partition(&graph, &pool);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].name(), ROOT_FRAGMENT);
    }
}
