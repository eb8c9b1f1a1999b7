//! Dependency ordering of generated blocks.

use std::collections::{BTreeSet, HashMap, VecDeque};

use forge_core::HclBlock;
use tracing::debug;

use crate::error::{HclError, HclResult};

/// Orders blocks so that every resolvable `depends_on` address is emitted
/// before the block that names it.
#[derive(Debug)]
pub struct DependencyGraph {
    blocks: Vec<HclBlock>,
}

impl DependencyGraph {
    pub fn new(blocks: Vec<HclBlock>) -> Self {
        Self { blocks }
    }

    /// Kahn's algorithm. Ready blocks are emitted in their original order,
    /// so unrelated blocks keep the order they were generated in.
    ///
    /// Addresses that name no block in the graph are ignored.
    pub fn topological_sort(self) -> HclResult<Vec<HclBlock>> {
        let count = self.blocks.len();

        let mut index_of: HashMap<String, usize> = HashMap::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(address) = block.address() {
                index_of.entry(address).or_insert(i);
            }
        }

        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (i, block) in self.blocks.iter().enumerate() {
            let deps: BTreeSet<usize> = block
                .depends_on
                .iter()
                .filter_map(|address| index_of.get(address).copied())
                .collect();
            in_degree[i] = deps.len();
            for dep in deps {
                dependents[dep].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut rank = vec![usize::MAX; count];
        let mut emitted = 0;

        while let Some(current) = queue.pop_front() {
            rank[current] = emitted;
            emitted += 1;
            for &dependent in &dependents[current] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if emitted != count {
            let stuck = self
                .blocks
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(i, b)| b.address().unwrap_or_else(|| format!("<block {}>", i)))
                .collect();
            return Err(HclError::CircularDependency(stuck));
        }

        debug!("Sorted {} HCL blocks", count);
        let mut ranked: Vec<(usize, HclBlock)> = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| (rank[i], block))
            .collect();
        ranked.sort_by_key(|(r, _)| *r);
        Ok(ranked.into_iter().map(|(_, block)| block).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(name: &str, deps: &[&str]) -> HclBlock {
        HclBlock::resource("t", name, name).depends_on(deps.iter().copied())
    }

    fn names(blocks: &[HclBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.name.as_deref().unwrap_or("")).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let blocks = vec![block("subnet", &["t.vnet"]), block("vnet", &["t.rg"]), block("rg", &[])];
        let sorted = DependencyGraph::new(blocks).topological_sort().unwrap();
        assert_eq!(names(&sorted), vec!["rg", "vnet", "subnet"]);
    }

    #[test]
    fn test_independent_blocks_keep_order() {
        let blocks = vec![block("c", &[]), block("a", &[]), block("b", &[])];
        let sorted = DependencyGraph::new(blocks).topological_sort().unwrap();
        assert_eq!(names(&sorted), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_unknown_and_duplicate_dependencies() {
        let blocks = vec![
            block("app", &["t.db", "t.db", "azurerm_client_config.missing"]),
            block("db", &[]),
        ];
        let sorted = DependencyGraph::new(blocks).topological_sort().unwrap();
        assert_eq!(names(&sorted), vec!["db", "app"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let blocks = vec![block("a", &["t.b"]), block("b", &["t.a"]), block("c", &[])];
        let err = DependencyGraph::new(blocks).topological_sort().unwrap_err();
        match err {
            HclError::CircularDependency(stuck) => assert_eq!(stuck, vec!["t.a", "t.b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let blocks = vec![block("a", &["t.a"])];
        assert!(DependencyGraph::new(blocks).topological_sort().is_err());
    }

    #[test]
    fn test_anonymous_blocks_pass_through() {
        let blocks = vec![
            HclBlock::anonymous(forge_core::BlockType::Locals, "locals {}"),
            block("a", &[]),
        ];
        let sorted = DependencyGraph::new(blocks).topological_sort().unwrap();
        assert_eq!(sorted.len(), 2);
        assert!(sorted[0].name.is_none());
    }

    /// Block `i` may only depend on blocks `j < i`, so the graph is acyclic.
    fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..12).prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)).prop_map(move |d| if i == 0 { Vec::new() } else { d }))
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn prop_sorted_output_respects_dependencies(deps in dag_strategy()) {
            let n = deps.len();
            // Feed blocks in reverse so dependencies usually arrive late.
            let blocks: Vec<HclBlock> = (0..n)
                .rev()
                .map(|i| {
                    let addresses: Vec<String> = deps[i].iter().map(|d| format!("t.b{}", d)).collect();
                    HclBlock::resource("t", format!("b{}", i), "").depends_on(addresses)
                })
                .collect();

            let sorted = DependencyGraph::new(blocks).topological_sort().unwrap();
            prop_assert_eq!(sorted.len(), n);

            let position: HashMap<String, usize> = sorted
                .iter()
                .enumerate()
                .map(|(p, b)| (b.address().unwrap(), p))
                .collect();
            for (i, ds) in deps.iter().enumerate() {
                for d in ds {
                    let dependency = position[&format!("t.b{}", d)];
                    let dependent = position[&format!("t.b{}", i)];
                    prop_assert!(dependency < dependent);
                }
            }
        }
    }
}
