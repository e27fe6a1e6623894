//! File dependency graph.
//!
//! petgraph DiGraph over file paths; Tarjan SCC for cycle detection and a
//! deterministic Kahn's algorithm for the topological order. Given the same
//! dependency edges, the emitted order is always identical: zero-in-degree
//! candidates are drained in lexicographic path order, and files left inside
//! cycles are appended lexicographically.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use std::cmp::Reverse;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::types::ResolvedImport;

/// Directed graph where an edge A → B means A depends on (imports from) B.
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    path_to_node: HashMap<String, NodeIndex>,
    cycles: Vec<Vec<String>>,
    topo_order: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            path_to_node: HashMap::new(),
            cycles: Vec::new(),
            topo_order: Vec::new(),
        }
    }

    /// Build from resolved imports (file → imports it makes).
    pub fn build(resolved_imports: &HashMap<String, Vec<ResolvedImport>>) -> Self {
        let mut graph = DiGraph::new();
        let mut path_to_node = HashMap::new();

        // Collect all file paths, sorted so node indices are reproducible
        let mut all_files: BTreeSet<String> = resolved_imports.keys().cloned().collect();
        for imports in resolved_imports.values() {
            for import in imports {
                if let Some(ref source_file) = import.source_file {
                    all_files.insert(source_file.clone());
                }
            }
        }

        for file_path in &all_files {
            let idx = graph.add_node(file_path.clone());
            path_to_node.insert(file_path.clone(), idx);
        }

        // Dependency edges, deduplicated, in sorted order
        let sorted_imports: BTreeMap<&String, &Vec<ResolvedImport>> =
            resolved_imports.iter().collect();
        let mut seen_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();

        for (from_path, imports) in sorted_imports {
            let Some(&from_idx) = path_to_node.get(from_path.as_str()) else {
                continue;
            };
            for import in imports.iter() {
                let Some(ref source_file) = import.source_file else {
                    continue;
                };
                if source_file == from_path {
                    continue;
                }
                if let Some(&to_idx) = path_to_node.get(source_file.as_str()) {
                    if seen_edges.insert((from_idx, to_idx)) {
                        graph.add_edge(from_idx, to_idx, ());
                    }
                }
            }
        }

        // SCCs with more than one member are cycles
        let sccs = tarjan_scc(&graph);
        let mut cycles: Vec<Vec<String>> = sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.into_iter().map(|idx| graph[idx].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        let topo_order = Self::compute_topological_order(&graph);

        Self {
            graph,
            path_to_node,
            cycles,
            topo_order,
        }
    }

    /// Rebuild a graph from an existing file → dependencies map (used by
    /// incremental updates to stitch reused and recomputed entries).
    pub fn from_dependency_map(dependencies: &HashMap<String, Vec<String>>) -> Self {
        let mut graph = DiGraph::new();
        let mut path_to_node = HashMap::new();

        let mut all_files: BTreeSet<String> = dependencies.keys().cloned().collect();
        for deps in dependencies.values() {
            for dep in deps {
                all_files.insert(dep.clone());
            }
        }

        for file_path in &all_files {
            let idx = graph.add_node(file_path.clone());
            path_to_node.insert(file_path.clone(), idx);
        }

        let sorted: BTreeMap<&String, &Vec<String>> = dependencies.iter().collect();
        let mut seen_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        for (from_path, deps) in sorted {
            let Some(&from_idx) = path_to_node.get(from_path.as_str()) else {
                continue;
            };
            for dep in deps.iter() {
                if dep == from_path {
                    continue;
                }
                if let Some(&to_idx) = path_to_node.get(dep.as_str()) {
                    if seen_edges.insert((from_idx, to_idx)) {
                        graph.add_edge(from_idx, to_idx, ());
                    }
                }
            }
        }

        let sccs = tarjan_scc(&graph);
        let mut cycles: Vec<Vec<String>> = sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.into_iter().map(|idx| graph[idx].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        let topo_order = Self::compute_topological_order(&graph);

        Self {
            graph,
            path_to_node,
            cycles,
            topo_order,
        }
    }

    /// Kahn's algorithm, deterministic: min-heap on file path for the ready
    /// set, lexicographic fallback for nodes stuck in cycles. Dependencies
    /// come before dependents in the result.
    fn compute_topological_order(graph: &DiGraph<String, ()>) -> Vec<String> {
        // A → B means A depends on B, so process out-degree-zero nodes
        // (no dependencies) first.
        let mut remaining_deps: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    graph.neighbors_directed(idx, Direction::Outgoing).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(String, NodeIndex)>> = remaining_deps
            .iter()
            .filter(|(_, &deps)| deps == 0)
            .map(|(&idx, _)| Reverse((graph[idx].clone(), idx)))
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        let mut emitted: HashSet<NodeIndex> = HashSet::new();

        while let Some(Reverse((path, idx))) = ready.pop() {
            order.push(path);
            emitted.insert(idx);

            for dependent in graph.neighbors_directed(idx, Direction::Incoming) {
                if let Some(deps) = remaining_deps.get_mut(&dependent) {
                    *deps -= 1;
                    if *deps == 0 {
                        ready.push(Reverse((graph[dependent].clone(), dependent)));
                    }
                }
            }
        }

        // Whatever is left sits inside a cycle; break it lexicographically
        let mut leftover: Vec<String> = graph
            .node_indices()
            .filter(|idx| !emitted.contains(idx))
            .map(|idx| graph[idx].clone())
            .collect();
        leftover.sort();
        order.extend(leftover);

        order
    }

    pub fn get_dependencies(&self, file_path: &str) -> Vec<String> {
        self.neighbors(file_path, Direction::Outgoing)
    }

    pub fn get_dependents(&self, file_path: &str) -> Vec<String> {
        self.neighbors(file_path, Direction::Incoming)
    }

    fn neighbors(&self, file_path: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.path_to_node.get(file_path) else {
            return Vec::new();
        };
        let mut result: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        result.sort();
        result
    }

    pub fn get_all_dependencies(&self) -> HashMap<String, Vec<String>> {
        self.path_to_node
            .keys()
            .map(|path| (path.clone(), self.get_dependencies(path)))
            .collect()
    }

    pub fn get_all_dependents(&self) -> HashMap<String, Vec<String>> {
        self.path_to_node
            .keys()
            .map(|path| (path.clone(), self.get_dependents(path)))
            .collect()
    }

    pub fn topological_order(&self) -> Vec<String> {
        self.topo_order.clone()
    }

    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Transitive dependents (everything that would be affected by a change
    /// to this file), breadth-first.
    pub fn get_transitive_dependents(&self, file_path: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&idx) = self.path_to_node.get(file_path) {
            queue.push_back(idx);
        }

        while let Some(idx) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if visited.insert(self.graph[neighbor].clone()) {
                    queue.push_back(neighbor);
                }
            }
        }

        let mut result: Vec<String> = visited.into_iter().collect();
        result.sort();
        result
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
