//! Individualization-refinement automorphism search
//!
//! Partitions are stored as a cell rank per vertex. Ranks are dense and
//! depend only on colors and adjacency, so every automorphism commutes with
//! refinement and individualization. The search walks a first path to a
//! discrete partition, then works through the levels bottom-up: at level `i`
//! every vertex of the target cell that is not yet in the orbit of the first
//! path's choice gets a subtree search for a leaf equivalent to the first one.

use std::mem::size_of;
use std::time::Instant;

use tracing::{debug, warn};

use super::{AutomorphismOracle, AutomorphismResult, SearchLimits, SearchStatus};
use crate::graph::ColoredGraph;

/// Reference automorphism oracle
#[derive(Debug, Default)]
pub struct RefinementOracle {
    nodes: usize,
}

impl RefinementOracle {
    /// Creates an oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of search nodes visited by the last search
    pub fn nodes_visited(&self) -> usize {
        self.nodes
    }
}

impl AutomorphismOracle for RefinementOracle {
    fn find_automorphisms(&mut self, graph: &ColoredGraph, limits: &SearchLimits) -> AutomorphismResult {
        let mut search = Search::new(graph, limits);
        let result = search.run();
        self.nodes = search.nodes;
        debug!(
            generators = result.generators.len(),
            nodes = self.nodes,
            status = ?result.status,
            "automorphism search finished"
        );
        if result.status != SearchStatus::Complete {
            warn!(status = ?result.status, "automorphism search stopped early");
        }
        result
    }
}

/// Cell rank per vertex
type Partition = Vec<usize>;

struct Level {
    partition: Partition,
    cell: Vec<usize>,
    chosen: usize,
}

struct Search<'g> {
    graph: &'g ColoredGraph,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    deadline: Option<Instant>,
    memory_limit: Option<usize>,
    profiles: Vec<Vec<usize>>,
    first_leaf: Vec<usize>,
    orbits: Vec<usize>,
    generators: Vec<Vec<usize>>,
    nodes: usize,
}

impl<'g> Search<'g> {
    fn new(graph: &'g ColoredGraph, limits: &SearchLimits) -> Self {
        let n = graph.num_vertices();
        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];
        for (from, to) in graph.edges() {
            successors[from].push(to);
            predecessors[to].push(from);
        }
        Self {
            graph,
            successors,
            predecessors,
            deadline: limits.time_limit.and_then(|limit| Instant::now().checked_add(limit)),
            memory_limit: limits.memory_limit_bytes,
            profiles: Vec::new(),
            first_leaf: Vec::new(),
            orbits: (0..n).collect(),
            generators: Vec::new(),
            nodes: 0,
        }
    }

    fn n(&self) -> usize {
        self.graph.num_vertices()
    }

    fn run(&mut self) -> AutomorphismResult {
        let status = match self.search() {
            Ok(()) => SearchStatus::Complete,
            Err(status) => status,
        };
        AutomorphismResult {
            generators: std::mem::take(&mut self.generators),
            status,
        }
    }

    fn search(&mut self) -> Result<(), SearchStatus> {
        if self.n() == 0 {
            return Ok(());
        }

        // first path
        let mut levels: Vec<Level> = Vec::new();
        let mut partition = self.refine(self.initial_partition());
        self.profiles.push(profile(&partition));
        while !is_discrete(&partition) {
            self.check_limits(levels.len() + 1)?;
            let cell = target_cell(&partition);
            let chosen = cell[0];
            let next = self.refine(individualize(&partition, chosen));
            levels.push(Level {
                partition,
                cell,
                chosen,
            });
            self.profiles.push(profile(&next));
            partition = next;
        }
        self.first_leaf = leaf_order(&partition);

        for (depth, level) in levels.iter().enumerate().rev() {
            let mut failed: Vec<usize> = Vec::new();
            for &candidate in &level.cell {
                if candidate == level.chosen || self.find(candidate) == self.find(level.chosen) {
                    continue;
                }
                if failed.iter().any(|&f| self.find(f) == self.find(candidate)) {
                    continue;
                }
                let start = self.refine(individualize(&level.partition, candidate));
                match self.search_subtree(start, depth + 1, levels.len())? {
                    Some(generator) => self.add_generator(generator, levels.len())?,
                    None => failed.push(candidate),
                }
            }
        }
        Ok(())
    }

    /// Depth-first search for a leaf equivalent to the first leaf
    fn search_subtree(
        &mut self,
        partition: Partition,
        depth: usize,
        leaf_depth: usize,
    ) -> Result<Option<Vec<usize>>, SearchStatus> {
        self.nodes += 1;
        self.check_limits(leaf_depth)?;
        if self.profiles.get(depth) != Some(&profile(&partition)) {
            return Ok(None);
        }
        if is_discrete(&partition) {
            if depth != leaf_depth {
                return Ok(None);
            }
            let leaf = leaf_order(&partition);
            let mut permutation = vec![0; self.n()];
            for (rank, &vertex) in self.first_leaf.iter().enumerate() {
                permutation[vertex] = leaf[rank];
            }
            return Ok(self.graph.is_automorphism(&permutation).then_some(permutation));
        }
        for vertex in target_cell(&partition) {
            let next = self.refine(individualize(&partition, vertex));
            if let Some(found) = self.search_subtree(next, depth + 1, leaf_depth)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn add_generator(&mut self, generator: Vec<usize>, leaf_depth: usize) -> Result<(), SearchStatus> {
        self.check_limits(leaf_depth)?;
        for (vertex, &image) in generator.iter().enumerate() {
            let (a, b) = (self.find(vertex), self.find(image));
            if a != b {
                self.orbits[a.max(b)] = a.min(b);
            }
        }
        self.generators.push(generator);
        Ok(())
    }

    fn find(&self, mut vertex: usize) -> usize {
        while self.orbits[vertex] != vertex {
            vertex = self.orbits[vertex];
        }
        vertex
    }

    fn check_limits(&self, depth: usize) -> Result<(), SearchStatus> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(SearchStatus::TimedOut);
        }
        if let Some(limit) = self.memory_limit {
            let n = self.n();
            let words = self.generators.len() * n + (depth + self.profiles.len() + 1) * 2 * n;
            if words * size_of::<usize>() > limit {
                return Err(SearchStatus::OutOfMemory);
            }
        }
        Ok(())
    }

    fn initial_partition(&self) -> Partition {
        let colors = self.graph.colors();
        let mut distinct = colors.clone();
        distinct.sort_unstable();
        distinct.dedup();
        colors
            .iter()
            .map(|color| distinct.partition_point(|c| c < color))
            .collect()
    }

    /// Splits cells by the ranks of successors and predecessors until stable
    fn refine(&self, mut partition: Partition) -> Partition {
        let mut cells = count_cells(&partition);
        loop {
            let signatures: Vec<(usize, Vec<usize>, Vec<usize>)> = (0..self.n())
                .map(|v| {
                    let mut out: Vec<usize> = self.successors[v].iter().map(|&w| partition[w]).collect();
                    let mut inc: Vec<usize> = self.predecessors[v].iter().map(|&w| partition[w]).collect();
                    out.sort_unstable();
                    inc.sort_unstable();
                    (partition[v], out, inc)
                })
                .collect();
            let mut distinct: Vec<&(usize, Vec<usize>, Vec<usize>)> = signatures.iter().collect();
            distinct.sort();
            distinct.dedup();
            partition = signatures
                .iter()
                .map(|signature| distinct.partition_point(|d| *d < signature))
                .collect();
            if distinct.len() == cells {
                return partition;
            }
            cells = distinct.len();
        }
    }
}

fn count_cells(partition: &[usize]) -> usize {
    partition.iter().max().map_or(0, |&max| max + 1)
}

fn profile(partition: &[usize]) -> Vec<usize> {
    let mut sizes = vec![0; count_cells(partition)];
    for &rank in partition {
        sizes[rank] += 1;
    }
    sizes
}

fn is_discrete(partition: &[usize]) -> bool {
    count_cells(partition) == partition.len()
}

/// Returns the vertices of the first non-singleton cell
fn target_cell(partition: &[usize]) -> Vec<usize> {
    let sizes = profile(partition);
    let rank = sizes.iter().position(|&size| size > 1).unwrap_or(0);
    (0..partition.len()).filter(|&v| partition[v] == rank).collect()
}

/// Gives `vertex` its own cell in front of the rest of its cell
fn individualize(partition: &[usize], vertex: usize) -> Partition {
    let rank = partition[vertex];
    partition
        .iter()
        .enumerate()
        .map(|(x, &r)| r + usize::from(r > rank || (r == rank && x != vertex)))
        .collect()
}

/// Returns the vertex of every rank of a discrete partition
fn leaf_order(partition: &[usize]) -> Vec<usize> {
    let mut order = vec![0; partition.len()];
    for (vertex, &rank) in partition.iter().enumerate() {
        order[rank] = vertex;
    }
    order
}
