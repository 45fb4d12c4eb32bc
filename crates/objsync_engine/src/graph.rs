//! In-memory dependency graph of records and typed edges.
//!
//! The graph is a plain data structure: it does no I/O and makes no
//! acyclicity promise. Ordering queries report cycles instead of silently
//! truncating, and callers decide whether to proceed with a best-effort
//! order.
//!
//! ## Ordering
//!
//! For every edge `from -> to`, `to` must exist before `from`:
//! - OWNERSHIP `child -> owner`: the owner precedes the child
//! - REFERENCE `referrer -> referenced`: the referenced record precedes the referrer
//!
//! Ties are broken by node insertion order, so results are deterministic.

use crate::error::{EngineError, EngineResult};
use objsync_model::{Edge, EdgeKind, Kind, Record, RecordId};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Node and edge counts of a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Total nodes.
    pub nodes: usize,
    /// Nodes without a payload.
    pub stubs: usize,
    /// OWNERSHIP edges.
    pub ownership_edges: usize,
    /// REFERENCE edges.
    pub reference_edges: usize,
}

/// A best-effort topological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Nodes in dependency order.
    pub ordered: Vec<RecordId>,
    /// Nodes on or behind a cycle, in insertion order.
    pub unordered: Vec<RecordId>,
}

impl TopologicalOrder {
    /// Returns true if every node was ordered.
    pub fn is_complete(&self) -> bool {
        self.unordered.is_empty()
    }

    /// Ordered nodes followed by the unordered remainder.
    pub fn into_sequence(self) -> Vec<RecordId> {
        let mut seq = self.ordered;
        seq.extend(self.unordered);
        seq
    }
}

/// Records and the OWNERSHIP/REFERENCE edges between them.
///
/// Invariant: every edge endpoint has a node entry (possibly a stub).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<RecordId, Record>,
    insertion: Vec<RecordId>,
    edges: Vec<Edge>,
    edge_set: HashSet<Edge>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a node.
    ///
    /// If a node with the same ID exists as a stub and `record` carries a
    /// payload, the payload is attached. A placeholder kind is replaced by
    /// a concrete one. Anything else leaves the existing node untouched.
    ///
    /// Returns true if a new node was inserted.
    pub fn add_object(&mut self, record: Record) -> bool {
        let id = record.id();
        match self.nodes.get_mut(&id) {
            Some(existing) => {
                let enrich = existing.is_stub() && !record.is_stub();
                let resolve_kind = existing.is_stub()
                    && existing.kind().is_unresolved()
                    && !record.kind().is_unresolved();
                if enrich || resolve_kind {
                    *existing = record;
                }
                false
            }
            None => {
                self.nodes.insert(id, record);
                self.insertion.push(id);
                true
            }
        }
    }

    /// Inserts an edge, creating placeholder stubs for unknown endpoints.
    ///
    /// Returns false if the `(from, to, kind)` triple was already present.
    pub fn add_dependency(&mut self, from: RecordId, to: RecordId, kind: EdgeKind) -> bool {
        for id in [from, to] {
            if !self.nodes.contains_key(&id) {
                self.add_object(Record::stub(id, Kind::unresolved()));
            }
        }
        let edge = Edge::new(from, to, kind);
        if self.edge_set.insert(edge) {
            self.edges.push(edge);
            true
        } else {
            false
        }
    }

    /// Returns a node.
    pub fn node(&self, id: &RecordId) -> Option<&Record> {
        self.nodes.get(id)
    }

    /// Returns true if the node exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns true if the edge exists.
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edge_set.contains(edge)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node IDs in insertion order.
    pub fn ids(&self) -> &[RecordId] {
        &self.insertion
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Record> {
        self.insertion.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges of one kind, in insertion order.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// IDs `id` depends on (edge targets), optionally filtered by kind.
    pub fn dependencies_of(&self, id: &RecordId, kind: Option<EdgeKind>) -> Vec<RecordId> {
        self.filtered_edges(kind)
            .filter(|e| e.from == *id)
            .map(|e| e.to)
            .collect()
    }

    /// IDs that depend on `id` (edge sources), optionally filtered by kind.
    pub fn dependents_of(&self, id: &RecordId, kind: Option<EdgeKind>) -> Vec<RecordId> {
        self.filtered_edges(kind)
            .filter(|e| e.to == *id)
            .map(|e| e.from)
            .collect()
    }

    /// The owner of `id`, if the graph holds an OWNERSHIP edge from it.
    pub fn owner_of(&self, id: &RecordId) -> Option<RecordId> {
        self.edges_of_kind(EdgeKind::Ownership)
            .find(|e| e.from == *id)
            .map(|e| e.to)
    }

    /// IDs reachable from `id` by following edges `from -> to`.
    ///
    /// `id` itself is included only if it lies on a cycle.
    pub fn reachable_from(&self, id: &RecordId, kind: Option<EdgeKind>) -> Vec<RecordId> {
        let adjacency = self.adjacency(kind);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<RecordId> = adjacency
            .get(id)
            .map(|next| next.iter().copied().collect())
            .unwrap_or_default();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            result.push(current);
            if let Some(next) = adjacency.get(&current) {
                queue.extend(next.iter().copied());
            }
        }
        result
    }

    /// IDs of nodes without a payload.
    pub fn stub_ids(&self) -> Vec<RecordId> {
        self.nodes()
            .filter(|record| record.is_stub())
            .map(Record::id)
            .collect()
    }

    /// Node and edge counts.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            stubs: self.nodes.values().filter(|r| r.is_stub()).count(),
            ownership_edges: self.edges_of_kind(EdgeKind::Ownership).count(),
            reference_edges: self.edges_of_kind(EdgeKind::Reference).count(),
        }
    }

    /// Orders all nodes so that every edge target precedes its source.
    ///
    /// Only edges of `kind` are considered when a filter is given; nodes
    /// without such edges are still included.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` listing the nodes that could not be ordered.
    pub fn topological_order(&self, kind: Option<EdgeKind>) -> EngineResult<Vec<RecordId>> {
        let order = self.best_effort_order(kind);
        if order.is_complete() {
            Ok(order.ordered)
        } else {
            Err(EngineError::CycleDetected {
                ids: order.unordered,
            })
        }
    }

    /// Kahn's algorithm; nodes blocked by a cycle are returned separately.
    pub fn best_effort_order(&self, kind: Option<EdgeKind>) -> TopologicalOrder {
        let mut in_degree: HashMap<RecordId, usize> =
            self.insertion.iter().map(|id| (*id, 0)).collect();
        // to -> [from]: `to` must come first
        let mut successors: HashMap<RecordId, Vec<RecordId>> = HashMap::new();

        for edge in self.filtered_edges(kind) {
            *in_degree.entry(edge.from).or_insert(0) += 1;
            successors.entry(edge.to).or_default().push(edge.from);
        }

        let mut queue: VecDeque<RecordId> = self
            .insertion
            .iter()
            .filter(|id| in_degree.get(id) == Some(&0))
            .copied()
            .collect();

        let mut ordered = Vec::with_capacity(self.insertion.len());
        while let Some(id) = queue.pop_front() {
            ordered.push(id);
            if let Some(next) = successors.get(&id) {
                for dependent in next {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*dependent);
                        }
                    }
                }
            }
        }

        let emitted: HashSet<_> = ordered.iter().copied().collect();
        let unordered = self
            .insertion
            .iter()
            .filter(|id| !emitted.contains(id))
            .copied()
            .collect();

        TopologicalOrder { ordered, unordered }
    }

    /// Strongly connected components that form cycles (size > 1, or a
    /// self-loop), via Tarjan's algorithm.
    pub fn find_cycles(&self, kind: Option<EdgeKind>) -> Vec<Vec<RecordId>> {
        let adjacency = self.adjacency(kind);
        let position: HashMap<RecordId, usize> = self
            .insertion
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut tarjan = Tarjan {
            adjacency: &adjacency,
            index: 0,
            indices: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        };
        for id in &self.insertion {
            if !tarjan.indices.contains_key(id) {
                tarjan.connect(*id);
            }
        }

        let mut cycles: Vec<Vec<RecordId>> = tarjan
            .components
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || adjacency
                        .get(&scc[0])
                        .is_some_and(|next| next.contains(&scc[0]))
            })
            .collect();
        for scc in &mut cycles {
            scc.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
        }
        cycles.sort_by_key(|scc| position.get(&scc[0]).copied().unwrap_or(usize::MAX));
        cycles
    }

    fn filtered_edges(&self, kind: Option<EdgeKind>) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |e| kind.map_or(true, |k| e.kind == k))
    }

    fn adjacency(&self, kind: Option<EdgeKind>) -> HashMap<RecordId, Vec<RecordId>> {
        let mut adjacency: HashMap<RecordId, Vec<RecordId>> = HashMap::new();
        for edge in self.filtered_edges(kind) {
            adjacency.entry(edge.from).or_default().push(edge.to);
        }
        adjacency
    }
}

struct Tarjan<'a> {
    adjacency: &'a HashMap<RecordId, Vec<RecordId>>,
    index: usize,
    indices: HashMap<RecordId, usize>,
    lowlink: HashMap<RecordId, usize>,
    stack: Vec<RecordId>,
    on_stack: HashSet<RecordId>,
    components: Vec<Vec<RecordId>>,
}

impl Tarjan<'_> {
    /// Iterative Tarjan from `root`. Each work entry is a node and the
    /// position of its next unexplored successor.
    fn connect(&mut self, root: RecordId) {
        let adjacency = self.adjacency;
        self.open(root);
        let mut work: Vec<(RecordId, usize)> = vec![(root, 0)];

        while let Some((v, position)) = work.pop() {
            let next = adjacency.get(&v).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(&w) = next.get(position) {
                work.push((v, position + 1));
                if !self.indices.contains_key(&w) {
                    self.open(w);
                    work.push((w, 0));
                } else if self.on_stack.contains(&w) {
                    let low = self.lowlink[&v].min(self.indices[&w]);
                    self.lowlink.insert(v, low);
                }
                continue;
            }

            if self.lowlink[&v] == self.indices[&v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack.remove(&w);
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                self.components.push(component);
            }
            // v is done: fold its lowlink into the node that discovered it.
            if let Some(&(parent, _)) = work.last() {
                let low = self.lowlink[&parent].min(self.lowlink[&v]);
                self.lowlink.insert(parent, low);
            }
        }
    }

    fn open(&mut self, v: RecordId) {
        self.indices.insert(v, self.index);
        self.lowlink.insert(v, self.index);
        self.index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
    }
}
