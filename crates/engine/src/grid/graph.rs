use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::marker::PhantomData;

pub type NodeId = u32;
pub type Edge = (NodeId, NodeId);

/// Edge addressing policy of a [`Graph`].
pub trait Orientation: Debug + Clone + Default {
    const ORIENTED: bool;

    fn key(a: NodeId, b: NodeId) -> Edge;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Oriented;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unoriented;

impl Orientation for Oriented {
    const ORIENTED: bool = true;

    fn key(a: NodeId, b: NodeId) -> Edge {
        (a, b)
    }
}

impl Orientation for Unoriented {
    const ORIENTED: bool = false;

    fn key(a: NodeId, b: NodeId) -> Edge {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Sparse graph over small integer node ids with an optional per-edge payload.
///
/// Unoriented graphs normalise the pair so `(a, b)` and `(b, a)` address the same
/// edge. Ordered collections keep neighbour iteration, and therefore path
/// selection, deterministic.
#[derive(Debug, Clone)]
pub struct Graph<S = (), O: Orientation = Unoriented> {
    vertices: BTreeSet<NodeId>,
    edges: BTreeMap<Edge, S>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    orientation: PhantomData<O>,
}

pub type UnorientedGraph<S = ()> = Graph<S, Unoriented>;
pub type OrientedGraph<S = ()> = Graph<S, Oriented>;

impl<S, O: Orientation> Default for Graph<S, O> {
    fn default() -> Self {
        Self {
            vertices: BTreeSet::new(),
            edges: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            orientation: PhantomData,
        }
    }
}

impl<S: Clone + Default, O: Orientation> Graph<S, O> {
    pub fn from_parts(
        vertices: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Self {
        let mut graph = Self::default();
        for vertex in vertices {
            graph.add_vertex(vertex);
        }
        for (a, b) in edges {
            graph.add_edge(a, b, S::default());
        }
        graph
    }
}

impl<S: Clone, O: Orientation> Graph<S, O> {
    pub fn is_oriented(&self) -> bool {
        O::ORIENTED
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.edges.contains_key(&O::key(a, b))
    }

    pub fn edge_data(&self, a: NodeId, b: NodeId) -> Option<&S> {
        self.edges.get(&O::key(a, b))
    }

    pub fn empty_edges(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn empty_vertices(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_vertex(&mut self, vertex: NodeId) {
        self.vertices.insert(vertex);
    }

    pub fn has_vertex(&self, vertex: NodeId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn remove_vertex(&mut self, vertex: NodeId) {
        if !self.vertices.remove(&vertex) {
            return;
        }
        let incident: Vec<Edge> = self
            .edges
            .keys()
            .filter(|(a, b)| *a == vertex || *b == vertex)
            .copied()
            .collect();
        for (a, b) in incident {
            self.remove_edge(a, b);
        }
        self.adjacency.remove(&vertex);
    }

    /// Nodes reachable over one edge. For oriented graphs only outgoing edges count.
    pub fn neighbours(&self, vertex: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency
            .get(&vertex)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId, data: S) {
        self.edges.insert(O::key(a, b), data);
        self.add_vertex(a);
        self.add_vertex(b);
        self.adjacency.entry(a).or_default().insert(b);
        if !O::ORIENTED {
            self.adjacency.entry(b).or_default().insert(a);
        }
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) {
        if self.edges.remove(&O::key(a, b)).is_none() {
            return;
        }
        if let Some(set) = self.adjacency.get_mut(&a) {
            set.remove(&b);
        }
        if !O::ORIENTED {
            if let Some(set) = self.adjacency.get_mut(&b) {
                set.remove(&a);
            }
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.vertices.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (Edge, &S)> + '_ {
        self.edges.iter().map(|(edge, data)| (*edge, data))
    }
}
