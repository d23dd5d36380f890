use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use super::graph::{Graph, NodeId, Orientation};

/// Adds a self-loop on every vertex. O(V).
pub fn make_reflexive<S: Clone + Default, O: Orientation>(graph: &Graph<S, O>) -> Graph<S, O> {
    let mut result = graph.clone();
    for vertex in graph.vertices() {
        result.add_edge(vertex, vertex, S::default());
    }
    result
}

/// Adds the reverse of every edge. A no-op for unoriented graphs. O(E).
pub fn make_symmetric<S: Clone + Default, O: Orientation>(graph: &Graph<S, O>) -> Graph<S, O> {
    let mut result = graph.clone();
    for ((a, b), data) in graph.edges() {
        if !result.has_edge(b, a) {
            result.add_edge(b, a, data.clone());
        }
    }
    result
}

/// Transitive closure: an edge `(a, c)` exists whenever `c` is reachable from `a`
/// over one or more edges. Runs one breadth-first walk per vertex, O(V * (V + E)).
pub fn make_transitive<S: Clone + Default, O: Orientation>(graph: &Graph<S, O>) -> Graph<S, O> {
    let mut result = graph.clone();
    for vertex in graph.vertices() {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = graph.neighbours(vertex).collect();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            queue.extend(graph.neighbours(current));
        }
        for reached in visited {
            if !result.has_edge(vertex, reached) {
                result.add_edge(vertex, reached, S::default());
            }
        }
    }
    result
}

/// Reflexive-transitive closure. `has_edge(a, b)` on the result answers
/// "is `b` reachable from `a`" in a single lookup.
pub fn make_strong_components<S: Clone + Default, O: Orientation>(
    graph: &Graph<S, O>,
) -> Graph<S, O> {
    make_transitive(&make_reflexive(graph))
}

pub fn reachable_from<S: Clone, O: Orientation>(
    graph: &Graph<S, O>,
    start: NodeId,
) -> BTreeSet<NodeId> {
    let mut visited = BTreeSet::new();
    if !graph.has_vertex(start) {
        return visited;
    }
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        queue.extend(graph.neighbours(current).filter(|next| !visited.contains(next)));
    }
    visited
}

/// Detects a cycle. Self-loops count; an unoriented edge walked back and forth
/// does not.
pub fn has_cycle<S: Clone, O: Orientation>(graph: &Graph<S, O>) -> bool {
    if graph.empty_edges() || graph.empty_vertices() {
        return false;
    }
    if O::ORIENTED {
        has_directed_cycle(graph)
    } else {
        has_undirected_cycle(graph)
    }
}

fn has_undirected_cycle<S: Clone, O: Orientation>(graph: &Graph<S, O>) -> bool {
    let mut parent: BTreeMap<NodeId, NodeId> = graph.vertices().map(|v| (v, v)).collect();

    fn root(parent: &mut BTreeMap<NodeId, NodeId>, mut node: NodeId) -> NodeId {
        while let Some(&next) = parent.get(&node) {
            if next == node {
                break;
            }
            let grandparent = parent.get(&next).copied().unwrap_or(next);
            parent.insert(node, grandparent);
            node = next;
        }
        node
    }

    for ((a, b), _) in graph.edges() {
        let root_a = root(&mut parent, a);
        let root_b = root(&mut parent, b);
        if root_a == root_b {
            return true;
        }
        parent.insert(root_a, root_b);
    }
    false
}

fn has_directed_cycle<S: Clone, O: Orientation>(graph: &Graph<S, O>) -> bool {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Open,
        Done,
    }

    let mut marks: BTreeMap<NodeId, Mark> = BTreeMap::new();
    for root in graph.vertices() {
        if marks.contains_key(&root) {
            continue;
        }
        // (node, expanded) pairs; a node is closed when popped the second time.
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                marks.insert(node, Mark::Done);
                continue;
            }
            match marks.get(&node) {
                Some(Mark::Done) => continue,
                Some(Mark::Open) => continue,
                None => {}
            }
            marks.insert(node, Mark::Open);
            stack.push((node, true));
            for next in graph.neighbours(node) {
                match marks.get(&next) {
                    Some(Mark::Open) => return true,
                    Some(Mark::Done) => {}
                    None => stack.push((next, false)),
                }
            }
        }
    }
    false
}

/// Breadth-first path search. Returns the node sequence from `start` to `end`
/// inclusive, or an empty vector when `end` is unreachable.
pub fn compute_path<S: Clone, O: Orientation>(
    graph: &Graph<S, O>,
    start: NodeId,
    end: NodeId,
) -> Vec<NodeId> {
    if !graph.has_vertex(start) || !graph.has_vertex(end) {
        return Vec::new();
    }

    let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut visited = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(vertex) = queue.pop_front() {
        if vertex == end {
            return trace_path_back(&previous, start, end);
        }
        for next in graph.neighbours(vertex) {
            if visited.insert(next) {
                previous.insert(next, vertex);
                queue.push_back(next);
            }
        }
    }
    Vec::new()
}

/// Hop-count shortest path driven by a min-priority queue. Ties on distance are
/// resolved by insertion order, so the result is deterministic.
pub fn compute_shortest_path<S: Clone, O: Orientation>(
    graph: &Graph<S, O>,
    start: NodeId,
    end: NodeId,
) -> Vec<NodeId> {
    if !graph.has_vertex(start) || !graph.has_vertex(end) {
        return Vec::new();
    }

    let mut open = BinaryHeap::new();
    let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut closed = BTreeSet::new();
    let mut next_insertion = 0u64;

    open.push(Reverse((0u32, next_insertion, start, start)));
    while let Some(Reverse((distance, _, vertex, previous_vertex))) = open.pop() {
        if !closed.insert(vertex) {
            continue;
        }
        previous.insert(vertex, previous_vertex);

        if vertex == end {
            return trace_path_back(&previous, start, end);
        }

        for next in graph.neighbours(vertex) {
            if closed.contains(&next) {
                continue;
            }
            next_insertion = next_insertion.saturating_add(1);
            open.push(Reverse((
                distance.saturating_add(1),
                next_insertion,
                next,
                vertex,
            )));
        }
    }
    Vec::new()
}

fn trace_path_back(previous: &BTreeMap<NodeId, NodeId>, start: NodeId, end: NodeId) -> Vec<NodeId> {
    let mut path = vec![end];
    let mut cursor = end;
    while cursor != start {
        let Some(&next) = previous.get(&cursor) else {
            return Vec::new();
        };
        cursor = next;
        path.push(cursor);
    }
    path.reverse();
    path
}
