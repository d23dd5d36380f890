use thiserror::Error;
use tracing::debug;

use crate::geometry::{Aabb, Vec2};
use crate::grid::{
    compute_coordinates, compute_index, compute_shortest_path, reachable_from, NodeId,
    UnorientedGraph,
};
use crate::world::CollisionWorld;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NavigationError {
    #[error("position {position:?} is outside the navigation boundary {boundary:?}")]
    OutOfBounds { position: Vec2, boundary: Aabb },
}

#[derive(Debug, Clone)]
struct NavigationCache {
    boundary: Aabb,
    dims: [u32; 2],
    graph: UnorientedGraph,
    /// Connected-component label per cell index; `None` for blocked cells.
    components: Vec<Option<u32>>,
}

impl Default for NavigationCache {
    fn default() -> Self {
        Self {
            boundary: Aabb::new(Vec2::ZERO, Vec2::ZERO),
            dims: [0, 0],
            graph: UnorientedGraph::default(),
            components: Vec::new(),
        }
    }
}

/// Walkability graph over the integer cells of a world boundary.
///
/// One node per cell free of static terrain, with edges between free cells that
/// share a side. The cache is either fresh (built by the latest [`update`]) or
/// stale; stale caches still answer queries from the last build.
///
/// [`update`]: NavigationMesh::update
#[derive(Debug, Default)]
pub struct NavigationMesh {
    cache: NavigationCache,
    fresh: bool,
    built_revision: Option<u64>,
}

impl NavigationMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    pub fn boundary(&self) -> Aabb {
        self.cache.boundary
    }

    pub fn node_count(&self) -> usize {
        self.cache.graph.vertex_count()
    }

    pub fn graph(&self) -> &UnorientedGraph {
        &self.cache.graph
    }

    pub fn update(&mut self, world: &impl CollisionWorld) {
        self.invalidate();

        let boundary = world.world_boundaries();
        let dims = [
            boundary.size.x.max(0.0).floor() as u32,
            boundary.size.y.max(0.0).floor() as u32,
        ];
        let [width, height] = dims;

        let mut walkable = vec![false; width as usize * height as usize];
        let mut graph = UnorientedGraph::default();
        for y in 0..height {
            for x in 0..width {
                let centre = boundary.origin + Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if world.has_static_collision(centre) {
                    continue;
                }
                if let Some(index) = compute_index([x, y], dims) {
                    walkable[index] = true;
                    graph.add_vertex(index as NodeId);
                }
            }
        }

        let is_walkable = |x: u32, y: u32| {
            compute_index([x, y], dims).map_or(false, |index| walkable[index])
        };
        for y in 0..height {
            for x in 0..width {
                if !is_walkable(x, y) {
                    continue;
                }
                let Some(node) = compute_index([x, y], dims) else {
                    continue;
                };
                for (nx, ny) in [(x + 1, y), (x, y + 1)] {
                    if is_walkable(nx, ny) {
                        if let Some(neighbour) = compute_index([nx, ny], dims) {
                            graph.add_edge(node as NodeId, neighbour as NodeId, ());
                        }
                    }
                }
            }
        }

        let (components, component_count) = label_components(&graph, walkable.len());
        debug!(
            width,
            height,
            nodes = graph.vertex_count(),
            edges = graph.edge_count(),
            components = component_count,
            "navigation_mesh_rebuilt"
        );

        self.cache = NavigationCache {
            boundary,
            dims,
            graph,
            components,
        };
        self.fresh = true;
    }

    /// Rebuilds only when the cache is stale or `revision` differs from the
    /// revision of the previous build. Returns whether a rebuild happened.
    pub fn update_if_changed(&mut self, world: &impl CollisionWorld, revision: u64) -> bool {
        if self.fresh && self.built_revision == Some(revision) {
            return false;
        }
        self.update(world);
        self.built_revision = Some(revision);
        true
    }

    /// Node of the cell containing `position`. Points on the far edge of the
    /// boundary belong to the last row or column.
    pub fn compute_node_id(&self, position: Vec2) -> Result<NodeId, NavigationError> {
        let boundary = self.cache.boundary;
        let out_of_bounds = NavigationError::OutOfBounds { position, boundary };
        if !position.is_finite() || !boundary.contains(position) {
            return Err(out_of_bounds);
        }
        let [width, height] = self.cache.dims;
        let local = (position - boundary.origin).floor();
        let x = (local.x.max(0.0) as u32).min(width.saturating_sub(1));
        let y = (local.y.max(0.0) as u32).min(height.saturating_sub(1));
        compute_index([x, y], self.cache.dims)
            .map(|index| index as NodeId)
            .ok_or(out_of_bounds)
    }

    pub fn position_of(&self, node: NodeId) -> Option<Vec2> {
        compute_coordinates(node as usize, self.cache.dims).map(|[x, y]| {
            self.cache.boundary.origin + Vec2::new(x as f32, y as f32)
        })
    }

    /// Blocked cells reach nothing, themselves included.
    pub fn is_reachable(&self, start: Vec2, end: Vec2) -> Result<bool, NavigationError> {
        let start = self.compute_node_id(start)?;
        let end = self.compute_node_id(end)?;
        Ok(self.same_component(start, end))
    }

    fn same_component(&self, a: NodeId, b: NodeId) -> bool {
        let label = |node: NodeId| self.cache.components.get(node as usize).copied().flatten();
        match (label(a), label(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Shortest 4-connected path between the cells of `start` and `end`, both
    /// included. Empty when `end` cannot be reached.
    pub fn compute_path(&self, start: Vec2, end: Vec2) -> Result<Vec<Vec2>, NavigationError> {
        let start_node = self.compute_node_id(start)?;
        let end_node = self.compute_node_id(end)?;
        if !self.same_component(start_node, end_node) {
            return Ok(Vec::new());
        }
        Ok(compute_shortest_path(&self.cache.graph, start_node, end_node)
            .into_iter()
            .filter_map(|node| self.position_of(node))
            .collect())
    }
}

fn label_components(graph: &UnorientedGraph, cells: usize) -> (Vec<Option<u32>>, u32) {
    let mut components = vec![None; cells];
    let mut count = 0u32;
    for vertex in graph.vertices() {
        if components.get(vertex as usize).copied().flatten().is_some() {
            continue;
        }
        for reached in reachable_from(graph, vertex) {
            if let Some(slot) = components.get_mut(reached as usize) {
                *slot = Some(count);
            }
        }
        count = count.saturating_add(1);
    }
    (components, count)
}
