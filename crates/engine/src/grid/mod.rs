mod algorithms;
mod graph;
mod occupancy;

pub use algorithms::{
    compute_path, compute_shortest_path, has_cycle, make_reflexive, make_strong_components,
    make_symmetric, make_transitive, reachable_from,
};
pub use graph::{Edge, Graph, NodeId, Oriented, OrientedGraph, Orientation, Unoriented, UnorientedGraph};
pub use occupancy::{
    compute_coordinates, compute_index, OccupancyError, OccupancyMap, OccupancyMap2D,
};
