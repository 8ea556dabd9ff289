use super::Direction;
use crate::input_graph::{EdgeId, StationId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OctiNodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OctiEdgeId(pub usize);

#[derive(Debug, Clone)]
pub struct OctiNode {
    pub id: OctiNodeId,
    pub cell: CellId,
    pub direction: Direction,
    pub edges: Vec<OctiEdgeId>,
}

/// Undirected edge between two octi nodes, endpoints stored in ascending id order.
#[derive(Debug, Clone)]
pub struct OctiEdge {
    pub id: OctiEdgeId,
    pub a: OctiNodeId,
    pub b: OctiNodeId,
    weight: f64,
    original_weight: f64,
    used: bool,
}

impl OctiEdge {
    pub fn new(id: OctiEdgeId, a: OctiNodeId, b: OctiNodeId, weight: f64) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            id,
            a,
            b,
            weight,
            original_weight: weight,
            used: false,
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn original_weight(&self) -> f64 {
        self.original_weight
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_open(&self) -> bool {
        self.weight.is_finite()
    }

    pub fn other(&self, node: OctiNodeId) -> OctiNodeId {
        if self.a == node { self.b } else { self.a }
    }

    /// No effect once the edge is used.
    pub fn set_weight(&mut self, weight: f64) {
        if !self.used {
            self.weight = weight;
        }
    }

    /// Close the edge for the rest of the run.
    pub fn mark_used(&mut self) {
        self.used = true;
        self.weight = f64::INFINITY;
    }

    pub fn reset_weight(&mut self) {
        if !self.used {
            self.weight = self.original_weight;
        }
    }
}

/// An input edge that already terminates at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedEdge {
    pub other_station: StationId,
    pub direction: Direction,
    pub edge: EdgeId,
}

#[derive(Debug, Clone)]
pub struct GridNode {
    pub id: CellId,
    pub x: usize,
    pub y: usize,
    /// Indexed by `Direction::index()`, the sink last.
    pub(super) nodes: [OctiNodeId; 9],
    pub(super) sink_edges: [OctiEdgeId; 8],
    pub(super) bend_edges: Vec<OctiEdgeId>,
    station: Option<StationId>,
    routed: Vec<RoutedEdge>,
}

impl GridNode {
    pub(super) fn new(id: CellId, x: usize, y: usize, first_node: usize) -> Self {
        Self {
            id,
            x,
            y,
            nodes: std::array::from_fn(|d| OctiNodeId(first_node + d)),
            sink_edges: [OctiEdgeId(0); 8],
            bend_edges: Vec::with_capacity(28),
            station: None,
            routed: Vec::new(),
        }
    }

    pub fn node(&self, direction: Direction) -> OctiNodeId {
        self.nodes[direction.index()]
    }

    pub fn sink(&self) -> OctiNodeId {
        self.nodes[Direction::Sink.index()]
    }

    /// Edge joining the given port to this cell's sink.
    pub fn sink_edge(&self, port: Direction) -> Option<OctiEdgeId> {
        self.sink_edges.get(port.index()).copied()
    }

    pub fn sink_edges(&self) -> &[OctiEdgeId; 8] {
        &self.sink_edges
    }

    pub fn bend_edges(&self) -> &[OctiEdgeId] {
        &self.bend_edges
    }

    pub fn station(&self) -> Option<StationId> {
        self.station
    }

    /// Bind a station to this cell. A cell keeps the first station it is given.
    pub fn bind_station(&mut self, station: StationId) -> bool {
        match self.station {
            Some(existing) => existing == station,
            None => {
                self.station = Some(station);
                true
            }
        }
    }

    pub fn routings(&self) -> &[RoutedEdge] {
        &self.routed
    }

    pub fn routed_direction(&self, edge: EdgeId) -> Option<Direction> {
        self.routed.iter().find(|r| r.edge == edge).map(|r| r.direction)
    }

    pub fn save_routing(&mut self, other_station: StationId, direction: Direction, edge: EdgeId) {
        if let Some(existing) = self.routed.iter_mut().find(|r| r.edge == edge) {
            existing.other_station = other_station;
            existing.direction = direction;
            return;
        }
        self.routed.push(RoutedEdge {
            other_station,
            direction,
            edge,
        });
    }

    pub fn remove_routing(&mut self, edge: EdgeId) -> Option<RoutedEdge> {
        let index = self.routed.iter().position(|r| r.edge == edge)?;
        Some(self.routed.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_edges_ignore_resets() {
        let mut edge = OctiEdge::new(OctiEdgeId(0), OctiNodeId(7), OctiNodeId(3), 1.5);
        assert_eq!((edge.a, edge.b), (OctiNodeId(3), OctiNodeId(7)));

        edge.set_weight(4.0);
        edge.reset_weight();
        assert_eq!(edge.weight(), 1.5);

        edge.mark_used();
        edge.reset_weight();
        edge.set_weight(0.5);
        assert!(edge.weight().is_infinite());
        assert_eq!(edge.original_weight(), 1.5);
    }

    #[test]
    fn station_binding_is_sticky() {
        let mut cell = GridNode::new(CellId(0), 0, 0, 0);
        assert!(cell.bind_station(StationId(1)));
        assert!(cell.bind_station(StationId(1)));
        assert!(!cell.bind_station(StationId(2)));
        assert_eq!(cell.station(), Some(StationId(1)));
    }

    #[test]
    fn one_routing_per_edge() {
        let mut cell = GridNode::new(CellId(0), 0, 0, 0);
        cell.save_routing(StationId(4), Direction::Left, EdgeId(9));
        cell.save_routing(StationId(4), Direction::TopLeft, EdgeId(9));
        assert_eq!(cell.routings().len(), 1);
        assert_eq!(cell.routed_direction(EdgeId(9)), Some(Direction::TopLeft));

        assert!(cell.remove_routing(EdgeId(9)).is_some());
        assert!(cell.remove_routing(EdgeId(9)).is_none());
    }
}
