// ===========================================================================
// Octilinear Grid Graph
// ===========================================================================
//
// Every grid cell owns nine nodes: eight compass ports (clockwise from the top)
// plus one sink. Ports of one cell are fully connected with bend edges priced by
// the angle between them, every port is tied to the sink, and matching ports of
// neighbouring cells are joined by hop edges.

mod constraints;
mod graph;
mod grid_node;

pub use graph::OctiGraph;
pub use grid_node::{CellId, GridNode, OctiEdge, OctiEdgeId, OctiNode, OctiNodeId, RoutedEdge};

use serde::{Deserialize, Serialize};

pub const COST_45: f64 = 2.0;
pub const COST_90: f64 = 1.5;
pub const COST_135: f64 = 1.0;
pub const COST_180: f64 = 0.0;
pub const COST_SINK: f64 = 2.0;
pub const COST_HOP: f64 = 1.0;
pub const COST_HOP_DIAGONAL: f64 = 1.5;
pub const COST_CROSSING: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    Top = 0,
    TopRight = 1,
    Right = 2,
    BottomRight = 3,
    Bottom = 4,
    BottomLeft = 5,
    Left = 6,
    TopLeft = 7,
    Sink = 8,
}

pub const PORTS: [Direction; 8] = [
    Direction::Top,
    Direction::TopRight,
    Direction::Right,
    Direction::BottomRight,
    Direction::Bottom,
    Direction::BottomLeft,
    Direction::Left,
    Direction::TopLeft,
];

impl Direction {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        match index {
            0..=7 => Some(PORTS[index]),
            8 => Some(Direction::Sink),
            _ => None,
        }
    }

    /// Port reached after `steps` clockwise eighth turns. The sink does not rotate.
    pub fn rotate(self, steps: i64) -> Direction {
        if self.is_sink() {
            return self;
        }
        PORTS[(self.index() as i64 + steps).rem_euclid(8) as usize]
    }

    pub fn is_sink(self) -> bool {
        self == Direction::Sink
    }

    pub fn is_diagonal(self) -> bool {
        !self.is_sink() && self.index() % 2 == 1
    }

    pub fn opposite(self) -> Direction {
        self.rotate(4)
    }

    /// Circular distance between two ports in eighth turns, 0..=4.
    pub fn octi_angle(self, other: Direction) -> usize {
        debug_assert!(!self.is_sink() && !other.is_sink());
        let d = (self.index() as i64 - other.index() as i64).rem_euclid(8) as usize;
        d.min(8 - d)
    }

    /// Clockwise distance in eighth turns from `self` to `other`, 0..=7.
    pub fn clockwise_steps(self, other: Direction) -> usize {
        (other.index() as i64 - self.index() as i64).rem_euclid(8) as usize
    }

    /// Grid offset of the neighbour behind this port; y grows downward.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
            Direction::Sink => (0, 0),
        }
    }

    pub fn from_offset(dx: i64, dy: i64) -> Option<Direction> {
        PORTS.into_iter().find(|d| d.offset() == (dx, dy))
    }
}

/// Cost of entering a cell through one port and leaving through another that is
/// `octi_angle` eighth turns away. A straight pass-through is free.
pub fn bend_cost(octi_angle: usize) -> f64 {
    match octi_angle {
        1 => COST_45,
        2 => COST_90,
        3 => COST_135,
        4 => COST_180,
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_ports() {
        assert_eq!(Direction::Top.opposite(), Direction::Bottom);
        assert_eq!(Direction::TopRight.opposite(), Direction::BottomLeft);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::Sink.opposite(), Direction::Sink);
    }

    #[test]
    fn octi_angle_is_symmetric_and_bounded() {
        for a in PORTS {
            for b in PORTS {
                assert_eq!(a.octi_angle(b), b.octi_angle(a));
                assert!(a.octi_angle(b) <= 4);
            }
            assert_eq!(a.octi_angle(a.opposite()), 4);
        }
        assert_eq!(Direction::TopLeft.octi_angle(Direction::Top), 1);
        assert_eq!(Direction::TopLeft.clockwise_steps(Direction::Top), 1);
        assert_eq!(Direction::Top.clockwise_steps(Direction::TopLeft), 7);
    }

    #[test]
    fn offsets_round_trip() {
        for d in PORTS {
            let (dx, dy) = d.offset();
            assert_eq!(Direction::from_offset(dx, dy), Some(d));
            assert_eq!(d.is_diagonal(), dx != 0 && dy != 0);
        }
        assert_eq!(Direction::from_offset(0, 0), None);
        assert_eq!(Direction::from_offset(2, 0), None);
    }

    #[test]
    fn sharper_bends_cost_more() {
        assert!(bend_cost(1) > bend_cost(2));
        assert!(bend_cost(2) > bend_cost(3));
        assert!(bend_cost(3) > bend_cost(4));
        assert_eq!(bend_cost(4), 0.0);
        assert!(COST_HOP_DIAGONAL > COST_HOP);
    }
}
