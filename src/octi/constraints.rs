// ===========================================================================
// Routing constraints: per-cell weight changes installed between searches
// ===========================================================================
use super::graph::OctiGraph;
use super::grid_node::{CellId, OctiNodeId};
use super::{Direction, PORTS, bend_cost};
use crate::input_graph::{EdgeId, Station, StationId};
use log::debug;

impl OctiGraph {
    /// Permanently close all sink edges of a cell.
    pub fn close_sink_edges(&mut self, cell: CellId) {
        let sinks = *self.cell(cell).sink_edges();
        for edge in sinks {
            self.edge_mut(edge).mark_used();
        }
    }

    /// Close the sink edges until the next `reopen_sink_edges`.
    pub fn block_sink_edges(&mut self, cell: CellId) {
        let sinks = *self.cell(cell).sink_edges();
        for edge in sinks {
            self.edge_mut(edge).set_weight(f64::INFINITY);
        }
    }

    /// Set every bend edge of a cell to `weight`; an infinite weight closes them for good.
    pub fn close_bend_edges(&mut self, cell: CellId, weight: f64) {
        let bends = self.cell(cell).bend_edges().to_vec();
        for edge in bends {
            if weight.is_infinite() {
                self.edge_mut(edge).mark_used();
            } else {
                self.edge_mut(edge).set_weight(weight);
            }
        }
    }

    pub fn reopen_sink_edges(&mut self, cell: CellId) {
        let sinks = *self.cell(cell).sink_edges();
        for edge in sinks {
            self.edge_mut(edge).reset_weight();
        }
    }

    pub fn reopen_bend_edges(&mut self, cell: CellId) {
        let bends = self.cell(cell).bend_edges().to_vec();
        for edge in bends {
            self.edge_mut(edge).reset_weight();
        }
    }

    /// Add `penalty` on top of the current weight of every open sink edge.
    pub fn add_sink_penalty(&mut self, cell: CellId, penalty: f64) {
        let sinks = *self.cell(cell).sink_edges();
        for edge in sinks {
            let e = self.edge_mut(edge);
            if e.is_open() {
                let weight = e.weight() + penalty;
                e.set_weight(weight);
            }
        }
    }

    /// True while at least one sink edge of the cell can still be entered.
    pub fn has_open_sink(&self, cell: CellId) -> bool {
        self.cell(cell)
            .sink_edges()
            .iter()
            .any(|&e| self.edge(e).is_open())
    }

    pub fn save_routing(&mut self, cell: CellId, other_station: StationId, direction: Direction, edge: EdgeId) {
        self.cell_mut(cell).save_routing(other_station, direction, edge);
    }

    pub fn remove_routing(&mut self, cell: CellId, edge: EdgeId) {
        self.cell_mut(cell).remove_routing(edge);
    }

    /// Restrict the ports `edge` may leave `station`'s cell through to the arc that
    /// keeps the station's circular line order intact.
    ///
    /// Walking the station's edge ordering forward and backward from `edge` finds the
    /// nearest already routed neighbours. Only the ports strictly between their
    /// directions stay open, minus one slot on each side for every unrouted edge
    /// skipped on the way, so those edges still have room later.
    pub fn block_for_circular_ordering(&mut self, cell: CellId, station: &Station, edge: EdgeId) {
        let ordering = &station.edge_ordering;
        if station.degree() <= 2 || ordering.len() <= 2 {
            return;
        }
        let Some(target) = station.ordering_index(edge) else {
            return;
        };
        let k = ordering.len();
        let grid_node = self.cell(cell);

        let mut forward = None;
        for step in 1..k {
            if let Some(d) = grid_node.routed_direction(ordering[(target + step) % k]) {
                forward = Some((d, step - 1));
                break;
            }
        }
        let mut backward = None;
        for step in 1..k {
            if let Some(d) = grid_node.routed_direction(ordering[(target + k - step) % k]) {
                backward = Some((d, step - 1));
                break;
            }
        }
        let (Some((next, skipped_forward)), Some((prev, skipped_backward))) = (forward, backward)
        else {
            return;
        };

        // Free ports strictly between prev and next, clockwise. 7 when they coincide.
        let gap = match prev.clockwise_steps(next) {
            0 => 7,
            steps => steps - 1,
        };

        let (mut reserve_back, mut reserve_fwd) = (skipped_backward, skipped_forward);
        while reserve_back + reserve_fwd + 1 > gap && reserve_back + reserve_fwd > 0 {
            if reserve_fwd >= reserve_back {
                reserve_fwd -= 1;
            } else {
                reserve_back -= 1;
            }
        }
        let allowed = gap.saturating_sub(reserve_back + reserve_fwd);
        let first_allowed = prev.rotate(1 + reserve_back as i64);

        let mut blocked = Vec::new();
        for port in PORTS {
            if first_allowed.clockwise_steps(port) >= allowed {
                if let Some(e) = self.cell(cell).sink_edge(port) {
                    self.edge_mut(e).set_weight(f64::INFINITY);
                    blocked.push(port);
                }
            }
        }

        debug!(
            "Circular ordering at {:?}: {} open ports after {:?}, blocked {:?}",
            station.id, allowed, first_allowed, blocked
        );
    }

    /// Install a found path: every traversed edge is used up, cells the path only
    /// passes through are sealed, and the two terminal cells lose their pass-through
    /// bends and stay blocked until they are explicitly reopened.
    pub fn commit_path(&mut self, nodes: &[OctiNodeId], allow_crossing: bool) {
        let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) else {
            return;
        };
        let first_cell = self.node(first).cell;
        let last_cell = self.node(last).cell;

        for pair in nodes.windows(2) {
            let Some(edge) = self.get_edge(pair[0], pair[1]) else {
                continue;
            };
            self.edge_mut(edge).mark_used();
            if self.is_diagonal_hop(edge) {
                self.close_diagonal_edge(edge, allow_crossing);
            }
        }

        let mut interior: Vec<CellId> = nodes
            .iter()
            .map(|&n| self.node(n).cell)
            .filter(|&c| c != first_cell && c != last_cell)
            .collect();
        interior.dedup();
        for cell in interior {
            self.close_sink_edges(cell);
            self.close_bend_edges(cell, f64::INFINITY);
        }

        for cell in [first_cell, last_cell] {
            self.close_bend_edges(cell, f64::INFINITY);
            self.block_sink_edges(cell);
        }
    }

    /// Make ports that bend sharply against lines already ending here more expensive.
    pub fn add_line_bend_penalty(&mut self, cell: CellId) {
        let routed: Vec<Direction> = self
            .cell(cell)
            .routings()
            .iter()
            .map(|r| r.direction)
            .collect();
        if routed.is_empty() {
            return;
        }

        for port in PORTS {
            let Some(edge) = self.cell(cell).sink_edge(port) else {
                continue;
            };
            if !self.edge(edge).is_open() {
                continue;
            }
            let penalty: f64 = routed
                .iter()
                .filter(|&&r| r != port)
                .map(|&r| bend_cost(port.octi_angle(r)))
                .sum();
            let e = self.edge_mut(edge);
            let weight = e.weight() + penalty;
            e.set_weight(weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::input_graph::{EdgeId, InputGraph, StationId};
    use crate::octi::{COST_45, COST_90, COST_135, COST_SINK, Direction, OctiGraph, PORTS};

    /// Hub with `spokes` neighbours evenly spread clockwise from north.
    fn star(spokes: usize) -> (InputGraph, StationId, Vec<EdgeId>) {
        let mut graph = InputGraph::new();
        let hub = graph.add_station("hub", "Hub", 50.0, 8.0);
        let mut edges = Vec::new();
        for i in 0..spokes {
            let angle = (i as f64) * std::f64::consts::TAU / spokes as f64;
            let s = graph.add_station(
                &format!("s{}", i),
                "Spoke",
                50.0 + 0.01 * angle.cos(),
                8.0 + 0.015 * angle.sin(),
            );
            edges.push(graph.add_edge(hub, s, vec![format!("L{}", i)], "").unwrap());
        }
        graph.merge_equal_edges();
        graph.calculate_edge_ordering_at_node();
        (graph, hub, edges)
    }

    fn open_ports(graph: &OctiGraph, cell: crate::octi::CellId) -> Vec<Direction> {
        PORTS
            .into_iter()
            .filter(|&p| graph.edge(graph.cell(cell).sink_edge(p).unwrap()).is_open())
            .collect()
    }

    #[test]
    fn sink_closing_and_reopening() {
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);

        graph.block_sink_edges(cell);
        assert!(!graph.has_open_sink(cell));
        graph.reopen_sink_edges(cell);
        assert!(graph.has_open_sink(cell));

        graph.close_sink_edges(cell);
        graph.reopen_sink_edges(cell);
        assert!(!graph.has_open_sink(cell), "closed sinks are permanent");
    }

    #[test]
    fn bend_edges_take_penalty_then_reopen() {
        let mut graph = OctiGraph::new(1, 1);
        let cell = graph.cell_id(0, 0);

        graph.close_bend_edges(cell, 9.0);
        for &e in graph.cell(cell).bend_edges() {
            assert_eq!(graph.edge(e).weight(), 9.0);
        }
        graph.reopen_bend_edges(cell);
        for &e in graph.cell(cell).bend_edges() {
            assert!(graph.edge(e).weight() <= COST_45);
        }

        graph.close_bend_edges(cell, f64::INFINITY);
        graph.reopen_bend_edges(cell);
        for &e in graph.cell(cell).bend_edges() {
            assert!(graph.edge(e).is_used());
        }
    }

    #[test]
    fn circular_ordering_is_noop_for_low_degree() {
        let (input, hub, edges) = star(2);
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);
        graph.save_routing(cell, StationId(1), Direction::Top, edges[0]);

        graph.block_for_circular_ordering(cell, input.station(hub).unwrap(), edges[1]);
        assert_eq!(open_ports(&graph, cell).len(), 8);
    }

    #[test]
    fn circular_ordering_is_noop_before_first_routing() {
        let (input, hub, edges) = star(4);
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);

        graph.block_for_circular_ordering(cell, input.station(hub).unwrap(), edges[2]);
        assert_eq!(open_ports(&graph, cell).len(), 8);
    }

    #[test]
    fn circular_ordering_reserves_room_for_skipped_edges() {
        // Four spokes N, E, S, W. Only N is routed (upwards); routing S must leave
        // one port free on each side for E and W.
        let (input, hub, edges) = star(4);
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);
        graph.save_routing(cell, StationId(1), Direction::Top, edges[0]);

        graph.block_for_circular_ordering(cell, input.station(hub).unwrap(), edges[2]);

        let open = open_ports(&graph, cell);
        assert_eq!(
            open,
            vec![
                Direction::Right,
                Direction::BottomRight,
                Direction::Bottom,
                Direction::BottomLeft,
                Direction::Left
            ]
        );
    }

    #[test]
    fn circular_ordering_stays_between_routed_neighbours() {
        // N routed up, S routed down: E must land strictly on the right half.
        let (input, hub, edges) = star(4);
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);
        graph.save_routing(cell, StationId(1), Direction::Top, edges[0]);
        graph.save_routing(cell, StationId(3), Direction::Bottom, edges[2]);

        graph.block_for_circular_ordering(cell, input.station(hub).unwrap(), edges[1]);

        let open = open_ports(&graph, cell);
        assert_eq!(
            open,
            vec![Direction::TopRight, Direction::Right, Direction::BottomRight]
        );
        for port in open {
            let from_top = Direction::Top.clockwise_steps(port);
            assert!(from_top > 0 && from_top < 4, "{:?} outside the arc", port);
        }

        graph.reopen_sink_edges(cell);
        graph.block_for_circular_ordering(cell, input.station(hub).unwrap(), edges[3]);
        assert_eq!(
            open_ports(&graph, cell),
            vec![Direction::BottomLeft, Direction::Left, Direction::TopLeft]
        );
    }

    #[test]
    fn circular_ordering_arc_width_follows_neighbours() {
        let (input, hub, edges) = star(3);
        let station = input.station(hub).unwrap();
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);

        // The third spoke sits clockwise between spoke 1 and spoke 0.
        graph.save_routing(cell, StationId(1), Direction::Top, edges[0]);
        graph.save_routing(cell, StationId(2), Direction::TopRight, edges[1]);
        graph.block_for_circular_ordering(cell, station, edges[2]);
        assert_eq!(open_ports(&graph, cell).len(), 6);

        // With its neighbours on adjacent ports there is no room left at all.
        let mut graph = OctiGraph::new(3, 3);
        graph.save_routing(cell, StationId(1), Direction::TopRight, edges[0]);
        graph.save_routing(cell, StationId(2), Direction::Top, edges[1]);
        graph.block_for_circular_ordering(cell, station, edges[2]);
        assert!(open_ports(&graph, cell).is_empty());
    }

    #[test]
    fn bend_penalty_prefers_straight_continuation() {
        let mut graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);
        let top = graph.cell(cell).sink_edge(Direction::Top).unwrap();
        graph.edge_mut(top).mark_used();
        graph.save_routing(cell, StationId(1), Direction::Top, EdgeId(0));

        graph.add_line_bend_penalty(cell);

        let weight = |g: &OctiGraph, d: Direction| g.edge(g.cell(cell).sink_edge(d).unwrap()).weight();
        assert_eq!(weight(&graph, Direction::Bottom), COST_SINK);
        assert_eq!(weight(&graph, Direction::BottomRight), COST_SINK + COST_135);
        assert_eq!(weight(&graph, Direction::Right), COST_SINK + COST_90);
        assert_eq!(weight(&graph, Direction::TopLeft), COST_SINK + COST_45);
        assert!(weight(&graph, Direction::Top).is_infinite());
    }
}
