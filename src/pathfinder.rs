// ===========================================================================
// Set-to-set shortest path over the octi grid
// ===========================================================================
use crate::octi::{COST_HOP, CellId, OctiEdgeId, OctiGraph, OctiNodeId};
use ahash::AHashSet;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Copy, Clone, Eq, PartialEq)]
struct QueueEntry {
    priority: OrderedFloat<f64>,
    node: usize,
}

// Flipped so the max-heap pops the lowest priority first; ties go to the lower id.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Minimum-cost route from the sink of one source cell to the sink of one target cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<OctiNodeId>,
    pub cost: f64,
}

impl Path {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first_cell(&self, graph: &OctiGraph) -> Option<CellId> {
        self.nodes.first().map(|&n| graph.node(n).cell)
    }

    pub fn last_cell(&self, graph: &OctiGraph) -> Option<CellId> {
        self.nodes.last().map(|&n| graph.node(n).cell)
    }

    /// Octi edges between consecutive nodes, in path order.
    pub fn edges(&self, graph: &OctiGraph) -> Vec<OctiEdgeId> {
        self.nodes
            .windows(2)
            .filter_map(|pair| graph.get_edge(pair[0], pair[1]))
            .collect()
    }
}

/// Reusable search state. Scratch tables are sized once per grid and only the
/// entries a search touched are cleared afterwards.
pub struct Pathfinder {
    dist: Vec<f64>,
    prev: Vec<Option<OctiNodeId>>,
    settled: Vec<bool>,
    touched: Vec<usize>,
}

impl Pathfinder {
    pub fn new(graph: &OctiGraph) -> Self {
        let n = graph.node_count();
        Self {
            dist: vec![f64::INFINITY; n],
            prev: vec![None; n],
            settled: vec![false; n],
            touched: Vec::new(),
        }
    }

    /// Search from every sink in `from` at once (a virtual source joined to each of
    /// them at zero cost) towards the sinks in `to`. `None` when no target is reachable.
    pub fn set_to_set(&mut self, graph: &OctiGraph, from: &[CellId], to: &[CellId]) -> Option<Path> {
        if from.is_empty() || to.is_empty() {
            return None;
        }
        if self.dist.len() != graph.node_count() {
            *self = Self::new(graph);
        }

        let result = self.search(graph, from, to);
        self.reset();
        result
    }

    fn search(&mut self, graph: &OctiGraph, from: &[CellId], to: &[CellId]) -> Option<Path> {
        let targets: AHashSet<usize> = to.iter().map(|&c| graph.cell(c).sink().0).collect();
        let target_positions: Vec<(i64, i64)> = to
            .iter()
            .map(|&c| {
                let cell = graph.cell(c);
                (cell.x as i64, cell.y as i64)
            })
            .collect();

        // One hop costs at least COST_HOP, and Chebyshev distance bounds the hop count.
        let heuristic = |node: usize| -> f64 {
            let (x, y) = graph.node_position(OctiNodeId(node));
            let (x, y) = (x as i64, y as i64);
            let hops = target_positions
                .iter()
                .map(|&(tx, ty)| (tx - x).abs().max((ty - y).abs()))
                .min()
                .unwrap_or(0);
            COST_HOP * (hops - 1).max(0) as f64
        };

        let mut heap = BinaryHeap::new();
        for &cell in from {
            let sink = graph.cell(cell).sink().0;
            if self.dist[sink] > 0.0 {
                self.touch(sink);
                self.dist[sink] = 0.0;
                self.prev[sink] = None;
                heap.push(QueueEntry {
                    priority: OrderedFloat(heuristic(sink)),
                    node: sink,
                });
            }
        }

        let mut best: Option<(f64, usize)> = None;
        let mut found = 0;

        while let Some(QueueEntry { priority, node: u }) = heap.pop() {
            if self.settled[u] {
                continue;
            }
            self.settled[u] = true;
            let du = self.dist[u];

            // Priorities are lower bounds, nothing left can beat the best target.
            if let Some((best_cost, _)) = best {
                if priority.0 >= best_cost {
                    break;
                }
            }
            if !du.is_finite() {
                break;
            }

            if targets.contains(&u) {
                found += 1;
                if best.is_none_or(|(c, _)| du < c) {
                    best = Some((du, u));
                }
                if found == targets.len() {
                    break;
                }
                continue;
            }

            for &edge_id in &graph.node(OctiNodeId(u)).edges {
                let edge = graph.edge(edge_id);
                let weight = edge.weight();
                if !weight.is_finite() {
                    continue;
                }
                let v = edge.other(OctiNodeId(u)).0;
                if self.settled[v] {
                    continue;
                }
                let candidate = du + weight;
                if candidate < self.dist[v] {
                    if !self.dist[v].is_finite() {
                        self.touch(v);
                    }
                    self.dist[v] = candidate;
                    self.prev[v] = Some(OctiNodeId(u));
                    heap.push(QueueEntry {
                        priority: OrderedFloat(candidate + heuristic(v)),
                        node: v,
                    });
                }
            }
        }

        let (cost, target) = best?;
        let mut nodes = vec![OctiNodeId(target)];
        let mut cursor = self.prev[target];
        while let Some(node) = cursor {
            nodes.push(node);
            cursor = self.prev[node.0];
        }
        nodes.reverse();

        Some(Path { nodes, cost })
    }

    fn touch(&mut self, node: usize) {
        self.touched.push(node);
    }

    fn reset(&mut self) {
        for node in self.touched.drain(..) {
            self.dist[node] = f64::INFINITY;
            self.prev[node] = None;
            self.settled[node] = false;
        }
    }
}

/// One-shot convenience wrapper around [`Pathfinder::set_to_set`].
pub fn set_to_set(graph: &OctiGraph, from: &[CellId], to: &[CellId]) -> Option<Path> {
    Pathfinder::new(graph).set_to_set(graph, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octi::{COST_HOP, COST_SINK, Direction};

    #[test]
    fn same_cell_is_a_zero_cost_single_node_path() {
        let graph = OctiGraph::new(3, 3);
        let cell = graph.cell_id(1, 1);

        let path = set_to_set(&graph, &[cell], &[cell]).expect("trivially connected");
        assert_eq!(path.nodes, vec![graph.cell(cell).sink()]);
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn straight_path_passes_through_for_free() {
        let graph = OctiGraph::new(3, 3);
        let from = graph.cell_id(0, 1);
        let to = graph.cell_id(2, 1);

        let path = set_to_set(&graph, &[from], &[to]).unwrap();

        assert_eq!(path.cost, 2.0 * COST_SINK + 2.0 * COST_HOP);
        let directions: Vec<Direction> = path.nodes.iter().map(|&n| graph.node(n).direction).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Sink,
                Direction::Right,
                Direction::Left,
                Direction::Right,
                Direction::Left,
                Direction::Sink
            ]
        );
        assert_eq!(path.first_cell(&graph), Some(from));
        assert_eq!(path.last_cell(&graph), Some(to));
        assert_eq!(path.edges(&graph).len(), 5);
    }

    #[test]
    fn picks_the_cheapest_of_several_targets() {
        let graph = OctiGraph::new(6, 1);
        let from = graph.cell_id(0, 0);
        let near = graph.cell_id(2, 0);
        let far = graph.cell_id(5, 0);

        let path = set_to_set(&graph, &[from], &[far, near]).unwrap();
        assert_eq!(path.last_cell(&graph), Some(near));
    }

    #[test]
    fn multiple_sources_start_from_the_nearest() {
        let graph = OctiGraph::new(6, 1);
        let to = graph.cell_id(5, 0);
        let sources = [graph.cell_id(0, 0), graph.cell_id(4, 0)];

        let path = set_to_set(&graph, &sources, &[to]).unwrap();
        assert_eq!(path.first_cell(&graph), Some(sources[1]));
        assert_eq!(path.cost, 2.0 * COST_SINK + COST_HOP);
    }

    #[test]
    fn closed_target_is_unreachable() {
        let mut graph = OctiGraph::new(3, 3);
        let from = graph.cell_id(0, 0);
        let to = graph.cell_id(2, 2);
        graph.block_sink_edges(to);

        assert_eq!(set_to_set(&graph, &[from], &[to]), None);
        assert_eq!(set_to_set(&graph, &[], &[to]), None);
    }

    #[test]
    fn repeated_searches_agree_on_cost() {
        let graph = OctiGraph::new(8, 8);
        let mut finder = Pathfinder::new(&graph);
        let from = [graph.cell_id(1, 6), graph.cell_id(2, 6)];
        let to = [graph.cell_id(6, 1), graph.cell_id(7, 2)];

        let first = finder.set_to_set(&graph, &from, &to).unwrap();
        let second = finder.set_to_set(&graph, &from, &to).unwrap();
        assert_eq!(first.cost, second.cost);
        assert!(finder.touched.is_empty());
        assert!(finder.dist.iter().all(|d| d.is_infinite()));
    }
}
