// ===========================================================================
// Orchestrator: routes every input edge onto the octi grid, one at a time
// ===========================================================================
mod layout;
mod ordering;
mod projection;


pub use layout::{CellLayout, CellRouting, OctiLayout, PathStep, RoutedPath, UnroutedEdge, path_steps};
pub use ordering::order_edges;
pub use projection::GridProjection;

use crate::config::RoutingConfig;
use crate::errors::RoutingError;
use crate::input_graph::{EdgeId, InputGraph, StationId};
use crate::octi::{CellId, OctiGraph};
use crate::pathfinder::{Path, Pathfinder};
use ahash::{AHashMap, AHashSet};
use geo::Coord;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;

/// Everything one routing pass produced. The grid carries the station bindings
/// and routed-edge records, `paths` the node sequence of every routed input edge.
pub struct RoutingRun {
    pub input: InputGraph,
    pub grid: OctiGraph,
    pub projection: GridProjection,
    pub order: Vec<EdgeId>,
    pub paths: Vec<(EdgeId, Path)>,
    pub unrouted: Vec<EdgeId>,
    pub settled: AHashMap<StationId, CellId>,
}

impl RoutingRun {
    pub fn settled_cell(&self, station: StationId) -> Option<CellId> {
        self.settled.get(&station).copied()
    }

    pub fn path_for(&self, edge: EdgeId) -> Option<&Path> {
        self.paths.iter().find(|(id, _)| *id == edge).map(|(_, p)| p)
    }
}

struct Candidates {
    from: Vec<CellId>,
    to: Vec<CellId>,
    /// Cells whose sink edges carry a temporary move penalty.
    penalised: Vec<CellId>,
}

pub struct OctiRouter {
    config: RoutingConfig,
}

impl OctiRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Preprocess `input` and route all of its edges.
    ///
    /// In strict mode the first edge without a path aborts the run; otherwise it
    /// is logged and listed in [`RoutingRun::unrouted`].
    pub fn route(&self, mut input: InputGraph) -> Result<RoutingRun, RoutingError> {
        input.preprocess(self.config.line_degree_policy);
        if input.edge_count() == 0 {
            return Err(RoutingError::EmptyGraph);
        }

        let radius = self.config.radius();
        let padding = radius.ceil() as usize + 1;
        let projection = GridProjection::for_graph(&input, self.config.scale_factor, padding)
            .ok_or(RoutingError::EmptyGraph)?;
        let mut grid = OctiGraph::new(projection.width, projection.height);
        let mut pathfinder = Pathfinder::new(&grid);

        info!(
            "Routing {} edges between {} stations on a {}x{} grid (cell size {:.1}, radius {:.2})",
            input.edge_count(),
            input.station_count(),
            projection.width,
            projection.height,
            projection.scale,
            radius
        );

        let order = order_edges(&mut input);
        let mut settled: AHashMap<StationId, CellId> = AHashMap::new();
        let mut paths = Vec::with_capacity(order.len());
        let mut unrouted = Vec::new();

        for &edge_id in &order {
            let Some(edge) = input.edge(edge_id) else {
                continue;
            };
            let (s1, s2) = (edge.station1, edge.station2);

            let candidates = self.candidates(&input, &mut grid, &projection, &settled, edge_id, radius);
            let found = pathfinder.set_to_set(&grid, &candidates.from, &candidates.to);

            for &cell in &candidates.penalised {
                grid.reopen_sink_edges(cell);
            }

            let path = match found {
                Some(path) if path.len() >= 2 => path,
                _ => {
                    for station in [s1, s2] {
                        if let Some(&cell) = settled.get(&station) {
                            grid.block_sink_edges(cell);
                        }
                    }

                    let stop = |s: StationId| {
                        input
                            .station(s)
                            .map(|st| st.stop_id.clone())
                            .unwrap_or_default()
                    };
                    let (from, to) = (stop(s1), stop(s2));
                    if self.config.strict {
                        return Err(RoutingError::UnroutableEdge {
                            from,
                            to,
                            lines: edge.lines.clone(),
                        });
                    }
                    warn!("No path for edge {} -> {} ({:?}), skipping", from, to, edge.lines);
                    unrouted.push(edge_id);
                    continue;
                }
            };

            let (Some(start), Some(end)) = (path.first_cell(&grid), path.last_cell(&grid)) else {
                continue;
            };
            for (station, cell) in [(s1, start), (s2, end)] {
                settled.entry(station).or_insert(cell);
                grid.cell_mut(cell).bind_station(station);
            }

            let n = path.nodes.len();
            let start_dir = grid.node(path.nodes[1]).direction;
            let end_dir = grid.node(path.nodes[n - 2]).direction;
            grid.save_routing(start, s2, start_dir, edge_id);
            grid.save_routing(end, s1, end_dir, edge_id);
            grid.commit_path(&path.nodes, self.config.allow_crossing);

            debug!(
                "Routed edge {:?}: {} nodes, cost {:.2}, leaves via {:?}, arrives via {:?}",
                edge_id, n, path.cost, start_dir, end_dir
            );
            paths.push((edge_id, path));
        }

        info!(
            "Routed {} of {} edges, {} unrouted",
            paths.len(),
            order.len(),
            unrouted.len()
        );

        Ok(RoutingRun {
            input,
            grid,
            projection,
            order,
            paths,
            unrouted,
            settled,
        })
    }

    /// Pick the candidate cells of both endpoints of `edge` and install the
    /// temporary weights the search should see.
    fn candidates(
        &self,
        input: &InputGraph,
        grid: &mut OctiGraph,
        projection: &GridProjection,
        settled: &AHashMap<StationId, CellId>,
        edge_id: EdgeId,
        radius: f64,
    ) -> Candidates {
        let mut out = Candidates {
            from: Vec::new(),
            to: Vec::new(),
            penalised: Vec::new(),
        };
        let Some(edge) = input.edge(edge_id) else {
            return out;
        };
        let (s1, s2) = (edge.station1, edge.station2);

        for (station, slot) in [(s1, &mut out.from), (s2, &mut out.to)] {
            if let Some(&cell) = settled.get(&station) {
                grid.reopen_sink_edges(cell);
                if let Some(st) = input.station(station) {
                    grid.block_for_circular_ordering(cell, st, edge_id);
                }
                grid.add_line_bend_penalty(cell);
                slot.push(cell);
            }
        }

        let grid_pos = |s: StationId| input.station(s).map(|st| projection.project(st.pos));
        let open1 = if settled.contains_key(&s1) { None } else { grid_pos(s1) };
        let open2 = if settled.contains_key(&s2) { None } else { grid_pos(s2) };

        let mut assigned: Vec<(CellId, bool, f64)> = Vec::new();
        let mut seen: AHashSet<CellId> = AHashSet::new();
        for center in [open1, open2].into_iter().flatten() {
            for cell in window(grid, center, radius) {
                if !seen.insert(cell) {
                    continue;
                }
                let c = grid.cell(cell);
                if c.station().is_some() || !grid.has_open_sink(cell) {
                    continue;
                }
                let here = cell_coord(grid, cell);
                let d1 = open1.map(|p| cell_distance(here, p));
                let d2 = open2.map(|p| cell_distance(here, p));

                let assigned_to = match (d1, d2) {
                    (Some(a), Some(b)) if a <= radius || b <= radius => {
                        if a <= b { Some((true, a)) } else { Some((false, b)) }
                    }
                    (Some(a), None) if a <= radius => Some((true, a)),
                    (None, Some(b)) if b <= radius => Some((false, b)),
                    _ => None,
                };
                if let Some((first, distance)) = assigned_to {
                    assigned.push((cell, first, distance));
                }
            }
        }

        if let (Some(p1), Some(p2)) = (open1, open2) {
            rebalance(grid, &mut assigned, p1, p2);
        }

        let move_penalty = self.config.move_penalty_per_cell();
        for (cell, first, distance) in assigned {
            grid.add_sink_penalty(cell, move_penalty * distance);
            out.penalised.push(cell);
            if first {
                out.from.push(cell);
            } else {
                out.to.push(cell);
            }
        }

        debug!(
            "Edge {:?}: {} source and {} target candidates",
            edge_id,
            out.from.len(),
            out.to.len()
        );
        out
    }
}

fn cell_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

fn cell_coord(grid: &OctiGraph, cell: CellId) -> Coord<f64> {
    let c = grid.cell(cell);
    Coord {
        x: c.x as f64,
        y: c.y as f64,
    }
}

/// Two unsettled endpoints at (nearly) the same position tie on every cell and
/// the first one wins them all. Hand the starved endpoint its nearest cell.
fn rebalance(grid: &OctiGraph, assigned: &mut [(CellId, bool, f64)], p1: Coord<f64>, p2: Coord<f64>) {
    let firsts = assigned.iter().filter(|(_, first, _)| *first).count();
    let (starved_first, target) = match (firsts, assigned.len() - firsts) {
        (0, n) if n >= 2 => (true, p1),
        (n, 0) if n >= 2 => (false, p2),
        _ => return,
    };

    let nearest = assigned
        .iter_mut()
        .min_by_key(|slot| OrderedFloat(cell_distance(cell_coord(grid, slot.0), target)));
    if let Some(slot) = nearest {
        slot.2 = cell_distance(cell_coord(grid, slot.0), target);
        slot.1 = starved_first;
    }
}

/// Grid cells in the square of half-width `radius + 1` around `center`.
fn window(grid: &OctiGraph, center: Coord<f64>, radius: f64) -> Vec<CellId> {
    let reach = radius + 1.0;
    let max_x = grid.width() as i64 - 1;
    let max_y = grid.height() as i64 - 1;
    let x0 = ((center.x - reach).floor() as i64).max(0);
    let x1 = ((center.x + reach).ceil() as i64).min(max_x);
    let y0 = ((center.y - reach).floor() as i64).max(0);
    let y1 = ((center.y + reach).ceil() as i64).min(max_y);

    let mut cells = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if grid.has_node(x, y) {
                cells.push(grid.cell_id(x as usize, y as usize));
            }
        }
    }
    cells
}
