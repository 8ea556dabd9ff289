use super::RoutingRun;
use crate::input_graph::{EdgeId, InputEdge};
use crate::input_graph::coord_conversion::screen_to_lat_lng;
use crate::octi::{Direction, OctiGraph};
use crate::pathfinder::Path;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CellRouting {
    pub edge: EdgeId,
    pub direction: Direction,
    pub other_station: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellLayout {
    pub x: usize,
    pub y: usize,
    pub station: Option<String>,
    pub routings: Vec<CellRouting>,
}

/// One grid cell of a drawn path, with the ports used to enter and leave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub x: usize,
    pub y: usize,
    pub entry: Option<Direction>,
    pub exit: Option<Direction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutedPath {
    pub edge: EdgeId,
    pub from: String,
    pub to: String,
    pub lines: Vec<String>,
    pub color: String,
    pub intermediate_stations: Vec<String>,
    pub cost: f64,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnroutedEdge {
    pub edge: EdgeId,
    pub from: String,
    pub to: String,
    pub lines: Vec<String>,
}

/// Renderer-facing result of a routing run.
#[derive(Debug, Clone, Serialize)]
pub struct OctiLayout {
    pub width: usize,
    pub height: usize,
    pub scale: f64,
    /// (longitude, latitude) of grid cell (0, 0).
    pub origin: [f64; 2],
    pub cells: Vec<CellLayout>,
    pub paths: Vec<RoutedPath>,
    pub unrouted: Vec<UnroutedEdge>,
}

/// Collapse a node path into one step per visited cell.
pub fn path_steps(graph: &OctiGraph, path: &Path) -> Vec<PathStep> {
    let mut groups: Vec<(usize, usize, Vec<Direction>)> = Vec::new();
    for &node in &path.nodes {
        let (x, y) = graph.node_position(node);
        let direction = graph.node(node).direction;
        match groups.last_mut() {
            Some((gx, gy, dirs)) if *gx == x && *gy == y => dirs.push(direction),
            _ => groups.push((x, y, vec![direction])),
        }
    }

    let last = groups.len().saturating_sub(1);
    groups
        .into_iter()
        .enumerate()
        .map(|(i, (x, y, dirs))| PathStep {
            x,
            y,
            entry: if i > 0 { dirs.first().copied() } else { None },
            exit: if i < last { dirs.last().copied() } else { None },
        })
        .collect()
}

impl RoutingRun {
    fn stop_id(&self, station: crate::input_graph::StationId) -> String {
        self.input
            .station_record(station)
            .map(|s| s.stop_id.clone())
            .unwrap_or_else(|| format!("#{}", station.0))
    }

    fn edge_record(&self, id: EdgeId) -> Option<&InputEdge> {
        self.input.edge(id)
    }

    pub fn layout(&self) -> OctiLayout {
        let cells = self
            .grid
            .cells()
            .filter(|c| c.station().is_some() || !c.routings().is_empty())
            .map(|c| CellLayout {
                x: c.x,
                y: c.y,
                station: c.station().map(|s| self.stop_id(s)),
                routings: c
                    .routings()
                    .iter()
                    .map(|r| CellRouting {
                        edge: r.edge,
                        direction: r.direction,
                        other_station: self.stop_id(r.other_station),
                    })
                    .collect(),
            })
            .collect();

        let paths = self
            .paths
            .iter()
            .filter_map(|(id, path)| {
                let edge = self.edge_record(*id)?;
                Some(RoutedPath {
                    edge: *id,
                    from: self.stop_id(edge.station1),
                    to: self.stop_id(edge.station2),
                    lines: edge.lines.clone(),
                    color: edge.color.clone(),
                    intermediate_stations: edge
                        .intermediate_stations
                        .iter()
                        .map(|&s| self.stop_id(s))
                        .collect(),
                    cost: path.cost,
                    steps: path_steps(&self.grid, path),
                })
            })
            .collect();

        let unrouted = self
            .unrouted
            .iter()
            .filter_map(|id| {
                let edge = self.edge_record(*id)?;
                Some(UnroutedEdge {
                    edge: *id,
                    from: self.stop_id(edge.station1),
                    to: self.stop_id(edge.station2),
                    lines: edge.lines.clone(),
                })
            })
            .collect();

        let (lon, lat) = screen_to_lat_lng(self.projection.origin);
        OctiLayout {
            width: self.grid.width(),
            height: self.grid.height(),
            scale: self.projection.scale,
            origin: [lon, lat],
            cells,
            paths,
            unrouted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinder::set_to_set;

    #[test]
    fn steps_carry_entry_and_exit_ports() {
        let graph = OctiGraph::new(3, 3);
        let path = set_to_set(&graph, &[graph.cell_id(0, 1)], &[graph.cell_id(2, 1)]).unwrap();

        let steps = path_steps(&graph, &path);
        assert_eq!(
            steps,
            vec![
                PathStep { x: 0, y: 1, entry: None, exit: Some(Direction::Right) },
                PathStep { x: 1, y: 1, entry: Some(Direction::Left), exit: Some(Direction::Right) },
                PathStep { x: 2, y: 1, entry: Some(Direction::Left), exit: None },
            ]
        );
    }

    #[test]
    fn single_cell_path_is_one_step() {
        let graph = OctiGraph::new(2, 2);
        let cell = graph.cell_id(1, 0);
        let path = set_to_set(&graph, &[cell], &[cell]).unwrap();

        assert_eq!(
            path_steps(&graph, &path),
            vec![PathStep { x: 1, y: 0, entry: None, exit: None }]
        );
    }
}
