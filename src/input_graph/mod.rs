// ===========================================================================
// Input Graph (stations + merged line edges, consumed by the router)
// ===========================================================================
pub mod coord_conversion;
pub mod format;
mod preprocessing;

use crate::errors::InputGraphError;
use ahash::AHashMap;
use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// Progress marker used by the edge ordering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStatus {
    Unprocessed,
    Dangling,
    Processed,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Web Mercator metres with y pointing south (screen orientation).
    pub pos: Coord<f64>,
    pub line_degree: usize,
    pub status: StationStatus,
    pub adjacent: BTreeSet<StationId>,
    /// Incident edges in clockwise order around the station. Treated as cyclic.
    pub edge_ordering: Vec<EdgeId>,
}

impl Station {
    pub fn degree(&self) -> usize {
        self.adjacent.len()
    }

    /// Position of `edge` within the circular ordering, if it is incident.
    pub fn ordering_index(&self, edge: EdgeId) -> Option<usize> {
        self.edge_ordering.iter().position(|&e| e == edge)
    }
}

#[derive(Debug, Clone)]
pub struct InputEdge {
    pub id: EdgeId,
    pub station1: StationId,
    pub station2: StationId,
    pub lines: Vec<String>,
    pub color: String,
    /// Stations absorbed by degree-2 contraction, ordered from `station1` to `station2`.
    pub intermediate_stations: Vec<StationId>,
}

impl InputEdge {
    pub fn other(&self, station: StationId) -> StationId {
        if self.station1 == station {
            self.station2
        } else {
            self.station1
        }
    }

    pub fn touches(&self, station: StationId) -> bool {
        self.station1 == station || self.station2 == station
    }

    /// Unordered station pair, smaller id first.
    pub fn key(&self) -> (StationId, StationId) {
        pair_key(self.station1, self.station2)
    }
}

// Edges are equal when they join the same two stations, in either orientation.
impl PartialEq for InputEdge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for InputEdge {}

pub(crate) fn pair_key(a: StationId, b: StationId) -> (StationId, StationId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Default)]
pub struct InputGraph {
    stations: BTreeMap<StationId, Station>,
    edges: BTreeMap<EdgeId, InputEdge>,
    /// Stations removed by contraction or isolation, kept for output annotation.
    retired: BTreeMap<StationId, Station>,
    pair_index: AHashMap<(StationId, StationId), EdgeId>,
    next_station_id: usize,
    next_edge_id: usize,
}

impl InputGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_station(&mut self, stop_id: &str, name: &str, lat: f64, lon: f64) -> StationId {
        let id = StationId(self.next_station_id);
        self.next_station_id += 1;

        self.stations.insert(
            id,
            Station {
                id,
                stop_id: stop_id.to_string(),
                name: name.to_string(),
                lat,
                lon,
                pos: coord_conversion::lat_lng_to_screen(lon, lat),
                line_degree: 0,
                status: StationStatus::Unprocessed,
                adjacent: BTreeSet::new(),
                edge_ordering: Vec::new(),
            },
        );
        id
    }

    pub fn add_edge(
        &mut self,
        station1: StationId,
        station2: StationId,
        lines: Vec<String>,
        color: &str,
    ) -> Result<EdgeId, InputGraphError> {
        let edge_index = self.next_edge_id;
        for s in [station1, station2] {
            if !self.stations.contains_key(&s) {
                return Err(InputGraphError::UnknownStation {
                    edge_index,
                    stop_id: format!("#{}", s.0),
                });
            }
        }
        if station1 == station2 {
            return Err(InputGraphError::SelfLoop {
                edge_index,
                stop_id: self.stations[&station1].stop_id.clone(),
            });
        }
        if lines.is_empty() {
            return Err(InputGraphError::NoLines {
                edge_index,
                from: self.stations[&station1].stop_id.clone(),
                to: self.stations[&station2].stop_id.clone(),
            });
        }

        let id = EdgeId(edge_index);
        self.next_edge_id += 1;
        self.edges.insert(
            id,
            InputEdge {
                id,
                station1,
                station2,
                lines,
                color: color.to_string(),
                intermediate_stations: Vec::new(),
            },
        );
        Ok(id)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.stations.get_mut(&id)
    }

    /// Looks up live stations as well as ones removed during preprocessing.
    pub fn station_record(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id).or_else(|| self.retired.get(&id))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&InputEdge> {
        self.edges.get(&id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &InputEdge> {
        self.edges.values()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The edge joining `a` and `b`. Only meaningful once parallel edges are merged.
    pub fn edge_between(&self, a: StationId, b: StationId) -> Option<EdgeId> {
        self.pair_index.get(&pair_key(a, b)).copied()
    }

    pub fn incident_edges(&self, station: StationId) -> Vec<EdgeId> {
        match self.stations.get(&station) {
            Some(s) => s
                .adjacent
                .iter()
                .filter_map(|&n| self.edge_between(station, n))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop lines rejected by `keep`. Edges left without lines are removed.
    /// Returns the number of removed edges.
    pub fn retain_lines(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let mut emptied = Vec::new();
        for (id, edge) in self.edges.iter_mut() {
            edge.lines.retain(|l| keep(l));
            if edge.lines.is_empty() {
                emptied.push(*id);
            }
        }
        for id in &emptied {
            self.edges.remove(id);
        }
        self.rebuild_adjacency();
        emptied.len()
    }

    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        let points: Vec<Point<f64>> = self.stations.values().map(|s| Point(s.pos)).collect();
        MultiPoint::from(points).bounding_rect()
    }

    /// Mean straight-line distance between the endpoints of every edge.
    pub fn average_adjacent_distance(&self) -> Option<f64> {
        let lengths: Vec<f64> = self
            .edges
            .values()
            .filter_map(|e| {
                let a = self.stations.get(&e.station1)?;
                let b = self.stations.get(&e.station2)?;
                Some(distance(a.pos, b.pos))
            })
            .collect();

        if lengths.is_empty() {
            return None;
        }
        Some(lengths.iter().sum::<f64>() / lengths.len() as f64)
    }

    fn rebuild_adjacency(&mut self) {
        for station in self.stations.values_mut() {
            station.adjacent.clear();
        }
        self.pair_index.clear();

        for edge in self.edges.values() {
            self.pair_index.entry(edge.key()).or_insert(edge.id);
            if let Some(s) = self.stations.get_mut(&edge.station1) {
                s.adjacent.insert(edge.station2);
            }
            if let Some(s) = self.stations.get_mut(&edge.station2) {
                s.adjacent.insert(edge.station1);
            }
        }
    }
}

pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
