use super::{EdgeId, InputGraph, StationId, pair_key};
use crate::config::LineDegreePolicy;
use ahash::{AHashMap, AHashSet};
use log::{debug, info};
use ordered_float::OrderedFloat;

/// Clockwise angle in degrees, [0, 360), of the vector `from -> to` against the fixed
/// up reference. Inputs are in screen orientation (y grows southward).
pub(crate) fn ordering_angle(from: geo::Coord<f64>, to: geo::Coord<f64>) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let reference = 0f64.atan2(1.0);
    (-dy.atan2(dx) + reference).to_degrees().rem_euclid(360.0)
}

impl InputGraph {
    /// Full preprocessing pipeline, in the order the router expects.
    pub fn preprocess(&mut self, policy: LineDegreePolicy) {
        let merged = self.merge_equal_edges();
        self.calculate_node_line_degrees(policy);
        self.calculate_edge_ordering_at_node();
        let contracted = self.remove_two_degree_nodes();
        let isolated = self.remove_nodes_without_edges();

        info!(
            "Preprocessed input graph: merged {} parallel edges, contracted {} degree-2 stations, dropped {} isolated stations ({} stations, {} edges left)",
            merged,
            contracted,
            isolated,
            self.station_count(),
            self.edge_count()
        );
    }

    /// Collapse edges joining the same station pair into the first-seen one.
    /// Returns the number of edges that were folded away.
    pub fn merge_equal_edges(&mut self) -> usize {
        let mut survivors: AHashMap<(StationId, StationId), EdgeId> = AHashMap::new();
        let mut folded: Vec<(EdgeId, EdgeId)> = Vec::new();

        for edge in self.edges.values() {
            match survivors.get(&edge.key()) {
                Some(&keep) => folded.push((edge.id, keep)),
                None => {
                    survivors.insert(edge.key(), edge.id);
                }
            }
        }

        for &(gone, keep) in &folded {
            let Some(removed) = self.edges.remove(&gone) else {
                continue;
            };
            if let Some(target) = self.edges.get_mut(&keep) {
                target.lines.extend(removed.lines);
            }
        }

        self.rebuild_adjacency();
        folded.len()
    }

    pub fn calculate_node_line_degrees(&mut self, policy: LineDegreePolicy) {
        for station in self.stations.values_mut() {
            station.line_degree = 0;
        }

        match policy {
            LineDegreePolicy::PerEdge => {
                for edge in self.edges.values() {
                    for s in [edge.station1, edge.station2] {
                        if let Some(station) = self.stations.get_mut(&s) {
                            station.line_degree += edge.lines.len();
                        }
                    }
                }
            }
            LineDegreePolicy::DistinctLines => {
                let mut seen: AHashMap<StationId, AHashSet<&str>> = AHashMap::new();
                for edge in self.edges.values() {
                    for s in [edge.station1, edge.station2] {
                        let set = seen.entry(s).or_default();
                        set.extend(edge.lines.iter().map(String::as_str));
                    }
                }
                for (s, set) in seen {
                    if let Some(station) = self.stations.get_mut(&s) {
                        station.line_degree = set.len();
                    }
                }
            }
        }
    }

    /// Sort every station's incident edges clockwise by the direction of the
    /// neighbouring endpoint.
    pub fn calculate_edge_ordering_at_node(&mut self) {
        self.rebuild_adjacency();

        let ids: Vec<StationId> = self.stations.keys().copied().collect();
        for id in ids {
            let station = &self.stations[&id];
            let origin = station.pos;

            let mut ordering: Vec<(f64, EdgeId)> = station
                .adjacent
                .iter()
                .filter_map(|&n| {
                    let edge = self.edge_between(id, n)?;
                    let other = self.stations.get(&n)?;
                    Some((ordering_angle(origin, other.pos), edge))
                })
                .collect();

            // With a single neighbour there is nothing to order.
            if ordering.len() > 1 {
                ordering.sort_by_key(|&(angle, edge)| (std::cmp::Reverse(OrderedFloat(angle)), edge));
            }

            if let Some(station) = self.stations.get_mut(&id) {
                station.edge_ordering = ordering.into_iter().map(|(_, e)| e).collect();
            }
        }
    }

    /// Contract every station with exactly two neighbours into a single edge joining
    /// those neighbours. Returns the number of contracted stations.
    ///
    /// A station whose two neighbours are already joined by an edge (a triangle) is
    /// kept, so degree-2 stations can survive preprocessing. Callers must not assume
    /// every remaining station has a degree other than two.
    pub fn remove_two_degree_nodes(&mut self) -> usize {
        let mut contracted = 0;
        let ids: Vec<StationId> = self.stations.keys().copied().collect();

        for s in ids {
            let Some(station) = self.stations.get(&s) else {
                continue;
            };
            if station.adjacent.len() != 2 {
                continue;
            }
            let mut neighbours = station.adjacent.iter().copied();
            let (Some(a), Some(b)) = (neighbours.next(), neighbours.next()) else {
                continue;
            };

            // Contracting would create a second edge between a and b.
            if self.edge_between(a, b).is_some() {
                continue;
            }
            let (Some(e1), Some(e2)) = (self.edge_between(s, a), self.edge_between(s, b)) else {
                continue;
            };
            let Some(second) = self.edges.remove(&e2) else {
                continue;
            };
            let Some(first) = self.edges.get_mut(&e1) else {
                continue;
            };

            // Orient both halves as a -> s -> b before stitching the intermediates.
            let mut intermediates = first.intermediate_stations.clone();
            if first.station1 != a {
                intermediates.reverse();
            }
            intermediates.push(s);
            let mut tail = second.intermediate_stations.clone();
            if second.station1 != s {
                tail.reverse();
            }
            intermediates.extend(tail);

            first.station1 = a;
            first.station2 = b;
            first.intermediate_stations = intermediates;
            for line in second.lines {
                if !first.lines.contains(&line) {
                    first.lines.push(line);
                }
            }

            self.pair_index.remove(&pair_key(s, a));
            self.pair_index.remove(&pair_key(s, b));
            self.pair_index.insert(pair_key(a, b), e1);

            if let Some(na) = self.stations.get_mut(&a) {
                na.adjacent.remove(&s);
                na.adjacent.insert(b);
            }
            if let Some(nb) = self.stations.get_mut(&b) {
                nb.adjacent.remove(&s);
                nb.adjacent.insert(a);
                for slot in nb.edge_ordering.iter_mut() {
                    if *slot == e2 {
                        *slot = e1;
                    }
                }
            }
            if let Some(mut gone) = self.stations.remove(&s) {
                gone.adjacent.clear();
                gone.edge_ordering.clear();
                self.retired.insert(s, gone);
            }

            debug!("Contracted degree-2 station {:?} into edge {:?}", s, e1);
            contracted += 1;
        }

        contracted
    }

    pub fn remove_nodes_without_edges(&mut self) -> usize {
        let isolated: Vec<StationId> = self
            .stations
            .values()
            .filter(|s| s.adjacent.is_empty())
            .map(|s| s.id)
            .collect();

        for id in &isolated {
            if let Some(station) = self.stations.remove(id) {
                self.retired.insert(*id, station);
            }
        }
        isolated.len()
    }
}
