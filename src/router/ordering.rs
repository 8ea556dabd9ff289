use crate::input_graph::{EdgeId, InputGraph, StationId, StationStatus};
use ahash::AHashSet;
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::BTreeSet;

type DegreeKey = (Reverse<usize>, StationId);

fn degree_key(graph: &InputGraph, station: StationId) -> DegreeKey {
    let degree = graph.station(station).map(|s| s.line_degree).unwrap_or(0);
    (Reverse(degree), station)
}

fn set_status(graph: &mut InputGraph, station: StationId, status: StationStatus) {
    if let Some(s) = graph.station_mut(station) {
        s.status = status;
    }
}

fn status(graph: &InputGraph, station: StationId) -> StationStatus {
    graph
        .station(station)
        .map(|s| s.status)
        .unwrap_or(StationStatus::Processed)
}

/// Decide the order in which input edges are routed.
///
/// Starting from the station with the highest line degree, the highest-degree
/// dangling station is expanded repeatedly: all its edges are emitted, heavier
/// neighbours first, and its neighbours become dangling. When the frontier runs
/// dry the next unprocessed station (by line degree) seeds a new expansion.
pub fn order_edges(graph: &mut InputGraph) -> Vec<EdgeId> {
    let by_degree: Vec<StationId> = {
        let view: &InputGraph = graph;
        view.stations()
            .map(|s| s.id)
            .sorted_by_key(|&id| degree_key(view, id))
            .collect()
    };

    for &id in &by_degree {
        set_status(graph, id, StationStatus::Unprocessed);
    }

    let mut order = Vec::with_capacity(graph.edge_count());
    let mut placed: AHashSet<EdgeId> = AHashSet::new();

    for &start in &by_degree {
        if status(graph, start) != StationStatus::Unprocessed {
            continue;
        }
        set_status(graph, start, StationStatus::Dangling);
        let mut dangling: BTreeSet<DegreeKey> = BTreeSet::new();
        dangling.insert(degree_key(graph, start));

        while let Some((_, hub)) = dangling.pop_first() {
            if status(graph, hub) == StationStatus::Processed {
                continue;
            }

            let neighbours: Vec<StationId> = {
                let view: &InputGraph = graph;
                view.station(hub)
                    .map(|s| s.adjacent.iter().copied().collect::<Vec<_>>())
                    .unwrap_or_default()
                    .into_iter()
                    .sorted_by_key(|&n| degree_key(view, n))
                    .collect()
            };

            for n in neighbours {
                if let Some(edge) = graph.edge_between(hub, n) {
                    if placed.insert(edge) {
                        order.push(edge);
                    }
                }
                if status(graph, n) == StationStatus::Unprocessed {
                    set_status(graph, n, StationStatus::Dangling);
                    dangling.insert(degree_key(graph, n));
                }
            }

            set_status(graph, hub, StationStatus::Processed);
        }
    }

    order
}
