use super::{InputGraph, StationId};
use crate::errors::InputGraphError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableStation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableEdge {
    pub from: String,
    pub to: String,
    pub lines: Vec<String>,
    #[serde(default)]
    pub color: String,
    /// Stop ids already folded into this edge upstream, ordered from `from` to `to`.
    #[serde(default)]
    pub intermediate_stations: Vec<String>,
}

/// On-disk shape of the network handed over by feed ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputFile {
    pub stations: Vec<SerializableStation>,
    pub edges: Vec<SerializableEdge>,
}

impl InputGraph {
    pub fn from_file_format(file: &InputFile) -> Result<Self, InputGraphError> {
        let mut graph = InputGraph::new();
        let mut by_stop_id: AHashMap<&str, StationId> = AHashMap::new();

        for station in &file.stations {
            if !station.lat.is_finite() || !station.lon.is_finite() {
                return Err(InputGraphError::InvalidCoordinate {
                    stop_id: station.id.clone(),
                    lat: station.lat,
                    lon: station.lon,
                });
            }
            if by_stop_id.contains_key(station.id.as_str()) {
                return Err(InputGraphError::DuplicateStation {
                    stop_id: station.id.clone(),
                });
            }
            let id = graph.add_station(&station.id, &station.name, station.lat, station.lon);
            by_stop_id.insert(station.id.as_str(), id);
        }

        let lookup = |edge_index: usize, stop_id: &str| {
            by_stop_id
                .get(stop_id)
                .copied()
                .ok_or_else(|| InputGraphError::UnknownStation {
                    edge_index,
                    stop_id: stop_id.to_string(),
                })
        };

        for (edge_index, edge) in file.edges.iter().enumerate() {
            let from = lookup(edge_index, &edge.from)?;
            let to = lookup(edge_index, &edge.to)?;
            let intermediates = edge
                .intermediate_stations
                .iter()
                .map(|s| lookup(edge_index, s))
                .collect::<Result<Vec<_>, _>>()?;

            let id = graph.add_edge(from, to, edge.lines.clone(), &edge.color)?;
            if let Some(added) = graph.edges.get_mut(&id) {
                added.intermediate_stations = intermediates;
            }
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "stations": [
            { "id": "of-markt", "name": "Offenbach Marktplatz", "lat": 50.1044, "lon": 8.7641 },
            { "id": "of-ledermuseum", "name": "Ledermuseum", "lat": 50.1034, "lon": 8.7562 },
            { "id": "of-ost", "name": "Offenbach Ost", "lat": 50.1001, "lon": 8.7798 }
        ],
        "edges": [
            { "from": "of-ledermuseum", "to": "of-markt", "lines": ["S1", "S2"], "color": "#408335" },
            { "from": "of-markt", "to": "of-ost", "lines": ["S1"] }
        ]
    }"##;

    #[test]
    fn parses_sample_network() {
        let file: InputFile = serde_json::from_str(SAMPLE).expect("sample should parse");
        let graph = InputGraph::from_file_format(&file).expect("sample should validate");

        assert_eq!(graph.station_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let first = graph.edges().next().unwrap();
        assert_eq!(first.lines, vec!["S1".to_string(), "S2".to_string()]);
        assert_eq!(first.color, "#408335");
    }

    #[test]
    fn rejects_unknown_and_duplicate_stations() {
        let mut file: InputFile = serde_json::from_str(SAMPLE).unwrap();
        file.edges[1].to = "of-hbf".to_string();
        assert_eq!(
            InputGraph::from_file_format(&file).unwrap_err(),
            InputGraphError::UnknownStation {
                edge_index: 1,
                stop_id: "of-hbf".to_string()
            }
        );

        let mut file: InputFile = serde_json::from_str(SAMPLE).unwrap();
        file.stations.push(file.stations[0].clone());
        assert!(matches!(
            InputGraph::from_file_format(&file),
            Err(InputGraphError::DuplicateStation { .. })
        ));

        let mut file: InputFile = serde_json::from_str(SAMPLE).unwrap();
        file.stations[2].lat = f64::NAN;
        assert!(matches!(
            InputGraph::from_file_format(&file),
            Err(InputGraphError::InvalidCoordinate { .. })
        ));
    }
}
