use thiserror::Error;

/// Rejections raised while turning an input file into an [`crate::InputGraph`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputGraphError {
    #[error("Station '{stop_id}' is defined more than once")]
    DuplicateStation { stop_id: String },
    #[error("Station '{stop_id}' has a non-finite coordinate ({lat}, {lon})")]
    InvalidCoordinate { stop_id: String, lat: f64, lon: f64 },
    #[error("Edge #{edge_index} references unknown station '{stop_id}'")]
    UnknownStation { edge_index: usize, stop_id: String },
    #[error("Edge #{edge_index} starts and ends at station '{stop_id}'")]
    SelfLoop { edge_index: usize, stop_id: String },
    #[error("Edge #{edge_index} between '{from}' and '{to}' carries no lines")]
    NoLines {
        edge_index: usize,
        from: String,
        to: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("No octilinear path between '{from}' and '{to}' (lines: {lines:?})")]
    UnroutableEdge {
        from: String,
        to: String,
        lines: Vec<String>,
    },
    #[error("Input graph has no edges left to route")]
    EmptyGraph,
}
