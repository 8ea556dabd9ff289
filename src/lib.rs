// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Octilinear schematic layout of transit networks.
//!
//! Stations with real-world coordinates and the line segments between them are
//! routed one input edge at a time onto a discrete grid whose edges run only at
//! multiples of 45 degrees. The circular order of lines around every station is
//! preserved and bends are penalised.

pub mod config;
pub mod errors;
pub mod input_graph;
pub mod octi;
pub mod pathfinder;
pub mod router;

pub use config::{LineDegreePolicy, LineFilter, RoutingConfig};
pub use errors::{InputGraphError, RoutingError};
pub use input_graph::{EdgeId, InputEdge, InputGraph, Station, StationId, StationStatus};
pub use octi::{Direction, OctiGraph};
pub use router::{OctiLayout, OctiRouter};
