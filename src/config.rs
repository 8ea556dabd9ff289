use ahash::AHashSet;
use serde::{Deserialize, Serialize};

pub const MIN_SEARCH_RADIUS: f64 = 1.0;
pub const MAX_SEARCH_RADIUS: f64 = 5.0;

/// How a station's `line_degree` is accumulated from its incident edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineDegreePolicy {
    /// Every incident edge contributes its full line count.
    #[default]
    PerEdge,
    /// Each line id counts once per station, whether it passes through or terminates.
    DistinctLines,
}

/// Whitelist/blacklist over line ids. An empty whitelist admits every line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl LineFilter {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Build a reusable predicate. The blacklist wins over the whitelist.
    pub fn predicate(&self) -> impl Fn(&str) -> bool + '_ {
        let include: AHashSet<&str> = self.include.iter().map(String::as_str).collect();
        let exclude: AHashSet<&str> = self.exclude.iter().map(String::as_str).collect();

        move |line: &str| {
            if exclude.contains(line) {
                return false;
            }
            include.is_empty() || include.contains(line)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Normalised slider position in [0, 1], mapped onto the search radius range.
    pub radius_slider: f64,
    /// Explicit search radius in grid cells. Overrides `radius_slider`.
    pub search_radius: Option<f64>,
    /// Diagonal crossings are priced at `COST_CROSSING` when true, forbidden otherwise.
    pub allow_crossing: bool,
    /// Abort the whole run on the first unroutable edge.
    pub strict: bool,
    /// Cost per grid unit between a candidate cell and the projected station position.
    pub move_penalty: f64,
    /// Grid cell size as a multiple of the average adjacent station distance.
    pub scale_factor: f64,
    pub line_degree_policy: LineDegreePolicy,
    pub line_filter: LineFilter,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            radius_slider: 0.5,
            search_radius: None,
            allow_crossing: true,
            strict: false,
            move_penalty: 0.5,
            scale_factor: 0.75,
            line_degree_policy: LineDegreePolicy::PerEdge,
            line_filter: LineFilter::default(),
        }
    }
}

impl RoutingConfig {
    pub fn radius(&self) -> f64 {
        match self.search_radius {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => {
                let t = self.radius_slider.clamp(0.0, 1.0);
                MIN_SEARCH_RADIUS + t * (MAX_SEARCH_RADIUS - MIN_SEARCH_RADIUS)
            }
        }
    }

    /// `move_penalty` as applied to sink edges. Negative or non-finite values
    /// count as zero so edge weights never drop below zero.
    pub fn move_penalty_per_cell(&self) -> f64 {
        if self.move_penalty.is_finite() {
            self.move_penalty.max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_maps_onto_radius_range() {
        let mut config = RoutingConfig::default();
        assert_eq!(config.radius(), 3.0);

        config.radius_slider = 0.0;
        assert_eq!(config.radius(), MIN_SEARCH_RADIUS);

        config.radius_slider = 7.0;
        assert_eq!(config.radius(), MAX_SEARCH_RADIUS, "slider is clamped");

        config.search_radius = Some(2.25);
        assert_eq!(config.radius(), 2.25);
    }

    #[test]
    fn move_penalty_is_never_negative() {
        let mut config = RoutingConfig::default();
        assert_eq!(config.move_penalty_per_cell(), 0.5);

        config.move_penalty = -3.0;
        assert_eq!(config.move_penalty_per_cell(), 0.0);

        config.move_penalty = f64::NAN;
        assert_eq!(config.move_penalty_per_cell(), 0.0);

        let parsed: RoutingConfig = serde_json::from_str(r#"{ "move_penalty": -1.5 }"#).unwrap();
        assert_eq!(parsed.move_penalty_per_cell(), 0.0, "config files cannot lower sink weights");
    }

    #[test]
    fn blacklist_beats_whitelist() {
        let filter = LineFilter {
            include: vec!["U1".to_string(), "U2".to_string()],
            exclude: vec!["U2".to_string()],
        };
        let keep = filter.predicate();

        assert!(keep("U1"));
        assert!(!keep("U2"));
        assert!(!keep("S8"), "lines outside a non-empty whitelist are dropped");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RoutingConfig =
            serde_json::from_str(r#"{ "allow_crossing": false, "line_degree_policy": "distinct_lines" }"#)
                .expect("config should parse");

        assert!(!config.allow_crossing);
        assert_eq!(config.line_degree_policy, LineDegreePolicy::DistinctLines);
        assert_eq!(config.scale_factor, 0.75);
        assert!(config.line_filter.is_empty());
    }
}
