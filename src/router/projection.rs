use crate::input_graph::InputGraph;
use geo::Coord;

/// Maps screen-oriented station positions onto grid coordinates and back.
#[derive(Debug, Clone, Copy)]
pub struct GridProjection {
    /// Screen position of grid cell (0, 0).
    pub origin: Coord<f64>,
    /// Side length of one grid cell, in projected metres.
    pub scale: f64,
    pub width: usize,
    pub height: usize,
}

impl GridProjection {
    /// Size the grid so every station fits with `padding` spare cells on each side.
    ///
    /// The cell size is `scale_factor` times the mean distance between adjacent
    /// stations, so a typical input edge spans a little more than one cell.
    pub fn for_graph(graph: &InputGraph, scale_factor: f64, padding: usize) -> Option<Self> {
        let bbox = graph.bounding_box()?;
        let scale = graph
            .average_adjacent_distance()
            .map(|d| d * scale_factor)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(1.0);

        let min = bbox.min();
        let max = bbox.max();
        let span_x = ((max.x - min.x) / scale).ceil() as usize;
        let span_y = ((max.y - min.y) / scale).ceil() as usize;
        let pad = padding as f64 * scale;

        Some(Self {
            origin: Coord {
                x: min.x - pad,
                y: min.y - pad,
            },
            scale,
            width: span_x + 1 + 2 * padding,
            height: span_y + 1 + 2 * padding,
        })
    }

    /// Continuous grid position of a screen coordinate.
    pub fn project(&self, pos: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (pos.x - self.origin.x) / self.scale,
            y: (pos.y - self.origin.y) / self.scale,
        }
    }

    /// Screen coordinate of the centre of grid cell (x, y).
    pub fn unproject(&self, x: usize, y: usize) -> Coord<f64> {
        Coord {
            x: self.origin.x + x as f64 * self.scale,
            y: self.origin.y + y as f64 * self.scale,
        }
    }
}
