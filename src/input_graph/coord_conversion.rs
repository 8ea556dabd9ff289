// ===========================================================================
// Station coordinates: WGS84 <-> screen-oriented Web Mercator
// ===========================================================================
use geo::Coord;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

pub const EARTH_RADIUS: f64 = 6378137.0;

/// Web Mercator metres for (longitude, latitude) in degrees.
pub fn lat_lng_to_web_merc(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

pub fn web_merc_to_lat_lng(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Mercator position with y pointing south, matching grid rows.
pub fn lat_lng_to_screen(lon: f64, lat: f64) -> Coord<f64> {
    let (x, y) = lat_lng_to_web_merc(lon, lat);
    Coord { x, y: -y }
}

/// (longitude, latitude) of a screen position.
pub fn screen_to_lat_lng(pos: Coord<f64>) -> (f64, f64) {
    web_merc_to_lat_lng(pos.x, -pos.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_position_round_trips_offenbach() {
        let pos = lat_lng_to_screen(8.7619, 50.1006);
        let (lon, lat) = screen_to_lat_lng(pos);

        assert!((lon - 8.7619).abs() < 1e-9);
        assert!((lat - 50.1006).abs() < 1e-9);
    }

    #[test]
    fn north_is_up_on_screen() {
        let south = lat_lng_to_screen(8.0, 49.0);
        let north = lat_lng_to_screen(8.0, 51.0);
        assert!(north.y < south.y, "screen y must shrink towards the north");
        assert!(lat_lng_to_screen(0.0, 0.0).x.abs() < 1e-9);
    }
}
