// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Spherical Geodesy
// ─────────────────────────────────────────────────────────────────────
//! Spherical-earth geodesy used by rupture geometry and distance
//! metrics. Longitudes/latitudes in decimal degrees, distances and
//! depths in km (depth positive down).

use serde::{Deserialize, Serialize};

/// Mean earth radius (km).
pub const EARTH_RADIUS: f64 = 6371.0;

/// A geographic point with depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub depth: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Self { lon, lat, depth }
    }

    pub fn surface(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 0.0)
    }

    /// Great-circle distance ignoring depth.
    pub fn epicentral_distance(&self, other: &Point) -> f64 {
        geodetic_distance(self.lon, self.lat, other.lon, other.lat)
    }

    /// Straight-line distance including the depth difference.
    pub fn distance(&self, other: &Point) -> f64 {
        let h = self.epicentral_distance(other);
        let v = self.depth - other.depth;
        (h * h + v * v).sqrt()
    }

    /// Point reached by travelling `horizontal` km along `azimuth` and
    /// `vertical` km down.
    pub fn translate(&self, azimuth: f64, horizontal: f64, vertical: f64) -> Point {
        let (lon, lat) = point_at(self.lon, self.lat, azimuth, horizontal);
        Point::new(lon, lat, self.depth + vertical)
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.depth.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Haversine great-circle distance in km.
pub fn geodetic_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Initial azimuth (degrees clockwise from north) from point 1 to point 2.
pub fn azimuth(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Destination (lon, lat) after `distance` km along `azimuth` degrees.
pub fn point_at(lon: f64, lat: f64, azimuth: f64, distance: f64) -> (f64, f64) {
    let delta = distance / EARTH_RADIUS;
    let theta = azimuth.to_radians();
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
    let lon2 = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (lon2, lat2.to_degrees())
}

/// Equirectangular projection centred on a reference point.
///
/// Accurate enough for source-sized regions (a few hundred km); used to
/// grid polygons and to test point inclusion in surface projections.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    lon0: f64,
    lat0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    pub fn new(lon0: f64, lat0: f64) -> Self {
        Self {
            lon0,
            lat0,
            cos_lat0: lat0.to_radians().cos(),
        }
    }

    /// Centred on the arithmetic mean of the given points.
    pub fn centred_on(points: &[Point]) -> Self {
        let n = points.len().max(1) as f64;
        let lon0 = points.iter().map(|p| p.lon).sum::<f64>() / n;
        let lat0 = points.iter().map(|p| p.lat).sum::<f64>() / n;
        Self::new(lon0, lat0)
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon - self.lon0).to_radians() * self.cos_lat0 * EARTH_RADIUS;
        let y = (lat - self.lat0).to_radians() * EARTH_RADIUS;
        (x, y)
    }

    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = self.lat0 + (y / EARTH_RADIUS).to_degrees();
        let lon = self.lon0 + (x / (EARTH_RADIUS * self.cos_lat0)).to_degrees();
        (lon, lat)
    }
}

/// Even-odd ray casting on projected coordinates.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from (x, y) to the segment (a, b) on a plane.
pub fn distance_to_segment(x: f64, y: f64, a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((x - a.0) * dx + (y - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (px, py) = (a.0 + t * dx, a.1 + t * dy);
    ((x - px).powi(2) + (y - py).powi(2)).sqrt()
}
