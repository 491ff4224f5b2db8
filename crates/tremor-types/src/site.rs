// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Sites and Site-Response Parameters
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HazardError, HazardResult};
use crate::geo::Point;

/// Site-response parameters a ground-motion model may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteParam {
    Vs30,
    Z1pt0,
    Z2pt5,
}

impl fmt::Display for SiteParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteParam::Vs30 => write!(f, "vs30"),
            SiteParam::Z1pt0 => write!(f, "z1pt0"),
            SiteParam::Z2pt5 => write!(f, "z2pt5"),
        }
    }
}

/// A hazard site: location plus site-response parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: u32,
    pub location: Point,
    /// Time-averaged shear-wave velocity of the top 30 m (m/s).
    pub vs30: f64,
    #[serde(default)]
    pub vs30_measured: bool,
    /// Depth to the 1.0 km/s velocity horizon (m).
    #[serde(default)]
    pub z1pt0: Option<f64>,
    /// Depth to the 2.5 km/s velocity horizon (km).
    #[serde(default)]
    pub z2pt5: Option<f64>,
}

impl Site {
    pub fn new(id: u32, lon: f64, lat: f64, vs30: f64) -> Self {
        Self {
            id,
            location: Point::surface(lon, lat),
            vs30,
            vs30_measured: false,
            z1pt0: None,
            z2pt5: None,
        }
    }

    pub fn param(&self, param: SiteParam) -> Option<f64> {
        match param {
            SiteParam::Vs30 => Some(self.vs30),
            SiteParam::Z1pt0 => self.z1pt0,
            SiteParam::Z2pt5 => self.z2pt5,
        }
    }

    pub fn has_param(&self, param: SiteParam) -> bool {
        self.param(param).is_some_and(|v| v.is_finite())
    }

    pub fn validate(&self) -> HazardResult<()> {
        if !self.location.is_valid() {
            return Err(HazardError::config(format!(
                "site {} has an invalid location {:?}",
                self.id, self.location
            )));
        }
        if !(self.vs30.is_finite() && self.vs30 > 0.0) {
            return Err(HazardError::config(format!(
                "site {} vs30 must be > 0, got {}",
                self.id, self.vs30
            )));
        }
        for (name, value) in [("z1pt0", self.z1pt0), ("z2pt5", self.z2pt5)] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(HazardError::config(format!(
                        "site {} {name} must be >= 0, got {v}",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Validate a site collection: non-empty, unique ids, valid members.
pub fn validate_sites(sites: &[Site]) -> HazardResult<()> {
    if sites.is_empty() {
        return Err(HazardError::config("no sites given"));
    }
    let mut ids: Vec<u32> = sites.iter().map(|s| s.id).collect();
    ids.sort_unstable();
    if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(HazardError::config(format!("duplicate site id {}", w[0])));
    }
    sites.iter().try_for_each(Site::validate)
}
