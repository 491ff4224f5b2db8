// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Calculation Configuration
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curve::CurveKind;
use crate::error::{HazardError, HazardResult};
use crate::imt::{Imt, ImtLevels};
use crate::site::{validate_sites, Site};

/// A scalar parameter that may be overridden per tectonic region type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrtMap {
    pub default: f64,
    #[serde(default)]
    pub by_trt: BTreeMap<String, f64>,
}

impl TrtMap {
    pub fn uniform(default: f64) -> Self {
        Self {
            default,
            by_trt: BTreeMap::new(),
        }
    }

    pub fn with(mut self, trt: impl Into<String>, value: f64) -> Self {
        self.by_trt.insert(trt.into(), value);
        self
    }

    /// Value for `trt`, falling back to the default.
    pub fn get(&self, trt: &str) -> f64 {
        self.by_trt.get(trt).copied().unwrap_or(self.default)
    }

    /// Largest value over the default and all overrides.
    pub fn max(&self) -> f64 {
        self.by_trt.values().copied().fold(self.default, f64::max)
    }

    fn values(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        std::iter::once(("default", self.default))
            .chain(self.by_trt.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

/// Geometry and MFD discretization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretizationConfig {
    /// Fault and rupture mesh spacing (km).
    pub rupture_mesh_spacing: f64,
    /// Magnitude bin width for truncated Gutenberg-Richter MFDs.
    pub width_of_mfd_bin: f64,
    /// Grid step used to discretize area sources into points (km).
    pub area_source_discretization: f64,
}

impl Default for DiscretizationConfig {
    fn default() -> Self {
        Self {
            rupture_mesh_spacing: 5.0,
            width_of_mfd_bin: 0.1,
            area_source_discretization: 10.0,
        }
    }
}

/// Disaggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisaggConfig {
    pub mag_bin_width: f64,
    /// Joyner-Boore distance bin width (km).
    pub distance_bin_width: f64,
    pub num_epsilon_bins: usize,
    /// Bin contributions by the epsilon of the target level rather than
    /// by the epsilon of the exceeding ground motion.
    #[serde(default)]
    pub epsilon_star: bool,
    /// Poes at which target levels are found by inverting the curve.
    #[serde(default)]
    pub poes_disagg: Vec<f64>,
    /// Target levels given directly.
    #[serde(default)]
    pub iml_disagg: BTreeMap<Imt, f64>,
    /// Realization ordinals to disaggregate; empty means all.
    #[serde(default)]
    pub realizations: Vec<usize>,
    /// Also disaggregate the weighted-mean curve.
    #[serde(default)]
    pub mean: bool,
}

impl Default for DisaggConfig {
    fn default() -> Self {
        Self {
            mag_bin_width: 0.5,
            distance_bin_width: 10.0,
            num_epsilon_bins: 6,
            epsilon_star: false,
            poes_disagg: Vec::new(),
            iml_disagg: BTreeMap::new(),
            realizations: Vec::new(),
            mean: false,
        }
    }
}

/// Output toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Keep every realization's curves, not only the statistics.
    pub individual_curves: bool,
    pub mean: bool,
    pub quantiles: Vec<f64>,
    pub hazard_maps: bool,
    pub uniform_hazard_spectra: bool,
    /// Poes for hazard maps and uniform hazard spectra.
    pub poes: Vec<f64>,
    pub curve_kind: CurveKind,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            individual_curves: false,
            mean: true,
            quantiles: Vec::new(),
            hazard_maps: false,
            uniform_hazard_spectra: false,
            poes: Vec::new(),
            curve_kind: CurveKind::Probability,
        }
    }
}

/// Resolved configuration of one classical hazard calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationConfig {
    pub sites: Vec<Site>,
    pub imtls: ImtLevels,

    /// Ground-motion truncation in standard deviations.
    /// 0 means no truncation.
    pub truncation_level: f64,

    /// Investigation time (years).
    pub investigation_time: f64,

    /// Rupture-to-site cutoff (km, closest distance).
    pub maximum_distance: TrtMap,

    /// Ruptures below this magnitude are never generated.
    #[serde(default = "default_minimum_magnitude")]
    pub minimum_magnitude: TrtMap,

    #[serde(default)]
    pub discretization: DiscretizationConfig,

    /// 0 enumerates the full logic tree.
    #[serde(default)]
    pub number_of_logic_tree_samples: u32,

    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Upper bound on fully enumerated realizations.
    #[serde(default = "default_max_realizations")]
    pub max_realizations: u64,

    #[serde(default)]
    pub disagg: Option<DisaggConfig>,

    #[serde(default)]
    pub output: OutputConfig,

    /// Sites per parallel work unit.
    #[serde(default = "default_sites_per_group")]
    pub sites_per_group: usize,

    /// Abort on the first per-site failure instead of reporting it.
    #[serde(default)]
    pub strict: bool,
}

fn default_minimum_magnitude() -> TrtMap {
    TrtMap::uniform(0.0)
}

fn default_random_seed() -> u64 {
    42
}

fn default_max_realizations() -> u64 {
    10_000
}

fn default_sites_per_group() -> usize {
    64
}

impl CalculationConfig {
    /// Minimal configuration; every other field takes its default.
    pub fn new(sites: Vec<Site>, imtls: ImtLevels) -> Self {
        Self {
            sites,
            imtls,
            truncation_level: 3.0,
            investigation_time: 50.0,
            maximum_distance: TrtMap::uniform(200.0),
            minimum_magnitude: default_minimum_magnitude(),
            discretization: DiscretizationConfig::default(),
            number_of_logic_tree_samples: 0,
            random_seed: default_random_seed(),
            max_realizations: default_max_realizations(),
            disagg: None,
            output: OutputConfig::default(),
            sites_per_group: default_sites_per_group(),
            strict: false,
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> HazardResult<()> {
        validate_sites(&self.sites)?;
        self.imtls.validate()?;

        if !(self.truncation_level.is_finite() && self.truncation_level >= 0.0) {
            return Err(HazardError::Configuration(format!(
                "truncation_level must be >= 0, got {}",
                self.truncation_level
            )));
        }
        if !(self.investigation_time.is_finite() && self.investigation_time > 0.0) {
            return Err(HazardError::Configuration(format!(
                "investigation_time must be > 0, got {}",
                self.investigation_time
            )));
        }
        for (trt, d) in self.maximum_distance.values() {
            if !(d.is_finite() && d > 0.0) {
                return Err(HazardError::Configuration(format!(
                    "maximum_distance[{trt}] must be > 0, got {d}"
                )));
            }
        }
        for (trt, m) in self.minimum_magnitude.values() {
            if !(m.is_finite() && m >= 0.0) {
                return Err(HazardError::Configuration(format!(
                    "minimum_magnitude[{trt}] must be >= 0, got {m}"
                )));
            }
        }

        let disc = &self.discretization;
        for (name, v) in [
            ("rupture_mesh_spacing", disc.rupture_mesh_spacing),
            ("width_of_mfd_bin", disc.width_of_mfd_bin),
            ("area_source_discretization", disc.area_source_discretization),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HazardError::Configuration(format!(
                    "{name} must be > 0, got {v}"
                )));
            }
        }

        if self.max_realizations == 0 {
            return Err(HazardError::Configuration(
                "max_realizations must be >= 1".to_string(),
            ));
        }
        if self.sites_per_group == 0 {
            return Err(HazardError::Configuration(
                "sites_per_group must be >= 1".to_string(),
            ));
        }

        self.validate_output()?;
        if let Some(disagg) = &self.disagg {
            self.validate_disagg(disagg)?;
        }
        Ok(())
    }

    fn validate_output(&self) -> HazardResult<()> {
        let out = &self.output;
        if let Some(q) = out.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(HazardError::Configuration(format!(
                "quantiles must be in [0, 1], got {q}"
            )));
        }
        if let Some(p) = out.poes.iter().find(|p| !(**p > 0.0 && **p < 1.0)) {
            return Err(HazardError::Configuration(format!(
                "poes must be in (0, 1), got {p}"
            )));
        }
        if (out.hazard_maps || out.uniform_hazard_spectra) && out.poes.is_empty() {
            return Err(HazardError::Configuration(
                "hazard maps and uniform hazard spectra require poes".to_string(),
            ));
        }
        if out.uniform_hazard_spectra && !self.imtls.imts().any(|imt| imt.is_spectral()) {
            return Err(HazardError::Configuration(
                "uniform hazard spectra require PGA or SA intensity measure types".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_disagg(&self, disagg: &DisaggConfig) -> HazardResult<()> {
        if self.truncation_level == 0.0 {
            return Err(HazardError::Configuration(
                "disaggregation by epsilon requires a finite truncation_level > 0".to_string(),
            ));
        }
        for (name, v) in [
            ("mag_bin_width", disagg.mag_bin_width),
            ("distance_bin_width", disagg.distance_bin_width),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HazardError::Configuration(format!(
                    "{name} must be > 0, got {v}"
                )));
            }
        }
        if disagg.num_epsilon_bins == 0 {
            return Err(HazardError::Configuration(
                "num_epsilon_bins must be >= 1".to_string(),
            ));
        }
        if disagg.poes_disagg.is_empty() && disagg.iml_disagg.is_empty() {
            return Err(HazardError::Configuration(
                "disaggregation requires poes_disagg or iml_disagg".to_string(),
            ));
        }
        if let Some(p) = disagg.poes_disagg.iter().find(|p| !(**p > 0.0 && **p < 1.0)) {
            return Err(HazardError::Configuration(format!(
                "poes_disagg must be in (0, 1), got {p}"
            )));
        }
        for (imt, iml) in &disagg.iml_disagg {
            if self.imtls.position(*imt).is_none() {
                return Err(HazardError::Configuration(format!(
                    "iml_disagg refers to {imt}, which is not a calculated IMT"
                )));
            }
            if !(iml.is_finite() && *iml > 0.0) {
                return Err(HazardError::Configuration(format!(
                    "iml_disagg[{imt}] must be > 0, got {iml}"
                )));
            }
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> HazardResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HazardError::Configuration(format!("JSON parse error: {e}")))
    }
}
