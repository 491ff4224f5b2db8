// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Source-Model Uncertainties
// ─────────────────────────────────────────────────────────────────────
//! Epistemic modifications applied to a base source model by the
//! levels of the source-model logic tree below the first.

use serde::{Deserialize, Serialize};

use tremor_source::SeismicSource;
use tremor_types::{HazardError, HazardResult};

use crate::branch::BranchSet;

/// One alternative value of an MFD parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceUncertainty {
    /// Replace the maximum magnitude.
    MaxMagAbsolute { value: f64 },
    /// Add to the maximum magnitude.
    MaxMagIncrement { delta: f64 },
    /// Add to the Gutenberg-Richter b value.
    BGrRelative { delta: f64 },
    /// Replace the Gutenberg-Richter a and b values.
    AbGrAbsolute { a: f64, b: f64 },
}

impl SourceUncertainty {
    /// Apply to one source. Sources without an MFD are left untouched.
    pub fn apply(&self, source: &mut SeismicSource) -> HazardResult<()> {
        let id = source.id.clone();
        let Some(mfd) = source.mfd_mut() else {
            log::debug!("source '{id}' has no MFD, skipping {self:?}");
            return Ok(());
        };
        let applied = match *self {
            SourceUncertainty::MaxMagAbsolute { value } => mfd.set_max_mag(value),
            SourceUncertainty::MaxMagIncrement { delta } => mfd.increment_max_mag(delta),
            SourceUncertainty::BGrRelative { delta } => mfd.increment_b(delta),
            SourceUncertainty::AbGrAbsolute { a, b } => mfd.set_ab(a, b),
        };
        applied.map_err(|e| match e {
            HazardError::Configuration(msg) => {
                HazardError::Configuration(format!("source '{id}': {msg}"))
            }
            other => other,
        })
    }
}

/// Which sources of a model an uncertainty level applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "apply_to", content = "ids", rename_all = "snake_case")]
pub enum ApplyTo {
    #[default]
    All,
    Sources(Vec<String>),
    Trts(Vec<String>),
}

impl ApplyTo {
    pub fn matches(&self, source: &SeismicSource) -> bool {
        match self {
            ApplyTo::All => true,
            ApplyTo::Sources(ids) => ids.iter().any(|id| *id == source.id),
            ApplyTo::Trts(trts) => trts.iter().any(|t| *t == source.trt),
        }
    }
}

/// A level of the source-model tree below the base models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyLevel {
    #[serde(default)]
    pub filter: ApplyTo,
    pub branch_set: BranchSet<SourceUncertainty>,
}

impl UncertaintyLevel {
    pub fn new(branch_set: BranchSet<SourceUncertainty>) -> Self {
        Self {
            filter: ApplyTo::All,
            branch_set,
        }
    }

    pub fn with_filter(mut self, filter: ApplyTo) -> Self {
        self.filter = filter;
        self
    }

    /// Apply branch `index` to every matching source.
    pub fn apply(&self, index: usize, sources: &mut [SeismicSource]) -> HazardResult<()> {
        let branch = self.branch_set.get(index).ok_or_else(|| {
            HazardError::config(format!(
                "branch index {index} out of range for '{}'",
                self.branch_set.id
            ))
        })?;
        for source in sources.iter_mut().filter(|s| self.filter.matches(s)) {
            branch.value.apply(source)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::Branch;
    use tremor_source::{Mfd, PointSource, SourceKind};
    use tremor_types::Point;

    fn source(id: &str, trt: &str, mfd: Mfd) -> SeismicSource {
        let json = format!(
            r#"{{
                "location": {{"lon": 0.0, "lat": 0.0}},
                "upper_seismogenic_depth": 0.0,
                "lower_seismogenic_depth": 20.0,
                "nodal_planes": [[1.0, {{"strike": 0.0, "dip": 90.0, "rake": 0.0}}]],
                "hypocentral_depths": [[1.0, 10.0]],
                "mfd": {},
                "rupture_aspect_ratio": 1.0
            }}"#,
            serde_json::to_string(&mfd).unwrap()
        );
        let point: PointSource = serde_json::from_str(&json).unwrap();
        assert_eq!(point.location, Point::surface(0.0, 0.0));
        SeismicSource::new(id, trt, SourceKind::Point(point))
    }

    fn gr() -> Mfd {
        Mfd::TruncatedGr {
            a_val: 4.0,
            b_val: 1.0,
            min_mag: 5.0,
            max_mag: 7.0,
        }
    }

    #[test]
    fn test_filtered_application() {
        let level = UncertaintyLevel::new(BranchSet::new(
            "mmax",
            vec![Branch::new("up", 1.0, SourceUncertainty::MaxMagIncrement { delta: 0.5 })],
        ))
        .with_filter(ApplyTo::Trts(vec!["Stable Continental".into()]));
        let mut sources = vec![
            source("a", "Active Shallow Crust", gr()),
            source("b", "Stable Continental", gr()),
        ];
        level.apply(0, &mut sources).unwrap();
        assert_eq!(sources[0].mfd(), Some(&gr()));
        assert!(matches!(
            sources[1].mfd(),
            Some(Mfd::TruncatedGr { max_mag, .. }) if (*max_mag - 7.5).abs() < 1e-12
        ));
    }

    #[test]
    fn test_ab_absolute() {
        let mut src = source("a", "Active Shallow Crust", gr());
        SourceUncertainty::AbGrAbsolute { a: 3.5, b: 0.9 }.apply(&mut src).unwrap();
        assert!(matches!(
            src.mfd(),
            Some(Mfd::TruncatedGr { a_val, b_val, .. }) if *a_val == 3.5 && *b_val == 0.9
        ));
    }

    #[test]
    fn test_incompatible_mfd_names_source() {
        let discrete = Mfd::EvenlyDiscretized {
            min_mag: 6.0,
            bin_width: 0.1,
            occurrence_rates: vec![0.01],
        };
        let mut src = source("evenly", "Active Shallow Crust", discrete);
        let err = SourceUncertainty::BGrRelative { delta: 0.1 }.apply(&mut src).unwrap_err();
        assert!(matches!(err, HazardError::Configuration(ref m) if m.contains("evenly")));
    }

    #[test]
    fn test_max_mag_below_min_is_rejected() {
        let mut src = source("a", "Active Shallow Crust", gr());
        assert!(SourceUncertainty::MaxMagAbsolute { value: 4.0 }.apply(&mut src).is_err());
    }
}
