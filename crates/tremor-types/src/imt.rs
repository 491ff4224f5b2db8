// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Intensity Measure Types
// ─────────────────────────────────────────────────────────────────────
//! Intensity measure types (PGA, PGV, SA(T)) and the IMT → levels table
//! every curve is computed on.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HazardError, HazardResult};

/// Intensity measure type. Accelerations are in g, PGV in cm/s.
///
/// Serialized as its canonical string form (`"PGA"`, `"SA(0.2)"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Imt {
    Pga,
    Pgv,
    /// Pseudo-spectral acceleration at `period` seconds, 5% damping.
    Sa(f64),
}

impl Imt {
    /// Spectral period; PGA is the zero-period ordinate, PGV has none.
    pub fn period(&self) -> Option<f64> {
        match self {
            Imt::Pga => Some(0.0),
            Imt::Sa(t) => Some(*t),
            Imt::Pgv => None,
        }
    }

    /// Whether the IMT belongs on a uniform hazard spectrum.
    pub fn is_spectral(&self) -> bool {
        self.period().is_some()
    }

    fn sort_key(&self) -> (u8, f64) {
        match self {
            Imt::Pga => (0, 0.0),
            Imt::Sa(t) => (1, *t),
            Imt::Pgv => (2, 0.0),
        }
    }
}

impl PartialEq for Imt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Imt {}

impl PartialOrd for Imt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Imt {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ka, pa) = self.sort_key();
        let (kb, pb) = other.sort_key();
        ka.cmp(&kb).then_with(|| pa.total_cmp(&pb))
    }
}

impl Hash for Imt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (k, p) = self.sort_key();
        k.hash(state);
        p.to_bits().hash(state);
    }
}

impl fmt::Display for Imt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imt::Pga => write!(f, "PGA"),
            Imt::Pgv => write!(f, "PGV"),
            Imt::Sa(t) if t.fract() == 0.0 => write!(f, "SA({t:.1})"),
            Imt::Sa(t) => write!(f, "SA({t})"),
        }
    }
}

impl FromStr for Imt {
    type Err = HazardError;

    fn from_str(s: &str) -> HazardResult<Self> {
        let s = s.trim();
        match s {
            "PGA" => return Ok(Imt::Pga),
            "PGV" => return Ok(Imt::Pgv),
            _ => {}
        }
        let inner = s
            .strip_prefix("SA(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| HazardError::config(format!("unknown IMT '{s}'")))?;
        let period: f64 = inner
            .trim()
            .parse()
            .map_err(|e| HazardError::config(format!("bad SA period in '{s}': {e}")))?;
        if !(period.is_finite() && period > 0.0) {
            return Err(HazardError::config(format!(
                "SA period must be > 0, got {period}"
            )));
        }
        Ok(Imt::Sa(period))
    }
}

impl TryFrom<String> for Imt {
    type Error = HazardError;

    fn try_from(s: String) -> HazardResult<Self> {
        s.parse()
    }
}

impl From<Imt> for String {
    fn from(imt: Imt) -> String {
        imt.to_string()
    }
}

/// Ordered IMT → intensity levels table.
///
/// Levels for each IMT are strictly increasing and positive. The flat
/// index of (imt, level) pairs defines the layout of every rate map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImtLevels {
    entries: Vec<(Imt, Vec<f64>)>,
}

impl ImtLevels {
    pub fn new(entries: Vec<(Imt, Vec<f64>)>) -> HazardResult<Self> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> HazardResult<()> {
        if self.entries.is_empty() {
            return Err(HazardError::config("at least one IMT is required"));
        }
        for (i, (imt, levels)) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|(other, _)| other == imt) {
                return Err(HazardError::config(format!("duplicate IMT {imt}")));
            }
            if levels.is_empty() {
                return Err(HazardError::config(format!("IMT {imt} has no levels")));
            }
            if levels.iter().any(|&l| !(l.is_finite() && l > 0.0)) {
                return Err(HazardError::config(format!(
                    "IMT {imt} levels must be finite and > 0"
                )));
            }
            if levels.windows(2).any(|w| w[1] <= w[0]) {
                return Err(HazardError::config(format!(
                    "IMT {imt} levels must be strictly increasing"
                )));
            }
        }
        Ok(())
    }

    pub fn imts(&self) -> impl Iterator<Item = Imt> + '_ {
        self.entries.iter().map(|(imt, _)| *imt)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Imt, &[f64])> + '_ {
        self.entries.iter().map(|(imt, l)| (*imt, l.as_slice()))
    }

    pub fn num_imts(&self) -> usize {
        self.entries.len()
    }

    pub fn levels(&self, imt: Imt) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(i, _)| *i == imt)
            .map(|(_, l)| l.as_slice())
    }

    pub fn levels_at(&self, imt_index: usize) -> &[f64] {
        &self.entries[imt_index].1
    }

    pub fn imt_at(&self, imt_index: usize) -> Imt {
        self.entries[imt_index].0
    }

    pub fn position(&self, imt: Imt) -> Option<usize> {
        self.entries.iter().position(|(i, _)| *i == imt)
    }

    /// Total number of (imt, level) slots.
    pub fn total_levels(&self) -> usize {
        self.entries.iter().map(|(_, l)| l.len()).sum()
    }

    /// Offset of the first level of `imt_index` in the flat layout.
    pub fn offset(&self, imt_index: usize) -> usize {
        self.entries[..imt_index].iter().map(|(_, l)| l.len()).sum()
    }
}
