// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all hazard kernel failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HazardError {
    /// Malformed or inconsistent input (weights, geometry, site params,
    /// truncation/epsilon mismatch). Raised before computation starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A quantity is undefined for this site/IMT (disaggregation target
    /// outside the curve domain, zero total rate, non-finite prediction).
    #[error("numerical domain error: {0}")]
    NumericalDomain(String),

    /// Full logic-tree enumeration would exceed the realization bound.
    #[error(
        "resource exhaustion: full enumeration yields {realizations} realizations \
         (limit {limit}); use logic-tree sampling instead"
    )]
    ResourceExhaustion { realizations: u128, limit: u64 },

    /// Remaining work units were aborted by the caller.
    #[error("calculation cancelled")]
    Cancelled,
}

impl HazardError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Self::NumericalDomain(msg.into())
    }

    /// True for errors that are scoped to one site/IMT and may be
    /// reported without aborting the whole calculation.
    pub fn is_site_local(&self) -> bool {
        matches!(self, Self::NumericalDomain(_))
    }
}

pub type HazardResult<T> = Result<T, HazardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_exhaustion_reports_count() {
        let err = HazardError::ResourceExhaustion {
            realizations: 1_048_576,
            limit: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("1048576"), "{msg}");
        assert!(msg.contains("10000"), "{msg}");
    }

    #[test]
    fn test_site_local_classification() {
        assert!(HazardError::domain("poe below curve").is_site_local());
        assert!(!HazardError::config("bad weights").is_site_local());
        assert!(!HazardError::Cancelled.is_site_local());
    }
}
