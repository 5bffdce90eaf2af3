//! # Compliance Checker
//!
//! Evaluates percent passing against a specification's envelope and reports
//! every sieve that fell outside its band, not just a pass/fail flag.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::gradation::{check_compliance, compute_gradation, RawWeight};
//! use qa_core::sieves::AggregateCatalog;
//!
//! let spec = AggregateCatalog::builtin().find("Keystone #7").unwrap();
//! let weights: Vec<RawWeight> = [0.0, 200.0, 300.0, 400.0, 100.0, 0.0]
//!     .into_iter()
//!     .map(RawWeight::from)
//!     .collect();
//! let gradation = compute_gradation(spec, &weights, None).unwrap();
//!
//! let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();
//! assert!(!report.passes_envelope);
//! assert_eq!(report.failed_sieves[0].sieve, "1/2\"");
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DerivedSieveResult, GradationResult};
use crate::errors::{QaError, QaResult};
use crate::sieves::{AggregateSpecification, ComplianceBounds};

/// One sieve that fell outside its band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SieveFailure {
    /// Sieve name
    pub sieve: String,

    /// Measured percent passing
    pub percent_passing: f64,

    /// The band that was violated
    pub bounds: ComplianceBounds,

    /// Percentage points outside the band
    pub deviation: f64,
}

/// Envelope check outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// True only when the sample was evaluable and every checked sieve passed
    pub passes_envelope: bool,

    /// False when total weight was zero (percentages unavailable)
    pub evaluable: bool,

    /// Number of sieves that carried a band
    pub checked_sieves: usize,

    /// Failures in sieve order
    pub failed_sieves: Vec<SieveFailure>,
}

/// Check derived results against an index-aligned envelope.
///
/// Sieves with `NotSpecified` bounds are skipped. A non-evaluable sample
/// (any percentage unavailable) never passes and lists no per-sieve failures.
///
/// # Errors
///
/// * `IncompatibleEnvelopeLength` - `results` and `envelope` differ in length
pub fn check_compliance(
    results: &[DerivedSieveResult],
    envelope: &[ComplianceBounds],
) -> QaResult<ComplianceReport> {
    if results.len() != envelope.len() {
        return Err(QaError::incompatible_length(envelope.len(), results.len()));
    }

    let checked_sieves = envelope.iter().filter(|b| b.is_specified()).count();
    let evaluable = !results.is_empty() && results.iter().all(|r| r.percent_passing.is_some());

    if !evaluable {
        debug!(checked_sieves, "sample not evaluable; envelope not checked");
        return Ok(ComplianceReport {
            passes_envelope: false,
            evaluable,
            checked_sieves,
            failed_sieves: Vec::new(),
        });
    }

    let failed_sieves: Vec<SieveFailure> = results
        .iter()
        .zip(envelope)
        .filter_map(|(result, bounds)| {
            let passing = result.percent_passing?;
            if bounds.contains(passing) {
                return None;
            }
            Some(SieveFailure {
                sieve: result.name().to_string(),
                percent_passing: passing,
                bounds: *bounds,
                deviation: bounds.deviation(passing),
            })
        })
        .collect();

    for failure in &failed_sieves {
        warn!(
            sieve = %failure.sieve,
            percent_passing = failure.percent_passing,
            bounds = %failure.bounds.label(),
            "sieve outside compliance envelope"
        );
    }

    Ok(ComplianceReport {
        passes_envelope: failed_sieves.is_empty(),
        evaluable,
        checked_sieves,
        failed_sieves,
    })
}

/// Which single-value limit a [`LimitCheck`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    /// Decant must not exceed the maximum
    MaxDecant,
    /// Fineness modulus must be at least the minimum
    MinFinenessModulus,
    /// Fineness modulus must not exceed the maximum
    MaxFinenessModulus,
}

impl LimitKind {
    /// Display name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            LimitKind::MaxDecant => "Decant (max)",
            LimitKind::MinFinenessModulus => "Fineness modulus (min)",
            LimitKind::MaxFinenessModulus => "Fineness modulus (max)",
        }
    }
}

/// Result of checking one single-value limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub kind: LimitKind,
    pub value: f64,
    pub limit: f64,
    pub passes: bool,
}

/// Check decant and fineness modulus against the specification's limits.
///
/// Only limits that are both specified and have a computed value are
/// reported; these checks are separate from the envelope outcome.
pub fn check_limits(spec: &AggregateSpecification, gradation: &GradationResult) -> Vec<LimitCheck> {
    let mut checks = Vec::new();
    let mut push = |kind, value: f64, limit: f64, passes| {
        checks.push(LimitCheck { kind, value, limit, passes });
    };

    if let (Some(limit), Some(value)) = (spec.max_decant, gradation.decant) {
        push(LimitKind::MaxDecant, value, limit, value <= limit);
    }
    if let (Some(limit), Some(value)) = (spec.min_fineness_modulus, gradation.fineness_modulus) {
        push(LimitKind::MinFinenessModulus, value, limit, value >= limit);
    }
    if let (Some(limit), Some(value)) = (spec.max_fineness_modulus, gradation.fineness_modulus) {
        push(LimitKind::MaxFinenessModulus, value, limit, value <= limit);
    }

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradation::{compute_gradation, RawWeight};
    use crate::sieves::AggregateCatalog;

    fn numbers(values: &[f64]) -> Vec<RawWeight> {
        values.iter().copied().map(RawWeight::from).collect()
    }

    fn keystone_7() -> &'static AggregateSpecification {
        AggregateCatalog::builtin().find("Keystone #7").unwrap()
    }

    fn concrete_sand() -> &'static AggregateSpecification {
        AggregateCatalog::builtin().find("Concrete Sand").unwrap()
    }

    #[test]
    fn test_keystone_7_fails_at_half_inch() {
        let spec = keystone_7();
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 200.0, 300.0, 400.0, 100.0, 0.0]),
            None,
        )
        .unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();

        assert!(report.evaluable);
        assert!(!report.passes_envelope);
        assert_eq!(report.checked_sieves, 4);
        assert_eq!(report.failed_sieves.len(), 1);

        let failure = &report.failed_sieves[0];
        assert_eq!(failure.sieve, "1/2\"");
        assert_eq!(failure.percent_passing, 80.0);
        assert_eq!(failure.bounds, ComplianceBounds::range(20.0, 55.0));
        assert_eq!(failure.deviation, 25.0);
    }

    #[test]
    fn test_passing_sample() {
        let spec = keystone_7();
        // passing: 100, 40, 15, 5, 0, 0
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 600.0, 250.0, 100.0, 50.0, 0.0]),
            None,
        )
        .unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();
        assert!(report.passes_envelope);
        assert!(report.failed_sieves.is_empty());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let spec = keystone_7();
        // passing: 100, 55, 20, 10, 5, 0 -- 1/2" at the upper edge, #4 and #8 at theirs
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 450.0, 350.0, 100.0, 50.0, 50.0]),
            None,
        )
        .unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();
        assert!(report.passes_envelope, "{:?}", report.failed_sieves);
    }

    #[test]
    fn test_unspecified_sieves_ignored() {
        let spec = keystone_7();
        // 3/8" (unspecified) passes 20 -- irrelevant to the outcome
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 600.0, 200.0, 150.0, 50.0, 0.0]),
            None,
        )
        .unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();
        assert!(report.failed_sieves.iter().all(|f| f.sieve != "3/8\""));
    }

    #[test]
    fn test_zero_total_never_passes() {
        let spec = keystone_7();
        let gradation = compute_gradation(spec, &numbers(&[0.0; 6]), None).unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();
        assert!(!report.evaluable);
        assert!(!report.passes_envelope);
        assert!(report.failed_sieves.is_empty());
    }

    #[test]
    fn test_envelope_length_mismatch() {
        let spec = keystone_7();
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 200.0, 300.0, 400.0, 100.0, 0.0]),
            None,
        )
        .unwrap();
        let envelope = &spec.envelope()[..4];
        let err = check_compliance(&gradation.sieve_results, envelope).unwrap_err();
        assert_eq!(err, QaError::incompatible_length(4, 6));
    }

    #[test]
    fn test_sand_failures_in_sieve_order() {
        let spec = concrete_sand();
        let weights = numbers(&[0.0, 20.0, 60.0, 120.0, 200.0, 250.0, 200.0, 100.0, 50.0]);
        let gradation = compute_gradation(spec, &weights, None).unwrap();
        let report = check_compliance(&gradation.sieve_results, &spec.envelope()).unwrap();

        let failed: Vec<&str> = report.failed_sieves.iter().map(|f| f.sieve.as_str()).collect();
        assert_eq!(failed, vec!["#50", "#100"]);
    }

    #[test]
    fn test_limits() {
        let spec = concrete_sand();
        let weights = numbers(&[0.0, 20.0, 60.0, 120.0, 200.0, 250.0, 200.0, 100.0, 50.0]);
        let gradation = compute_gradation(spec, &weights, Some(&RawWeight::from(970.0))).unwrap();
        let checks = check_limits(spec, &gradation);

        assert_eq!(checks.len(), 3);
        let decant = checks.iter().find(|c| c.kind == LimitKind::MaxDecant).unwrap();
        assert!(decant.passes);
        let fm_min = checks.iter().find(|c| c.kind == LimitKind::MinFinenessModulus).unwrap();
        assert!(!fm_min.passes); // 2.20 < 2.3
        let fm_max = checks.iter().find(|c| c.kind == LimitKind::MaxFinenessModulus).unwrap();
        assert!(fm_max.passes);
    }

    #[test]
    fn test_no_limits_for_coarse() {
        let spec = keystone_7();
        let gradation = compute_gradation(
            spec,
            &numbers(&[0.0, 200.0, 300.0, 400.0, 100.0, 0.0]),
            None,
        )
        .unwrap();
        assert!(check_limits(spec, &gradation).is_empty());
    }
}
