//! # Gradation Calculator
//!
//! Turns raw sieve weights into percent retained, cumulative retained and
//! percent passing, plus fineness modulus and decant for fine aggregates.
//!
//! Sieves are processed in specification order (largest aperture first). A
//! sample whose total weight is zero is not an error: every derived percentage
//! is reported as unavailable (`None`) and the result is flagged not evaluable.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::gradation::{compute_gradation, RawWeight};
//! use qa_core::sieves::AggregateCatalog;
//!
//! let spec = AggregateCatalog::builtin().find("Keystone #7").unwrap();
//! let weights: Vec<RawWeight> = ["0", "200", "300", "400", "100", ""]
//!     .into_iter()
//!     .map(RawWeight::from)
//!     .collect();
//!
//! let result = compute_gradation(spec, &weights, None).unwrap();
//! assert_eq!(result.total_weight.0, 1000.0);
//! assert_eq!(result.sieve_results[1].percent_passing, Some(80.0));
//! assert!(result.fineness_modulus.is_none()); // coarse aggregate
//! ```

pub mod compliance;

pub use compliance::{
    check_compliance, check_limits, ComplianceReport, LimitCheck, LimitKind, SieveFailure,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{QaError, QaResult};
use crate::sieves::{
    AggregateClass, AggregateSpecification, SieveMeasurement, FINENESS_MODULUS_SIEVES,
};
use crate::units::{Grams, Millimeters};

/// Weight exactly as entered on the form: a number or the text of an input box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWeight {
    /// Numeric entry
    Number(f64),
    /// Text entry; blank means "nothing on this sieve"
    Text(String),
}

impl From<f64> for RawWeight {
    fn from(value: f64) -> Self {
        RawWeight::Number(value)
    }
}

impl From<&str> for RawWeight {
    fn from(value: &str) -> Self {
        RawWeight::Text(value.to_string())
    }
}

impl From<String> for RawWeight {
    fn from(value: String) -> Self {
        RawWeight::Text(value)
    }
}

/// Parse one raw weight.
///
/// Returns `Ok(None)` for a blank entry. Non-numeric, non-finite and negative
/// values are rejected with `InvalidWeight`.
///
/// ```rust
/// use qa_core::gradation::{parse_weight, RawWeight};
///
/// assert_eq!(parse_weight("#4", &RawWeight::from(" 412.5 ")).unwrap().map(|g| g.0), Some(412.5));
/// assert_eq!(parse_weight("#4", &RawWeight::from("")).unwrap(), None);
/// assert!(parse_weight("#4", &RawWeight::from("abc")).is_err());
/// assert!(parse_weight("#4", &RawWeight::from(-3.0)).is_err());
/// ```
pub fn parse_weight(sieve: &str, raw: &RawWeight) -> QaResult<Option<Grams>> {
    let value = match raw {
        RawWeight::Number(n) => *n,
        RawWeight::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| {
                warn!(sieve, value = trimmed, "rejected non-numeric weight");
                QaError::invalid_weight(sieve, trimmed, "Weight is not a number")
            })?
        }
    };

    if !value.is_finite() {
        warn!(sieve, value, "rejected non-finite weight");
        return Err(QaError::invalid_weight(
            sieve,
            value.to_string(),
            "Weight must be a finite number",
        ));
    }
    if value < 0.0 {
        warn!(sieve, value, "rejected negative weight");
        return Err(QaError::invalid_weight(sieve, value.to_string(), "Weight cannot be negative"));
    }

    Ok(Some(Grams(value)))
}

/// A sieve measurement with its derived percentages.
///
/// Percentages are `None` when the sample's total weight is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSieveResult {
    /// Sieve name, aperture and entered weight
    #[serde(flatten)]
    pub measurement: SieveMeasurement,

    /// Weight on this sieve as a percentage of the total
    pub percent_retained: Option<f64>,

    /// Running sum of percent retained from the largest sieve down to this one
    pub cumulative_retained: Option<f64>,

    /// `100 - cumulative_retained`
    pub percent_passing: Option<f64>,
}

impl DerivedSieveResult {
    /// Sieve name
    pub fn name(&self) -> &str {
        &self.measurement.name
    }

    /// Sieve aperture
    pub fn aperture_mm(&self) -> Millimeters {
        self.measurement.aperture_mm
    }
}

/// Output of [`compute_gradation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradationResult {
    /// Specification the sample was tested against
    pub aggregate_name: String,

    /// Fine or Coarse, copied from the specification
    pub aggregate_class: AggregateClass,

    /// Per-sieve results, largest aperture first
    pub sieve_results: Vec<DerivedSieveResult>,

    /// Sum of all entered weights
    pub total_weight: Grams,

    /// Weight after washing (fine aggregates only)
    pub washed_weight: Option<Grams>,

    /// Fineness modulus, two decimals (fine aggregates only)
    pub fineness_modulus: Option<f64>,

    /// Decant percentage (fine aggregates with a washed weight only)
    pub decant: Option<f64>,
}

impl GradationResult {
    /// Whether percentages could be computed (total weight above zero)
    pub fn is_evaluable(&self) -> bool {
        self.total_weight.0 > 0.0
    }

    /// Percent passing per sieve, index-aligned with `sieve_results`
    pub fn percent_passing(&self) -> Vec<Option<f64>> {
        self.sieve_results.iter().map(|r| r.percent_passing).collect()
    }
}

/// Compute the gradation of one sample.
///
/// # Arguments
///
/// * `spec` - Specification supplying the sieve stack
/// * `raw_weights` - One entry per sieve, in specification order
/// * `washed_weight` - Post-wash weight for the decant test (fine aggregates)
///
/// # Errors
///
/// * `IncompatibleEnvelopeLength` - weight count differs from the sieve count
/// * `InvalidWeight` - a weight fails to parse, the total overflows, or washed weight exceeds total
/// * `InvalidSpecification` - the specification itself is malformed
pub fn compute_gradation(
    spec: &AggregateSpecification,
    raw_weights: &[RawWeight],
    washed_weight: Option<&RawWeight>,
) -> QaResult<GradationResult> {
    spec.validate()?;

    if raw_weights.len() != spec.sieve_count() {
        return Err(QaError::incompatible_length(spec.sieve_count(), raw_weights.len()));
    }

    let mut measurements = spec.templates();
    for (measurement, raw) in measurements.iter_mut().zip(raw_weights) {
        measurement.weight_retained = parse_weight(&measurement.name, raw)?;
    }

    let total_weight: Grams = measurements
        .iter()
        .map(|m| m.weight_retained.unwrap_or_default())
        .sum();
    if !total_weight.0.is_finite() {
        warn!(aggregate = %spec.name, "total weight overflowed");
        return Err(QaError::invalid_weight(
            "total",
            total_weight.0.to_string(),
            "Total weight is not finite",
        ));
    }

    let sieve_results = derive_percentages(measurements, total_weight);

    let (washed_weight, decant) = match spec.aggregate_class {
        AggregateClass::Fine => {
            let washed = match washed_weight {
                Some(raw) => parse_weight("washed", raw)?,
                None => None,
            };
            let decant = match washed {
                Some(w) => decant_percent(total_weight, w)?,
                None => None,
            };
            (washed, decant)
        }
        AggregateClass::Coarse => {
            if washed_weight.is_some() {
                debug!(aggregate = %spec.name, "ignoring washed weight for coarse aggregate");
            }
            (None, None)
        }
    };

    let fineness_modulus = match spec.aggregate_class {
        AggregateClass::Fine => fineness_modulus(&sieve_results),
        AggregateClass::Coarse => None,
    };

    debug!(
        aggregate = %spec.name,
        total_g = total_weight.0,
        ?fineness_modulus,
        ?decant,
        "computed gradation"
    );

    Ok(GradationResult {
        aggregate_name: spec.name.clone(),
        aggregate_class: spec.aggregate_class,
        sieve_results,
        total_weight,
        washed_weight,
        fineness_modulus,
        decant,
    })
}

/// Attach percent retained / cumulative / passing to each measurement.
fn derive_percentages(
    measurements: Vec<SieveMeasurement>,
    total: Grams,
) -> Vec<DerivedSieveResult> {
    if total.0 <= 0.0 {
        return measurements
            .into_iter()
            .map(|measurement| DerivedSieveResult {
                measurement,
                percent_retained: None,
                cumulative_retained: None,
                percent_passing: None,
            })
            .collect();
    }

    let mut cumulative = 0.0;
    measurements
        .into_iter()
        .map(|measurement| {
            let weight = measurement.weight_retained.unwrap_or_default();
            let retained = weight.0 * 100.0 / total.0;
            cumulative += retained;
            let cumulative_retained = cumulative.min(100.0);
            DerivedSieveResult {
                measurement,
                percent_retained: Some(retained),
                cumulative_retained: Some(cumulative_retained),
                percent_passing: Some((100.0 - cumulative_retained).clamp(0.0, 100.0)),
            }
        })
        .collect()
}

/// Sum of cumulative retained at the reference sieves / 100, two decimals.
///
/// Reference sieves missing from the stack contribute nothing.
fn fineness_modulus(results: &[DerivedSieveResult]) -> Option<f64> {
    let mut sum = 0.0;
    for result in results {
        if FINENESS_MODULUS_SIEVES.contains(&result.name()) {
            sum += result.cumulative_retained?;
        }
    }
    if results.iter().all(|r| r.cumulative_retained.is_none()) {
        return None;
    }
    Some(round2(sum / 100.0))
}

/// `(total - washed) / total * 100`; washed weight above the total is rejected.
fn decant_percent(total: Grams, washed: Grams) -> QaResult<Option<f64>> {
    if washed.0 > total.0 {
        warn!(total_g = total.0, washed_g = washed.0, "washed weight exceeds total");
        return Err(QaError::invalid_weight(
            "washed",
            washed.0.to_string(),
            format!("Washed weight exceeds total weight of {}", total.0),
        ));
    }
    if total.0 <= 0.0 {
        return Ok(None);
    }
    Ok(Some((total - washed).0 * 100.0 / total.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
