//! # Sieve Stack Model
//!
//! Reference data for gradation testing: named sieves, their apertures, and
//! the per-sieve compliance envelope of each aggregate product.
//!
//! ## Structure
//!
//! ```text
//! AggregateSpecification
//! ├── name, aggregate_class (Fine | Coarse)
//! ├── sieves: [SieveSpec] (strictly decreasing aperture, ends at Pan)
//! │   └── bounds: ComplianceBounds (NotSpecified | Range { lower, upper })
//! └── limits: max_decant, min/max fineness modulus
//! ```
//!
//! ## Example
//!
//! ```rust
//! use qa_core::sieves::{AggregateClass, AggregateSpecification, ComplianceBounds};
//!
//! let spec = AggregateSpecification::new("Pea Gravel", AggregateClass::Coarse)
//!     .with_sieve("1/2\"", 12.5, ComplianceBounds::range(100.0, 100.0))
//!     .with_sieve("3/8\"", 9.5, ComplianceBounds::range(85.0, 100.0))
//!     .with_sieve("#4", 4.75, ComplianceBounds::range(10.0, 30.0))
//!     .with_sieve("Pan", 0.0, ComplianceBounds::NotSpecified);
//!
//! assert!(spec.validate().is_ok());
//! assert_eq!(spec.envelope().len(), 4);
//! ```

pub mod catalog;

pub use catalog::{standard_aperture, AggregateCatalog, FINENESS_MODULUS_SIEVES, PAN};

use serde::{Deserialize, Serialize};

use crate::errors::{QaError, QaResult};
use crate::units::{Grams, Millimeters};

/// Aggregate classification; decides whether fineness modulus and decant apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateClass {
    /// Sand; fineness modulus and decant are evaluated
    Fine,
    /// Stone; fineness modulus and decant are not applicable
    Coarse,
}

impl AggregateClass {
    /// Display name for UI/reports
    pub fn display_name(&self) -> &'static str {
        match self {
            AggregateClass::Fine => "Fine",
            AggregateClass::Coarse => "Coarse",
        }
    }
}

/// Allowed percent-passing band at one sieve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum ComplianceBounds {
    /// No constraint at this sieve
    #[default]
    NotSpecified,
    /// Inclusive band `[lower, upper]` in percent passing
    Range { lower: f64, upper: f64 },
}

impl ComplianceBounds {
    /// Shorthand for `ComplianceBounds::Range`
    pub fn range(lower: f64, upper: f64) -> Self {
        ComplianceBounds::Range { lower, upper }
    }

    /// Whether this sieve carries a constraint
    pub fn is_specified(&self) -> bool {
        matches!(self, ComplianceBounds::Range { .. })
    }

    /// Inclusive membership test. Unconstrained sieves accept everything.
    pub fn contains(&self, percent_passing: f64) -> bool {
        match *self {
            ComplianceBounds::NotSpecified => true,
            ComplianceBounds::Range { lower, upper } => {
                percent_passing >= lower && percent_passing <= upper
            }
        }
    }

    /// How far a value sits outside the band (0.0 when inside).
    pub fn deviation(&self, percent_passing: f64) -> f64 {
        match *self {
            ComplianceBounds::NotSpecified => 0.0,
            ComplianceBounds::Range { lower, upper } => {
                if percent_passing < lower {
                    lower - percent_passing
                } else if percent_passing > upper {
                    percent_passing - upper
                } else {
                    0.0
                }
            }
        }
    }

    /// Short label, e.g. "20-55" or "-"
    pub fn label(&self) -> String {
        match *self {
            ComplianceBounds::NotSpecified => "-".to_string(),
            ComplianceBounds::Range { lower, upper } => format!("{}-{}", lower, upper),
        }
    }
}

/// One sieve as measured in a test: name, aperture and the operator's raw weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SieveMeasurement {
    /// Sieve identifier (e.g., "#4", "3/8\"", "Pan")
    pub name: String,

    /// Aperture size in millimeters (0 for the Pan)
    pub aperture_mm: Millimeters,

    /// Weight retained on this sieve, if entered
    #[serde(default)]
    pub weight_retained: Option<Grams>,
}

/// One sieve of a specification: the measurement template plus its bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SieveSpec {
    /// Sieve identifier
    pub name: String,

    /// Aperture size in millimeters (0 for the Pan)
    pub aperture_mm: Millimeters,

    /// Percent-passing band at this sieve
    #[serde(default)]
    pub bounds: ComplianceBounds,
}

impl SieveSpec {
    /// Create a sieve entry
    pub fn new(name: impl Into<String>, aperture_mm: f64, bounds: ComplianceBounds) -> Self {
        SieveSpec {
            name: name.into(),
            aperture_mm: Millimeters(aperture_mm),
            bounds,
        }
    }

    /// Empty measurement for this sieve (no weight entered yet)
    pub fn template(&self) -> SieveMeasurement {
        SieveMeasurement {
            name: self.name.clone(),
            aperture_mm: self.aperture_mm,
            weight_retained: None,
        }
    }

    /// Whether this is the zero-aperture catch pan
    pub fn is_pan(&self) -> bool {
        self.aperture_mm.0 == 0.0
    }
}

/// Grading requirements for one named aggregate product.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Keystone #7",
///   "aggregate_class": "Coarse",
///   "sieves": [
///     { "name": "1/2\"", "aperture_mm": 12.5, "bounds": { "kind": "Range", "lower": 20.0, "upper": 55.0 } },
///     { "name": "Pan", "aperture_mm": 0.0, "bounds": { "kind": "NotSpecified" } }
///   ],
///   "max_decant": null,
///   "min_fineness_modulus": null,
///   "max_fineness_modulus": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpecification {
    /// Product name used for lookups (e.g., "Keystone #7")
    pub name: String,

    /// Fine or Coarse
    pub aggregate_class: AggregateClass,

    /// Sieve stack, largest aperture first, ending with the Pan
    pub sieves: Vec<SieveSpec>,

    /// Maximum decant percentage (Fine only)
    #[serde(default)]
    pub max_decant: Option<f64>,

    /// Minimum fineness modulus (Fine only)
    #[serde(default)]
    pub min_fineness_modulus: Option<f64>,

    /// Maximum fineness modulus (Fine only)
    #[serde(default)]
    pub max_fineness_modulus: Option<f64>,
}

impl AggregateSpecification {
    /// Create a specification with an empty sieve stack
    pub fn new(name: impl Into<String>, aggregate_class: AggregateClass) -> Self {
        AggregateSpecification {
            name: name.into(),
            aggregate_class,
            sieves: Vec::new(),
            max_decant: None,
            min_fineness_modulus: None,
            max_fineness_modulus: None,
        }
    }

    /// Builder: append a sieve (call in decreasing aperture order)
    pub fn with_sieve(
        mut self,
        name: impl Into<String>,
        aperture_mm: f64,
        bounds: ComplianceBounds,
    ) -> Self {
        self.sieves.push(SieveSpec::new(name, aperture_mm, bounds));
        self
    }

    /// Builder: set the decant limit
    pub fn with_max_decant(mut self, max_decant: f64) -> Self {
        self.max_decant = Some(max_decant);
        self
    }

    /// Builder: set the fineness modulus band
    pub fn with_fineness_modulus_range(mut self, min: f64, max: f64) -> Self {
        self.min_fineness_modulus = Some(min);
        self.max_fineness_modulus = Some(max);
        self
    }

    /// Validate ordering and bounds.
    ///
    /// The stack must be non-empty, strictly decreasing in aperture, end with
    /// a zero-aperture Pan, and every band must satisfy `0 <= lower <= upper <= 100`.
    pub fn validate(&self) -> QaResult<()> {
        let last = self
            .sieves
            .last()
            .ok_or_else(|| QaError::invalid_specification(&self.name, "Sieve stack is empty"))?;

        if !last.is_pan() {
            return Err(QaError::invalid_specification(
                &self.name,
                format!("Sieve stack must end with a zero-aperture Pan, found '{}'", last.name),
            ));
        }

        for sieve in &self.sieves {
            if !sieve.aperture_mm.0.is_finite() || sieve.aperture_mm.0 < 0.0 {
                return Err(QaError::invalid_specification(
                    &self.name,
                    format!("Sieve '{}' has invalid aperture {}", sieve.name, sieve.aperture_mm.0),
                ));
            }
            if let ComplianceBounds::Range { lower, upper } = sieve.bounds {
                let in_range = |p: f64| (0.0..=100.0).contains(&p);
                if !in_range(lower) || !in_range(upper) || lower > upper {
                    return Err(QaError::invalid_specification(
                        &self.name,
                        format!("Sieve '{}' has invalid bounds [{}, {}]", sieve.name, lower, upper),
                    ));
                }
            }
        }

        for pair in self.sieves.windows(2) {
            if pair[1].aperture_mm.0 >= pair[0].aperture_mm.0 {
                return Err(QaError::invalid_specification(
                    &self.name,
                    format!(
                        "Sieves must be in strictly decreasing aperture order ('{}' follows '{}')",
                        pair[1].name, pair[0].name
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Compliance envelope, index-aligned with `sieves`
    pub fn envelope(&self) -> Vec<ComplianceBounds> {
        self.sieves.iter().map(|s| s.bounds).collect()
    }

    /// Blank measurements for a new test
    pub fn templates(&self) -> Vec<SieveMeasurement> {
        self.sieves.iter().map(SieveSpec::template).collect()
    }

    /// Number of sieves including the Pan
    pub fn sieve_count(&self) -> usize {
        self.sieves.len()
    }

    /// Whether fineness modulus and decant apply
    pub fn is_fine(&self) -> bool {
        self.aggregate_class == AggregateClass::Fine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pea_gravel() -> AggregateSpecification {
        AggregateSpecification::new("Pea Gravel", AggregateClass::Coarse)
            .with_sieve("1/2\"", 12.5, ComplianceBounds::range(100.0, 100.0))
            .with_sieve("3/8\"", 9.5, ComplianceBounds::range(85.0, 100.0))
            .with_sieve("#4", 4.75, ComplianceBounds::range(10.0, 30.0))
            .with_sieve("Pan", 0.0, ComplianceBounds::NotSpecified)
    }

    #[test]
    fn test_bounds_inclusive() {
        let bounds = ComplianceBounds::range(20.0, 55.0);
        assert!(bounds.contains(20.0));
        assert!(bounds.contains(55.0));
        assert!(!bounds.contains(55.0001));
        assert!(!bounds.contains(19.9));
        assert!(ComplianceBounds::NotSpecified.contains(250.0));
    }

    #[test]
    fn test_bounds_deviation() {
        let bounds = ComplianceBounds::range(20.0, 55.0);
        assert_eq!(bounds.deviation(80.0), 25.0);
        assert_eq!(bounds.deviation(15.0), 5.0);
        assert_eq!(bounds.deviation(30.0), 0.0);
    }

    #[test]
    fn test_valid_specification() {
        let spec = pea_gravel();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.sieve_count(), 4);
        assert!(!spec.is_fine());
    }

    #[test]
    fn test_missing_pan_rejected() {
        let spec = AggregateSpecification::new("No Pan", AggregateClass::Coarse)
            .with_sieve("#4", 4.75, ComplianceBounds::NotSpecified);
        let err = spec.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SPECIFICATION");
    }

    #[test]
    fn test_out_of_order_rejected() {
        let spec = AggregateSpecification::new("Shuffled", AggregateClass::Coarse)
            .with_sieve("#4", 4.75, ComplianceBounds::NotSpecified)
            .with_sieve("3/8\"", 9.5, ComplianceBounds::NotSpecified)
            .with_sieve("Pan", 0.0, ComplianceBounds::NotSpecified);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let spec = AggregateSpecification::new("Inverted", AggregateClass::Coarse)
            .with_sieve("#4", 4.75, ComplianceBounds::range(60.0, 40.0))
            .with_sieve("Pan", 0.0, ComplianceBounds::NotSpecified);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_templates_have_no_weight() {
        let templates = pea_gravel().templates();
        assert_eq!(templates.len(), 4);
        assert!(templates.iter().all(|t| t.weight_retained.is_none()));
        assert_eq!(templates[3].name, "Pan");
    }

    #[test]
    fn test_bounds_serialization() {
        let json = serde_json::to_string(&ComplianceBounds::range(20.0, 55.0)).unwrap();
        assert_eq!(json, r#"{"kind":"Range","lower":20.0,"upper":55.0}"#);

        let unspecified: ComplianceBounds =
            serde_json::from_str(r#"{"kind":"NotSpecified"}"#).unwrap();
        assert_eq!(unspecified, ComplianceBounds::NotSpecified);
    }
}
