//! Standard sieve sizes and the built-in aggregate product catalog.
//!
//! Envelopes follow ASTM C33 grading tables as adopted by the plant's
//! approved suppliers. Additional products can be registered at runtime
//! (see [`AggregateCatalog::insert`]).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{AggregateClass, AggregateSpecification, ComplianceBounds};
use crate::errors::{QaError, QaResult};
use crate::units::Millimeters;

/// Name of the zero-aperture catch pan
pub const PAN: &str = "Pan";

/// Sieves whose cumulative retained percentages sum to the fineness modulus
pub const FINENESS_MODULUS_SIEVES: [&str; 6] = ["#4", "#8", "#16", "#30", "#50", "#100"];

/// Standard sieve designations and apertures (mm), largest first
const STANDARD_SIEVES: [(&str, f64); 12] = [
    ("1\"", 25.0),
    ("3/4\"", 19.0),
    ("1/2\"", 12.5),
    ("3/8\"", 9.5),
    ("#4", 4.75),
    ("#8", 2.36),
    ("#16", 1.18),
    ("#30", 0.6),
    ("#50", 0.3),
    ("#100", 0.15),
    ("#200", 0.075),
    (PAN, 0.0),
];

/// Look up the aperture of a standard sieve designation.
///
/// ```rust
/// use qa_core::sieves::standard_aperture;
///
/// assert_eq!(standard_aperture("#4").map(|mm| mm.0), Some(4.75));
/// assert!(standard_aperture("#7").is_none());
/// ```
pub fn standard_aperture(name: &str) -> Option<Millimeters> {
    STANDARD_SIEVES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, mm)| Millimeters(*mm))
}

static BUILTIN: Lazy<AggregateCatalog> = Lazy::new(|| AggregateCatalog {
    specifications: vec![keystone_7(), keystone_67(), concrete_sand()],
});

fn keystone_7() -> AggregateSpecification {
    AggregateSpecification::new("Keystone #7", AggregateClass::Coarse)
        .with_sieve("3/4\"", 19.0, ComplianceBounds::range(90.0, 100.0))
        .with_sieve("1/2\"", 12.5, ComplianceBounds::range(20.0, 55.0))
        .with_sieve("3/8\"", 9.5, ComplianceBounds::NotSpecified)
        .with_sieve("#4", 4.75, ComplianceBounds::range(0.0, 10.0))
        .with_sieve("#8", 2.36, ComplianceBounds::range(0.0, 5.0))
        .with_sieve(PAN, 0.0, ComplianceBounds::NotSpecified)
}

fn keystone_67() -> AggregateSpecification {
    AggregateSpecification::new("Keystone #67", AggregateClass::Coarse)
        .with_sieve("1\"", 25.0, ComplianceBounds::range(100.0, 100.0))
        .with_sieve("3/4\"", 19.0, ComplianceBounds::range(90.0, 100.0))
        .with_sieve("3/8\"", 9.5, ComplianceBounds::range(20.0, 55.0))
        .with_sieve("#4", 4.75, ComplianceBounds::range(0.0, 10.0))
        .with_sieve("#8", 2.36, ComplianceBounds::range(0.0, 5.0))
        .with_sieve(PAN, 0.0, ComplianceBounds::NotSpecified)
}

fn concrete_sand() -> AggregateSpecification {
    AggregateSpecification::new("Concrete Sand", AggregateClass::Fine)
        .with_sieve("3/8\"", 9.5, ComplianceBounds::range(100.0, 100.0))
        .with_sieve("#4", 4.75, ComplianceBounds::range(95.0, 100.0))
        .with_sieve("#8", 2.36, ComplianceBounds::range(80.0, 100.0))
        .with_sieve("#16", 1.18, ComplianceBounds::range(50.0, 85.0))
        .with_sieve("#30", 0.6, ComplianceBounds::range(25.0, 60.0))
        .with_sieve("#50", 0.3, ComplianceBounds::range(5.0, 30.0))
        .with_sieve("#100", 0.15, ComplianceBounds::range(0.0, 10.0))
        .with_sieve("#200", 0.075, ComplianceBounds::NotSpecified)
        .with_sieve(PAN, 0.0, ComplianceBounds::NotSpecified)
        .with_max_decant(3.0)
        .with_fineness_modulus_range(2.3, 3.1)
}

/// Named collection of aggregate specifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateCatalog {
    /// Specifications in registration order
    pub specifications: Vec<AggregateSpecification>,
}

impl AggregateCatalog {
    /// The shipped product catalog
    pub fn builtin() -> &'static AggregateCatalog {
        &BUILTIN
    }

    /// Find a specification by exact product name.
    ///
    /// ```rust
    /// use qa_core::sieves::AggregateCatalog;
    ///
    /// let spec = AggregateCatalog::builtin().find("Keystone #7").unwrap();
    /// assert_eq!(spec.sieve_count(), 6);
    /// assert!(AggregateCatalog::builtin().find("Keystone #9").is_err());
    /// ```
    pub fn find(&self, name: &str) -> QaResult<&AggregateSpecification> {
        self.specifications
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| QaError::missing_specification(name))
    }

    /// Register (or replace) a specification after validating it
    pub fn insert(&mut self, spec: AggregateSpecification) -> QaResult<()> {
        spec.validate()?;
        match self.specifications.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specifications.push(spec),
        }
        Ok(())
    }

    /// Product names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.specifications.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered products
    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    /// Whether no products are registered
    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_specs_are_valid() {
        for spec in &AggregateCatalog::builtin().specifications {
            assert!(spec.validate().is_ok(), "{} failed validation", spec.name);
        }
    }

    #[test]
    fn test_builtin_apertures_match_standard_table() {
        for spec in &AggregateCatalog::builtin().specifications {
            for sieve in &spec.sieves {
                assert_eq!(standard_aperture(&sieve.name), Some(sieve.aperture_mm));
            }
        }
    }

    #[test]
    fn test_find_missing() {
        let err = AggregateCatalog::builtin().find("River Rock").unwrap_err();
        assert_eq!(err, QaError::missing_specification("River Rock"));
    }

    #[test]
    fn test_keystone_7_half_inch_band() {
        let spec = AggregateCatalog::builtin().find("Keystone #7").unwrap();
        let half = spec.sieves.iter().find(|s| s.name == "1/2\"").unwrap();
        assert_eq!(half.bounds, ComplianceBounds::range(20.0, 55.0));
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut catalog = AggregateCatalog::default();
        assert!(catalog.is_empty());

        catalog.insert(keystone_7()).unwrap();
        let mut revised = keystone_7();
        revised.sieves[1].bounds = ComplianceBounds::range(25.0, 60.0);
        catalog.insert(revised).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.find("Keystone #7").unwrap().sieves[1].bounds,
            ComplianceBounds::range(25.0, 60.0)
        );
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let mut catalog = AggregateCatalog::default();
        let bad = AggregateSpecification::new("Bad", AggregateClass::Fine);
        assert!(catalog.insert(bad).is_err());
        assert!(catalog.is_empty());
    }
}
