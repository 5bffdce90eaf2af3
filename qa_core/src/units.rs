//! # Unit Types
//!
//! Lightweight newtype wrappers for the three units the QA engine works in.
//! They serialize as bare numbers so stored JSON stays clean.
//!
//! - Sieve apertures: millimeters (mm)
//! - Strand coordinates: inches (in)
//! - Sample weights: grams (g)
//!
//! ## Example
//!
//! ```rust
//! use qa_core::units::Grams;
//!
//! let total: Grams = [Grams(600.0), Grams(400.0)].into_iter().sum();
//! assert_eq!(total - Grams(970.0), Grams(30.0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Length in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

/// Length in inches
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inches(pub f64);

/// Mass in grams
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grams(pub f64);

impl Sub for Inches {
    type Output = Inches;
    fn sub(self, rhs: Inches) -> Inches {
        Inches(self.0 - rhs.0)
    }
}

impl Add for Grams {
    type Output = Grams;
    fn add(self, rhs: Grams) -> Grams {
        Grams(self.0 + rhs.0)
    }
}

impl Sub for Grams {
    type Output = Grams;
    fn sub(self, rhs: Grams) -> Grams {
        Grams(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Grams {
    fn sum<I: Iterator<Item = Grams>>(iter: I) -> Grams {
        iter.fold(Grams(0.0), |acc, g| acc + g)
    }
}

impl fmt::Display for Millimeters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mm", self.0)
    }
}

impl fmt::Display for Inches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\"", self.0)
    }
}

impl fmt::Display for Grams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} g", self.0)
    }
}
