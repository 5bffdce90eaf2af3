//! # Strand Patterns
//!
//! Prestressing strand layouts and the comparison between a design pattern and
//! the as-cast pattern of a precast member.
//!
//! - [`compare`] - positional, tolerance-aware diff producing a [`ComparisonResult`]
//! - [`report`] - plain-text and Typst renderings of a comparison
//!
//! ## Example
//!
//! ```rust
//! use qa_core::strands::{compare_strand_patterns, StrandPattern, StrandPosition};
//!
//! let design = StrandPattern::new("D-12", "12\" hollowcore design")
//!     .with_slot("1/2\"", Some((0.0, 0.0)))
//!     .with_slot("1/2\"", Some((2.0, 0.0)));
//! let cast = StrandPattern::new("C-12", "12\" hollowcore as cast")
//!     .with_slot("1/2\"", Some((0.0, 0.0)));
//!
//! let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
//! assert!(result.has_differences);
//! assert_eq!(result.summary, "1 difference(s) found: 1 strand(s) missing in cast");
//! ```

pub mod compare;
pub mod report;

pub use compare::{
    compare_strand_patterns, compare_strand_patterns_with, summarize, ComparisonOptions,
    DEFAULT_LOCATION_TOLERANCE_IN,
};
pub use report::{format_comparison_for_display, format_comparison_for_report};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::Inches;

/// Which layer of strands is being compared. Used only for labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StrandPosition {
    #[default]
    Bottom,
    Top,
}

impl StrandPosition {
    /// Display name for UI/reports
    pub fn display_name(&self) -> &'static str {
        match self {
            StrandPosition::Bottom => "Bottom",
            StrandPosition::Top => "Top",
        }
    }
}

impl fmt::Display for StrandPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Strand location in the member cross-section, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrandCoordinate {
    pub x: Inches,
    pub y: Inches,
}

impl StrandCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        StrandCoordinate { x: Inches(x), y: Inches(y) }
    }
}

impl fmt::Display for StrandCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x.0, self.y.0)
    }
}

/// One strand position in a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandSlot {
    /// 1-based position in the pattern
    pub index: usize,

    /// Strand size label, compared as an exact string (e.g. `1/2"`)
    pub size: String,

    /// Location, if the pattern records one
    #[serde(default)]
    pub coordinate: Option<StrandCoordinate>,
}

/// An ordered strand layout.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": "D-12",
///   "name": "12\" hollowcore design",
///   "slots": [
///     { "index": 1, "size": "1/2\"", "coordinate": { "x": 0.0, "y": 0.0 } },
///     { "index": 2, "size": "1/2\"", "coordinate": null }
///   ],
///   "counts_by_size": { "1/2\"": 2 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandPattern {
    /// Unique identifier; equal ids mean the same pattern
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Slots in layout order
    pub slots: Vec<StrandSlot>,

    /// Strand count per size label
    #[serde(default)]
    pub counts_by_size: BTreeMap<String, usize>,
}

impl StrandPattern {
    /// Create an empty pattern
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        StrandPattern {
            id: id.into(),
            name: name.into(),
            slots: Vec::new(),
            counts_by_size: BTreeMap::new(),
        }
    }

    /// Builder: append a slot; its index is the next 1-based position
    pub fn with_slot(mut self, size: impl Into<String>, coordinate: Option<(f64, f64)>) -> Self {
        let size = size.into();
        *self.counts_by_size.entry(size.clone()).or_insert(0) += 1;
        self.slots.push(StrandSlot {
            index: self.slots.len() + 1,
            size,
            coordinate: coordinate.map(|(x, y)| StrandCoordinate::new(x, y)),
        });
        self
    }

    /// Rebuild `counts_by_size` from the slots
    pub fn recount(&mut self) {
        let mut counts = BTreeMap::new();
        for slot in &self.slots {
            *counts.entry(slot.size.clone()).or_insert(0) += 1;
        }
        self.counts_by_size = counts;
    }

    /// Total number of strands
    pub fn strand_count(&self) -> usize {
        self.slots.len()
    }
}

/// Kind of discrepancy between design and cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Slot exists in the design but not in the cast
    MissingInCast,
    /// Slot exists in the cast but not in the design
    MissingInDesign,
    /// Size labels differ
    SizeMismatch,
    /// Coordinates differ by more than the tolerance
    LocationMismatch,
}

impl IssueType {
    /// All issue types in summary order
    pub const ALL: [IssueType; 4] = [
        IssueType::MissingInCast,
        IssueType::MissingInDesign,
        IssueType::SizeMismatch,
        IssueType::LocationMismatch,
    ];

    /// Wire name (matches the serialized form)
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::MissingInCast => "missing_in_cast",
            IssueType::MissingInDesign => "missing_in_design",
            IssueType::SizeMismatch => "size_mismatch",
            IssueType::LocationMismatch => "location_mismatch",
        }
    }
}

/// One classified discrepancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandDifference {
    /// 1-based slot index
    pub slot_index: usize,

    pub position: StrandPosition,

    pub issue_type: IssueType,

    pub design_size: Option<String>,

    pub cast_size: Option<String>,

    pub design_location: Option<StrandCoordinate>,

    pub cast_location: Option<StrandCoordinate>,

    /// Human-readable explanation
    pub description: String,
}

/// Outcome of comparing two strand patterns.
///
/// Always computed fresh from its two inputs; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Layer the comparison was run for
    pub position: StrandPosition,

    pub has_design_pattern: bool,

    pub has_cast_pattern: bool,

    /// Differences in ascending slot order
    pub differences: Vec<StrandDifference>,

    pub has_differences: bool,

    /// One-line summary of the outcome
    pub summary: String,
}

impl ComparisonResult {
    /// Number of differences of one kind
    pub fn count(&self, issue_type: IssueType) -> usize {
        self.differences.iter().filter(|d| d.issue_type == issue_type).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_indices_and_counts() {
        let pattern = StrandPattern::new("P1", "Test")
            .with_slot("1/2\"", None)
            .with_slot("0.6\"", Some((1.0, 2.0)))
            .with_slot("1/2\"", None);

        let indices: Vec<usize> = pattern.slots.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(pattern.counts_by_size.get("1/2\""), Some(&2));
        assert_eq!(pattern.counts_by_size.get("0.6\""), Some(&1));
        assert_eq!(pattern.strand_count(), 3);
    }

    #[test]
    fn test_recount() {
        let mut pattern = StrandPattern::new("P1", "Test").with_slot("1/2\"", None);
        pattern.slots[0].size = "3/8\"".to_string();
        pattern.recount();
        assert_eq!(pattern.counts_by_size.len(), 1);
        assert_eq!(pattern.counts_by_size.get("3/8\""), Some(&1));
    }

    #[test]
    fn test_issue_type_serialization() {
        let json = serde_json::to_string(&IssueType::MissingInCast).unwrap();
        assert_eq!(json, "\"missing_in_cast\"");
        for issue in IssueType::ALL {
            let json = serde_json::to_string(&issue).unwrap();
            assert_eq!(json, format!("\"{}\"", issue.as_str()));
        }
    }

    #[test]
    fn test_pattern_roundtrip() {
        let pattern = StrandPattern::new("D-1", "Double tee")
            .with_slot("1/2\"", Some((1.5, 2.0)))
            .with_slot("1/2\"", None);
        let json = serde_json::to_string_pretty(&pattern).unwrap();
        let roundtrip: StrandPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, pattern);
    }
}
