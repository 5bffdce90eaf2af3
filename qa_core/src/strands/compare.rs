//! Positional strand pattern comparison.
//!
//! Slots are aligned by index, not by content: slot `i` of the design is only
//! ever compared with slot `i` of the cast. Reordered layouts therefore show
//! up as size/location mismatches rather than being re-matched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ComparisonResult, IssueType, StrandDifference, StrandPattern, StrandPosition, StrandSlot,
};

/// Allowed coordinate drift per axis, in inches. A drift of exactly this
/// amount is within tolerance.
pub const DEFAULT_LOCATION_TOLERANCE_IN: f64 = 0.5;

/// Tunables for [`compare_strand_patterns_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOptions {
    /// Per-axis location tolerance in inches
    pub location_tolerance_in: f64,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        ComparisonOptions {
            location_tolerance_in: DEFAULT_LOCATION_TOLERANCE_IN,
        }
    }
}

/// Compare a design pattern with a cast pattern using the default tolerance.
///
/// Absent patterns are a normal outcome, never an error.
pub fn compare_strand_patterns(
    design: Option<&StrandPattern>,
    cast: Option<&StrandPattern>,
    position: StrandPosition,
) -> ComparisonResult {
    compare_strand_patterns_with(design, cast, position, &ComparisonOptions::default())
}

/// Compare two patterns with explicit options.
pub fn compare_strand_patterns_with(
    design: Option<&StrandPattern>,
    cast: Option<&StrandPattern>,
    position: StrandPosition,
    options: &ComparisonOptions,
) -> ComparisonResult {
    let (design, cast) = match (design, cast) {
        (Some(d), Some(c)) => (d, c),
        (None, None) => {
            return without_differences(position, false, false, "No strand pattern specified")
        }
        (None, Some(_)) => {
            return without_differences(position, false, true, "No design pattern specified")
        }
        (Some(_), None) => {
            return without_differences(position, true, false, "No cast pattern specified")
        }
    };

    if design.id == cast.id {
        return without_differences(position, true, true, "Patterns are identical");
    }

    let slot_count = design.slots.len().max(cast.slots.len());
    let mut differences = Vec::new();
    for i in 0..slot_count {
        compare_slot(
            i + 1,
            design.slots.get(i),
            cast.slots.get(i),
            position,
            options,
            &mut differences,
        );
    }

    let summary = summarize(&differences);
    debug!(
        design = %design.id,
        cast = %cast.id,
        %position,
        differences = differences.len(),
        "compared strand patterns"
    );

    ComparisonResult {
        position,
        has_design_pattern: true,
        has_cast_pattern: true,
        has_differences: !differences.is_empty(),
        differences,
        summary,
    }
}

fn without_differences(
    position: StrandPosition,
    has_design: bool,
    has_cast: bool,
    summary: &str,
) -> ComparisonResult {
    ComparisonResult {
        position,
        has_design_pattern: has_design,
        has_cast_pattern: has_cast,
        differences: Vec::new(),
        has_differences: false,
        summary: summary.to_string(),
    }
}

fn compare_slot(
    slot_index: usize,
    design: Option<&StrandSlot>,
    cast: Option<&StrandSlot>,
    position: StrandPosition,
    options: &ComparisonOptions,
    out: &mut Vec<StrandDifference>,
) {
    match (design, cast) {
        (Some(d), None) => out.push(StrandDifference {
            slot_index,
            position,
            issue_type: IssueType::MissingInCast,
            design_size: Some(d.size.clone()),
            cast_size: None,
            design_location: d.coordinate,
            cast_location: None,
            description: format!(
                "{} strand {} ({}) is missing in cast",
                position, slot_index, d.size
            ),
        }),
        (None, Some(c)) => out.push(StrandDifference {
            slot_index,
            position,
            issue_type: IssueType::MissingInDesign,
            design_size: None,
            cast_size: Some(c.size.clone()),
            design_location: None,
            cast_location: c.coordinate,
            description: format!(
                "{} strand {} ({}) is not in the design",
                position, slot_index, c.size
            ),
        }),
        (Some(d), Some(c)) => {
            if d.size != c.size {
                out.push(StrandDifference {
                    slot_index,
                    position,
                    issue_type: IssueType::SizeMismatch,
                    design_size: Some(d.size.clone()),
                    cast_size: Some(c.size.clone()),
                    design_location: d.coordinate,
                    cast_location: c.coordinate,
                    description: format!(
                        "{} strand {} size differs: design {}, cast {}",
                        position, slot_index, d.size, c.size
                    ),
                });
            }
            if let (Some(dl), Some(cl)) = (d.coordinate, c.coordinate) {
                let dx = (dl.x - cl.x).0.abs();
                let dy = (dl.y - cl.y).0.abs();
                if dx > options.location_tolerance_in || dy > options.location_tolerance_in {
                    out.push(StrandDifference {
                        slot_index,
                        position,
                        issue_type: IssueType::LocationMismatch,
                        design_size: Some(d.size.clone()),
                        cast_size: Some(c.size.clone()),
                        design_location: Some(dl),
                        cast_location: Some(cl),
                        description: format!(
                            "{} strand {} location differs: design {}, cast {}",
                            position, slot_index, dl, cl
                        ),
                    });
                }
            }
        }
        (None, None) => {}
    }
}

/// Compose the one-line summary for a set of differences between two
/// distinct patterns.
///
/// ```rust
/// use qa_core::strands::summarize;
///
/// assert_eq!(
///     summarize(&[]),
///     "Patterns differ by identity but no structural differences were found"
/// );
/// ```
pub fn summarize(differences: &[StrandDifference]) -> String {
    if differences.is_empty() {
        return "Patterns differ by identity but no structural differences were found".to_string();
    }

    let parts: Vec<String> = IssueType::ALL
        .iter()
        .filter_map(|issue| {
            let count = differences.iter().filter(|d| d.issue_type == *issue).count();
            if count == 0 {
                return None;
            }
            Some(match issue {
                IssueType::MissingInCast => format!("{} strand(s) missing in cast", count),
                IssueType::MissingInDesign => format!("{} strand(s) missing in design", count),
                IssueType::SizeMismatch => format!("{} size mismatch(es)", count),
                IssueType::LocationMismatch => format!("{} location mismatch(es)", count),
            })
        })
        .collect();

    format!("{} difference(s) found: {}", differences.len(), parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(id: &str, slots: &[(&str, Option<(f64, f64)>)]) -> StrandPattern {
        slots
            .iter()
            .fold(StrandPattern::new(id, id), |p, (size, coord)| p.with_slot(*size, *coord))
    }

    #[test]
    fn test_both_absent() {
        let result = compare_strand_patterns(None, None, StrandPosition::Bottom);
        assert!(!result.has_differences);
        assert!(!result.has_design_pattern);
        assert!(!result.has_cast_pattern);
        assert_eq!(result.summary, "No strand pattern specified");
    }

    #[test]
    fn test_one_side_absent() {
        let design = pattern("D", &[("1/2\"", None), ("1/2\"", None)]);

        let result = compare_strand_patterns(Some(&design), None, StrandPosition::Top);
        assert!(result.differences.is_empty());
        assert!(!result.has_differences);
        assert!(result.has_design_pattern);
        assert_eq!(result.summary, "No cast pattern specified");

        let result = compare_strand_patterns(None, Some(&design), StrandPosition::Top);
        assert!(result.differences.is_empty());
        assert_eq!(result.summary, "No design pattern specified");
    }

    #[test]
    fn test_same_id_short_circuits() {
        let design = pattern("P-7", &[("1/2\"", Some((0.0, 0.0)))]);
        let mut altered = pattern("P-7", &[("3/8\"", Some((9.0, 9.0))), ("1/2\"", None)]);
        altered.name = "edited copy".to_string();

        let result = compare_strand_patterns(Some(&design), Some(&altered), StrandPosition::Bottom);
        assert!(!result.has_differences);
        assert_eq!(result.summary, "Patterns are identical");
    }

    #[test]
    fn test_missing_in_cast() {
        let design = pattern("D", &[("1/2\"", Some((0.0, 0.0))), ("1/2\"", Some((2.0, 0.0)))]);
        let cast = pattern("C", &[("1/2\"", Some((0.0, 0.0)))]);

        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        assert_eq!(result.differences.len(), 1);
        let diff = &result.differences[0];
        assert_eq!(diff.slot_index, 2);
        assert_eq!(diff.issue_type, IssueType::MissingInCast);
        assert_eq!(diff.design_size.as_deref(), Some("1/2\""));
        assert_eq!(result.summary, "1 difference(s) found: 1 strand(s) missing in cast");
    }

    #[test]
    fn test_missing_in_design() {
        let design = pattern("D", &[("1/2\"", None)]);
        let cast = pattern("C", &[("1/2\"", None), ("1/2\"", None), ("1/2\"", None)]);

        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Top);
        let indices: Vec<usize> = result.differences.iter().map(|d| d.slot_index).collect();
        assert_eq!(indices, vec![2, 3]);
        assert!(result.differences.iter().all(|d| d.issue_type == IssueType::MissingInDesign));
        assert_eq!(result.summary, "2 difference(s) found: 2 strand(s) missing in design");
    }

    #[test]
    fn test_size_comparison_is_exact_string() {
        let design = pattern("D", &[("1/2\"", None), ("0.5\"", None)]);
        let cast = pattern("C", &[("1/2\"", None), ("1/2\"", None)]);

        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        assert_eq!(result.differences.len(), 1);
        assert_eq!(result.differences[0].issue_type, IssueType::SizeMismatch);
        assert_eq!(result.differences[0].slot_index, 2);
        assert_eq!(result.summary, "1 difference(s) found: 1 size mismatch(es)");
    }

    #[test]
    fn test_location_tolerance_boundary() {
        let design = pattern("D", &[("1/2\"", Some((2.0, 0.0)))]);

        let within = pattern("C1", &[("1/2\"", Some((2.5, 0.0)))]);
        let result = compare_strand_patterns(Some(&design), Some(&within), StrandPosition::Bottom);
        assert!(!result.has_differences);

        let outside = pattern("C2", &[("1/2\"", Some((2.51, 0.0)))]);
        let result = compare_strand_patterns(Some(&design), Some(&outside), StrandPosition::Bottom);
        assert!(result.has_differences);
        assert_eq!(result.differences[0].issue_type, IssueType::LocationMismatch);

        let vertical = pattern("C3", &[("1/2\"", Some((2.0, -0.51)))]);
        let result =
            compare_strand_patterns(Some(&design), Some(&vertical), StrandPosition::Bottom);
        assert_eq!(result.count(IssueType::LocationMismatch), 1);
    }

    #[test]
    fn test_location_skipped_without_both_coordinates() {
        let design = pattern("D", &[("1/2\"", Some((0.0, 0.0)))]);
        let cast = pattern("C", &[("1/2\"", None)]);
        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        assert!(!result.has_differences);
        assert_eq!(
            result.summary,
            "Patterns differ by identity but no structural differences were found"
        );
    }

    #[test]
    fn test_size_and_location_recorded_separately() {
        let design = pattern("D", &[("1/2\"", Some((0.0, 0.0)))]);
        let cast = pattern("C", &[("3/8\"", Some((1.0, 0.0)))]);

        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        let kinds: Vec<IssueType> = result.differences.iter().map(|d| d.issue_type).collect();
        assert_eq!(kinds, vec![IssueType::SizeMismatch, IssueType::LocationMismatch]);
        assert!(result.differences.iter().all(|d| d.slot_index == 1));
        assert_eq!(
            result.summary,
            "2 difference(s) found: 1 size mismatch(es), 1 location mismatch(es)"
        );
    }

    #[test]
    fn test_differences_in_slot_order() {
        let design = pattern(
            "D",
            &[
                ("1/2\"", Some((0.0, 0.0))),
                ("1/2\"", Some((2.0, 0.0))),
                ("1/2\"", Some((4.0, 0.0))),
            ],
        );
        let cast = pattern("C", &[("1/2\"", Some((0.0, 3.0))), ("3/8\"", Some((2.0, 0.0)))]);

        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        let indices: Vec<usize> = result.differences.iter().map(|d| d.slot_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(
            result.summary,
            concat!(
                "3 difference(s) found: 1 strand(s) missing in cast, ",
                "1 size mismatch(es), 1 location mismatch(es)"
            )
        );
    }

    #[test]
    fn test_custom_tolerance() {
        let design = pattern("D", &[("1/2\"", Some((0.0, 0.0)))]);
        let cast = pattern("C", &[("1/2\"", Some((0.75, 0.0)))]);
        let options = ComparisonOptions { location_tolerance_in: 1.0 };

        let result = compare_strand_patterns_with(
            Some(&design),
            Some(&cast),
            StrandPosition::Bottom,
            &options,
        );
        assert!(!result.has_differences);
        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Bottom);
        assert!(result.has_differences);
    }

    #[test]
    fn test_position_labels_descriptions() {
        let design = pattern("D", &[("1/2\"", None)]);
        let cast = pattern("C", &[]);
        let result = compare_strand_patterns(Some(&design), Some(&cast), StrandPosition::Top);
        assert_eq!(result.differences[0].position, StrandPosition::Top);
        assert_eq!(result.differences[0].description, "Top strand 1 (1/2\") is missing in cast");
    }
}
