//! Renderings of a [`ComparisonResult`].
//!
//! Both formatters are deterministic and read nothing but the comparison
//! result: no dates, no environment, so the same result always renders to the
//! same text.
//!
//! - [`format_comparison_for_display`] - plain text for screens and logs
//! - [`format_comparison_for_report`] - Typst markup for inclusion in a QA report

use super::{ComparisonResult, StrandCoordinate, StrandDifference};

/// Typst fragment for one comparison section
const REPORT_TEMPLATE: &str = r##"
== {{POSITION}} Strand Pattern Comparison

#table(
  columns: (auto, 1fr),
  stroke: none,
  row-gutter: 4pt,
  [Design pattern:], [{{DESIGN_STATUS}}],
  [Cast pattern:], [{{CAST_STATUS}}],
  [Result:], [#text(weight: "bold", fill: {{RESULT_COLOR}})[{{RESULT}}]],
)

{{SUMMARY}}

{{DIFFERENCES}}
"##;

/// Plain-text rendering.
///
/// ```rust
/// use qa_core::strands::{compare_strand_patterns, format_comparison_for_display, StrandPosition};
///
/// let result = compare_strand_patterns(None, None, StrandPosition::Bottom);
/// let text = format_comparison_for_display(&result);
/// assert!(text.contains("No strand pattern specified"));
/// ```
pub fn format_comparison_for_display(result: &ComparisonResult) -> String {
    let mut lines = vec![
        format!("{} Strand Pattern Comparison", result.position),
        format!("Design pattern: {}", presence(result.has_design_pattern)),
        format!("Cast pattern: {}", presence(result.has_cast_pattern)),
        format!("Result: {}", verdict(result)),
        format!("Summary: {}", result.summary),
    ];

    if result.has_differences {
        lines.push(String::new());
        lines.push("Differences:".to_string());
        for (i, diff) in result.differences.iter().enumerate() {
            lines.push(format!("  {}. [{}] {}", i + 1, diff.issue_type.as_str(), diff.description));
        }
    }

    lines.join("\n")
}

/// Typst markup rendering, suitable for splicing into a report document.
pub fn format_comparison_for_report(result: &ComparisonResult) -> String {
    let pass = !result.has_differences && result.has_design_pattern && result.has_cast_pattern;
    let color = if pass {
        "green"
    } else if result.has_differences {
        "red"
    } else {
        "gray"
    };
    REPORT_TEMPLATE
        .replace("{{POSITION}}", result.position.display_name())
        .replace("{{DESIGN_STATUS}}", presence(result.has_design_pattern))
        .replace("{{CAST_STATUS}}", presence(result.has_cast_pattern))
        .replace("{{RESULT_COLOR}}", color)
        .replace("{{RESULT}}", verdict(result))
        .replace("{{SUMMARY}}", &escape_typst(&result.summary))
        .replace("{{DIFFERENCES}}", &build_difference_table(&result.differences))
        .trim()
        .to_string()
}

fn presence(present: bool) -> &'static str {
    if present {
        "Provided"
    } else {
        "Not specified"
    }
}

fn verdict(result: &ComparisonResult) -> &'static str {
    if result.has_differences {
        "DIFFERENCES FOUND"
    } else if result.has_design_pattern && result.has_cast_pattern {
        "MATCH"
    } else {
        "INCOMPLETE"
    }
}

fn build_difference_table(differences: &[StrandDifference]) -> String {
    if differences.is_empty() {
        return String::new();
    }

    let rows = differences
        .iter()
        .map(|d| {
            format!(
                "  [{}], [{}], [{}], [{}], [{}], [{}],",
                d.slot_index,
                escape_typst(d.issue_type.as_str()),
                escape_typst(d.design_size.as_deref().unwrap_or("-")),
                escape_typst(d.cast_size.as_deref().unwrap_or("-")),
                location(d.design_location),
                location(d.cast_location),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"#table(
  columns: (auto, auto, auto, auto, 1fr, 1fr),
  inset: 6pt,
  stroke: 0.5pt,
  table.header([*Slot*], [*Issue*], [*Design Size*], [*Cast Size*], [*Design Location*], [*Cast Location*]),
{}
)"#,
        rows
    )
}

fn location(coordinate: Option<StrandCoordinate>) -> String {
    coordinate.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}
