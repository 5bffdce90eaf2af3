//! # qa_core - Precast QA Calculation Engine
//!
//! `qa_core` is the computational heart of the precast QA tools. It turns
//! sieve weights into gradation metrics checked against an ASTM C33-style
//! envelope, and diffs design strand patterns against as-cast patterns.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: engines are pure functions; every result is a freshly owned value
//! - **JSON-First**: all types implement Serialize/Deserialize
//! - **Rich Errors**: structured error types, never silent defaults
//!
//! ## Quick Start
//!
//! ```rust
//! use qa_core::gradation::{check_compliance, compute_gradation, RawWeight};
//! use qa_core::sieves::AggregateCatalog;
//! use qa_core::strands::{compare_strand_patterns, StrandPosition};
//!
//! let spec = AggregateCatalog::builtin().find("Keystone #7")?;
//! let weights: Vec<RawWeight> = ["0", "200", "300", "400", "100", "0"]
//!     .into_iter()
//!     .map(RawWeight::from)
//!     .collect();
//! let gradation = compute_gradation(spec, &weights, None)?;
//! let report = check_compliance(&gradation.sieve_results, &spec.envelope())?;
//! assert!(!report.passes_envelope);
//!
//! let comparison = compare_strand_patterns(None, None, StrandPosition::Bottom);
//! assert!(!comparison.has_differences);
//! # Ok::<(), qa_core::errors::QaError>(())
//! ```
//!
//! ## Modules
//!
//! - [`sieves`] - Sieve stack model and aggregate catalog
//! - [`gradation`] - Gradation calculator and compliance checker
//! - [`strands`] - Strand pattern comparator and report formatters
//! - [`record`] - Test records built from operator submissions
//! - [`logbook`] - Logbook container, settings
//! - [`file_io`] - Logbook files with atomic saves and locking
//! - [`units`] - Unit newtypes
//! - [`errors`] - Structured error types

pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod gradation;
pub mod logbook;
pub mod record;
pub mod sieves;
pub mod strands;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use errors::{QaError, QaResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_logbook, save_logbook, FileLock};
pub use gradation::{
    check_compliance, compute_gradation, ComplianceReport, GradationResult, RawWeight,
};
pub use logbook::{QaLogbook, QaSettings};
pub use record::{TestRecord, TestSubmission};
pub use sieves::{AggregateCatalog, AggregateClass, AggregateSpecification, ComplianceBounds};
pub use strands::{
    compare_strand_patterns, format_comparison_for_display, format_comparison_for_report,
    ComparisonResult, StrandPattern, StrandPosition,
};
