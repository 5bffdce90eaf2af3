//! # QA Logbook
//!
//! The `QaLogbook` is the root container a plant keeps its QA data in.
//! Logbooks serialize to `.pqa` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! QaLogbook
//! ├── meta: LogbookMetadata (version, plant, technician, timestamps)
//! ├── settings: QaSettings (comparison tolerance)
//! ├── catalog: AggregateCatalog (aggregate specifications by name)
//! ├── records: HashMap<Uuid, TestRecord>
//! └── patterns: HashMap<String, StrandPattern>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use qa_core::logbook::QaLogbook;
//! use qa_core::record::TestSubmission;
//!
//! let mut logbook = QaLogbook::new("North Plant", "J. Rivera");
//! let id = logbook
//!     .submit_test(&TestSubmission::new(
//!         "Keystone #7",
//!         NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
//!         ["0", "200", "300", "400", "100", "0"],
//!     ))
//!     .unwrap();
//!
//! assert!(!logbook.get_test(&id).unwrap().passes_envelope);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{QaError, QaResult};
use crate::record::{TestRecord, TestSubmission};
use crate::sieves::{AggregateCatalog, AggregateSpecification};
use crate::strands::{
    compare_strand_patterns_with, ComparisonOptions, ComparisonResult, StrandPattern,
    StrandPosition, DEFAULT_LOCATION_TOLERANCE_IN,
};

/// Current schema version for .pqa files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root logbook container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaLogbook {
    /// Logbook metadata (version, plant, technician)
    pub meta: LogbookMetadata,

    /// Engine settings
    #[serde(default)]
    pub settings: QaSettings,

    /// Aggregate specifications available for testing
    pub catalog: AggregateCatalog,

    /// Gradation test records, keyed by UUID
    #[serde(default)]
    pub records: HashMap<Uuid, TestRecord>,

    /// Strand patterns, keyed by pattern id
    #[serde(default)]
    pub patterns: HashMap<String, StrandPattern>,
}

impl QaLogbook {
    /// Create a logbook seeded with the built-in aggregate catalog.
    pub fn new(plant: impl Into<String>, technician: impl Into<String>) -> Self {
        let now = Utc::now();
        QaLogbook {
            meta: LogbookMetadata {
                version: SCHEMA_VERSION.to_string(),
                plant: plant.into(),
                technician: technician.into(),
                created: now,
                modified: now,
            },
            settings: QaSettings::default(),
            catalog: AggregateCatalog::builtin().clone(),
            records: HashMap::new(),
            patterns: HashMap::new(),
        }
    }

    /// Look up an aggregate specification by name.
    pub fn specification(&self, name: &str) -> QaResult<&AggregateSpecification> {
        self.catalog.find(name)
    }

    /// Evaluate a submission against its named specification and store the record.
    ///
    /// Returns the new record's UUID.
    pub fn submit_test(&mut self, submission: &TestSubmission) -> QaResult<Uuid> {
        let spec = self.catalog.find(&submission.aggregate_name)?;
        let record = TestRecord::create(spec, submission)?;
        let id = record.id;
        self.records.insert(id, record);
        self.touch();
        Ok(id)
    }

    /// Edit a stored record in place, recomputing every derived field.
    pub fn update_test(&mut self, id: &Uuid, submission: &TestSubmission) -> QaResult<()> {
        let spec = self.catalog.find(&submission.aggregate_name)?;
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| QaError::RecordNotFound { id: id.to_string() })?;
        record.recompute(spec, submission)?;
        self.touch();
        Ok(())
    }

    /// Recompute every record against the current catalog.
    ///
    /// Records whose recomputation fails keep their previous values; their ids
    /// and errors are returned.
    pub fn recompute_all(&mut self) -> Vec<(Uuid, QaError)> {
        let mut failures = Vec::new();
        for (id, record) in self.records.iter_mut() {
            let submission = record.submission();
            let outcome = self
                .catalog
                .find(&submission.aggregate_name)
                .and_then(|spec| record.recompute(spec, &submission));
            if let Err(e) = outcome {
                warn!(%id, error = %e, "record could not be recomputed");
                failures.push((*id, e));
            }
        }
        self.touch();
        failures
    }

    /// Remove a record by UUID.
    pub fn remove_test(&mut self, id: &Uuid) -> Option<TestRecord> {
        let record = self.records.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Get a record by UUID.
    pub fn get_test(&self, id: &Uuid) -> Option<&TestRecord> {
        self.records.get(id)
    }

    /// Records for one aggregate product, oldest test date first
    pub fn tests_for(&self, aggregate_name: &str) -> Vec<&TestRecord> {
        let mut records: Vec<&TestRecord> = self
            .records
            .values()
            .filter(|r| r.aggregate_name == aggregate_name)
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.timestamp.cmp(&b.timestamp)));
        records
    }

    /// Register (or replace) a specification
    pub fn add_specification(&mut self, spec: AggregateSpecification) -> QaResult<()> {
        self.catalog.insert(spec)?;
        self.touch();
        Ok(())
    }

    /// Store a strand pattern under its id, returning any pattern it replaced.
    pub fn add_pattern(&mut self, pattern: StrandPattern) -> Option<StrandPattern> {
        let previous = self.patterns.insert(pattern.id.clone(), pattern);
        self.touch();
        previous
    }

    /// Get a strand pattern by id.
    pub fn get_pattern(&self, id: &str) -> Option<&StrandPattern> {
        self.patterns.get(id)
    }

    /// Compare two stored patterns by id.
    ///
    /// `None` ids are "no pattern assigned" and handled by the comparator; an
    /// id that is given but not stored is a `PatternNotFound` error.
    pub fn compare_patterns(
        &self,
        design_id: Option<&str>,
        cast_id: Option<&str>,
        position: StrandPosition,
    ) -> QaResult<ComparisonResult> {
        let design = design_id.map(|id| self.pattern_or_err(id)).transpose()?;
        let cast = cast_id.map(|id| self.pattern_or_err(id)).transpose()?;
        let options = self.settings.comparison_options();
        Ok(compare_strand_patterns_with(design, cast, position, &options))
    }

    fn pattern_or_err(&self, id: &str) -> QaResult<&StrandPattern> {
        self.patterns
            .get(id)
            .ok_or_else(|| QaError::PatternNotFound { id: id.to_string() })
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn test_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for QaLogbook {
    fn default() -> Self {
        QaLogbook::new("", "")
    }
}

/// Logbook metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogbookMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Precast plant name
    pub plant: String,

    /// QA technician responsible for the logbook
    pub technician: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaSettings {
    /// Per-axis strand location tolerance in inches
    pub location_tolerance_in: f64,
}

impl Default for QaSettings {
    fn default() -> Self {
        QaSettings {
            location_tolerance_in: DEFAULT_LOCATION_TOLERANCE_IN,
        }
    }
}

impl QaSettings {
    /// Comparator options derived from these settings
    pub fn comparison_options(&self) -> ComparisonOptions {
        ComparisonOptions {
            location_tolerance_in: self.location_tolerance_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn submission(day: u32, weights: [&str; 6]) -> TestSubmission {
        TestSubmission::new("Keystone #7", NaiveDate::from_ymd_opt(2025, 3, day).unwrap(), weights)
    }

    #[test]
    fn test_logbook_creation() {
        let logbook = QaLogbook::new("North Plant", "J. Rivera");
        assert_eq!(logbook.meta.plant, "North Plant");
        assert_eq!(logbook.meta.version, SCHEMA_VERSION);
        assert_eq!(logbook.settings.location_tolerance_in, 0.5);
        assert!(logbook.specification("Concrete Sand").is_ok());
    }

    #[test]
    fn test_submit_unknown_aggregate() {
        let mut logbook = QaLogbook::default();
        let bad =
            TestSubmission::new("River Rock", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), ["1"]);
        let err = logbook.submit_test(&bad).unwrap_err();
        assert_eq!(err, QaError::missing_specification("River Rock"));
        assert_eq!(logbook.test_count(), 0);
    }

    #[test]
    fn test_submit_update_remove() {
        let mut logbook = QaLogbook::default();
        let id = logbook
            .submit_test(&submission(1, ["0", "200", "300", "400", "100", "0"]))
            .unwrap();
        assert!(!logbook.get_test(&id).unwrap().passes_envelope);

        logbook.update_test(&id, &submission(1, ["0", "600", "250", "100", "50", "0"])).unwrap();
        assert!(logbook.get_test(&id).unwrap().passes_envelope);

        assert!(logbook.remove_test(&id).is_some());
        assert_eq!(logbook.test_count(), 0);
    }

    #[test]
    fn test_update_missing_record() {
        let mut logbook = QaLogbook::default();
        let err = logbook
            .update_test(&Uuid::new_v4(), &submission(1, ["0", "200", "300", "400", "100", "0"]))
            .unwrap_err();
        assert_eq!(err.error_code(), "RECORD_NOT_FOUND");
    }

    #[test]
    fn test_tests_for_sorted_by_date() {
        let mut logbook = QaLogbook::default();
        logbook.submit_test(&submission(9, ["0", "200", "300", "400", "100", "0"])).unwrap();
        logbook.submit_test(&submission(2, ["0", "600", "250", "100", "50", "0"])).unwrap();

        let days: Vec<u32> = logbook
            .tests_for("Keystone #7")
            .iter()
            .map(|r| chrono::Datelike::day(&r.date))
            .collect();
        assert_eq!(days, vec![2, 9]);
        assert!(logbook.tests_for("Concrete Sand").is_empty());
    }

    #[test]
    fn test_recompute_all_after_spec_change() {
        let mut logbook = QaLogbook::default();
        let id = logbook
            .submit_test(&submission(1, ["0", "200", "300", "400", "100", "0"]))
            .unwrap();

        let mut relaxed = logbook.specification("Keystone #7").unwrap().clone();
        relaxed.sieves[1].bounds = crate::sieves::ComplianceBounds::range(20.0, 85.0);
        logbook.add_specification(relaxed).unwrap();

        assert!(logbook.recompute_all().is_empty());
        assert!(logbook.get_test(&id).unwrap().passes_envelope);
    }

    #[test]
    fn test_compare_stored_patterns() {
        let mut logbook = QaLogbook::default();
        logbook.add_pattern(StrandPattern::new("D", "Design").with_slot("1/2\"", Some((0.0, 0.0))));
        logbook.add_pattern(StrandPattern::new("C", "Cast").with_slot("1/2\"", Some((0.75, 0.0))));

        let result = logbook
            .compare_patterns(Some("D"), Some("C"), StrandPosition::Bottom)
            .unwrap();
        assert!(result.has_differences);

        logbook.settings.location_tolerance_in = 1.0;
        let result = logbook
            .compare_patterns(Some("D"), Some("C"), StrandPosition::Bottom)
            .unwrap();
        assert!(!result.has_differences);

        let result = logbook.compare_patterns(None, Some("C"), StrandPosition::Top).unwrap();
        assert_eq!(result.summary, "No design pattern specified");
    }

    #[test]
    fn test_compare_unknown_pattern_id() {
        let logbook = QaLogbook::default();
        let err = logbook.compare_patterns(Some("X"), None, StrandPosition::Bottom).unwrap_err();
        assert_eq!(err, QaError::PatternNotFound { id: "X".to_string() });
    }

    #[test]
    fn test_logbook_serialization() {
        let mut logbook = QaLogbook::new("North Plant", "J. Rivera");
        let id = logbook
            .submit_test(&submission(1, ["0", "200", "300", "400", "100", "0"]))
            .unwrap();
        logbook.add_pattern(StrandPattern::new("D", "Design").with_slot("1/2\"", None));

        let json = serde_json::to_string_pretty(&logbook).unwrap();
        let roundtrip: QaLogbook = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.meta.plant, "North Plant");
        assert_eq!(roundtrip.get_test(&id), logbook.get_test(&id));
        assert_eq!(roundtrip.get_pattern("D"), logbook.get_pattern("D"));
        assert_eq!(roundtrip.catalog, logbook.catalog);
    }
}
