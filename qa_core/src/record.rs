//! # Test Records
//!
//! A [`TestRecord`] is the stored outcome of one gradation test: the derived
//! sieve results, the single-value metrics and the compliance verdict. Records
//! are created once per submission and only change through
//! [`TestRecord::recompute`], which rebuilds every derived field.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use qa_core::record::{TestRecord, TestSubmission};
//! use qa_core::sieves::AggregateCatalog;
//!
//! let spec = AggregateCatalog::builtin().find("Keystone #7").unwrap();
//! let submission = TestSubmission::new(
//!     "Keystone #7",
//!     NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
//!     ["0", "200", "300", "400", "100", "0"],
//! );
//!
//! let record = TestRecord::create(spec, &submission).unwrap();
//! assert!(!record.passes_envelope);
//! assert_eq!(record.failed_sieves[0].sieve, "1/2\"");
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::{QaError, QaResult};
use crate::gradation::{
    check_compliance, check_limits, compute_gradation, DerivedSieveResult, GradationResult,
    LimitCheck, RawWeight, SieveFailure,
};
use crate::sieves::AggregateSpecification;
use crate::units::Grams;

/// Operator input for one test, as captured by the entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSubmission {
    /// Aggregate product the sample was drawn from
    pub aggregate_name: String,

    /// Date the sample was tested
    pub date: NaiveDate,

    /// One raw weight per sieve, in specification order
    pub weights: Vec<RawWeight>,

    /// Post-wash weight (fine aggregates)
    #[serde(default)]
    pub washed_weight: Option<RawWeight>,
}

impl TestSubmission {
    /// Create a submission without a washed weight
    pub fn new<W, I>(aggregate_name: impl Into<String>, date: NaiveDate, weights: I) -> Self
    where
        W: Into<RawWeight>,
        I: IntoIterator<Item = W>,
    {
        TestSubmission {
            aggregate_name: aggregate_name.into(),
            date,
            weights: weights.into_iter().map(Into::into).collect(),
            washed_weight: None,
        }
    }

    /// Builder: attach a washed weight
    pub fn with_washed_weight(mut self, washed: impl Into<RawWeight>) -> Self {
        self.washed_weight = Some(washed.into());
        self
    }
}

/// Stored result of one gradation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Unique record id
    pub id: Uuid,

    /// When the record was created or last recomputed
    pub timestamp: DateTime<Utc>,

    /// Specification the sample was tested against
    pub aggregate_name: String,

    /// Date the sample was tested
    pub date: NaiveDate,

    /// Per-sieve results, largest aperture first
    pub sieve_results: Vec<DerivedSieveResult>,

    pub total_weight: Grams,

    /// Fine aggregates only
    pub washed_weight: Option<Grams>,

    /// Fine aggregates only
    pub fineness_modulus: Option<f64>,

    /// Fine aggregates with a washed weight only
    pub decant: Option<f64>,

    /// Envelope verdict; false whenever the sample was not evaluable
    pub passes_envelope: bool,

    /// Sieves outside their band
    #[serde(default)]
    pub failed_sieves: Vec<SieveFailure>,

    /// Decant / fineness modulus limit checks
    #[serde(default)]
    pub limit_checks: Vec<LimitCheck>,
}

/// Everything derived from a submission, before it is stamped into a record.
struct Evaluation {
    gradation: GradationResult,
    passes_envelope: bool,
    failed_sieves: Vec<SieveFailure>,
    limit_checks: Vec<LimitCheck>,
}

fn evaluate(spec: &AggregateSpecification, submission: &TestSubmission) -> QaResult<Evaluation> {
    if submission.aggregate_name != spec.name {
        return Err(QaError::invalid_specification(
            &spec.name,
            format!("Submission is for '{}'", submission.aggregate_name),
        ));
    }

    let gradation =
        compute_gradation(spec, &submission.weights, submission.washed_weight.as_ref())?;
    let compliance = check_compliance(&gradation.sieve_results, &spec.envelope())?;
    let limit_checks = check_limits(spec, &gradation);

    Ok(Evaluation {
        passes_envelope: compliance.passes_envelope,
        failed_sieves: compliance.failed_sieves,
        limit_checks,
        gradation,
    })
}

impl TestRecord {
    /// Evaluate a submission and create a new record with a fresh id.
    ///
    /// # Errors
    ///
    /// * `InvalidSpecification` - submission names a different product than `spec`
    /// * Any error from [`compute_gradation`] or [`check_compliance`]
    pub fn create(
        spec: &AggregateSpecification,
        submission: &TestSubmission,
    ) -> QaResult<TestRecord> {
        let evaluation = evaluate(spec, submission)?;
        let record = TestRecord::from_evaluation(Uuid::new_v4(), submission.date, evaluation);
        info!(
            id = %record.id,
            aggregate = %record.aggregate_name,
            passes = record.passes_envelope,
            "created test record"
        );
        Ok(record)
    }

    /// Replace this record's inputs and recompute every derived field.
    ///
    /// The id is kept. On error the record is left unchanged.
    pub fn recompute(
        &mut self,
        spec: &AggregateSpecification,
        submission: &TestSubmission,
    ) -> QaResult<()> {
        let evaluation = evaluate(spec, submission)?;
        *self = TestRecord::from_evaluation(self.id, submission.date, evaluation);
        info!(id = %self.id, passes = self.passes_envelope, "recomputed test record");
        Ok(())
    }

    /// Reconstruct the submission this record was computed from.
    ///
    /// Blank sieves come back as blank text entries.
    pub fn submission(&self) -> TestSubmission {
        TestSubmission {
            aggregate_name: self.aggregate_name.clone(),
            date: self.date,
            weights: self
                .sieve_results
                .iter()
                .map(|r| match r.measurement.weight_retained {
                    Some(g) => RawWeight::Number(g.0),
                    None => RawWeight::Text(String::new()),
                })
                .collect(),
            washed_weight: self.washed_weight.map(|g| RawWeight::Number(g.0)),
        }
    }

    /// Whether percentages could be computed for this sample
    pub fn is_evaluable(&self) -> bool {
        self.total_weight.0 > 0.0
    }

    /// Whether the envelope and every limit check passed
    pub fn passes_all(&self) -> bool {
        self.passes_envelope && self.limit_checks.iter().all(|c| c.passes)
    }

    fn from_evaluation(id: Uuid, date: NaiveDate, evaluation: Evaluation) -> TestRecord {
        let Evaluation {
            gradation,
            passes_envelope,
            failed_sieves,
            limit_checks,
        } = evaluation;

        TestRecord {
            id,
            timestamp: Utc::now(),
            aggregate_name: gradation.aggregate_name,
            date,
            sieve_results: gradation.sieve_results,
            total_weight: gradation.total_weight,
            washed_weight: gradation.washed_weight,
            fineness_modulus: gradation.fineness_modulus,
            decant: gradation.decant,
            passes_envelope,
            failed_sieves,
            limit_checks,
        }
    }
}
