//! Feature extraction for credit-scoring model training and inference
//!
//! Turns one (loan, customer) pair into a fixed-schema numeric feature vector
//! plus a binary repayment label. The schema is identical for training and
//! inference; missing inputs are carried as `NaN` for the preparer to impute
//! or drop.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::data::{Dataset, DatasetMetadata, FeatureVector, LabeledExample};

/// Terminal and in-flight loan outcomes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Fully repaid
    Completed,
    /// Went into default
    Defaulted,
    /// Application rejected
    Rejected,
    /// Still running; not usable as a training outcome
    Active,
    /// Awaiting decision; not usable as a training outcome
    Pending,
}

impl LoanStatus {
    /// Whether the loan has a final outcome
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Defaulted | LoanStatus::Rejected
        )
    }
}

/// A loan completed before the current application, with its outcome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorLoan {
    pub status: LoanStatus,
    pub date: NaiveDate,
}

/// Customer-side raw inputs supplied by the collaborator
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Used to derive age when `age` is not supplied directly
    pub birth_date: Option<NaiveDate>,
    pub age: Option<f64>,
    pub employment_months: Option<f64>,
    pub dependents: Option<f64>,
    /// Free-form category, label-encoded via a fixed lookup
    pub employment_category: String,
    pub monthly_income: Option<f64>,
    pub monthly_expenses: Option<f64>,
    pub savings: Option<f64>,
    pub existing_debt: Option<f64>,
    /// Digital engagement score from the collaborator's analytics
    pub engagement_score: Option<f64>,
    /// Average response time to notifications, in hours
    pub response_hours: Option<f64>,
    pub auto_payment: bool,
    /// Loans with a date strictly before the current loan's creation
    pub prior_loans: Vec<PriorLoan>,
}

/// Loan-side raw inputs supplied by the collaborator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: String,
    pub amount: Option<f64>,
    pub term_months: Option<f64>,
    pub status: LoanStatus,
    pub created_at: NaiveDate,
}

/// Per-record extraction failure; skipped in batch extraction, not fatal
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("loan {0} has non-terminal status {1:?}")]
    NonTerminalStatus(String, LoanStatus),
}

/// Ratio features are clamped into this range
pub const RATIO_MIN: f64 = 0.0;
pub const RATIO_MAX: f64 = 2.0;

/// Fixed label encoding for employment categories; unknown maps to 0
pub fn encode_employment(category: &str) -> f64 {
    match category {
        "unemployed" => 1.0,
        "student" => 2.0,
        "self_employed" => 3.0,
        "temporary" => 4.0,
        "permanent" => 5.0,
        "retired" => 6.0,
        _ => 0.0,
    }
}

/// Base features that also get a `log(x+1)` companion to reduce skew
const LOG_COMPANIONS: [&str; 6] = [
    "age",
    "monthly_income",
    "monthly_expenses",
    "savings",
    "existing_debt",
    "loan_amount",
];

/// Transforms (loan, customer) pairs into labeled feature vectors.
///
/// Pure function of its inputs: no side effects beyond a `tracing` warning
/// when a record in a batch cannot be extracted.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// The fixed feature-name schema, in vector (alphabetical) order
    pub fn schema(&self) -> Vec<String> {
        let mut names = vec![
            "age".to_string(),
            "auto_payment".to_string(),
            "debt_to_income".to_string(),
            "dependents".to_string(),
            "employment_months".to_string(),
            "employment_type".to_string(),
            "engagement_score".to_string(),
            "existing_debt".to_string(),
            "loan_amount".to_string(),
            "loan_to_income".to_string(),
            "monthly_expenses".to_string(),
            "monthly_income".to_string(),
            "prior_completed_ratio".to_string(),
            "prior_loan_count".to_string(),
            "response_hours".to_string(),
            "savings".to_string(),
            "savings_to_income".to_string(),
            "term_months".to_string(),
        ];
        for base in LOG_COMPANIONS {
            names.push(format!("{base}_log"));
        }
        names.sort();
        names
    }

    /// Extract one labeled example.
    ///
    /// Label is `true` iff the loan status is exactly `Completed`; any other
    /// terminal status (defaulted, rejected) labels `false`. Non-terminal
    /// loans are rejected.
    pub fn extract(
        &self,
        loan: &LoanRecord,
        customer: &CustomerRecord,
    ) -> Result<LabeledExample, ExtractError> {
        if !loan.status.is_terminal() {
            return Err(ExtractError::NonTerminalStatus(loan.id.clone(), loan.status));
        }

        let mut features: FeatureVector = BTreeMap::new();
        let missing = f64::NAN;

        let age = customer.age.or_else(|| {
            customer
                .birth_date
                .map(|b| (loan.created_at - b).num_days() as f64 / 365.25)
        });

        features.insert("age".into(), age.unwrap_or(missing));
        features.insert(
            "employment_months".into(),
            customer.employment_months.unwrap_or(missing),
        );
        features.insert("dependents".into(), customer.dependents.unwrap_or(missing));
        features.insert(
            "employment_type".into(),
            encode_employment(&customer.employment_category),
        );
        features.insert(
            "monthly_income".into(),
            customer.monthly_income.unwrap_or(missing),
        );
        features.insert(
            "monthly_expenses".into(),
            customer.monthly_expenses.unwrap_or(missing),
        );
        features.insert("savings".into(), customer.savings.unwrap_or(missing));
        features.insert(
            "existing_debt".into(),
            customer.existing_debt.unwrap_or(missing),
        );
        features.insert("loan_amount".into(), loan.amount.unwrap_or(missing));
        features.insert("term_months".into(), loan.term_months.unwrap_or(missing));
        features.insert(
            "engagement_score".into(),
            customer.engagement_score.unwrap_or(missing),
        );
        features.insert(
            "response_hours".into(),
            customer.response_hours.unwrap_or(missing),
        );
        features.insert(
            "auto_payment".into(),
            if customer.auto_payment { 1.0 } else { 0.0 },
        );

        // Prior history: only loans dated strictly before this application
        let priors: Vec<&PriorLoan> = customer
            .prior_loans
            .iter()
            .filter(|p| p.date < loan.created_at)
            .collect();
        let prior_count = priors.len() as f64;
        let prior_completed = priors
            .iter()
            .filter(|p| p.status == LoanStatus::Completed)
            .count() as f64;
        features.insert("prior_loan_count".into(), prior_count);
        features.insert(
            "prior_completed_ratio".into(),
            if priors.is_empty() {
                0.0
            } else {
                prior_completed / prior_count
            },
        );

        let income = customer.monthly_income.unwrap_or(0.0);
        let annual = income * 12.0;
        let debt = customer.existing_debt.unwrap_or(missing);
        let amount = loan.amount.unwrap_or(missing);
        let savings = customer.savings.unwrap_or(missing);

        // Zero income signals maximal risk for debt/loan ratios and minimal
        // savings cover, instead of dividing by zero.
        features.insert("debt_to_income".into(), income_ratio(debt, annual, 1.0));
        features.insert("loan_to_income".into(), income_ratio(amount, annual, 1.0));
        features.insert(
            "savings_to_income".into(),
            income_ratio(savings, income, 0.0),
        );

        // Skew-reducing companions: ln(x+1) when the base is positive,
        // 0.0 otherwise so the schema stays fixed.
        for base in LOG_COMPANIONS {
            let value = *features.get(base).unwrap_or(&missing);
            let companion = if value.is_finite() && value > 0.0 {
                (value + 1.0).ln()
            } else {
                0.0
            };
            features.insert(format!("{base}_log"), companion);
        }

        Ok(LabeledExample {
            features,
            label: loan.status == LoanStatus::Completed,
        })
    }

    /// Extract a batch into a [`Dataset`].
    ///
    /// Individual failures are skipped with a warning and reflected in the
    /// metadata's success ratio; they never fail the batch.
    pub fn extract_batch(&self, pairs: &[(LoanRecord, CustomerRecord)]) -> Dataset {
        let mut examples = Vec::with_capacity(pairs.len());
        for (loan, customer) in pairs {
            match self.extract(loan, customer) {
                Ok(example) => examples.push(example),
                Err(err) => {
                    warn!(loan_id = %loan.id, error = %err, "skipping unextractable record");
                }
            }
        }
        let metadata = DatasetMetadata::new(pairs.len(), examples.len());
        Dataset::new(self.schema(), examples, metadata)
    }
}

/// Clamped ratio of `numerator / denominator`; `fallback` when the
/// denominator is zero or either side is missing on the denominator path.
fn income_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator <= 0.0 || !denominator.is_finite() {
        return fallback;
    }
    if !numerator.is_finite() {
        return f64::NAN; // still imputable downstream
    }
    (numerator / denominator).clamp(RATIO_MIN, RATIO_MAX)
}
