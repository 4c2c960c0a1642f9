//! Premium quote engine.
//!
//! Pure decimal arithmetic, no I/O. The engine validates the applicant
//! against the policy's eligibility bounds, derives a risk multiplier from
//! age, gender, and smoking status, and prices the premium:
//!
//! ```text
//! annual  = coverage * base_rate * duration_years * multiplier
//! monthly = annual / 12
//! ```
//!
//! Both premiums are rounded to cents. All arithmetic uses [`Decimal`] so
//! the same inputs always price to the same cent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aegis_core::Gender;

use crate::api::types::Policy;

/// Age below which the youth surcharge applies.
const YOUTH_AGE_LIMIT: u32 = 25;
/// Age above which the senior surcharge applies.
const SENIOR_AGE_LIMIT: u32 = 50;

/// Errors from quote validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    /// Applicant age is outside the policy's eligibility window.
    #[error("age {age} is outside the eligible range {min}-{max}")]
    AgeOutOfRange { age: u32, min: u32, max: u32 },

    /// Requested coverage is outside the policy's bounds.
    #[error("coverage {coverage} is outside the range {min}-{max}")]
    CoverageOutOfRange {
        coverage: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// Requested term length is not offered by the policy.
    #[error("a {duration_years}-year term is not offered for this policy")]
    DurationNotOffered { duration_years: u32 },
}

/// Applicant details from the quote form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    /// Applicant age in years.
    pub age: u32,
    /// Applicant gender.
    pub gender: Gender,
    /// Requested coverage amount.
    pub coverage: Decimal,
    /// Requested term length in years.
    pub duration_years: u32,
    /// Whether the applicant smokes.
    pub smoker: bool,
}

/// A priced quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Premium per month, rounded to cents.
    pub monthly_premium: Decimal,
    /// Premium per year, rounded to cents.
    pub annual_premium: Decimal,
}

/// Risk multiplier for an applicant profile.
///
/// Starts at 1.0. Age adds a single surcharge (youth or senior, never
/// both), women get a discount, smokers a surcharge.
#[must_use]
pub fn risk_multiplier(input: &QuoteInput) -> Decimal {
    let mut multiplier = Decimal::ONE;

    if input.age < YOUTH_AGE_LIMIT {
        multiplier += Decimal::new(2, 1); // +0.2
    } else if input.age > SENIOR_AGE_LIMIT {
        multiplier += Decimal::new(4, 1); // +0.4
    }

    if input.gender == Gender::Female {
        multiplier -= Decimal::new(1, 1); // -0.1
    }

    if input.smoker {
        multiplier += Decimal::new(5, 1); // +0.5
    }

    multiplier
}

/// Price a quote for an applicant against a policy.
///
/// # Errors
///
/// Returns a [`QuoteError`] if the applicant falls outside the policy's
/// eligibility bounds. Pricing itself cannot fail.
pub fn compute(policy: &Policy, input: &QuoteInput) -> Result<Quote, QuoteError> {
    validate(policy, input)?;

    let multiplier = risk_multiplier(input);
    let annual = input.coverage
        * policy.base_premium_rate
        * Decimal::from(input.duration_years)
        * multiplier;

    let annual_premium = annual.round_dp(2);
    let monthly_premium = (annual / Decimal::from(12)).round_dp(2);

    Ok(Quote {
        monthly_premium,
        annual_premium,
    })
}

fn validate(policy: &Policy, input: &QuoteInput) -> Result<(), QuoteError> {
    if input.age < policy.min_age || input.age > policy.max_age {
        return Err(QuoteError::AgeOutOfRange {
            age: input.age,
            min: policy.min_age,
            max: policy.max_age,
        });
    }

    if input.coverage < policy.coverage_min || input.coverage > policy.coverage_max {
        return Err(QuoteError::CoverageOutOfRange {
            coverage: input.coverage,
            min: policy.coverage_min,
            max: policy.coverage_max,
        });
    }

    if !policy.duration_options.contains(&input.duration_years) {
        return Err(QuoteError::DurationNotOffered {
            duration_years: input.duration_years,
        });
    }

    Ok(())
}
