//! Status and attribute enums shared across the portal.

use serde::{Deserialize, Serialize};

/// Application review status.
///
/// New applications are always created `Pending`; only an admin review
/// moves them to `Approved` or `Rejected`. Stored capitalized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Whether payment collection is open for an application in this status.
    #[must_use]
    pub const fn payable(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid application status: {s}")),
        }
    }
}

/// Premium payment status on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Due,
    Paid,
}

/// Claim review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClaimStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// How often a premium is collected.
///
/// Annual billing carries a 10% discount over twelve monthly installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    #[default]
    Monthly,
    Annual,
}

impl std::fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Annual => write!(f, "annual"),
        }
    }
}

/// Applicant gender as collected on the quote form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_application_status_wire_format_is_capitalized() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Pending).unwrap(),
            "\"Pending\""
        );
        let status: ApplicationStatus = serde_json::from_str("\"Approved\"").unwrap();
        assert_eq!(status, ApplicationStatus::Approved);
    }

    #[test]
    fn test_only_approved_is_payable() {
        assert!(ApplicationStatus::Approved.payable());
        assert!(!ApplicationStatus::Pending.payable());
        assert!(!ApplicationStatus::Rejected.payable());
    }

    #[test]
    fn test_payment_frequency_wire_format_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentFrequency::Monthly).unwrap(),
            "\"monthly\""
        );
        let freq: PaymentFrequency = serde_json::from_str("\"annual\"").unwrap();
        assert_eq!(freq, PaymentFrequency::Annual);
    }

    #[test]
    fn test_gender_wire_format_is_lowercase() {
        let gender: Gender = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(gender, Gender::Female);
    }

    #[test]
    fn test_status_from_str_rejects_lowercase() {
        assert!("pending".parse::<ApplicationStatus>().is_err());
        assert_eq!(
            "Rejected".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Rejected
        );
    }
}
