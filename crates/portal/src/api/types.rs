//! Domain types for the policy backend REST API.
//!
//! The backend speaks camelCase JSON; every struct here renames its fields
//! accordingly so the rest of the portal stays snake_case. Monetary fields
//! are decimal strings on the wire (preserves precision).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aegis_core::{
    ApplicationId, ApplicationStatus, BlogId, ClaimId, ClaimStatus, Email, Gender,
    PaymentFrequency, PaymentRef, PaymentStatus, PolicyId, ReviewId, RoleFlags, TransactionId,
    UserId,
};

// =============================================================================
// User Types
// =============================================================================

/// A user record as the backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (unique, doubles as the user key).
    pub email: Email,
    /// Profile photo URL, if one was uploaded.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Role grants.
    #[serde(flatten)]
    pub flags: RoleFlags,
    /// When the record was first created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating or refreshing a user record on sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Profile photo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Payload for changing a user's role grants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    /// Grant of the admin role.
    pub is_admin: bool,
    /// Grant of the agent role.
    pub is_agent: bool,
}

// =============================================================================
// Policy Types
// =============================================================================

/// An insurance policy product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: PolicyId,
    /// Policy title (e.g., "Term Life Shield").
    pub title: String,
    /// Category slug (e.g., "term-life", "senior").
    pub category: String,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Long-form description.
    pub description: String,
    /// Minimum eligible age.
    pub min_age: u32,
    /// Maximum eligible age.
    pub max_age: u32,
    /// Minimum coverage amount.
    pub coverage_min: Decimal,
    /// Maximum coverage amount.
    pub coverage_max: Decimal,
    /// Offered term lengths in years.
    pub duration_options: Vec<u32>,
    /// Base premium rate per unit of coverage per year.
    pub base_premium_rate: Decimal,
    /// How many applications for this policy have been approved.
    #[serde(default)]
    pub purchase_count: u64,
}

/// Payload for creating or updating a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInput {
    pub title: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub description: String,
    pub min_age: u32,
    pub max_age: u32,
    pub coverage_min: Decimal,
    pub coverage_max: Decimal,
    pub duration_options: Vec<u32>,
    pub base_premium_rate: Decimal,
}

/// One page of the policy catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPage {
    /// Policies on this page.
    pub policies: Vec<Policy>,
    /// Total matching policies across all pages.
    pub total: u64,
}

// =============================================================================
// Application Types
// =============================================================================

/// A policy application as the backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: ApplicationId,
    /// Applicant display name (taken from the session at submit time).
    pub user_name: String,
    /// Applicant email (taken from the session at submit time).
    pub user_email: Email,
    /// The policy applied for.
    pub policy_id: PolicyId,
    /// Denormalized policy title for list views.
    pub policy_title: String,
    /// Assigned agent, once an admin assigns one.
    #[serde(default)]
    pub agent_email: Option<Email>,
    /// Street address.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// National ID number.
    #[serde(default)]
    pub nid: Option<String>,
    /// Nominee full name.
    pub nominee_name: String,
    /// Nominee relationship to the applicant.
    pub nominee_relation: String,
    /// Self-reported health conditions.
    #[serde(default)]
    pub health_disclosures: Vec<String>,
    /// Applicant age at quote time.
    pub age: u32,
    /// Applicant gender at quote time.
    pub gender: Gender,
    /// Whether the applicant is a smoker.
    pub smoker: bool,
    /// Requested coverage amount.
    pub coverage: Decimal,
    /// Requested term length in years.
    pub duration_years: u32,
    /// Chosen billing frequency.
    pub frequency: PaymentFrequency,
    /// Monthly premium from the quote; absent when submitted without one.
    #[serde(default)]
    pub monthly_premium: Option<Decimal>,
    /// Annual premium from the quote; absent when submitted without one.
    #[serde(default)]
    pub annual_premium: Option<Decimal>,
    /// Whether the premiums came from a quote computed by this portal.
    #[serde(default)]
    pub quoted: bool,
    /// Review status.
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Premium payment status.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Reviewer feedback when rejected.
    #[serde(default)]
    pub rejection_feedback: Option<String>,
    /// When the application was submitted.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Payload for submitting an application.
///
/// Built server-side from the session and quote handoff; the browser never
/// supplies premiums or identity fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    pub user_name: String,
    pub user_email: Email,
    pub policy_id: PolicyId,
    pub policy_title: String,
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nid: Option<String>,
    pub nominee_name: String,
    pub nominee_relation: String,
    #[serde(default)]
    pub health_disclosures: Vec<String>,
    pub age: u32,
    pub gender: Gender,
    pub smoker: bool,
    pub coverage: Decimal,
    pub duration_years: u32,
    pub frequency: PaymentFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_premium: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_premium: Option<Decimal>,
    pub quoted: bool,
    pub status: ApplicationStatus,
    pub payment_status: PaymentStatus,
}

/// Payload for an admin review decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// The new status.
    pub status: ApplicationStatus,
    /// Feedback for the applicant; only meaningful for rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_feedback: Option<String>,
}

/// Payload for assigning an agent to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAgent {
    /// The agent taking over the application.
    pub agent_email: Email,
}

// =============================================================================
// Claim Types
// =============================================================================

/// A claim request against an approved application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: ClaimId,
    /// The approved application claimed against.
    pub application_id: ApplicationId,
    /// Denormalized policy title for list views.
    pub policy_title: String,
    /// Claimant email.
    pub user_email: Email,
    /// Why the claim is being made.
    pub reason: String,
    /// Supporting document URL, if uploaded.
    #[serde(default)]
    pub document_url: Option<String>,
    /// Review status.
    #[serde(default)]
    pub status: ClaimStatus,
    /// When the claim was submitted.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Payload for submitting a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInput {
    pub application_id: ApplicationId,
    pub policy_title: String,
    pub user_email: Email,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

/// Payload for a claim review decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusUpdate {
    /// The new status.
    pub status: ClaimStatus,
}

// =============================================================================
// Blog Types
// =============================================================================

/// A blog article written by an agent or admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: BlogId,
    /// Article title.
    pub title: String,
    /// Article body.
    pub content: String,
    /// Author display name.
    pub author_name: String,
    /// Author email.
    pub author_email: Email,
    /// Author photo URL.
    #[serde(default)]
    pub author_photo_url: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Publish timestamp.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Total detail-page visits.
    #[serde(default)]
    pub total_visits: u64,
}

/// Payload for creating or updating a blog article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogInput {
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub author_email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// =============================================================================
// Review Types
// =============================================================================

/// A customer review left on a purchased policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: ReviewId,
    /// The reviewed policy.
    pub policy_id: PolicyId,
    /// Denormalized policy title.
    pub policy_title: String,
    /// Reviewer display name.
    pub user_name: String,
    /// Reviewer email.
    pub user_email: Email,
    /// Reviewer photo URL.
    #[serde(default)]
    pub user_photo_url: Option<String>,
    /// Star rating, 1-5.
    pub rating: u8,
    /// Free-text feedback.
    pub comment: String,
    /// When the review was submitted.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Payload for submitting a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub policy_id: PolicyId,
    pub policy_title: String,
    pub user_name: String,
    pub user_email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo_url: Option<String>,
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// Newsletter Types
// =============================================================================

/// A newsletter signup from the public home page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSignup {
    pub name: String,
    pub email: Email,
}

// =============================================================================
// Payment Types
// =============================================================================

/// Request to open a payment intent with the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    /// Amount to charge, in the currency's standard unit.
    pub price: Decimal,
}

/// Processor handle for a freshly opened payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    /// Client secret the payment widget confirms against.
    pub client_secret: String,
}

/// Payload recording a confirmed charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    /// Processor payment reference.
    pub payment_ref: PaymentRef,
    /// The application the premium was paid for.
    pub application_id: ApplicationId,
    /// Denormalized policy title.
    pub policy_title: String,
    /// Payer email.
    pub user_email: Email,
    /// Amount charged.
    pub amount: Decimal,
    /// Billing frequency the charge covers.
    pub frequency: PaymentFrequency,
}

/// A payment-history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Backend document ID.
    #[serde(rename = "_id")]
    pub id: TransactionId,
    /// Processor payment reference.
    pub payment_ref: PaymentRef,
    /// The application the premium was paid for.
    pub application_id: ApplicationId,
    /// Denormalized policy title.
    pub policy_title: String,
    /// Payer email.
    pub user_email: Email,
    /// Amount charged.
    pub amount: Decimal,
    /// Billing frequency the charge covers.
    pub frequency: PaymentFrequency,
    /// Processor-reported status string (e.g., "succeeded").
    pub status: String,
    /// When the charge was recorded.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Dashboard Types
// =============================================================================

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_policies: u64,
    pub total_applications: u64,
    pub pending_applications: u64,
    pub pending_claims: u64,
    /// Sum of recorded payments.
    pub total_revenue: Decimal,
}

/// One point on the admin earnings chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// X-axis label (e.g., a month or policy title).
    pub label: String,
    /// Policies sold in this bucket.
    pub policies_sold: u64,
    /// Revenue recorded in this bucket.
    pub revenue: Decimal,
}
