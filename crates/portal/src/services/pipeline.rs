//! The quote, application, and payment pipeline.
//!
//! A linear, cancellable flow: a priced quote is parked in the session,
//! an application carries it forward, and a payment settles it. Each step
//! re-derives nothing it can copy from the one before:
//!
//! 1. **Quote**: price the applicant against the policy and park a
//!    [`QuoteHandoff`] in the session.
//! 2. **Apply**: merge the session identity, the form, and the handoff
//!    into one application record (status always starts Pending). A
//!    missing or mismatched handoff does not block submission; the record
//!    simply carries no premium figures and is flagged unquoted.
//! 3. **Pay**: only Approved applications with premiums on file can open
//!    a payment intent. After the widget confirms the charge, the success
//!    record lands on the backend; if the backend refuses it the failure
//!    surfaces as a reconciliation error carrying the payment reference,
//!    because the money has already moved.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use aegis_core::{
    ApplicationId, ApplicationStatus, Email, Gender, PaymentFrequency, PaymentRef, PaymentStatus,
    PolicyId,
};

use crate::api::types::{
    Application, ApplicationInput, PaymentIntentRequest, RecordPayment, StatusUpdate, Transaction,
};
use crate::api::{BackendClient, BackendError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::CurrentUser;
use crate::models::pipeline::QuoteHandoff;
use crate::models::session::keys;
use crate::services::quote::{self, Quote, QuoteInput};

/// Client-submitted application form.
///
/// Identity and premium fields are deliberately not part of this struct:
/// name and email always come from the session, premiums always come from
/// the session handoff, so a tampered request body cannot override either.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
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
    /// Applicant age; superseded by the quoted profile when one exists.
    pub age: u32,
    /// Applicant gender; superseded by the quoted profile when one exists.
    pub gender: Gender,
    /// Smoker flag; superseded by the quoted profile when one exists.
    #[serde(default)]
    pub smoker: bool,
    /// Requested coverage; superseded by the quoted profile when one exists.
    pub coverage: Decimal,
    /// Requested term; superseded by the quoted profile when one exists.
    pub duration_years: u32,
    /// Chosen billing frequency.
    #[serde(default)]
    pub frequency: PaymentFrequency,
}

/// Everything the payment widget needs to confirm a charge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStart {
    /// Client secret from the processor.
    pub client_secret: String,
    /// The amount that will be charged.
    pub amount: Decimal,
    /// The billing frequency the amount covers.
    pub frequency: PaymentFrequency,
}

/// Pipeline orchestration service.
///
/// Borrowed per request from [`crate::state::AppState`]; stateless beyond
/// the backend client.
pub struct PipelineService<'a> {
    backend: &'a BackendClient,
}

impl<'a> PipelineService<'a> {
    /// Create a new pipeline service.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Step 1: Quote
    // =========================================================================

    /// Price a quote and park it in the session for the application step.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the input falls outside the
    /// policy's bounds, or a backend error if the policy cannot be loaded.
    #[instrument(skip(self, session), fields(policy_id = %policy_id))]
    pub async fn quote(
        &self,
        session: &Session,
        policy_id: &PolicyId,
        input: QuoteInput,
    ) -> Result<Quote> {
        let policy = self.backend.get_policy(policy_id).await?;

        let quote =
            quote::compute(&policy, &input).map_err(|e| AppError::Validation(e.to_string()))?;

        let handoff = QuoteHandoff {
            policy_id: policy_id.clone(),
            policy_title: policy.title,
            input,
            quote,
            quoted_at: chrono::Utc::now(),
        };

        session
            .insert(keys::QUOTE_HANDOFF, &handoff)
            .await
            .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

        add_breadcrumb(
            "pipeline",
            "Quote computed",
            Some(&[("policy_id", policy_id.as_str())]),
        );

        Ok(quote)
    }

    // =========================================================================
    // Step 2: Apply
    // =========================================================================

    /// Submit an application, attaching the session handoff when it
    /// belongs to this policy.
    ///
    /// The handoff is consumed only after the backend accepts the record,
    /// so a failed submission can be retried without re-quoting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an incomplete form, or a backend
    /// error if the policy lookup or the submission fails.
    #[instrument(skip(self, session, user, form), fields(policy_id = %policy_id, email = %user.email))]
    pub async fn submit(
        &self,
        session: &Session,
        user: &CurrentUser,
        policy_id: &PolicyId,
        form: ApplicationForm,
    ) -> Result<Application> {
        validate_form(&form)?;

        let policy = self.backend.get_policy(policy_id).await?;

        let handoff = usable_handoff(
            session
                .get::<QuoteHandoff>(keys::QUOTE_HANDOFF)
                .await
                .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?,
            policy_id,
        );

        let quoted = handoff.is_some();
        let input = build_application(user, policy_id, &policy.title, form, handoff.as_ref());

        let application = self
            .backend
            .submit_application(&user.access_token, &input)
            .await?;

        // Consume the handoff only once its figures are on record
        if quoted {
            session
                .remove::<QuoteHandoff>(keys::QUOTE_HANDOFF)
                .await
                .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
        }

        add_breadcrumb(
            "pipeline",
            "Application submitted",
            Some(&[
                ("application_id", application.id.as_str()),
                ("quoted", if quoted { "true" } else { "false" }),
            ]),
        );

        Ok(application)
    }

    // =========================================================================
    // Step 3: Pay
    // =========================================================================

    /// Open a payment intent for an approved application.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the application belongs to someone
    /// else, `AppError::NotPayable` unless the status is Approved,
    /// `AppError::Validation` if the premium is already paid,
    /// `AppError::NotQuoted` if the record carries no premium to charge,
    /// and `AppError::Processor` when the processor refuses to open the
    /// intent.
    #[instrument(skip(self, user), fields(application_id = %application_id, frequency = %frequency))]
    pub async fn payment_intent(
        &self,
        user: &CurrentUser,
        application_id: &ApplicationId,
        frequency: PaymentFrequency,
    ) -> Result<PaymentStart> {
        let application = self
            .backend
            .get_application(&user.access_token, application_id)
            .await?;
        ensure_owned_by(&application, &user.email)?;

        let monthly = ensure_payable(&application)?;
        let amount = charge_amount(monthly, frequency);

        let intent = self
            .backend
            .create_payment_intent(&user.access_token, &PaymentIntentRequest { price: amount })
            .await
            .map_err(|e| match e {
                // A 4xx from the intent endpoint is the processor refusing
                // the charge, not a backend outage
                BackendError::Rejected { message, .. } => AppError::Processor(message),
                other => AppError::Backend(other),
            })?;

        add_breadcrumb(
            "pipeline",
            "Payment intent opened",
            Some(&[("application_id", application_id.as_str())]),
        );

        Ok(PaymentStart {
            client_secret: intent.client_secret,
            amount,
            frequency,
        })
    }

    /// Record a widget-confirmed charge against an application.
    ///
    /// The charge has already happened by the time this is called, so the
    /// status gates are not re-checked here; the backend is the judge of
    /// the record. A backend failure is reported as a reconciliation
    /// error carrying the payment reference, never a generic one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the application belongs to someone
    /// else, `AppError::NotQuoted` if no premium is on record, or
    /// `AppError::Reconciliation` if the backend refuses the record.
    #[instrument(skip(self, user), fields(application_id = %application_id, payment_ref = %payment_ref))]
    pub async fn record_success(
        &self,
        user: &CurrentUser,
        application_id: &ApplicationId,
        payment_ref: PaymentRef,
        frequency: PaymentFrequency,
    ) -> Result<Transaction> {
        let application = self
            .backend
            .get_application(&user.access_token, application_id)
            .await?;
        ensure_owned_by(&application, &user.email)?;

        let monthly = application
            .monthly_premium
            .ok_or_else(|| AppError::NotQuoted(application.policy_id.to_string()))?;
        let amount = charge_amount(monthly, frequency);

        let record = RecordPayment {
            payment_ref: payment_ref.clone(),
            application_id: application_id.clone(),
            policy_title: application.policy_title,
            user_email: user.email.clone(),
            amount,
            frequency,
        };

        let transaction = self
            .backend
            .record_payment(&user.access_token, &record)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    payment_ref = %record.payment_ref,
                    "Confirmed charge could not be recorded"
                );
                AppError::Reconciliation {
                    payment_ref: record.payment_ref.clone(),
                    application_id: application_id.clone(),
                }
            })?;

        add_breadcrumb(
            "pipeline",
            "Payment recorded",
            Some(&[("application_id", application_id.as_str())]),
        );

        Ok(transaction)
    }

    // =========================================================================
    // Review Decisions
    // =========================================================================

    /// Approve an application, acting as the reviewing admin or agent.
    ///
    /// Bumps the referenced policy's purchase count with exactly one
    /// backend call once the status change lands.
    ///
    /// # Errors
    ///
    /// Returns a backend error if either call fails; a failed count bump
    /// is surfaced rather than retried so the counter can never move
    /// twice for one approval.
    #[instrument(skip(self, token), fields(application_id = %application_id))]
    pub async fn approve(
        &self,
        token: &SecretString,
        application_id: &ApplicationId,
    ) -> Result<Application> {
        let application = self
            .backend
            .update_application_status(
                token,
                application_id,
                &StatusUpdate {
                    status: ApplicationStatus::Approved,
                    rejection_feedback: None,
                },
            )
            .await?;

        self.backend
            .increment_purchase_count(token, &application.policy_id)
            .await?;

        add_breadcrumb(
            "pipeline",
            "Application approved",
            Some(&[("application_id", application_id.as_str())]),
        );

        Ok(application)
    }

    /// Reject an application with optional feedback for the applicant.
    ///
    /// Performs no purchase-count call.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the status update fails.
    #[instrument(skip(self, token, feedback), fields(application_id = %application_id))]
    pub async fn reject(
        &self,
        token: &SecretString,
        application_id: &ApplicationId,
        feedback: Option<String>,
    ) -> Result<Application> {
        let application = self
            .backend
            .update_application_status(
                token,
                application_id,
                &StatusUpdate {
                    status: ApplicationStatus::Rejected,
                    rejection_feedback: feedback,
                },
            )
            .await?;

        add_breadcrumb(
            "pipeline",
            "Application rejected",
            Some(&[("application_id", application_id.as_str())]),
        );

        Ok(application)
    }
}

// =============================================================================
// Pure Helpers
// =============================================================================

/// Keep a handoff only when it was priced for this policy.
///
/// A handoff for a different policy stays in the session; it is still
/// valid for the flow it belongs to.
fn usable_handoff(handoff: Option<QuoteHandoff>, policy_id: &PolicyId) -> Option<QuoteHandoff> {
    handoff.filter(|h| h.matches(policy_id))
}

/// Merge session identity, form data, and the handoff into one record.
///
/// Name and email come from the session unconditionally. When a handoff
/// exists, the quoted profile and premiums are copied, not re-derived;
/// without one the form's profile is used and the record stays unquoted.
fn build_application(
    user: &CurrentUser,
    policy_id: &PolicyId,
    policy_title: &str,
    form: ApplicationForm,
    handoff: Option<&QuoteHandoff>,
) -> ApplicationInput {
    let (age, gender, smoker, coverage, duration_years) = handoff.map_or(
        (
            form.age,
            form.gender,
            form.smoker,
            form.coverage,
            form.duration_years,
        ),
        |h| {
            (
                h.input.age,
                h.input.gender,
                h.input.smoker,
                h.input.coverage,
                h.input.duration_years,
            )
        },
    );

    ApplicationInput {
        user_name: user.name.clone(),
        user_email: user.email.clone(),
        policy_id: policy_id.clone(),
        policy_title: policy_title.to_string(),
        address: form.address,
        phone: form.phone,
        nid: form.nid,
        nominee_name: form.nominee_name,
        nominee_relation: form.nominee_relation,
        health_disclosures: form.health_disclosures,
        age,
        gender,
        smoker,
        coverage,
        duration_years,
        frequency: form.frequency,
        monthly_premium: handoff.map(|h| h.quote.monthly_premium),
        annual_premium: handoff.map(|h| h.quote.annual_premium),
        quoted: handoff.is_some(),
        status: ApplicationStatus::Pending,
        payment_status: PaymentStatus::Due,
    }
}

/// Reject obviously incomplete forms before they reach the backend.
fn validate_form(form: &ApplicationForm) -> Result<()> {
    for (field, value) in [
        ("address", &form.address),
        ("phone", &form.phone),
        ("nomineeName", &form.nominee_name),
        ("nomineeRelation", &form.nominee_relation),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

/// Check the caller owns the application.
fn ensure_owned_by(application: &Application, email: &Email) -> Result<()> {
    if application.user_email == *email {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "application {} belongs to another user",
            application.id
        )))
    }
}

/// Check an application can take a payment and return its monthly premium.
fn ensure_payable(application: &Application) -> Result<Decimal> {
    if application.payment_status == PaymentStatus::Paid {
        return Err(AppError::Validation(format!(
            "application {} is already paid",
            application.id
        )));
    }

    if !application.status.payable() {
        return Err(AppError::NotPayable(application.id.to_string()));
    }

    application
        .monthly_premium
        .ok_or_else(|| AppError::NotQuoted(application.policy_id.to_string()))
}

/// Compute the charge for one billing period.
///
/// Monthly billing charges the monthly premium as-is. Annual billing
/// charges twelve months less a 10% discount; the discount is derived
/// here every time, never stored.
#[must_use]
pub fn charge_amount(monthly_premium: Decimal, frequency: PaymentFrequency) -> Decimal {
    match frequency {
        PaymentFrequency::Monthly => monthly_premium,
        PaymentFrequency::Annual => {
            (monthly_premium * Decimal::from(12) * Decimal::new(9, 1)).round_dp(2)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn maria() -> CurrentUser {
        CurrentUser {
            name: "Maria Gomez".to_string(),
            email: Email::parse("maria@example.com").unwrap(),
            photo_url: None,
            access_token: SecretString::from("tok-maria".to_string()),
        }
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            address: "12 Hill Rd".to_string(),
            phone: "555-0100".to_string(),
            nid: None,
            nominee_name: "Ana Gomez".to_string(),
            nominee_relation: "sister".to_string(),
            health_disclosures: vec![],
            age: 44,
            gender: Gender::Male,
            smoker: true,
            coverage: Decimal::from(500_000),
            duration_years: 15,
            frequency: PaymentFrequency::Monthly,
        }
    }

    fn handoff_for(policy_id: &str) -> QuoteHandoff {
        QuoteHandoff {
            policy_id: PolicyId::new(policy_id),
            policy_title: "Term Life Shield".to_string(),
            input: QuoteInput {
                age: 30,
                gender: Gender::Female,
                coverage: Decimal::from(1_000_000),
                duration_years: 10,
                smoker: false,
            },
            quote: Quote {
                monthly_premium: Decimal::new(41_667, 2),
                annual_premium: Decimal::from(5000),
            },
            quoted_at: chrono::Utc::now(),
        }
    }

    fn application(status: ApplicationStatus, monthly: Option<Decimal>) -> Application {
        Application {
            id: ApplicationId::new("a1"),
            user_name: "Maria Gomez".to_string(),
            user_email: Email::parse("maria@example.com").unwrap(),
            policy_id: PolicyId::new("p1"),
            policy_title: "Term Life Shield".to_string(),
            agent_email: None,
            address: "12 Hill Rd".to_string(),
            phone: "555-0100".to_string(),
            nid: None,
            nominee_name: "Ana Gomez".to_string(),
            nominee_relation: "sister".to_string(),
            health_disclosures: vec![],
            age: 30,
            gender: Gender::Female,
            smoker: false,
            coverage: Decimal::from(1_000_000),
            duration_years: 10,
            frequency: PaymentFrequency::Monthly,
            monthly_premium: monthly,
            annual_premium: monthly.map(|m| m * Decimal::from(12)),
            quoted: monthly.is_some(),
            status,
            payment_status: PaymentStatus::Due,
            rejection_feedback: None,
            submitted_at: None,
        }
    }

    // -------------------------------------------------------------------------
    // Handoff gating
    // -------------------------------------------------------------------------

    #[test]
    fn test_handoff_for_matching_policy_is_used() {
        let handoff = usable_handoff(Some(handoff_for("p1")), &PolicyId::new("p1"));
        assert!(handoff.is_some());
    }

    #[test]
    fn test_handoff_for_other_policy_is_not_used() {
        let handoff = usable_handoff(Some(handoff_for("p2")), &PolicyId::new("p1"));
        assert!(handoff.is_none());
    }

    #[test]
    fn test_missing_handoff_is_not_quoted() {
        assert!(usable_handoff(None, &PolicyId::new("p1")).is_none());
    }

    // -------------------------------------------------------------------------
    // Application assembly
    // -------------------------------------------------------------------------

    #[test]
    fn test_quoted_submission_copies_the_priced_profile() {
        let handoff = handoff_for("p1");
        let input = build_application(
            &maria(),
            &PolicyId::new("p1"),
            "Term Life Shield",
            form(),
            Some(&handoff),
        );

        // The quoted profile wins over the form's
        assert_eq!(input.age, 30);
        assert_eq!(input.gender, Gender::Female);
        assert!(!input.smoker);
        assert_eq!(input.coverage, Decimal::from(1_000_000));
        assert_eq!(input.duration_years, 10);
        assert_eq!(input.monthly_premium, Some(Decimal::new(41_667, 2)));
        assert_eq!(input.annual_premium, Some(Decimal::from(5000)));
        assert!(input.quoted);
    }

    #[test]
    fn test_unquoted_submission_carries_no_premiums() {
        let input = build_application(
            &maria(),
            &PolicyId::new("p1"),
            "Term Life Shield",
            form(),
            None,
        );

        assert_eq!(input.age, 44);
        assert!(input.smoker);
        assert!(input.monthly_premium.is_none());
        assert!(input.annual_premium.is_none());
        assert!(!input.quoted);
    }

    #[test]
    fn test_identity_always_comes_from_the_session() {
        // A request body carrying identity overrides deserializes with
        // those fields dropped; only session values reach the record.
        let tampered: ApplicationForm = serde_json::from_str(
            r#"{
                "userName": "Mallory",
                "userEmail": "mallory@evil.example",
                "monthlyPremium": "0.01",
                "status": "Approved",
                "address": "12 Hill Rd",
                "phone": "555-0100",
                "nomineeName": "Ana Gomez",
                "nomineeRelation": "sister",
                "age": 44,
                "gender": "male",
                "coverage": "500000",
                "durationYears": 15
            }"#,
        )
        .unwrap();

        let input = build_application(
            &maria(),
            &PolicyId::new("p1"),
            "Term Life Shield",
            tampered,
            None,
        );

        assert_eq!(input.user_name, "Maria Gomez");
        assert_eq!(input.user_email.as_str(), "maria@example.com");
        assert!(input.monthly_premium.is_none());
        assert_eq!(input.status, ApplicationStatus::Pending);
        assert_eq!(input.payment_status, PaymentStatus::Due);
    }

    #[test]
    fn test_status_is_always_pending_on_submit() {
        let handoff = handoff_for("p1");
        let input = build_application(
            &maria(),
            &PolicyId::new("p1"),
            "Term Life Shield",
            form(),
            Some(&handoff),
        );
        assert_eq!(input.status, ApplicationStatus::Pending);
        assert_eq!(input.payment_status, PaymentStatus::Due);
    }

    #[test]
    fn test_validate_form_rejects_blank_fields() {
        let mut bad = form();
        bad.nominee_name = "   ".to_string();
        assert!(matches!(
            validate_form(&bad),
            Err(AppError::Validation(_))
        ));
        assert!(validate_form(&form()).is_ok());
    }

    // -------------------------------------------------------------------------
    // Payment eligibility and charge math
    // -------------------------------------------------------------------------

    #[test]
    fn test_pending_application_is_not_payable() {
        let app = application(ApplicationStatus::Pending, Some(Decimal::new(41_667, 2)));
        assert!(matches!(
            ensure_payable(&app),
            Err(AppError::NotPayable(_))
        ));
    }

    #[test]
    fn test_rejected_application_is_not_payable() {
        let app = application(ApplicationStatus::Rejected, Some(Decimal::new(41_667, 2)));
        assert!(matches!(
            ensure_payable(&app),
            Err(AppError::NotPayable(_))
        ));
    }

    #[test]
    fn test_approved_application_is_payable() {
        let app = application(ApplicationStatus::Approved, Some(Decimal::new(41_667, 2)));
        assert_eq!(ensure_payable(&app).unwrap(), Decimal::new(41_667, 2));
    }

    #[test]
    fn test_approved_but_unquoted_cannot_be_charged() {
        let app = application(ApplicationStatus::Approved, None);
        assert!(matches!(ensure_payable(&app), Err(AppError::NotQuoted(_))));
    }

    #[test]
    fn test_paid_application_cannot_be_charged_again() {
        let mut app = application(ApplicationStatus::Approved, Some(Decimal::new(41_667, 2)));
        app.payment_status = PaymentStatus::Paid;
        assert!(matches!(
            ensure_payable(&app),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_monthly_charge_is_the_monthly_premium() {
        assert_eq!(
            charge_amount(Decimal::new(41_667, 2), PaymentFrequency::Monthly),
            Decimal::new(41_667, 2)
        );
    }

    #[test]
    fn test_annual_charge_applies_ten_percent_discount() {
        // 416.67 * 12 * 0.9 = 4500.036, rounded to cents
        assert_eq!(
            charge_amount(Decimal::new(41_667, 2), PaymentFrequency::Annual),
            Decimal::new(450_004, 2)
        );

        // 100.00 * 12 * 0.9 = 1080 exactly
        assert_eq!(
            charge_amount(Decimal::from(100), PaymentFrequency::Annual),
            Decimal::from(1080)
        );
    }

    #[test]
    fn test_ownership_check() {
        let app = application(ApplicationStatus::Approved, Some(Decimal::new(41_667, 2)));
        assert!(ensure_owned_by(&app, &Email::parse("maria@example.com").unwrap()).is_ok());
        assert!(matches!(
            ensure_owned_by(&app, &Email::parse("other@example.com").unwrap()),
            Err(AppError::Forbidden(_))
        ));
    }
}
