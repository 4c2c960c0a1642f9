//! Operations checks: backend reachability and role lookups.

use tracing::info;

use aegis_core::Email;

use super::{backend_from_env, operator_token};

/// Probe the policy backend.
///
/// # Errors
///
/// Returns an error if `AEGIS_BACKEND_URL` is not set or the backend
/// does not answer.
pub async fn ping() -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend_from_env()?;

    backend.ping().await?;
    info!("Backend is reachable");

    Ok(())
}

/// Resolve and print an account's role grants.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the email is
/// invalid, or the lookup fails.
pub async fn check_role(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend_from_env()?;
    let token = operator_token()?;
    let email = Email::parse(email)?;

    let flags = backend.check_role(&token, &email).await?;

    info!("Role grants for {email}");
    info!("  admin: {}", flags.is_admin);
    info!("  agent: {}", flags.is_agent);
    info!("  effective role: {}", flags.reduce());

    Ok(())
}
