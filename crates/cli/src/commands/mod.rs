//! CLI command implementations.

use secrecy::SecretString;

use aegis_portal::api::BackendClient;
use aegis_portal::config::BackendConfig;

pub mod ops;
pub mod policy;

/// Build a backend client from `AEGIS_BACKEND_URL`.
pub(crate) fn backend_from_env() -> Result<BackendClient, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("AEGIS_BACKEND_URL").map_err(|_| "AEGIS_BACKEND_URL not set")?;

    Ok(BackendClient::new(&BackendConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
    }))
}

/// Read the operator bearer token from `AEGIS_OPERATOR_TOKEN`.
pub(crate) fn operator_token() -> Result<SecretString, Box<dyn std::error::Error>> {
    std::env::var("AEGIS_OPERATOR_TOKEN")
        .map(SecretString::from)
        .map_err(|_| "AEGIS_OPERATOR_TOKEN not set".into())
}
