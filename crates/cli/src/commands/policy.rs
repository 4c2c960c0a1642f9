//! Catalog management: listing and YAML seeding.
//!
//! Seeding posts each policy through the same backend endpoint the admin
//! surface uses, so seeded records look exactly like hand-created ones.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use aegis_core::Money;
use aegis_portal::api::PolicyInput;

use super::{backend_from_env, operator_token};

/// Seed file layout: a single `policies` list.
#[derive(Debug, Deserialize)]
struct SeedFile {
    policies: Vec<PolicyInput>,
}

/// Print one page of the catalog.
///
/// # Errors
///
/// Returns an error if environment variables are missing or the request
/// fails.
pub async fn list(
    category: Option<&str>,
    page: u32,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend_from_env()?;

    let result = backend.get_policies(category, None, page, limit).await?;

    info!(
        "Catalog page {page} ({} of {} policies)",
        result.policies.len(),
        result.total
    );
    for policy in &result.policies {
        info!(
            "  [{}] {} ({}) - cover {} to {} - rate {} - {} purchases",
            policy.id,
            policy.title,
            policy.category,
            Money::usd(policy.coverage_min),
            Money::usd(policy.coverage_max),
            policy.base_premium_rate,
            policy.purchase_count
        );
    }

    Ok(())
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot
/// be read or parsed, or every insert fails.
pub async fn seed(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend_from_env()?;
    let token = operator_token()?;

    // Verify file exists
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading policy seeds from file");

    // Read and parse YAML before touching the backend
    let content = tokio::fs::read_to_string(path).await?;
    let seed_file: SeedFile = serde_yaml::from_str(&content)?;

    info!(policies = seed_file.policies.len(), "Parsed seed file");

    let mut inserted = 0usize;
    let mut failures: Vec<(String, String)> = Vec::new();

    for input in &seed_file.policies {
        match backend.create_policy(&token, input).await {
            Ok(policy) => {
                inserted += 1;
                info!("  created [{}] {}", policy.id, policy.title);
            }
            Err(e) => {
                failures.push((input.title.clone(), e.to_string()));
            }
        }
    }

    // Print summary
    info!("Seeding complete!");
    info!("  Policies inserted: {inserted}");

    if !failures.is_empty() {
        error!("  Errors: {}", failures.len());
        for (title, err) in &failures {
            error!("    - {title}: {err}");
        }
        if inserted == 0 {
            return Err(format!("{} inserts failed", failures.len()).into());
        }
    }

    Ok(())
}
