use crate::plan::CrawlPlan;
use crate::InputError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates a crawl plan from a YAML file
///
/// # Arguments
///
/// * `path` - Path to the crawl plan
///
/// # Returns
///
/// * `Ok(CrawlPlan)` - Successfully loaded plan
/// * `Err(InputError)` - The file is missing, is not valid YAML, or names an invalid domain
pub fn load_plan(path: &Path) -> Result<CrawlPlan, InputError> {
    let content = read(path)?;
    parse_plan(&content)
}

/// Parses and validates a crawl plan from YAML text
pub fn parse_plan(content: &str) -> Result<CrawlPlan, InputError> {
    let plan: CrawlPlan = serde_yaml::from_str(content)?;

    for domain in plan.domains.keys() {
        validate_domain(domain)?;
    }

    Ok(plan)
}

/// Computes a SHA-256 hash of the crawl plan file content
///
/// The hash is logged with each run so a scheduled crawl can be traced back
/// to the exact plan it was configured from.
pub fn compute_plan_hash(path: &Path) -> Result<String, InputError> {
    let content = read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a crawl plan and returns both the plan and its hash
pub fn load_plan_with_hash(path: &Path) -> Result<(CrawlPlan, String), InputError> {
    let plan = load_plan(path)?;
    let hash = compute_plan_hash(path)?;
    Ok((plan, hash))
}

fn read(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Validates a domain name used as a rate-limit key
///
/// Keys are bare host names as the control plane tracks them; a port or
/// path (`example.com:8080`, `example.com/a`) is rejected.
fn validate_domain(domain: &str) -> Result<(), InputError> {
    if domain.is_empty() {
        return Err(InputError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(InputError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(InputError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(InputError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
