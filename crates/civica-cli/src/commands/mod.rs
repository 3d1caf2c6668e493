pub mod chat;
pub mod duplicates;
pub mod issues;
pub mod login;
pub mod report;

use crate::config::{ConfigPaths, ProviderConfig};
use civica_core::StoreError;
use civica_core::model::{GenerativeModel, UnconfiguredModel, create_model};
use civica_core::store::{IssueStore, StorePaths};
use civica_core::types::User;
use std::io::{self, BufRead, Write};

pub(crate) fn open_store(paths: &ConfigPaths) -> Result<IssueStore, StoreError> {
    IssueStore::open(StorePaths::from_base(paths.state_dir.clone()))
}

/// The persisted current user; every mutation is attributed to one.
pub(crate) fn require_user(store: &IssueStore) -> Result<User, Box<dyn std::error::Error>> {
    store
        .load_user()?
        .ok_or_else(|| "not logged in; run `civica login` first".into())
}

/// Build the configured provider, or the unconfigured stand-in when it
/// cannot be constructed; commands then run on their degraded paths
/// instead of refusing to work.
pub(crate) fn build_model(profile: &ProviderConfig) -> Box<dyn GenerativeModel> {
    match create_model(
        profile.provider.as_str(),
        non_empty(profile.model.as_str()),
        non_empty(profile.api_key.as_str()),
    ) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("model unavailable ({err}); continuing with fallbacks");
            Box::new(UnconfiguredModel)
        }
    }
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// y/N prompt on stdin.
pub(crate) fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  hi "), Some("hi"));
        assert_eq!(non_empty("   "), None);
        assert_eq!(non_empty(""), None);
    }

    #[test]
    fn missing_key_falls_back_to_unconfigured_model() {
        let profile = ProviderConfig {
            provider: "gemini".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: String::new(),
        };
        assert_eq!(build_model(&profile).name(), "unconfigured");
    }

    #[test]
    fn configured_key_builds_the_real_provider() {
        let profile = ProviderConfig {
            provider: "gemini".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: "key".to_string(),
        };
        assert_eq!(build_model(&profile).name(), "gemini");
    }
}
