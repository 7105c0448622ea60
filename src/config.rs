use anyhow::{Context, Result};

use crate::client::ClientConfig;

pub(crate) const KEY_VAR: &str = "MAILCHIMP_API_KEY";
pub(crate) const URL_VAR: &str = "MAILCHIMP_URL";

/// Reads the key from `MAILCHIMP_API_KEY` and an optional base URL override
/// from `MAILCHIMP_URL`.
pub(crate) fn load_config() -> Result<ClientConfig> {
    load_config_with(|name| std::env::var(name).ok())
}

fn load_config_with<E>(env: E) -> Result<ClientConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let key = env(KEY_VAR)
        .filter(|k| !k.trim().is_empty())
        .with_context(|| format!("Missing configuration: key (set {})", KEY_VAR))?;
    let url = env(URL_VAR).filter(|u| !u.trim().is_empty());

    Ok(ClientConfig {
        key: key.trim().to_string(),
        url,
        ..ClientConfig::default()
    })
}
