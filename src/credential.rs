use std::fmt;

use crate::error::Error;

/// Host every datacenter subdomain hangs off.
pub(crate) const API_HOST: &str = "api.mailchimp.com";
/// API version segment appended to the base URL.
pub(crate) const API_VERSION: &str = "3.0";

/// A Mailchimp API key of the form `<key>-<datacenter>`, e.g. `0123abcd-us6`.
///
/// The datacenter suffix selects the regional host requests are sent to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key: String,
    datacenter: String,
}

impl Credential {
    /// Validates `key` and extracts its datacenter.
    ///
    /// Any hyphen with at least one character on each side is accepted; the
    /// datacenter is everything after the first hyphen.
    pub fn parse(key: &str) -> Result<Self, Error> {
        // An inner hyphen means the first hyphen is never the last char, so
        // the datacenter below is never empty.
        let Some((_, datacenter)) = key.split_once('-').filter(|_| has_inner_hyphen(key)) else {
            return Err(Error::InvalidCredential {
                key: redact(key),
            });
        };

        Ok(Self {
            key: key.to_string(),
            datacenter: datacenter.to_string(),
        })
    }

    /// The full API key, used as the basic-auth password.
    pub fn api_key(&self) -> &str {
        &self.key
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    /// `https://<datacenter>.api.mailchimp.com/3.0`
    pub fn base_url(&self) -> String {
        format!("https://{}.{}/{}", self.datacenter, API_HOST, API_VERSION)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"<redacted>")
            .field("datacenter", &self.datacenter)
            .finish()
    }
}

fn has_inner_hyphen(s: &str) -> bool {
    s.char_indices()
        .any(|(i, c)| c == '-' && i > 0 && i + 1 < s.len())
}

/// Keeps only the datacenter-looking tail so keys don't leak into errors.
fn redact(key: &str) -> String {
    if key.is_empty() {
        return "(empty)".to_string();
    }
    match key.rsplit_once('-') {
        Some((_, tail)) => format!("***-{}", tail),
        None => "***".to_string(),
    }
}
