//! Provider settings passed explicitly to the mailer.

use serde::Deserialize;
use std::fmt;

use crate::headers::obfuscate_key;

/// How messages leave the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendingMethod {
    /// JSON POST to the transmissions API
    #[default]
    Http,
    /// SMTP injection relay
    Smtp,
}

/// Provider data-center region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    /// Transmissions endpoint for this region.
    #[must_use]
    pub const fn transmissions_url(self) -> &'static str {
        match self {
            Self::Us => "https://api.sparkpost.com/api/v1/transmissions",
            Self::Eu => "https://api.eu.sparkpost.com/api/v1/transmissions",
        }
    }

    /// SMTP injection host for this region.
    #[must_use]
    pub const fn smtp_host(self) -> &'static str {
        match self {
            Self::Us => "smtp.sparkpostmail.com",
            Self::Eu => "smtp.eu.sparkpostmail.com",
        }
    }
}

/// Settings controlling how a message is sent.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key, sent verbatim as the `Authorization` header
    #[serde(alias = "password")]
    pub api_key: String,
    /// Drives both open and click tracking
    pub enable_tracking: bool,
    pub transactional: bool,
    /// Stored template id; when non-empty the template shape is sent
    pub template: Option<String>,
    pub sending_method: SendingMethod,
    pub region: Region,
    /// Overrides the region's transmissions URL
    pub endpoint: Option<String>,
}

impl ProviderSettings {
    /// Create settings with the given API key and everything else defaulted.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// The configured template id, if it is non-empty.
    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        self.template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// URL transmissions are POSTed to.
    #[must_use]
    pub fn transmissions_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.region.transmissions_url())
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &obfuscate_key(&self.api_key))
            .field("enable_tracking", &self.enable_tracking)
            .field("transactional", &self.transactional)
            .field("template", &self.template)
            .field("sending_method", &self.sending_method)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
