//! Send host application email through the SparkPost transmissions API.
//!
//! A [`MailMessage`] is translated into the provider's JSON request body,
//! POSTed with a blocking [`Transport`], and the response is classified into
//! a [`SendOutcome`] or an [`Error`]. When the sending method is `smtp` the
//! message is relayed through the provider's SMTP injection endpoint instead.

mod error;
pub mod headers;
mod message;
mod relay;
pub mod response;
mod settings;
pub mod translate;
mod transport;

pub use error::{Error, Rejection, Result};
pub use headers::{HeaderMap, RequestHeaders};
pub use message::{Address, Attachment, AttachmentSource, MailMessage};
pub use relay::SmtpRelay;
pub use response::SendOutcome;
pub use settings::{ProviderSettings, Region, SendingMethod};
pub use translate::RequestBody;
pub use transport::{HttpResponse, HttpTransport, Transport};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

/// Default timeout for one API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

enum Backend {
    Http(Arc<dyn Transport>),
    Smtp(SmtpRelay),
}

/// Host-facing entry point: translate, send, interpret.
pub struct Mailer {
    settings: ProviderSettings,
    backend: Backend,
}

impl Mailer {
    /// Create a mailer using the backend selected by `settings.sending_method`.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client or the SMTP relay cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let backend = match settings.sending_method {
            SendingMethod::Http => Backend::Http(Arc::new(HttpTransport::new(DEFAULT_TIMEOUT)?)),
            SendingMethod::Smtp => Backend::Smtp(SmtpRelay::new(settings.clone())?),
        };
        Ok(Self { settings, backend })
    }

    /// Create an HTTP mailer over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(settings: ProviderSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings,
            backend: Backend::Http(transport),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Send one message.
    ///
    /// The request body is fully built before anything goes on the wire, so
    /// an unreadable attachment aborts the send with nothing transmitted.
    ///
    /// # Errors
    ///
    /// Returns the translation, transport or provider error that stopped the
    /// message.
    pub fn send(&self, message: &MailMessage) -> Result<SendOutcome> {
        match &self.backend {
            Backend::Http(transport) => self.send_http(transport.as_ref(), message),
            Backend::Smtp(relay) => relay.send(message),
        }
    }

    fn send_http(&self, transport: &dyn Transport, message: &MailMessage) -> Result<SendOutcome> {
        let body = translate::build_request_body(message, &self.settings)?.to_json()?;
        let url = self.settings.transmissions_url();

        debug!(
            "Sending transmission to {url} with headers {:?}",
            headers::obfuscated_request_headers(&self.settings)
        );

        let response = transport.send(url, &headers::request_headers(&self.settings), &body)?;
        response::interpret(&response)
    }

    /// Send one message and report only whether it was accepted.
    ///
    /// Failures are logged with their detail.
    pub fn deliver(&self, message: &MailMessage) -> bool {
        match self.send(message) {
            Ok(outcome) => {
                info!(
                    "Transmission {} accepted for {} recipient(s)",
                    outcome.transmission_id.as_deref().unwrap_or("(no id)"),
                    outcome.accepted
                );
                true
            }
            Err(e) => {
                error!("Failed to send email: {e}");
                false
            }
        }
    }

    /// Request headers (key masked) and body that [`Mailer::send`] would POST.
    ///
    /// # Errors
    ///
    /// Fails when the body cannot be built, e.g. an attachment is unreadable.
    pub fn request_preview(&self, message: &MailMessage) -> Result<(RequestHeaders, serde_json::Value)> {
        let body = translate::build_request_body(message, &self.settings)?.to_json()?;
        Ok((headers::obfuscated_request_headers(&self.settings), body))
    }
}
