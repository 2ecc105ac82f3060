//! SMTP injection relay, used when the sending method is `smtp`.

use std::time::{Duration, SystemTime};

use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{Message, SmtpTransport, Transport as _};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::message::{Address, MailMessage};
use crate::response::SendOutcome;
use crate::settings::ProviderSettings;
use crate::translate::{load_attachment, Options};

/// Submission port with STARTTLS.
pub const SMTP_PORT: u16 = 587;

/// Fixed SMTP username; the API key is the password.
pub const SMTP_USERNAME: &str = "SMTP_Injection";

/// `X-MSYS-API` header carrying delivery options over SMTP.
#[derive(Debug, Clone)]
struct MsysApi(String);

impl Header for MsysApi {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-MSYS-API")
    }

    fn parse(s: &str) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// Sends messages through the provider's SMTP endpoint.
pub struct SmtpRelay {
    transport: SmtpTransport,
    settings: ProviderSettings,
}

impl SmtpRelay {
    /// Create a relay for the region configured in `settings`.
    ///
    /// # Errors
    ///
    /// Fails when the STARTTLS relay cannot be configured for the host.
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let host = settings.region.smtp_host();
        let transport = SmtpTransport::starttls_relay(host)?
            .port(SMTP_PORT)
            .credentials(Credentials::new(
                SMTP_USERNAME.to_string(),
                settings.api_key.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        Ok(Self {
            transport,
            settings,
        })
    }

    /// Relay one message.
    ///
    /// # Errors
    ///
    /// Fails when the message cannot be built or the server refuses it.
    pub fn send(&self, message: &MailMessage) -> Result<SendOutcome> {
        let email = build_message(message, &self.settings)?;
        let recipients = email.envelope().to().len() as u64;

        let response = self.transport.send(&email)?;
        Ok(relay_outcome(&response, recipients))
    }
}

/// The SMTP reply carries no transmission id, so only the counts are kept.
fn relay_outcome(response: &Response, recipients: u64) -> SendOutcome {
    let reply = response.message().collect::<Vec<_>>().join(" ");
    debug!("SMTP relay replied {}: {reply}", response.code());
    SendOutcome {
        transmission_id: None,
        accepted: recipients,
        rejected: 0,
    }
}

fn mailbox(address: &Address) -> Result<Mailbox> {
    let email = address
        .email
        .parse()
        .map_err(|_| Error::InvalidAddress(address.email.clone()))?;
    Ok(Mailbox::new(address.display_name().map(String::from), email))
}

fn msys_api(settings: &ProviderSettings) -> Result<MsysApi> {
    let options = Options::from_settings(settings);
    let value = json!({ "options": options });
    Ok(MsysApi(serde_json::to_string(&value)?))
}

enum Body {
    Single(SinglePart),
    Multi(MultiPart),
}

/// Build the MIME message relayed over SMTP.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for an unparsable address and
/// [`Error::AttachmentRead`] for an unreadable attachment.
pub fn build_message(message: &MailMessage, settings: &ProviderSettings) -> Result<Message> {
    if settings.template_id().is_some() {
        warn!("Stored templates are not applied when relaying over SMTP");
    }
    if !message.headers.is_empty() {
        debug!(
            "Skipping {} custom header(s) on the SMTP relay",
            message.headers.len()
        );
    }

    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone())
        .message_id(Some(message.effective_message_id()))
        .header(msys_api(settings)?);

    for to in &message.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &message.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }
    if let Some(date) = message.date {
        builder = builder.date(SystemTime::from(date));
    }

    let body = match (&message.text, &message.html) {
        (Some(text), Some(html)) => {
            Body::Multi(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
        (None, Some(html)) => Body::Single(SinglePart::html(html.clone())),
        (text, None) => Body::Single(SinglePart::plain(text.clone().unwrap_or_default())),
    };

    if message.attachments.is_empty() {
        let email = match body {
            Body::Single(part) => builder.singlepart(part)?,
            Body::Multi(parts) => builder.multipart(parts)?,
        };
        return Ok(email);
    }

    let mut mixed = match body {
        Body::Single(part) => MultiPart::mixed().singlepart(part),
        Body::Multi(parts) => MultiPart::mixed().multipart(parts),
    };
    for attachment in &message.attachments {
        let loaded = load_attachment(attachment)?;
        let content_type = ContentType::parse(&loaded.content_type).map_err(|e| {
            Error::Smtp(format!("invalid content type {}: {e}", loaded.content_type))
        })?;
        mixed = mixed.singlepart(MimeAttachment::new(loaded.name).body(loaded.data, content_type));
    }

    Ok(builder.multipart(mixed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Attachment;
    use lettre::transport::smtp::response::{Category, Code, Detail, Severity};

    fn settings() -> ProviderSettings {
        ProviderSettings {
            api_key: "abcd1234".to_string(),
            enable_tracking: true,
            transactional: true,
            ..Default::default()
        }
    }

    fn message() -> MailMessage {
        MailMessage::new()
            .from(("me@hello.com", "me"))
            .to(("abc@xyz.com", "abc"))
            .cc("cc@xyz.com")
            .bcc("bcc@xyz.com")
            .subject("Hello")
            .message_id("<fixed@hello.com>")
            .text("Hi there")
    }

    #[test]
    fn test_relay_outcome_has_no_transmission_id() {
        let reply = Response::new(
            Code::new(Severity::PositiveCompletion, Category::MailSystem, Detail::Zero),
            vec!["2.0.0 OK 1A/2B-12345-67890ABC".to_string()],
        );
        assert_eq!(
            relay_outcome(&reply, 3),
            SendOutcome {
                transmission_id: None,
                accepted: 3,
                rejected: 0,
            }
        );
    }

    #[test]
    fn test_build_message_carries_options_header() {
        let email = build_message(&message(), &settings()).unwrap();
        let raw = email.headers().get_raw("X-MSYS-API").unwrap();
        let value: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            value,
            json!({ "options": { "open_tracking": true, "click_tracking": true, "transactional": true } })
        );
    }

    #[test]
    fn test_build_message_envelope_includes_all_recipients() {
        let email = build_message(&message(), &settings()).unwrap();
        let to: Vec<String> = email.envelope().to().iter().map(ToString::to_string).collect();
        assert_eq!(to.len(), 3);
        assert!(to.contains(&"bcc@xyz.com".to_string()));
        assert_eq!(
            email.envelope().from().map(ToString::to_string).as_deref(),
            Some("me@hello.com")
        );
    }

    #[test]
    fn test_build_message_with_attachment() {
        let message = message()
            .html("<p>Hi there</p>")
            .attachment(Attachment::from_bytes("a.txt", b"TEST".to_vec()));
        let email = build_message(&message, &settings()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("a.txt"));
        assert!(formatted.contains("Message-ID: <fixed@hello.com>"));
    }

    #[test]
    fn test_build_message_rejects_invalid_address() {
        let message = MailMessage::new().from("me@hello.com").to("not an address");
        assert!(matches!(
            build_message(&message, &settings()),
            Err(Error::InvalidAddress(addr)) if addr == "not an address"
        ));
    }
}
