//! Translation of a [`MailMessage`] into a transmissions API request body.

use base64::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::headers::{self, HeaderMap};
use crate::message::{Address, Attachment, AttachmentSource, MailMessage};
use crate::settings::ProviderSettings;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One entry of the `recipients` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub address: RecipientAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientAddress {
    pub email: String,
    /// Rendered To list, identical for every recipient
    pub header_to: String,
}

/// Delivery options; both tracking flags mirror a single setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Options {
    pub open_tracking: bool,
    pub click_tracking: bool,
    pub transactional: bool,
}

impl Options {
    #[must_use]
    pub const fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            open_tracking: settings.enable_tracking,
            click_tracking: settings.enable_tracking,
            transactional: settings.transactional,
        }
    }
}

/// Sender as sent in inline content. `name` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl From<&Address> for Sender {
    fn from(address: &Address) -> Self {
        Self {
            name: address.display_name().map(String::from),
            email: address.email.clone(),
        }
    }
}

/// Encoded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentEntry {
    #[serde(rename = "type")]
    pub content_type: String,
    pub name: String,
    /// Base64 of the file contents
    pub data: String,
}

/// `content` when the full message is sent inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineContent {
    pub from: Sender,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub headers: HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentEntry>,
}

/// `content` when a stored template is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateContent {
    pub template_id: String,
}

/// Variables merged into a stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionData {
    pub content: String,
    pub subject: String,
    pub from_name: String,
    pub from: String,
    pub from_localpart: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// The two request shapes. Only one can exist in a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Inline {
        content: InlineContent,
    },
    Template {
        content: TemplateContent,
        substitution_data: SubstitutionData,
    },
}

/// Complete transmissions request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    pub recipients: Vec<Recipient>,
    pub options: Options,
    #[serde(flatten)]
    pub payload: Payload,
}

impl RequestBody {
    #[must_use]
    pub const fn is_template(&self) -> bool {
        matches!(self.payload, Payload::Template { .. })
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Recipients in To, BCC, CC order, each carrying the rendered To list.
#[must_use]
pub fn build_recipients(message: &MailMessage) -> Vec<Recipient> {
    let header_to = MailMessage::render_addresses(&message.to, ", ");

    message
        .to
        .iter()
        .chain(&message.bcc)
        .chain(&message.cc)
        .map(|address| Recipient {
            address: RecipientAddress {
                email: address.email.clone(),
                header_to: header_to.clone(),
            },
        })
        .collect()
}

/// Read and encode every attachment.
///
/// # Errors
///
/// Returns [`Error::AttachmentRead`] for the first unreadable file.
pub fn build_attachments(attachments: &[Attachment]) -> Result<Vec<AttachmentEntry>> {
    attachments.iter().map(encode_attachment).collect()
}

/// Attachment contents with their resolved name and MIME type.
pub(crate) struct LoadedAttachment {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub(crate) fn load_attachment(attachment: &Attachment) -> Result<LoadedAttachment> {
    let name = attachment.file_name();
    let data = match &attachment.source {
        AttachmentSource::Path(path) => {
            std::fs::read(path).map_err(|source| Error::AttachmentRead {
                path: path.clone(),
                source,
            })?
        }
        AttachmentSource::Bytes(bytes) => bytes.clone(),
    };

    let content_type = attachment
        .content_type
        .clone()
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&name)
                .first_raw()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string()
        });

    Ok(LoadedAttachment {
        name,
        content_type,
        data,
    })
}

fn encode_attachment(attachment: &Attachment) -> Result<AttachmentEntry> {
    let loaded = load_attachment(attachment)?;
    debug!(
        "Encoded attachment {} ({}, {} bytes)",
        loaded.name,
        loaded.content_type,
        loaded.data.len()
    );

    Ok(AttachmentEntry {
        content_type: loaded.content_type,
        name: loaded.name,
        data: BASE64_STANDARD.encode(loaded.data),
    })
}

/// Build the request body, choosing the template shape when a template id
/// is configured.
///
/// # Errors
///
/// Returns [`Error::AttachmentRead`] when an attachment cannot be read.
pub fn build_request_body(
    message: &MailMessage,
    settings: &ProviderSettings,
) -> Result<RequestBody> {
    let payload = match settings.template_id() {
        Some(template_id) => template_payload(message, template_id),
        None => inline_payload(message)?,
    };

    Ok(RequestBody {
        recipients: build_recipients(message),
        options: Options::from_settings(settings),
        payload,
    })
}

fn inline_payload(message: &MailMessage) -> Result<Payload> {
    let attachments = build_attachments(&message.attachments)?;
    let headers = headers::parse(&message.header_block(), &message.cc);

    // An empty plain body is still sent when there is no body at all.
    let text = match (&message.text, &message.html) {
        (None, None) => Some(String::new()),
        (text, _) => text.clone(),
    };

    Ok(Payload::Inline {
        content: InlineContent {
            from: Sender::from(&message.from),
            subject: message.subject.clone(),
            html: message.html.clone(),
            text,
            headers,
            reply_to: message.reply_to.as_ref().map(ToString::to_string),
            attachments,
        },
    })
}

fn template_payload(message: &MailMessage, template_id: &str) -> Payload {
    debug!("Using stored template {template_id}");
    if !message.attachments.is_empty() {
        warn!(
            "Dropping {} attachment(s): not supported with stored templates",
            message.attachments.len()
        );
    }

    let content = message
        .html
        .clone()
        .or_else(|| message.text.clone())
        .unwrap_or_default();

    Payload::Template {
        content: TemplateContent {
            template_id: template_id.to_string(),
        },
        substitution_data: SubstitutionData {
            content,
            subject: message.subject.clone(),
            from_name: message.from.display_name().unwrap_or_default().to_string(),
            from: message.from.to_string(),
            from_localpart: message.from.local_part().to_string(),
            reply_to: message.reply_to.as_ref().map(ToString::to_string),
        },
    }
}
