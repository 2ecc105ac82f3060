//! Host-side mail message.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// An email address with an optional display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Address {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Display name, if set and non-empty.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Part of the address before the first `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.email
            .split_once('@')
            .map_or(self.email.as_str(), |(local, _)| local)
    }
}

/// Renders `Name <email>`, or the bare email when there is no name.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<(&str, &str)> for Address {
    fn from((email, name): (&str, &str)) -> Self {
        Self::with_name(email, name)
    }
}

/// Where attachment bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Read from disk at translation time
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    #[serde(flatten)]
    pub source: AttachmentSource,
    /// Declared file name; defaults to the path's base name
    #[serde(default)]
    pub name: Option<String>,
    /// Declared MIME type; guessed from the name when absent
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Attachment {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: AttachmentSource::Path(path.into()),
            name: None,
            content_type: None,
        }
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            source: AttachmentSource::Bytes(data.into()),
            name: Some(name.into()),
            content_type: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// File name reported to the provider.
    #[must_use]
    pub fn file_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match &self.source {
            AttachmentSource::Path(path) => path
                .file_name()
                .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned()),
            AttachmentSource::Bytes(_) => "attachment".to_string(),
        }
    }

    /// Path on disk, when the attachment is file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            AttachmentSource::Path(path) => Some(path),
            AttachmentSource::Bytes(_) => None,
        }
    }
}

/// A message handed over by the host for one send.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailMessage {
    pub from: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub reply_to: Option<Address>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    /// Custom headers in insertion order; duplicates allowed
    pub headers: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
    pub message_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl MailMessage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, sender: impl Into<Address>) -> Self {
        self.from = sender.into();
        self
    }

    #[must_use]
    pub fn to(mut self, recipient: impl Into<Address>) -> Self {
        self.to.push(recipient.into());
        self
    }

    #[must_use]
    pub fn cc(mut self, recipient: impl Into<Address>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<Address>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    #[must_use]
    pub fn reply_to(mut self, address: impl Into<Address>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// The configured Message-ID, or a fresh one on the sender's domain.
    #[must_use]
    pub fn effective_message_id(&self) -> String {
        self.message_id.clone().unwrap_or_else(|| {
            let domain = self
                .from
                .email
                .split_once('@')
                .map(|(_, d)| d)
                .filter(|d| !d.is_empty())
                .unwrap_or("localhost");
            format!("<{}@{domain}>", Uuid::new_v4().simple())
        })
    }

    /// MIME type of the body as it would be sent over SMTP.
    #[must_use]
    pub fn body_content_type(&self) -> &'static str {
        match (&self.text, &self.html) {
            (Some(_), Some(_)) => "multipart/alternative",
            (None, Some(_)) => "text/html; charset=UTF-8",
            _ => "text/plain; charset=UTF-8",
        }
    }

    /// Joined rendering of an address list.
    #[must_use]
    pub fn render_addresses(addresses: &[Address], separator: &str) -> String {
        addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Render the MIME header block for this message, one `Name: value` per line.
    ///
    /// Line breaks inside names and values are replaced with spaces so that
    /// host-supplied text can never start a header of its own.
    #[must_use]
    pub fn header_block(&self) -> String {
        let date = self.date.unwrap_or_else(Utc::now).to_rfc2822();
        let to = if self.to.is_empty() {
            "undisclosed-recipients:;".to_string()
        } else {
            Self::render_addresses(&self.to, ", ")
        };

        let mut lines = vec![
            format!("Date: {date}"),
            format!("To: {to}"),
            format!("From: {}", self.from),
            format!("Subject: {}", self.subject),
        ];
        if let Some(reply_to) = &self.reply_to {
            lines.push(format!("Reply-To: {reply_to}"));
        }
        lines.push(format!("Message-ID: {}", self.effective_message_id()));
        lines.push("MIME-Version: 1.0".to_string());
        lines.push(format!("Content-Type: {}", self.body_content_type()));
        for (name, value) in &self.headers {
            lines.push(format!("{name}: {value}"));
        }

        lines
            .iter()
            .map(|line| line.replace(['\r', '\n'], " "))
            .collect::<Vec<_>>()
            .join("\r\n")
    }
}
