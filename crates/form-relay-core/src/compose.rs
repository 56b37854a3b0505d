//! # Message Composition
//!
//! Renders a [`Submission`] as chat text.
//!
//! The message is a title line, a header block with one line per field in a
//! fixed order, and at most one category-specific block:
//!
//! | Category             | Block fields                        |
//! |----------------------|-------------------------------------|
//! | Alumni Relations     | request                             |
//! | Document Checking    | upload (linked), instructions       |
//! | Partnerships IC      | link (linked), selection, reason    |
//! | Partnerships Request | service type, details               |
//!
//! Empty detail fields are left out, and a block with no filled fields is
//! left out entirely. Header fields are always printed.

use crate::category::{CategoryMatch, ServiceCategory, TopicId};
use crate::delivery::OutboundMessage;
use crate::payload::Submission;
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Text format
// ============================================================================

/// Markup dialect the chat API is asked to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Html,
    MarkdownV2,
    Plain,
}

impl TextFormat {
    /// Value for the chat API's `parse_mode` parameter; `None` for plain text.
    pub fn parse_mode(&self) -> Option<&'static str> {
        match self {
            Self::Html => Some("HTML"),
            Self::MarkdownV2 => Some("MarkdownV2"),
            Self::Plain => None,
        }
    }

    /// Escape submitter-controlled text so it renders literally.
    pub fn escape(&self, text: &str) -> String {
        match self {
            Self::Html => {
                let mut escaped = String::with_capacity(text.len());
                for c in text.chars() {
                    match c {
                        '&' => escaped.push_str("&amp;"),
                        '<' => escaped.push_str("&lt;"),
                        '>' => escaped.push_str("&gt;"),
                        '"' => escaped.push_str("&quot;"),
                        other => escaped.push(other),
                    }
                }
                escaped
            }
            Self::MarkdownV2 => escape_with(text, |c| {
                matches!(
                    c,
                    '_' | '*'
                        | '['
                        | ']'
                        | '('
                        | ')'
                        | '~'
                        | '`'
                        | '>'
                        | '#'
                        | '+'
                        | '-'
                        | '='
                        | '|'
                        | '{'
                        | '}'
                        | '.'
                        | '!'
                        | '\\'
                )
            }),
            Self::Plain => text.to_string(),
        }
    }

    pub fn bold(&self, text: &str) -> String {
        match self {
            Self::Html => format!("<b>{}</b>", self.escape(text)),
            Self::MarkdownV2 => format!("*{}*", self.escape(text)),
            Self::Plain => text.to_string(),
        }
    }

    /// Clickable link whose visible text is the URL itself.
    ///
    /// Plain text relies on the client's own URL detection.
    pub fn link(&self, url: &str) -> String {
        match self {
            Self::Html => {
                let escaped = self.escape(url);
                format!("<a href=\"{}\">{}</a>", escaped, escaped)
            }
            Self::MarkdownV2 => format!(
                "[{}]({})",
                self.escape(url),
                escape_with(url, |c| matches!(c, ')' | '\\'))
            ),
            Self::Plain => url.to_string(),
        }
    }
}

fn escape_with(text: &str, needs_escape: impl Fn(char) -> bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if needs_escape(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whether `value` is an absolute `http`/`https` URL with a host.
pub fn is_web_link(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

// ============================================================================
// Composer
// ============================================================================

/// Composer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub format: TextFormat,

    /// First line of every message, rendered bold
    pub title: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            format: TextFormat::default(),
            title: "New Request Submission".to_string(),
        }
    }
}

/// Final text plus the routing decision it was composed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub text: String,
    pub format: TextFormat,
    pub category: Option<ServiceCategory>,
    pub topic_id: Option<TopicId>,
}

impl ComposedMessage {
    /// The part of the message the chat API needs.
    pub fn to_outbound(&self) -> OutboundMessage {
        OutboundMessage {
            text: self.text.clone(),
            format: self.format,
            topic_id: self.topic_id,
        }
    }
}

/// Builds message text from normalized submissions.
#[derive(Debug, Clone, Default)]
pub struct MessageComposer {
    config: ComposerConfig,
}

impl MessageComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn format(&self) -> TextFormat {
        self.config.format
    }

    /// Compose the message for `submission` routed as `routed`.
    ///
    /// Output depends only on the arguments and the composer settings.
    pub fn compose(&self, submission: &Submission, routed: &CategoryMatch) -> ComposedMessage {
        let format = self.config.format;
        let mut sections = vec![
            format!("📩 {}", format.bold(&self.config.title)),
            self.header_block(submission),
        ];

        if let Some(block) = routed
            .category
            .and_then(|category| self.detail_block(category, submission))
        {
            sections.push(block);
        }

        ComposedMessage {
            text: sections.join("\n\n"),
            format,
            category: routed.category,
            topic_id: routed.topic_id,
        }
    }

    fn header_block(&self, s: &Submission) -> String {
        let fields = [
            ("👤", "Name", &s.name),
            ("🆔", "ID Number", &s.id_number),
            ("🏢", "Department", &s.department),
            ("📂", "Project", &s.project),
            ("💬", "Telegram Handle", &s.contact_handle),
            ("🛠", "Service", &s.service),
        ];

        fields
            .iter()
            .map(|(glyph, label, value)| {
                let value = self.config.format.escape(value.trim());
                if value.is_empty() {
                    format!("{} {}:", glyph, label)
                } else {
                    format!("{} {}: {}", glyph, label, value)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn detail_block(&self, category: ServiceCategory, s: &Submission) -> Option<String> {
        let (glyph, lines) = match category {
            ServiceCategory::AcademicRelations => return None,
            ServiceCategory::AlumniRelations => (
                "🎓",
                vec![self.text_line("📝", "Request", &s.alumni_request)],
            ),
            ServiceCategory::DocumentChecking => (
                "📄",
                vec![
                    self.upload_line(&s.document_uploads),
                    self.text_line("🗒", "Instructions", &s.document_instructions),
                ],
            ),
            ServiceCategory::PartnershipsIc => (
                "🤝",
                vec![
                    self.link_line("🔗", "Link", &s.partner_link),
                    self.text_line("👥", "Selected", &s.partner_selection),
                    self.text_line("💡", "Reason", &s.partner_reason),
                ],
            ),
            ServiceCategory::PartnershipsRequest => (
                "📑",
                vec![
                    self.text_line("🧩", "Service Type", &s.partnership_service),
                    self.text_line("📝", "Details", &s.partnership_details),
                ],
            ),
        };

        let lines: Vec<String> = lines.into_iter().flatten().collect();
        if lines.is_empty() {
            return None;
        }

        let mut block = vec![format!(
            "{} {}",
            glyph,
            self.config.format.bold(category.name())
        )];
        block.extend(lines);
        Some(block.join("\n"))
    }

    fn text_line(&self, glyph: &str, label: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(format!(
            "{} {}: {}",
            glyph,
            label,
            self.config.format.escape(value)
        ))
    }

    fn link_line(&self, glyph: &str, label: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(format!("{} {}: {}", glyph, label, self.render_reference(value)))
    }

    fn upload_line(&self, uploads: &[String]) -> Option<String> {
        let rendered: Vec<String> = uploads
            .iter()
            .map(|upload| upload.trim())
            .filter(|upload| !upload.is_empty())
            .map(|upload| self.render_reference(upload))
            .collect();

        if rendered.is_empty() {
            return None;
        }
        Some(format!("📎 Upload: {}", rendered.join(", ")))
    }

    fn render_reference(&self, value: &str) -> String {
        if is_web_link(value) {
            self.config.format.link(value)
        } else {
            self.config.format.escape(value)
        }
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
