// src/services/message.rs

//! Alert text rendering.
//!
//! Alerts use Telegram's HTML parse mode, so every upstream string is escaped.

use chrono::{DateTime, Local};
use url::Url;

use crate::error::Result;
use crate::models::{FeedConfig, Listing};
use crate::pipeline::{Change, ChangeKind};

/// Renders listings into rich-text alerts.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    document_base: Url,
    index_url: String,
}

impl MessageFormatter {
    /// Create a formatter from the feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        Ok(Self {
            document_base: Url::parse(&config.document_base_url)?,
            index_url: config.index_url.clone(),
        })
    }

    /// Render an alert stamped with the current local time.
    pub fn render(&self, change: &Change) -> String {
        self.render_at(change, Local::now())
    }

    /// Render an alert stamped with `detected_at`.
    pub fn render_at(&self, change: &Change, detected_at: DateTime<Local>) -> String {
        let listing = &change.listing;
        let mut lines = Vec::new();

        match change.kind {
            ChangeKind::New => lines.push("🚨 <b>New HKEX Listing Detected!</b>".to_string()),
            ChangeKind::Updated => {
                lines.push("🔄 <b>HKEX Listing Updated</b>".to_string());
                let mut changed = Vec::new();
                if change.fields.status {
                    changed.push("status");
                }
                if change.fields.documents {
                    changed.push("documents");
                }
                if !changed.is_empty() {
                    lines.push(format!("<i>Changed: {}</i>", changed.join(", ")));
                }
            }
        }

        lines.push(String::new());
        lines.push(field("Company", &listing.company_name));
        lines.push(field("Listing Date", &listing.listing_date));
        lines.push(field("Status", listing.status.label()));
        lines.push(format!("<b>ID:</b> <code>{}</code>", listing.id));
        lines.push(field("Posted", &listing.posting_date));
        lines.push(field("Has PHIP", if listing.has_phip { "Yes" } else { "No" }));
        lines.push(String::new());
        lines.push("📄 <b>Documents:</b>".to_string());
        lines.extend(self.document_lines(listing));
        lines.push(String::new());
        lines.push(format!(
            "<a href=\"{}\">View All Listings</a>",
            escape_html(&self.index_url)
        ));
        lines.push(String::new());
        lines.push(format!(
            "<i>Detected at: {}</i>",
            detected_at.format("%Y-%m-%d %H:%M:%S")
        ));

        lines.join("\n")
    }

    /// One bullet per document, in upstream order.
    fn document_lines(&self, listing: &Listing) -> Vec<String> {
        if listing.documents.is_empty() {
            return vec!["• No documents available".to_string()];
        }

        listing
            .documents
            .iter()
            .map(|doc| {
                let name = escape_html(doc.display_name());
                match doc.resolved_url(&self.document_base) {
                    Some(url) => format!("• <a href=\"{}\">{}</a>", escape_html(&url), name),
                    None => format!("• {} (no link)", name),
                }
            })
            .collect()
    }
}

fn field(name: &str, value: &str) -> String {
    let value = if value.trim().is_empty() {
        "Unknown".to_string()
    } else {
        escape_html(value)
    };
    format!("<b>{name}:</b> {value}")
}

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
