use std::collections::BTreeMap;

use crate::{encoder::Attachment, part::DEFAULT_FILE_CONTENT_TYPE, Part};

/// Filename used when a file part carries an empty one.
pub const DEFAULT_FILENAME: &str = "proof.jpg";

/// Text values by field name plus the optional single attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    fields: BTreeMap<String, String>,
    attachment: Option<Attachment>,
}

impl ExtractedFields {
    /// Value of a requested text field. Fields that were never requested
    /// read as empty too.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

/// Picks the requested text fields and the file field out of decoded parts.
///
/// The first non-file part named after a text field wins and its value is
/// trimmed; missing text fields are empty. The first part named
/// `file_field` that carries a filename becomes the attachment, any further
/// ones are ignored.
pub fn extract(parts: &[Part], text_names: &[&str], file_field: &str) -> ExtractedFields {
    let fields = text_names
        .iter()
        .map(|name| {
            let value = parts
                .iter()
                .find(|p| p.name() == *name && !p.is_file())
                .map(|p| p.text().trim().to_string())
                .unwrap_or_default();

            (name.to_string(), value)
        })
        .collect();

    let attachment = parts
        .iter()
        .find(|p| p.name() == file_field && p.is_file())
        .map(|p| {
            let filename = match p.filename() {
                Some(f) if !f.trim().is_empty() => f.to_string(),
                _ => DEFAULT_FILENAME.to_string(),
            };

            Attachment::new(
                filename,
                p.content_type().unwrap_or(DEFAULT_FILE_CONTENT_TYPE),
                p.body_bytes(),
            )
        });

    ExtractedFields { fields, attachment }
}
