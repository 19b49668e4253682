use std::collections::BTreeMap;

use mime::Mime;
use serde::Serialize;

pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("File size must be less than 5MB")]
    TooLarge { size: usize },
    #[error("Please upload a JPEG or PNG image")]
    UnsupportedType { content_type: String },
    #[error("Selected file is empty")]
    Empty,
    #[error("{field} does not accept file uploads")]
    NotAnAttachment { field: String },
}

/// A file picked for a document field. Lives only in the session, never in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAttachment {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub preview_url: String,
}

impl DocumentAttachment {
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, AttachmentError> {
        let field = field.into();
        let content_type = content_type.into();

        if bytes.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge { size: bytes.len() });
        }
        let Some(accepted) = accepted_image_type(&content_type) else {
            return Err(AttachmentError::UnsupportedType { content_type });
        };
        let file_name = sanitize_file_name(&file_name.into(), &field, &accepted);
        let content_type = accepted.essence_str().to_string();

        let preview_url = format!("preview://{field}/{file_name}");
        Ok(Self {
            field,
            file_name,
            content_type,
            bytes,
            preview_url,
        })
    }

    pub fn summary(&self) -> AttachmentSummary {
        AttachmentSummary {
            field: self.field.clone(),
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            size: self.bytes.len(),
            preview_url: self.preview_url.clone(),
        }
    }
}

/// Byte-free view of an attachment for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub preview_url: String,
}

/// Attachments held by a wizard session, keyed by field.
#[derive(Debug, Clone, Default)]
pub struct AttachmentSet {
    files: BTreeMap<String, DocumentAttachment>,
}

impl AttachmentSet {
    pub fn insert(&mut self, attachment: DocumentAttachment) -> Option<DocumentAttachment> {
        self.files.insert(attachment.field.clone(), attachment)
    }

    pub fn remove(&mut self, field: &str) -> Option<DocumentAttachment> {
        self.files.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&DocumentAttachment> {
        self.files.get(field)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Attachments for the given fields, in field order.
    pub fn for_fields<'a, I>(&self, fields: I) -> Vec<&DocumentAttachment>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields
            .into_iter()
            .filter_map(|field| self.files.get(field))
            .collect()
    }

    pub fn summaries(&self) -> Vec<AttachmentSummary> {
        self.files.values().map(DocumentAttachment::summary).collect()
    }
}

/// JPEG or PNG, with the legacy `image/jpg` and `image/pjpeg` spellings folded into JPEG.
fn accepted_image_type(raw: &str) -> Option<Mime> {
    let parsed = raw.trim().parse::<Mime>().ok()?;
    if parsed.type_() != mime::IMAGE {
        return None;
    }
    match parsed.subtype().as_str() {
        "jpeg" | "jpg" | "pjpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        _ => None,
    }
}

fn sanitize_file_name(raw: &str, field: &str, content_type: &Mime) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if !base.is_empty() {
        return base.to_string();
    }
    let extension = if *content_type == mime::IMAGE_PNG {
        "png"
    } else {
        "jpg"
    };
    format!("{field}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_jpeg_and_builds_preview_url() {
        let attachment =
            DocumentAttachment::new("nic_front", "C:\\scans\\front.jpg", "image/jpg", vec![1, 2, 3])
                .expect("valid attachment");
        assert_eq!(attachment.file_name, "front.jpg");
        assert_eq!(attachment.content_type, "image/jpeg");
        assert_eq!(attachment.preview_url, "preview://nic_front/front.jpg");
    }

    #[test]
    fn rejects_oversized_and_unsupported_files() {
        let oversized = DocumentAttachment::new(
            "nic_back",
            "back.png",
            "image/png",
            vec![0; MAX_ATTACHMENT_BYTES + 1],
        );
        assert!(matches!(oversized, Err(AttachmentError::TooLarge { .. })));

        let pdf = DocumentAttachment::new("nic_back", "back.pdf", "application/pdf", vec![1]);
        assert_eq!(
            pdf.unwrap_err().to_string(),
            "Please upload a JPEG or PNG image"
        );
    }

    #[test]
    fn content_type_parameters_and_case_are_ignored() {
        let attachment =
            DocumentAttachment::new("nic_front", "front", "Image/PNG; charset=binary", vec![1])
                .expect("valid attachment");
        assert_eq!(attachment.content_type, "image/png");

        for rejected in ["image/gif", "text/png", "not a mime type", ""] {
            let err = DocumentAttachment::new("nic_front", "front", rejected, vec![1]).unwrap_err();
            assert_eq!(
                err,
                AttachmentError::UnsupportedType {
                    content_type: rejected.to_string()
                }
            );
        }
    }

    #[test]
    fn names_unnamed_uploads_after_field() {
        let attachment = DocumentAttachment::new("profile_image", "  ", "image/png", vec![9])
            .expect("valid attachment");
        assert_eq!(attachment.file_name, "profile_image.png");
    }
}
