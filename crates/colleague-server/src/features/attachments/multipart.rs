//! Multipart header helpers
//!
//! Boundary extraction from `Content-Type` and `Content-Disposition`
//! classification for the sections of an attachment upload.

use axum::http::header::CONTENT_DISPOSITION;
use thiserror::Error;

/// RFC 2046 caps multipart boundaries at 70 characters.
pub const MAX_BOUNDARY_LENGTH: usize = 70;

/// Section name (or disposition type) carrying the JSON metadata.
pub const METADATA_SECTION: &str = "attachment";

/// Section name (or disposition type) carrying the binary content.
pub const CONTENT_SECTION: &str = "datafile";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    #[error("Missing content-type boundary")]
    Missing,
    #[error("Unsupported multipart content type: {0}")]
    InvalidContentType(String),
    #[error("Multipart boundary length limit {limit} exceeded")]
    TooLong { limit: usize, length: usize },
}

/// Whether a `Content-Type` value names a multipart body.
pub fn is_multipart_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("multipart/")
}

/// Extract the boundary parameter from a `multipart/form-data` `Content-Type`.
///
/// Parsing and quote stripping are left to `multer`. An absent or blank
/// boundary is an error, as is one longer than `length_limit`.
pub fn get_boundary(content_type: &str, length_limit: usize) -> Result<String, BoundaryError> {
    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(multer::Error::NoBoundary) => return Err(BoundaryError::Missing),
        Err(e) => return Err(BoundaryError::InvalidContentType(e.to_string())),
    };

    if boundary.trim().is_empty() {
        return Err(BoundaryError::Missing);
    }

    let length = boundary.chars().count();
    if length > length_limit {
        return Err(BoundaryError::TooLong {
            limit: length_limit,
            length,
        });
    }

    Ok(boundary)
}

/// `Content-Disposition` of a multipart section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lower-cased (`form-data`, `attachment`, ...)
    pub disposition_type: String,
    pub name: Option<String>,
    pub file_name: Option<String>,
}

impl ContentDisposition {
    /// Read the disposition of a section as `multer` parsed it.
    ///
    /// `multer` exposes `name` and `filename` but not the disposition type,
    /// which is the token ahead of the first parameter.
    pub fn of_field(field: &multer::Field<'_>) -> Option<Self> {
        let value = field.headers().get(CONTENT_DISPOSITION)?.to_str().ok()?;
        Some(Self {
            disposition_type: disposition_type(value),
            name: field.name().map(str::to_string),
            file_name: field.file_name().map(str::to_string),
        })
    }

    pub fn has_file_name(&self) -> bool {
        self.file_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// `form-data` section without a file name, i.e. a plain form field.
    pub fn is_form_data(&self) -> bool {
        self.disposition_type == "form-data" && !self.has_file_name()
    }

    /// `form-data` section carrying a file.
    pub fn is_file(&self) -> bool {
        self.disposition_type == "form-data" && self.has_file_name()
    }

    pub fn is_mixed(&self) -> bool {
        self.disposition_type == "mixed"
    }

    fn is(&self, section: &str) -> bool {
        self.disposition_type == section || self.name.as_deref() == Some(section)
    }
}

fn disposition_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Role of one section within an attachment upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Metadata,
    Content,
    Other,
}

impl SectionKind {
    /// Classify by disposition type or section name.
    pub fn of(disposition: Option<&ContentDisposition>) -> Self {
        match disposition {
            Some(d) if d.is(METADATA_SECTION) => Self::Metadata,
            Some(d) if d.is(CONTENT_SECTION) => Self::Content,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disposition(disposition_type: &str, name: Option<&str>, file_name: Option<&str>) -> ContentDisposition {
        ContentDisposition {
            disposition_type: disposition_type.to_string(),
            name: name.map(str::to_string),
            file_name: file_name.map(str::to_string),
        }
    }

    #[test]
    fn test_multipart_content_type_detection() {
        assert!(is_multipart_content_type("multipart/form-data; boundary=abc"));
        assert!(is_multipart_content_type("Multipart/Mixed; boundary=abc"));
        assert!(!is_multipart_content_type("application/json"));
    }

    #[test]
    fn test_boundary_unquoted_and_quoted() {
        assert_eq!(
            get_boundary("multipart/form-data; boundary=----abc123", MAX_BOUNDARY_LENGTH),
            Ok("----abc123".to_string())
        );
        assert_eq!(
            get_boundary(r#"multipart/form-data; charset=utf-8; boundary="abc;123""#, MAX_BOUNDARY_LENGTH),
            Ok("abc;123".to_string())
        );
    }

    #[test]
    fn test_boundary_missing() {
        assert_eq!(get_boundary("multipart/form-data", 70), Err(BoundaryError::Missing));
        assert_eq!(get_boundary("multipart/form-data; charset=utf-8", 70), Err(BoundaryError::Missing));
    }

    #[test]
    fn test_boundary_requires_form_data() {
        assert!(matches!(
            get_boundary("application/json", 70),
            Err(BoundaryError::InvalidContentType(_))
        ));
    }

    #[test]
    fn test_boundary_length_limit() {
        let exact = "b".repeat(MAX_BOUNDARY_LENGTH);
        assert!(get_boundary(&format!("multipart/form-data; boundary={}", exact), MAX_BOUNDARY_LENGTH).is_ok());

        let long = "b".repeat(MAX_BOUNDARY_LENGTH + 1);
        assert_eq!(
            get_boundary(&format!("multipart/form-data; boundary={}", long), MAX_BOUNDARY_LENGTH),
            Err(BoundaryError::TooLong {
                limit: MAX_BOUNDARY_LENGTH,
                length: MAX_BOUNDARY_LENGTH + 1
            })
        );
    }

    #[test]
    fn test_disposition_type_token() {
        assert_eq!(disposition_type(r#"Form-Data; name="datafile""#), "form-data");
        assert_eq!(disposition_type("mixed"), "mixed");
        assert_eq!(disposition_type(""), "");
    }

    #[test]
    fn test_form_field_file_and_mixed() {
        assert!(disposition("form-data", Some("attachment"), None).is_form_data());
        assert!(disposition("form-data", Some("attachment"), Some("")).is_form_data());

        let file = disposition("form-data", Some("datafile"), Some("notes.txt"));
        assert!(file.is_file());
        assert!(!file.is_form_data());

        assert!(disposition("mixed", None, None).is_mixed());
    }

    #[test]
    fn test_section_classification() {
        let by_name = disposition("form-data", Some("attachment"), None);
        assert_eq!(SectionKind::of(Some(&by_name)), SectionKind::Metadata);

        let by_type = disposition("datafile", None, Some("a.bin"));
        assert_eq!(SectionKind::of(Some(&by_type)), SectionKind::Content);

        let by_name = disposition("form-data", Some("datafile"), Some("a.bin"));
        assert_eq!(SectionKind::of(Some(&by_name)), SectionKind::Content);

        let other = disposition("form-data", Some("comment"), None);
        assert_eq!(SectionKind::of(Some(&other)), SectionKind::Other);
        assert_eq!(SectionKind::of(None), SectionKind::Other);
    }
}
