//! Client-side encryption parameters carried in `X-Encr-*` headers
//!
//! Binary values travel base64 encoded. A request without `X-Encr-Key-Id`
//! carries no encryption; a missing IV or content key decodes to empty bytes.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use colleague_common::AttachmentEncryption;
use thiserror::Error;

pub const ENCR_KEY_ID_HEADER: HeaderName = HeaderName::from_static("x-encr-key-id");
pub const ENCR_IV_HEADER: HeaderName = HeaderName::from_static("x-encr-iv");
pub const ENCR_CONTENT_KEY_HEADER: HeaderName = HeaderName::from_static("x-encr-content-key");
pub const ENCR_TYPE_HEADER: HeaderName = HeaderName::from_static("x-encr-type");

pub const ENCRYPTION_HEADERS: [HeaderName; 4] = [
    ENCR_KEY_ID_HEADER,
    ENCR_IV_HEADER,
    ENCR_CONTENT_KEY_HEADER,
    ENCR_TYPE_HEADER,
];

#[derive(Debug, Error)]
pub enum EncryptionHeaderError {
    #[error("Header {header} is not valid base64: {source}")]
    InvalidBase64 {
        header: HeaderName,
        #[source]
        source: base64::DecodeError,
    },
    #[error("Header {0} contains characters that are not visible ASCII")]
    InvalidValue(HeaderName),
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
) -> Result<Option<&'a str>, EncryptionHeaderError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| EncryptionHeaderError::InvalidValue(name.clone())),
    }
}

fn decode_bytes(headers: &HeaderMap, name: &HeaderName) -> Result<Vec<u8>, EncryptionHeaderError> {
    match header_str(headers, name)? {
        None | Some("") => Ok(Vec::new()),
        Some(value) => STANDARD
            .decode(value)
            .map_err(|source| EncryptionHeaderError::InvalidBase64 {
                header: name.clone(),
                source,
            }),
    }
}

/// Read encryption parameters from request headers.
pub fn from_headers(headers: &HeaderMap) -> Result<Option<AttachmentEncryption>, EncryptionHeaderError> {
    let encr_key_id = match header_str(headers, &ENCR_KEY_ID_HEADER)? {
        None | Some("") => return Ok(None),
        Some(key_id) => key_id.to_string(),
    };

    let encr_type = header_str(headers, &ENCR_TYPE_HEADER)?
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(Some(AttachmentEncryption {
        encr_key_id,
        encr_type,
        encr_content_key: decode_bytes(headers, &ENCR_CONTENT_KEY_HEADER)?,
        encr_iv: decode_bytes(headers, &ENCR_IV_HEADER)?,
    }))
}

/// Response headers announcing how downloaded content was encrypted.
///
/// Values that cannot be carried in a header are left out.
pub fn to_headers(encryption: &AttachmentEncryption) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&encryption.encr_key_id) {
        headers.insert(ENCR_KEY_ID_HEADER, value);
    }
    if let Some(Ok(value)) = encryption.encr_type.as_deref().map(HeaderValue::from_str) {
        headers.insert(ENCR_TYPE_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&STANDARD.encode(&encryption.encr_content_key)) {
        headers.insert(ENCR_CONTENT_KEY_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&STANDARD.encode(&encryption.encr_iv)) {
        headers.insert(ENCR_IV_HEADER, value);
    }

    headers
}
