use std::{fmt, str::FromStr};

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info};

/// Matches the "up to 10MB" hint on the intake form.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("media type `{0}` is not an image")]
    NotImage(String),
    #[error("media type `{0}` is malformed")]
    BadMediaType(String),
    #[error("invalid base64 payload: {0}")]
    BadPayload(String),
}

/// An image inlined as `data:<media-type>;base64,<payload>`.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    media_type: String,
    bytes: Bytes,
}

impl DataUrl {
    pub fn new(media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, DataUrlError> {
        let media_type = media_type.into().trim().to_ascii_lowercase();
        let Some(subtype) = media_type.strip_prefix("image/") else {
            return Err(DataUrlError::NotImage(media_type));
        };
        if !is_token(subtype) {
            return Err(DataUrlError::BadMediaType(media_type));
        }
        Ok(Self { media_type, bytes: bytes.into() })
    }

    pub fn parse(raw: &str) -> Result<Self, DataUrlError> {
        let rest = raw.trim().strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;
        let media_type = header.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| DataUrlError::BadPayload(e.to_string()))?;
        Self::new(media_type, bytes)
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// RFC 6838 restricted-name characters.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 127
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

// Keep multi-megabyte payloads out of debug logs.
impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FromStr for DataUrl {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataUrl::parse(s)
    }
}

impl Serialize for DataUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DataUrl::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("photo is {0} bytes, limit is {MAX_PHOTO_BYTES}")]
    TooLarge(usize),
}

/// Turns an uploaded file into a data URL.
///
/// The declared media type wins when it names an image; otherwise the format is
/// sniffed from the bytes. Returns `Ok(None)` for anything that is not an image,
/// which callers treat as "ignore this file".
pub async fn decode_upload(bytes: Bytes, declared: Option<&str>) -> Result<Option<DataUrl>, UploadError> {
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(UploadError::TooLarge(bytes.len()));
    }

    let declared = declared
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let media_type = match declared {
        Some(m) if m.starts_with("image/") => Some(m),
        Some(m) if m != "application/octet-stream" => {
            debug!("Ignoring upload declared as {}", m);
            None
        }
        _ => sniff_media_type(bytes.clone()).await,
    };

    let Some(media_type) = media_type else {
        info!("⚠️ Upload is not an image, ignoring ({} bytes)", bytes.len());
        return Ok(None);
    };

    info!("🖼️ Decoded {} photo ({} bytes)", media_type, bytes.len());
    Ok(DataUrl::new(media_type, bytes).ok())
}

async fn sniff_media_type(bytes: Bytes) -> Option<String> {
    tokio::task::spawn_blocking(move || image::guess_format(&bytes).ok())
        .await
        .ok()
        .flatten()
        .map(|format| format.to_mime_type().to_string())
}
