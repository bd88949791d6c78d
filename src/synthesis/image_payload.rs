use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;

use super::error::ValidationError;

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Types the provider accepts but the local decoder cannot read. They are
/// forwarded after an ISO media container check.
const PASSTHROUGH_TYPES: [&str; 2] = ["image/heic", "image/heif"];

/// A validated, self-describing image taken from a data URI.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    media_type: String,
    /// `None` for passthrough types.
    format: Option<ImageFormat>,
    encoded: String,
    bytes: Arc<Vec<u8>>,
}

impl ImagePayload {
    /// Checks the data URI header, the base64 body and the byte signature.
    /// Full pixel decoding is left to [`ImagePayload::verify_decodable`].
    /// `image/jpg` and `image/pjpeg` are normalized to `image/jpeg`.
    pub fn parse(data_uri: &str) -> Result<Self, ValidationError> {
        let data_uri = data_uri.trim();
        if data_uri.is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let rest = strip_prefix_ignore_case(data_uri, DATA_URI_PREFIX)
            .ok_or(ValidationError::NotDataUri)?;
        let (header, body) = rest.split_once(',').ok_or(ValidationError::NotDataUri)?;

        let media_type = strip_suffix_ignore_case(header, BASE64_MARKER)
            .ok_or(ValidationError::NotBase64Encoded)?
            .trim()
            .to_ascii_lowercase();
        // Parameters such as `;charset=` are tolerated but ignored.
        let media_type = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        if media_type.is_empty() {
            return Err(ValidationError::MissingMediaType);
        }
        if !is_type_subtype(&media_type) {
            return Err(ValidationError::UnsupportedMediaType(media_type));
        }

        let media_type = canonical_media_type(&media_type).to_string();
        let format = if PASSTHROUGH_TYPES.contains(&media_type.as_str()) {
            None
        } else {
            Some(
                ImageFormat::from_mime_type(&media_type)
                    .ok_or_else(|| ValidationError::UnsupportedMediaType(media_type.clone()))?,
            )
        };

        let encoded: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if encoded.is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|err| ValidationError::InvalidBase64(err.to_string()))?;
        if bytes.is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let signature_matches = match format {
            Some(format) => {
                let sniffed = image::guess_format(&bytes).map_err(|_| {
                    ValidationError::Undecodable("unrecognized image signature".into())
                })?;
                sniffed == format
            }
            None => is_iso_media(&bytes),
        };
        if !signature_matches {
            return Err(ValidationError::MediaTypeMismatch {
                declared: media_type,
            });
        }

        Ok(Self {
            media_type,
            format,
            encoded,
            bytes: Arc::new(bytes),
        })
    }

    /// Decodes the image on the blocking pool and returns its dimensions.
    /// Passthrough types are not decoded and yield `None`.
    pub async fn verify_decodable(&self) -> Result<Option<(u32, u32)>, ValidationError> {
        let Some(format) = self.format else {
            return Ok(None);
        };
        let bytes = Arc::clone(&self.bytes);

        tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&bytes, format)
                .map(|img| Some((img.width(), img.height())))
                .map_err(|err| ValidationError::Undecodable(err.to_string()))
        })
        .await
        .map_err(|err| ValidationError::Undecodable(format!("decoder task failed: {err}")))?
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Base64 body exactly as received, minus whitespace.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

fn canonical_media_type(media_type: &str) -> &str {
    match media_type {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    }
}

/// HEIF-family files open with an ISO base media `ftyp` box.
fn is_iso_media(bytes: &[u8]) -> bool {
    bytes.get(4..8) == Some(b"ftyp".as_slice())
}

fn is_type_subtype(media_type: &str) -> bool {
    match media_type.split_once('/') {
        Some((kind, subtype)) => !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/'),
        None => false,
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    let tail = value.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &value[..split])
}
