//! Image payload loading and mime-type inference
//!
//! Images arrive either as a filesystem path or inline base64 (optionally a
//! full data: URI). The mime type comes from the file extension, the data:
//! URI prefix, or magic-byte sniffing, defaulting to image/jpeg.

use crate::error::AppError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// An image ready for upload
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub alt_text: Option<String>,
}

/// Image input as supplied by a tool call
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ImageInput {
    /// Filesystem path to the image
    #[schemars(description = "Filesystem path to a PNG or JPEG file")]
    pub path: Option<String>,

    /// Inline base64 image data, optionally a full data: URI
    #[schemars(description = "Base64-encoded image data or a data: URI")]
    pub data: Option<String>,

    /// Alt text for accessibility
    #[schemars(description = "Alt text describing the image")]
    pub alt: Option<String>,
}

/// Load an image from a path or inline data
///
/// Exactly one of `path` and `data` must be supplied; anything else is an
/// input error surfaced to the caller.
pub async fn load_image(input: ImageInput) -> Result<ImagePayload, AppError> {
    match (input.path, input.data) {
        (Some(path), None) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| AppError::InvalidInput(format!("Cannot read image {}: {}", path, e)))?;
            let mime_type = mime_from_extension(&path)
                .unwrap_or_else(|| sniff_mime(&bytes))
                .to_string();
            Ok(ImagePayload {
                bytes,
                mime_type,
                alt_text: input.alt,
            })
        }
        (None, Some(data)) => {
            let (declared_mime, encoded) = split_data_uri(&data);
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|e| AppError::InvalidInput(format!("Invalid base64 image data: {}", e)))?;
            let mime_type = declared_mime
                .unwrap_or_else(|| sniff_mime(&bytes))
                .to_string();
            Ok(ImagePayload {
                bytes,
                mime_type,
                alt_text: input.alt,
            })
        }
        _ => Err(AppError::InvalidInput(
            "Each image must supply exactly one of 'path' or 'data'".to_string(),
        )),
    }
}

/// Infer mime type from a file extension, if recognizable
fn mime_from_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(MIME_PNG),
        "jpg" | "jpeg" => Some(MIME_JPEG),
        _ => None,
    }
}

/// Split an optional data: URI prefix from the base64 body
fn split_data_uri(data: &str) -> (Option<&'static str>, &str) {
    if let Some(rest) = data.strip_prefix("data:image/png;base64,") {
        (Some(MIME_PNG), rest)
    } else if let Some(rest) = data.strip_prefix("data:image/jpeg;base64,") {
        (Some(MIME_JPEG), rest)
    } else if let Some((_, rest)) = data.split_once(";base64,") {
        // Unknown data: prefix; fall back to sniffing the decoded bytes
        (None, rest)
    } else {
        (None, data)
    }
}

/// Magic-byte sniffing fallback; anything that is not a PNG is treated as JPEG
fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PNG_MAGIC) {
        MIME_PNG
    } else {
        MIME_JPEG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(mime_from_extension("photo.PNG"), Some(MIME_PNG));
        assert_eq!(mime_from_extension("photo.jpeg"), Some(MIME_JPEG));
        assert_eq!(mime_from_extension("photo.jpg"), Some(MIME_JPEG));
        assert_eq!(mime_from_extension("photo.webp"), None);
        assert_eq!(mime_from_extension("noextension"), None);
    }

    #[test]
    fn test_sniff_png_magic() {
        assert_eq!(sniff_mime(&png_bytes()), MIME_PNG);
        assert_eq!(sniff_mime(&[0xff, 0xd8, 0xff]), MIME_JPEG);
        assert_eq!(sniff_mime(b"anything else"), MIME_JPEG);
    }

    #[tokio::test]
    async fn test_load_from_path_png_extension() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let input = ImageInput {
            path: Some(file.path().to_string_lossy().into_owned()),
            data: None,
            alt: Some("a png".to_string()),
        };
        let payload = load_image(input).await.unwrap();
        assert_eq!(payload.mime_type, MIME_PNG);
        assert_eq!(payload.alt_text.as_deref(), Some("a png"));
    }

    #[tokio::test]
    async fn test_load_from_path_sniffs_without_extension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let input = ImageInput {
            path: Some(file.path().to_string_lossy().into_owned()),
            data: None,
            alt: None,
        };
        let payload = load_image(input).await.unwrap();
        assert_eq!(payload.mime_type, MIME_PNG);
    }

    #[tokio::test]
    async fn test_load_from_data_uri_prefix() {
        let encoded = BASE64.encode(b"not really a png");
        let input = ImageInput {
            path: None,
            data: Some(format!("data:image/png;base64,{}", encoded)),
            alt: None,
        };
        let payload = load_image(input).await.unwrap();
        // Declared prefix wins over sniffing
        assert_eq!(payload.mime_type, MIME_PNG);
        assert_eq!(payload.bytes, b"not really a png");
    }

    #[tokio::test]
    async fn test_load_from_bare_base64_defaults_jpeg() {
        let encoded = BASE64.encode(b"some jpeg-ish bytes");
        let input = ImageInput {
            path: None,
            data: Some(encoded),
            alt: None,
        };
        let payload = load_image(input).await.unwrap();
        assert_eq!(payload.mime_type, MIME_JPEG);
    }

    #[tokio::test]
    async fn test_load_from_base64_sniffs_png_magic() {
        let encoded = BASE64.encode(png_bytes());
        let input = ImageInput {
            path: None,
            data: Some(encoded),
            alt: None,
        };
        let payload = load_image(input).await.unwrap();
        assert_eq!(payload.mime_type, MIME_PNG);
    }

    #[tokio::test]
    async fn test_both_path_and_data_rejected() {
        let input = ImageInput {
            path: Some("x.png".to_string()),
            data: Some("AAAA".to_string()),
            alt: None,
        };
        let result = load_image(input).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_neither_path_nor_data_rejected() {
        let input = ImageInput {
            path: None,
            data: None,
            alt: None,
        };
        assert!(load_image(input).await.is_err());
    }
}
