use crate::error::MediaError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Read;
use std::path::Path;

/// Encode raw bytes as a `data:` URI, the storage form for captured photos.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 `data:` URI into its mime type and payload bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), MediaError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::Decode("not a data URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::Decode("data URI has no payload".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MediaError::Decode("data URI is not base64-encoded".into()))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}

/// Load the raw bytes behind an issue image: either an inline data URI
/// (user-captured photos) or a remote URL (seed data). Remote fetches can
/// fail for reasons outside our control; callers decide whether that skips
/// a comparison or aborts a scan.
pub fn load_image_bytes(agent: &ureq::Agent, source: &str) -> Result<Vec<u8>, MediaError> {
    if source.starts_with("data:") {
        return decode_data_uri(source).map(|(_, bytes)| bytes);
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        return fetch_bytes(agent, source);
    }
    Err(MediaError::Decode(format!(
        "unsupported image source: {source}"
    )))
}

fn fetch_bytes(agent: &ureq::Agent, url: &str) -> Result<Vec<u8>, MediaError> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| MediaError::Fetch(e.to_string()))?;
    let mut bytes = Vec::new();
    response
        .into_body()
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| MediaError::Fetch(e.to_string()))?;
    Ok(bytes)
}

/// Best-effort mime type for a picked file. Imports are unconstrained in
/// format, so unknown extensions stay opaque.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn data_uri_round_trip() {
        let uri = to_data_uri("image/jpeg", b"\xff\xd8\xff");
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, b"\xff\xd8\xff");
    }

    #[test]
    fn rejects_non_data_uri() {
        assert!(decode_data_uri("https://example.com/a.jpg").is_err());
        assert!(decode_data_uri("data:image/jpeg").is_err());
        assert!(decode_data_uri("data:image/jpeg,plain").is_err());
    }

    #[test]
    fn load_rejects_unknown_source_kind() {
        let agent = crate::http::default_agent();
        assert!(load_image_bytes(&agent, "ftp://example.com/a.jpg").is_err());
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(&PathBuf::from("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(&PathBuf::from("a.png")), "image/png");
        assert_eq!(mime_for_path(&PathBuf::from("a.bin")), "application/octet-stream");
        assert_eq!(mime_for_path(&PathBuf::from("noext")), "application/octet-stream");
    }
}
