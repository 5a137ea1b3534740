use serde::Serialize;
use stowage_storage::sniff;

/// Result of `stowage upload`.
#[derive(Debug, Serialize)]
pub struct UploadOutput {
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Result of `stowage download --output`.
#[derive(Debug, Serialize)]
pub struct DownloadOutput {
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub output: String,
}

/// Explicit content type if given and non-blank, otherwise sniffed from `data`.
pub fn resolve_content_type(explicit: Option<&str>, data: &[u8]) -> String {
    match explicit.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(content_type) => content_type.to_string(),
        None => sniff::detect(data).to_string(),
    }
}

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so stdout stays clean for JSON and downloaded bytes.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_content_type_prefers_explicit() {
        assert_eq!(resolve_content_type(Some("text/csv"), b"%PDF-1.7"), "text/csv");
        assert_eq!(resolve_content_type(Some(" image/png "), b""), "image/png");
    }

    #[test]
    fn resolve_content_type_sniffs_when_missing() {
        assert_eq!(resolve_content_type(None, b"%PDF-1.7"), "application/pdf");
        assert_eq!(resolve_content_type(Some("  "), b"plain words"), "text/plain");
        assert_eq!(resolve_content_type(None, &[0x00, 0xFF]), "application/octet-stream");
    }

    #[test]
    fn upload_output_serializes() {
        let output = UploadOutput {
            stored_path: "my-bucket/6c84fb90-12c4-41c4-8f5e-1d7a8c2f3b9a".to_string(),
            content_type: "text/plain".to_string(),
            size_bytes: 5,
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["stored_path"], "my-bucket/6c84fb90-12c4-41c4-8f5e-1d7a8c2f3b9a");
        assert_eq!(value["size_bytes"], 5);
    }
}
