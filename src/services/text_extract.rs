use anyhow::{Context, Result};

/// Supported MIME types for lecture upload.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/markdown",
    "application/octet-stream", // fallback — we detect by extension
];

/// Supported file extensions (used as fallback when MIME is generic).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Check if a file is supported by MIME type or extension.
pub fn is_supported(content_type: &str, filename: &str) -> bool {
    if content_type != "application/octet-stream" && SUPPORTED_MIME_TYPES.contains(&content_type) {
        return true;
    }
    extension_from_filename(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_pdf(content_type: &str, ext: &str) -> bool {
    content_type == "application/pdf" || ext == "pdf"
}

/// Extract text from uploaded file bytes, routing by MIME type with extension
/// fallback.
///
/// PDF extraction is CPU-bound and runs on a blocking thread pool via
/// `spawn_blocking` so it doesn't stall the async runtime.
pub async fn extract_text(bytes: &[u8], content_type: &str, filename: &str) -> Result<String> {
    let ext = extension_from_filename(filename).unwrap_or_default();

    if is_pdf(content_type, &ext) {
        let bytes = bytes.to_vec();
        let fname = filename.to_string();

        tracing::info!(
            "extract_text: starting blocking PDF extraction for '{fname}' ({} bytes)",
            bytes.len()
        );

        let handle = tokio::task::spawn_blocking(move || {
            let result = extract_pdf(&bytes);
            match &result {
                Ok(text) => {
                    tracing::info!("extract_text: '{fname}' extracted, {} chars", text.len())
                }
                Err(e) => tracing::error!("extract_text: '{fname}' extraction failed: {e:#}"),
            }
            result
        });

        // Time out after 120 seconds to avoid hanging forever on problematic files
        match tokio::time::timeout(std::time::Duration::from_secs(120), handle).await {
            Ok(join_result) => join_result.context("PDF extraction task panicked")?,
            Err(_) => anyhow::bail!("PDF extraction timed out after 120s for '{filename}'"),
        }
    } else if matches!(content_type, "text/plain" | "text/markdown")
        || matches!(ext.as_str(), "txt" | "md")
    {
        Ok(extract_plaintext(bytes))
    } else {
        Err(anyhow::anyhow!(
            "Unsupported file type: {content_type} (ext: {ext})"
        ))
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // Try pdftotext (poppler) first — much faster and handles complex PDFs better
    match extract_pdf_pdftotext(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!("PDF extracted via pdftotext ({} chars)", text.len());
            return Ok(text);
        }
        Ok(_) => tracing::warn!("pdftotext returned empty text, falling back to pdf_extract"),
        Err(e) => tracing::warn!("pdftotext failed ({e:#}), falling back to pdf_extract"),
    }

    // Fallback to pure-Rust pdf_extract
    tracing::info!("Extracting PDF via pdf_extract (this may be slow for large files)");
    pdf_extract::extract_text_from_mem(bytes)
        .context("No working PDF extraction path for this file")
}

fn extract_pdf_pdftotext(bytes: &[u8]) -> Result<String> {
    use std::io::Write;
    use std::process::Command;

    // Write bytes to a temp file (pdftotext reads from file)
    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(tmp.path())
        .arg("-") // output to stdout
        .output()
        .context("Failed to run pdftotext — is poppler-utils installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext exited with {}: {stderr}", output.status);
    }

    String::from_utf8(output.stdout).context("pdftotext output is not valid UTF-8")
}

/// Decode a text upload: UTF-8 first, Latin-1 otherwise. Latin-1 maps every
/// byte to a char, so this never fails.
fn extract_plaintext(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn extension_from_filename(filename: &str) -> Option<String> {
    filename.rsplit('.').next().map(|e| e.to_lowercase())
}
