/// Upload client for the MV3D upload service
use std::path::Path;

use serde::Deserialize;
use tracing::info;

const BOUNDARY: &str = "----mv3d-upload-boundary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// 201: first upload of this filename
    Created,
    /// 200: a file of this name already existed on the server
    AlreadyExists,
}

#[derive(Debug, Deserialize)]
pub struct UploadOutcome {
    #[serde(skip)]
    pub status: UploadStatus,
    pub message: String,
    pub filename: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

impl Default for UploadStatus {
    fn default() -> Self {
        Self::Created
    }
}

/// POST a local model file to `<server>/upload` as a multipart form with a
/// single `model` field, mapping 201/200 onto created/already-exists.
pub fn upload_model(server: &str, path: &Path) -> Result<UploadOutcome, String> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{} has no usable filename", path.display()))?;
    let content =
        std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;

    let body = multipart_body(filename, &content);
    let url = format!("{}/upload", server.trim_end_matches('/'));

    let response = ureq::post(&url)
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .send_bytes(&body)
        .map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let detail = response.into_string().unwrap_or_default();
                format!("upload rejected ({code}): {detail}")
            }
            other => format!("upload failed: {other}"),
        })?;

    let status = if response.status() == 201 {
        UploadStatus::Created
    } else {
        UploadStatus::AlreadyExists
    };

    let mut outcome: UploadOutcome = response
        .into_json()
        .map_err(|e| format!("invalid upload response: {e}"))?;
    outcome.status = status;

    info!("uploaded {filename}: {}", outcome.message);
    Ok(outcome)
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"model\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_frames_content() {
        let body = multipart_body("part.stl", b"PAYLOAD");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{BOUNDARY}\r\n")));
        assert!(text.contains("name=\"model\""));
        assert!(text.contains("filename=\"part.stl\""));
        assert!(text.contains("PAYLOAD"));
        assert!(text.ends_with(&format!("\r\n--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn upload_of_missing_file_errors() {
        let err = upload_model("http://localhost:1", Path::new("/nonexistent.stl")).unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
