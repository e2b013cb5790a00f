// Knowledge-base documents: PDF upload and listing

use log::info;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::Path;

use super::{send_json, send_unit, SupportApi};
use crate::error::ApiResult;
use crate::models::{DocumentInfo, UploadReceipt};
use crate::validation::{validate_upload, ValidationError};

impl SupportApi {
    /// Uploads one PDF as a multipart `file` field.
    ///
    /// Extension and size are checked from file metadata first; nothing is
    /// read or sent for a file that fails validation.
    pub async fn upload_document(&self, path: &Path) -> ApiResult<UploadReceipt> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", path.display(), e)))?;
        validate_upload(path, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", path.display(), e)))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = Part::bytes(bytes).file_name(filename.clone()).mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let receipt: UploadReceipt = send_json(self.authed(Method::POST, "/admin/student/upload")?.multipart(form)).await?;
        info!("Uploaded {} ({} bytes): {}", filename, metadata.len(), receipt.status);
        Ok(receipt)
    }

    pub async fn list_documents(&self) -> ApiResult<Vec<DocumentInfo>> {
        send_json(self.authed(Method::GET, "/admin/student/documents")?).await
    }

    pub async fn delete_document(&self, id: i64) -> ApiResult<()> {
        let path = format!("/admin/student/documents/{}", id);
        send_unit(self.authed(Method::DELETE, &path)?).await
    }
}
