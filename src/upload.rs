//! Buffers `multipart/form-data` bodies into text fields and files.

use std::collections::HashMap;

use axum::{body::Bytes, extract::Multipart};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub texts: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == field);
        self.files = rest;
        taken
    }
}

/// Parts with a filename are files, the rest are text. Files above `max_file_bytes` are rejected.
pub async fn read_form(mut multipart: Multipart, max_file_bytes: usize) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > max_file_bytes {
                    return Err(AppError::BadRequest(format!(
                        "{file_name} exceeds {} MiB",
                        max_file_bytes / (1024 * 1024)
                    )));
                }
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    bytes,
                });
            }
            None => {
                let text = field.text().await?;
                form.texts.insert(name, text);
            }
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(field: &str) -> UploadedFile {
        UploadedFile {
            field: field.into(),
            file_name: "a.png".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"png"),
        }
    }

    #[test]
    fn take_files_splits_by_field() {
        let mut form = UploadForm {
            texts: HashMap::new(),
            files: vec![file("images"), file("selfie"), file("images")],
        };
        assert_eq!(form.take_files("images").len(), 2);
        assert_eq!(form.files.len(), 1);
        assert!(form.take_files("images").is_empty());
    }
}
