//! Multipart form reading shared by the upload routes.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::generate::{MAX_IMAGE_MB, UploadedImage},
};

/// Text fields and file parts of a submitted form, keyed by field name.
#[derive(Debug, Default)]
pub struct FormData {
    pub texts: HashMap<String, String>,
    pub files: HashMap<String, UploadedImage>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedImage> {
        self.files.remove(name)
    }
}

fn form_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Image too large. Max allowed is {MAX_IMAGE_MB}MB."))
    } else {
        tracing::debug!(error = %e, "Unreadable multipart body");
        AppError::InvalidInput("Invalid form data.".into())
    }
}

/// Drain the form. Parts carrying a file name are files; empty files are
/// dropped so they read as missing.
pub async fn read_form(mut multipart: Multipart) -> AppResult<FormData> {
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(form_error)?;
            if bytes.is_empty() {
                continue;
            }
            form.files.insert(
                name,
                UploadedImage {
                    bytes: bytes.to_vec(),
                    file_name: Some(file_name),
                    content_type,
                },
            );
        } else {
            let value = field.text().await.map_err(form_error)?;
            form.texts.insert(name, value);
        }
    }

    Ok(form)
}
