/// Reading post form bodies
///
/// The create/edit form is posted either urlencoded (no file) or as
/// `multipart/form-data` with an optional `image` part.
use actix_multipart::Multipart;
use actix_web::{web, FromRequest, HttpRequest};
use futures::StreamExt;

use super::PostFormData;
use crate::error::{AppError, Result};

/// A file part as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Browsers send an empty file part when no file was chosen.
    pub fn is_empty(&self) -> bool {
        self.filename.is_empty() && self.bytes.is_empty()
    }
}

/// Parse a post form body, whichever encoding the browser used.
pub async fn read_post_submission(
    req: &HttpRequest,
    payload: web::Payload,
    max_upload_bytes: usize,
) -> Result<PostFormData> {
    let is_multipart = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        read_multipart(req, payload, max_upload_bytes).await
    } else {
        let mut payload = payload.into_inner();
        let form = web::Form::<PostFormData>::from_request(req, &mut payload)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(form.into_inner())
    }
}

async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    max_upload_bytes: usize,
) -> Result<PostFormData> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut data = PostFormData::default();

    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        // Read one byte past the limit so oversized files still fail validation.
        let limit = if name == "image" {
            max_upload_bytes.saturating_add(1)
        } else {
            max_upload_bytes
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            let room = limit.saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }

        match name.as_str() {
            "text" => data.text = String::from_utf8_lossy(&bytes).into_owned(),
            "group" => data.group = String::from_utf8_lossy(&bytes).into_owned(),
            "image" => {
                data.image = Some(Upload {
                    filename: filename.unwrap_or_default(),
                    bytes,
                })
            }
            other => tracing::debug!(field = %other, "ignoring unknown form field"),
        }
    }

    Ok(data)
}
