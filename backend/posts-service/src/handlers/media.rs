/// Serving uploaded media
use actix_web::{http::header, web, HttpResponse};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn serve_media(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let tail = path.into_inner();
    let file = state
        .media
        .resolve(&tail)
        .ok_or_else(|| AppError::NotFound(format!("/media/{}", tail)))?;

    let bytes = match tokio::fs::read(&file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("/media/{}", tail)))
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = mime_guess::from_path(&file).first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .content_type(content_type.essence_str())
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(bytes))
}
