//! Extractor for the `output_dir` form field of `GET /results/{job_id}`.
//!
//! Clients send the field in whichever encoding their HTTP library picks
//! for a form on a GET request, so all three are accepted, tried in order:
//!
//! 1. query string (`?output_dir=...`)
//! 2. `application/x-www-form-urlencoded` body
//! 3. `multipart/form-data` body

use axum::extract::{FromRequest, Multipart, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::Form;
use serde::Deserialize;

use crate::error::AppError;

const FIELD: &str = "output_dir";

#[derive(Debug, Deserialize)]
struct OutputDirField {
    output_dir: Option<String>,
}

/// The caller-supplied output directory, not yet resolved against the data root.
#[derive(Debug, Clone)]
pub struct OutputDir(pub String);

impl<S> FromRequest<S> for OutputDir
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Ok(Query(OutputDirField {
            output_dir: Some(dir),
        })) = Query::<OutputDirField>::try_from_uri(req.uri())
        {
            return Ok(Self(dir));
        }

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let found = if content_type.starts_with("application/x-www-form-urlencoded") {
            // `Form` reads GET requests from the query string; present the
            // body as a POST so it is decoded instead.
            let (mut parts, body) = req.into_parts();
            parts.method = Method::POST;
            let Form(field) =
                Form::<OutputDirField>::from_request(Request::from_parts(parts, body), state)
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            field.output_dir
        } else if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            read_multipart_field(&mut multipart).await?
        } else {
            None
        };

        found
            .map(Self)
            .ok_or_else(|| AppError::BadRequest(format!("Missing required '{FIELD}' field")))
    }
}

async fn read_multipart_field(multipart: &mut Multipart) -> Result<Option<String>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(FIELD) {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            return Ok(Some(text));
        }
    }
    Ok(None)
}
