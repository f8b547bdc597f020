//! HTTP handlers.

use crate::AppState;
use crate::error::ConvertError;
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use imgconv_image::TargetFormat;
use serde_json::json;
use std::time::Instant;

/// Parsed `file` + `format` fields of a conversion request.
#[derive(Debug, Default)]
struct ConversionForm {
    file: Option<UploadedFile>,
    format: Option<String>,
}

#[derive(Debug)]
struct UploadedFile {
    name: Option<String>,
    bytes: Bytes,
}

/// `POST /api/convert`
///
/// Validation order: both fields present, then the format against the
/// whitelist, then the codec. Nothing about the request outlives the response.
#[tracing::instrument(skip_all)]
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ConvertError> {
    let multipart = multipart.map_err(|e| ConvertError::internal(format!("invalid multipart request: {e}")))?;
    let form = read_form(multipart, state.max_body_bytes).await?;

    let (file, requested) = match (form.file, form.format) {
        (Some(file), Some(format)) => (file, format),
        _ => {
            state.metrics.increment("convert.rejected");
            return Err(ConvertError::MissingInput);
        }
    };

    let Some(target) = state.whitelist.resolve(&requested) else {
        state.metrics.increment("convert.rejected");
        return Err(ConvertError::UnsupportedFormat { requested });
    };

    tracing::info!(
        file_name = ?file.name,
        size_bytes = file.bytes.len(),
        target = %target,
        quality = ?target.is_lossy().then_some(state.quality),
        "Converting image"
    );

    let started = Instant::now();
    let converter = state.converter.clone();
    let quality = state.quality;
    let bytes = file.bytes;

    let converted = tokio::task::spawn_blocking(move || converter.convert(&bytes, target, quality))
        .await
        .map_err(|e| ConvertError::conversion(format!("conversion task did not complete: {e}")))
        .and_then(|result| result.map_err(|e| ConvertError::conversion(e.to_string())));

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    state.metrics.histogram("convert.duration_ms", elapsed_ms);

    let output = match converted {
        Ok(output) => output,
        Err(e) => {
            state.metrics.increment("convert.failed");
            return Err(e);
        }
    };

    state.metrics.increment("convert.success");
    tracing::info!(
        target = %target,
        output_bytes = output.len(),
        elapsed_ms = elapsed_ms as u64,
        "Conversion complete"
    );

    Ok(converted_response(target, output))
}

fn converted_response(target: TargetFormat, output: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, target.content_type()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"converted.{}\"", target.extension()),
            ),
        ],
        output,
    )
        .into_response()
}

async fn read_form(mut multipart: Multipart, limit: usize) -> Result<ConversionForm, ConvertError> {
    let mut form = ConversionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                if form.file.is_none() && !bytes.is_empty() {
                    form.file = Some(UploadedFile { name, bytes });
                }
            }
            "format" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                let text = text.trim();
                if form.format.is_none() && !text.is_empty() {
                    form.format = Some(text.to_string());
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Oversized bodies are a transport rejection; anything else wrong with the
/// stream falls through to the outer boundary.
fn multipart_error(err: MultipartError, limit: usize) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConvertError::PayloadTooLarge { limit }
    } else {
        ConvertError::internal(format!("malformed multipart body: {}", err.body_text()))
    }
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.export_json())
}
