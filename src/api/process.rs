//! Voice command endpoint
//!
//! `POST /process` takes a multipart upload with an `audio` field and answers
//! with synthesized speech. The recognized transcript rides along
//! percent-encoded in the `X-Transcript` header. The request's temp files are released once the
//! body has been streamed out, or as soon as it is dropped if the client
//! disconnects first.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::ApiState;
use super::voice::VoiceError;
use crate::intent::Intent;
use crate::pipeline::{Delivery, TempResources};
use crate::voice::AudioFormat;

const CHUNK_SIZE: usize = 64 * 1024;

const X_TRANSCRIPT: &str = "x-transcript";
const X_INTENT: &str = "x-intent";
const X_INTENT_SOURCE: &str = "x-intent-source";

/// Build process router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/process", post(process))
        .with_state(state)
}

async fn process(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Response, VoiceError> {
    let (audio, format) = read_audio_field(&mut multipart).await?;
    if audio.is_empty() {
        return Err(VoiceError::BadRequest("Empty audio data"));
    }

    let delivery = state.orchestrator.process(&audio, format).await?;
    Ok(respond(delivery).await)
}

/// Pull the `audio` part out of the form
async fn read_audio_field(multipart: &mut Multipart) -> Result<(Bytes, AudioFormat), VoiceError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|_| VoiceError::BadRequest("Malformed multipart body"))?
            .ok_or(VoiceError::BadRequest("Missing audio field"))?;

        if field.name() != Some("audio") {
            continue;
        }

        let format = AudioFormat::from_content_type(field.content_type());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| VoiceError::BadRequest("Failed to read audio field"))?;
        return Ok((bytes, format));
    }
}

async fn respond(delivery: Delivery) -> Response {
    let headers = delivery_headers(&delivery);
    let request_id = delivery.request_id;
    let resources = delivery.into_resources();

    let Some(path) = resources.output_path() else {
        tracing::error!(%request_id, "delivery without audio");
        resources.release();
        return VoiceError::AudioGenerationFailed.into_response();
    };

    match File::open(path).await {
        Ok(file) => (StatusCode::OK, headers, stream_then_release(file, resources)).into_response(),
        Err(e) => {
            tracing::error!(%request_id, error = %e, "failed to open response audio");
            resources.release();
            VoiceError::AudioGenerationFailed.into_response()
        }
    }
}

fn delivery_headers(delivery: &Delivery) -> HeaderMap {
    let source = if delivery.is_fallback {
        "fallback"
    } else {
        delivery.source.map_or("none", |s| s.as_str())
    };
    let intent = delivery.intent.as_ref().map_or("none", Intent::name);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(delivery.format.mime()),
    );
    if let Ok(value) = HeaderValue::from_str(&format!(
        "inline; filename=\"response.{}\"",
        delivery.format.extension()
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(HeaderName::from_static(X_TRANSCRIPT), header_text(&delivery.transcript));
    headers.insert(HeaderName::from_static(X_INTENT), header_text(intent));
    headers.insert(HeaderName::from_static(X_INTENT_SOURCE), HeaderValue::from_static(source));
    headers
}

/// Header value for free text, always percent-encoded so clients decode
/// every value the same way
fn header_text(text: &str) -> HeaderValue {
    HeaderValue::from_str(&urlencoding::encode(text)).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Stream a file as the response body, releasing `resources` when the last
/// chunk has been handed off or the body is dropped
fn stream_then_release(file: File, resources: TempResources) -> Body {
    let chunks = futures::stream::unfold(Some((file, resources)), |state| async move {
        let (mut file, resources) = state?;
        let mut buf = vec![0_u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => {
                drop(file);
                resources.release();
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, resources))))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to stream response audio");
                Some((Err(e), None))
            }
        }
    });
    Body::from_stream(chunks)
}
