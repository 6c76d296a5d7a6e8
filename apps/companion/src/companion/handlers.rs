use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

use super::{Narration, NarrationRequest, Reflection, Reply};
use crate::errors::AppError;
use crate::state::AppState;
use crate::sync::handlers::{load_for_update, persist_profile};

pub const NARRATION_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-narration-source");

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct IkigaiRequest {
    pub input: String,
}

#[derive(Deserialize)]
pub struct ReflectRequest {
    pub text: String,
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// A binary upload plus the optional text fields that came with it.
struct Upload {
    bytes: Bytes,
    mime_type: String,
    question: Option<String>,
}

async fn read_upload(mut multipart: Multipart, file_field: &str) -> Result<Upload, AppError> {
    let mut file: Option<(Bytes, String)> = None;
    let mut question = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(name) if name == file_field => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                file = Some((field.bytes().await?, mime_type));
            }
            Some("question") => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    question = Some(text);
                }
            }
            _ => {}
        }
    }

    let (bytes, mime_type) =
        file.ok_or_else(|| AppError::Validation(format!("Missing '{file_field}' upload")))?;
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("'{file_field}' upload is empty")));
    }
    Ok(Upload {
        bytes,
        mime_type,
        question,
    })
}

/// POST /api/v1/mentor/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Reply<String>>, AppError> {
    require_text(&req.message, "message")?;
    let profile = state.sync.cached_profile().await;
    Ok(Json(state.companion.chat(&req.message, &profile).await))
}

/// POST /api/v1/mentor/vision (multipart: `image`, optional `question`)
pub async fn handle_vision(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Reply<String>>, AppError> {
    let upload = read_upload(multipart, "image").await?;
    let reply = state
        .companion
        .analyze_image(&upload.bytes, &upload.mime_type, upload.question.as_deref())
        .await;
    Ok(Json(reply))
}

/// POST /api/v1/mentor/transcribe (multipart: `audio`)
pub async fn handle_transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Reply<String>>, AppError> {
    let upload = read_upload(multipart, "audio").await?;
    let reply = state
        .companion
        .transcribe(&upload.bytes, &upload.mime_type)
        .await;
    Ok(Json(reply))
}

/// POST /api/v1/mentor/ikigai
/// Stores the distilled purpose on the profile when the model answers.
pub async fn handle_ikigai(
    State(state): State<AppState>,
    Json(req): Json<IkigaiRequest>,
) -> Result<Json<Reply<String>>, AppError> {
    require_text(&req.input, "input")?;
    let reply = state.companion.discover_ikigai(&req.input).await;
    if let Reply::Answered { answer } = &reply {
        match load_for_update(&state.sync).await {
            Ok(mut profile) => {
                profile.ikigai = answer.clone();
                persist_profile(&state.sync, profile).await;
            }
            // The answer is still returned; the client can save it.
            Err(e) => tracing::warn!("Ikigai not stored on profile: {e}"),
        }
    }
    Ok(Json(reply))
}

/// POST /api/v1/mentor/reflect
pub async fn handle_reflect(
    State(state): State<AppState>,
    Json(req): Json<ReflectRequest>,
) -> Result<Json<Reply<Reflection>>, AppError> {
    require_text(&req.text, "text")?;
    Ok(Json(state.companion.reflect(&req.text).await))
}

/// POST /api/v1/narration
/// Audio bytes when neural audio is available, otherwise a JSON script for
/// the on-device voice. `x-narration-source` tells the two apart.
pub async fn handle_narration(
    State(state): State<AppState>,
    Json(req): Json<NarrationRequest>,
) -> Result<Response, AppError> {
    require_text(&req.script, "script")?;
    let narration = state.companion.narrate(&req).await;
    let source = HeaderValue::from_static(narration.source());

    let response = match narration {
        Narration::Cached(audio) | Narration::Generated(audio) => {
            let content_type = HeaderValue::from_str(&audio.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (NARRATION_SOURCE_HEADER, source),
                ],
                audio.bytes,
            )
                .into_response()
        }
        Narration::Device(device) => {
            ([(NARRATION_SOURCE_HEADER, source)], Json(device)).into_response()
        }
    };
    Ok(response)
}
