use axum::http::header;
use axum::response::IntoResponse;
use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::dto::notes::{ExportRequest, StudyNotesResponse};
use crate::errors::AppError;
use crate::services::llm_provider::{self, ModelCaller, RigCaller};
use crate::services::pipeline::{self, GenerationPolicy, StudyNotes};
use crate::services::text_extract;
use crate::state::AppState;

struct UploadedFile {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

/// Multipart generation request: the uploaded lecture file plus optional
/// provider/model/api_key/quiz_count text fields.
struct GenerateRequest {
    file: Option<UploadedFile>,
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    quiz_count: Option<String>,
}

async fn read_multipart(multipart: &mut Multipart) -> Result<GenerateRequest, AppError> {
    let mut request = GenerateRequest {
        file: None,
        provider: None,
        model: None,
        api_key: None,
        quiz_count: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?
                    .to_vec();
                request.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "provider" => request.provider = Some(field_text(field).await?),
            "model" => request.model = Some(field_text(field).await?),
            "api_key" => request.api_key = Some(field_text(field).await?),
            "quiz_count" => request.quiz_count = Some(field_text(field).await?),
            other => {
                tracing::debug!("Ignoring unknown multipart field '{other}'");
            }
        }
    }

    Ok(request)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart field: {e}")))
}

/// Upload a lecture document and generate study notes, key terms, and a quiz
/// in one request.
pub async fn generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StudyNotesResponse>, AppError> {
    let request = read_multipart(&mut multipart).await?;

    let file = request
        .file
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let max_bytes = state.config.limits.max_file_size_mb * 1024 * 1024;
    if file.data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size is {} MB",
            state.config.limits.max_file_size_mb
        )));
    }

    if !text_extract::is_supported(&file.content_type, &file.filename) {
        return Err(AppError::Validation(format!(
            "Unsupported file type '{}'. Upload a .pdf, .txt, or .md file.",
            file.content_type
        )));
    }

    let provider = request
        .provider
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.config.llm.default_provider.clone());
    let model_name = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.llm.default_model.clone());
    let quiz_count = parse_quiz_count(request.quiz_count.as_deref(), &state.config.limits)?;

    let text = text_extract::extract_text(&file.data, &file.content_type, &file.filename)
        .await
        .map_err(|e| AppError::Extraction(format!("{e:#}")))?;

    if text.trim().is_empty() {
        return Err(AppError::Extraction(format!(
            "No text could be extracted from '{}'",
            file.filename
        )));
    }

    tracing::info!(
        "Generating notes for '{}' ({} chars) via {provider}/{model_name}",
        file.filename,
        text.len()
    );

    let policy = GenerationPolicy {
        max_chunk_chars: state.config.llm.max_chunk_chars,
        max_prompt_chars: state.config.llm.max_prompt_chars,
    };

    let extracted_chars = text.chars().count();
    let notes = generate_for_upload(
        &provider,
        request.api_key.as_deref(),
        |key| {
            let caller = RigCaller::new(&provider, key, &model_name)?;
            Ok(Box::new(caller) as Box<dyn ModelCaller>)
        },
        &text,
        quiz_count,
        policy,
    )
    .await?;

    Ok(Json(StudyNotesResponse::new(notes, extracted_chars)))
}

/// Resolve the API key, build the provider caller, then run the pipeline —
/// strictly in that order, so a missing key aborts the request before any
/// inference call is attempted.
async fn generate_for_upload(
    provider: &str,
    explicit_key: Option<&str>,
    build_caller: impl FnOnce(&str) -> Result<Box<dyn ModelCaller>, AppError>,
    text: &str,
    quiz_count: u8,
    policy: GenerationPolicy,
) -> Result<StudyNotes, AppError> {
    let api_key = llm_provider::resolve_api_key(provider, explicit_key)?;
    let caller = build_caller(&api_key)?;
    pipeline::generate_study_notes(caller.as_ref(), text, quiz_count, policy).await
}

fn parse_quiz_count(
    raw: Option<&str>,
    limits: &crate::config::LimitsConfig,
) -> Result<u8, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(limits.quiz_count_default);
    };

    let count: u8 = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid quiz_count '{raw}'")))?;
    Ok(count.clamp(limits.quiz_count_min, limits.quiz_count_max))
}

/// Render the generated sections as one downloadable plain-text artifact.
pub async fn export(Json(payload): Json<ExportRequest>) -> impl IntoResponse {
    let body = pipeline::render_export(&payload.summary, &payload.key_terms, &payload.quiz);

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"study_notes.txt\"",
            ),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls; any call at all is a test failure for the key-missing
    /// path.
    struct CountingCaller {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ModelCaller for CountingCaller {
        async fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("unexpected".to_string())
        }
    }

    #[tokio::test]
    async fn test_missing_key_aborts_before_any_model_call() {
        unsafe { std::env::remove_var("OPENAI_API_KEY") };

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_caller = calls.clone();
        let policy = GenerationPolicy {
            max_chunk_chars: 4000,
            max_prompt_chars: 12000,
        };

        let result = generate_for_upload(
            "openai",
            None,
            move |_key| {
                Ok(Box::new(CountingCaller {
                    calls: calls_in_caller,
                }) as Box<dyn ModelCaller>)
            },
            "some lecture text",
            7,
            policy,
        )
        .await;

        assert!(matches!(result, Err(AppError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    fn limits() -> LimitsConfig {
        LimitsConfig {
            max_file_size_mb: 25,
            quiz_count_min: 5,
            quiz_count_max: 10,
            quiz_count_default: 7,
        }
    }

    #[test]
    fn test_quiz_count_default_when_absent() {
        assert_eq!(parse_quiz_count(None, &limits()).unwrap(), 7);
        assert_eq!(parse_quiz_count(Some("  "), &limits()).unwrap(), 7);
    }

    #[test]
    fn test_quiz_count_clamped_to_bounds() {
        assert_eq!(parse_quiz_count(Some("3"), &limits()).unwrap(), 5);
        assert_eq!(parse_quiz_count(Some("50"), &limits()).unwrap(), 10);
        assert_eq!(parse_quiz_count(Some("8"), &limits()).unwrap(), 8);
    }

    #[test]
    fn test_quiz_count_rejects_garbage() {
        assert!(matches!(
            parse_quiz_count(Some("many"), &limits()),
            Err(AppError::Validation(_))
        ));
    }
}
