use serde::Serialize;

use crate::errors::AppError;
use crate::services::chunker;
use crate::services::llm_provider::ModelCaller;
use crate::services::prompts;

/// Maximum number of key terms kept after post-processing.
const MAX_KEY_TERMS: usize = 20;

/// Everything one generation request produces.
#[derive(Debug, Serialize)]
pub struct StudyNotes {
    pub summary: String,
    pub key_terms: Vec<String>,
    pub quiz: String,
    pub chunk_count: usize,
}

/// Chunking and truncation policy for one request. Summaries go through the
/// chunker; the single-call tasks (key terms, quiz) see the whole text
/// truncated to `max_prompt_chars`.
#[derive(Debug, Clone, Copy)]
pub struct GenerationPolicy {
    pub max_chunk_chars: usize,
    pub max_prompt_chars: usize,
}

/// Run the full pipeline over extracted text: chunked summarization, then key
/// terms, then quiz. Strictly sequential and fail-fast — the first failed
/// model call aborts the request with nothing retried.
pub async fn generate_study_notes(
    model: &dyn ModelCaller,
    text: &str,
    quiz_count: u8,
    policy: GenerationPolicy,
) -> Result<StudyNotes, AppError> {
    let chunks = chunker::chunk_text(text, policy.max_chunk_chars);
    let chunk_count = chunks.len();
    tracing::info!("Summarizing {chunk_count} chunk(s)");
    let summary = summarize_chunks(model, &chunks).await?;

    let capped = truncate_chars(text, policy.max_prompt_chars);
    let key_terms = extract_key_terms(model, capped).await?;
    let quiz = generate_quiz(model, capped, quiz_count).await?;

    Ok(StudyNotes {
        summary,
        key_terms,
        quiz,
        chunk_count,
    })
}

/// Summarize each chunk into bullets, then combine the per-chunk summaries
/// with one final deduplication call. Zero chunks short-circuits to an empty
/// summary without touching the model.
pub async fn summarize_chunks(
    model: &dyn ModelCaller,
    chunks: &[String],
) -> Result<String, AppError> {
    if chunks.is_empty() {
        return Ok(String::new());
    }

    let mut summaries = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let response = model.generate(&prompts::chunk_summary(chunk)).await?;
        summaries.push(response.trim().to_string());
    }

    let combined = summaries.join("\n\n");
    let final_summary = model.generate(&prompts::combine_summaries(&combined)).await?;
    Ok(final_summary.trim().to_string())
}

/// One call over the whole (truncated) text, post-processed into at most
/// twenty terms.
pub async fn extract_key_terms(
    model: &dyn ModelCaller,
    text: &str,
) -> Result<Vec<String>, AppError> {
    let response = model.generate(&prompts::key_terms(text)).await?;
    Ok(parse_key_terms(&response))
}

/// Models answer comma-separated, newline-separated, or a mix of both.
pub fn parse_key_terms(raw: &str) -> Vec<String> {
    raw.replace('\n', ",")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_KEY_TERMS)
        .map(str::to_string)
        .collect()
}

pub async fn generate_quiz(
    model: &dyn ModelCaller,
    text: &str,
    count: u8,
) -> Result<String, AppError> {
    let response = model.generate(&prompts::quiz(text, count)).await?;
    Ok(response.trim().to_string())
}

/// Render the downloadable artifact: labeled sections in a fixed order.
pub fn render_export(summary: &str, key_terms: &[String], quiz: &str) -> String {
    format!(
        "Study Notes:\n\n{summary}\n\nKey Terms:\n\n{}\n\nQuiz:\n\n{quiz}",
        key_terms.join(", ")
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted caller: records every prompt, optionally failing on the n-th
    /// call (1-based).
    struct MockCaller {
        prompts: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
    }

    impl MockCaller {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }

        fn failing_on(n: usize) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on_call: Some(n),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ModelCaller for MockCaller {
        async fn generate(&self, prompt: &str) -> Result<String, AppError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            if self.fail_on_call == Some(prompts.len()) {
                return Err(AppError::Inference("simulated provider failure".into()));
            }
            Ok(format!("response {}", prompts.len()))
        }
    }

    #[test]
    fn test_parse_key_terms_mixed_separators() {
        assert_eq!(parse_key_terms("a, b,\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_key_terms_truncates_to_twenty() {
        let raw = (0..30).map(|i| format!("term{i}")).collect::<Vec<_>>().join(", ");
        assert_eq!(parse_key_terms(&raw).len(), 20);
    }

    #[test]
    fn test_parse_key_terms_drops_empties() {
        assert_eq!(parse_key_terms(",, a ,,\n, b"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_summarize_makes_one_call_per_chunk_plus_combine() {
        let mock = MockCaller::new();
        let chunks = vec!["first".to_string(), "second".to_string()];

        let summary = summarize_chunks(&mock, &chunks).await.unwrap();
        assert_eq!(summary, "response 3");
        assert_eq!(mock.call_count(), 3);

        let prompts = mock.prompts.lock().unwrap();
        assert!(prompts[0].contains("first"));
        assert!(prompts[1].contains("second"));
        assert!(prompts[2].contains("Combine and deduplicate"));
    }

    #[tokio::test]
    async fn test_summarize_empty_chunks_makes_no_calls() {
        let mock = MockCaller::new();
        let summary = summarize_chunks(&mock, &[]).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_mid_chunks_aborts_before_combine() {
        let mock = MockCaller::failing_on(2);
        let chunks = vec!["a".into(), "b".into(), "c".into()];

        let result = summarize_chunks(&mock, &chunks).await;
        assert!(matches!(result, Err(AppError::Inference(_))));
        // Second call failed, so neither the third chunk nor the combine
        // call happened.
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_full_pipeline_call_sequence() {
        let mock = MockCaller::new();
        let policy = GenerationPolicy {
            max_chunk_chars: 4000,
            max_prompt_chars: 12000,
        };

        let notes = generate_study_notes(&mock, "Lecture one.\n\nLecture two.", 7, policy)
            .await
            .unwrap();

        // One chunk summary + combine + key terms + quiz.
        assert_eq!(mock.call_count(), 4);
        assert_eq!(notes.chunk_count, 1);
        assert_eq!(notes.summary, "response 2");
        assert!(!notes.quiz.is_empty());

        let prompts = mock.prompts.lock().unwrap();
        assert!(prompts[3].contains("Create 7 short quiz questions"));
    }

    #[tokio::test]
    async fn test_quiz_failure_leaves_no_further_calls() {
        // Calls: 1 chunk summary, 2 combine, 3 key terms, 4 quiz (fails).
        let mock = MockCaller::failing_on(4);
        let policy = GenerationPolicy {
            max_chunk_chars: 4000,
            max_prompt_chars: 12000,
        };

        let result = generate_study_notes(&mock, "single paragraph", 5, policy).await;
        assert!(matches!(result, Err(AppError::Inference(_))));
        assert_eq!(mock.call_count(), 4);
    }

    #[test]
    fn test_render_export_labels_sections() {
        let artifact = render_export("- bullet", &["osmosis".into(), "diffusion".into()], "Q1?");
        assert_eq!(
            artifact,
            "Study Notes:\n\n- bullet\n\nKey Terms:\n\nosmosis, diffusion\n\nQuiz:\n\nQ1?"
        );
    }

    #[test]
    fn test_truncate_chars_is_boundary_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
