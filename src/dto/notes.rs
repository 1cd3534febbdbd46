use serde::{Deserialize, Serialize};

use crate::services::pipeline::StudyNotes;

#[derive(Debug, Serialize)]
pub struct StudyNotesResponse {
    pub summary: String,
    pub key_terms: Vec<String>,
    pub quiz: String,
    pub extracted_chars: usize,
    pub chunk_count: usize,
}

impl StudyNotesResponse {
    pub fn new(notes: StudyNotes, extracted_chars: usize) -> Self {
        Self {
            summary: notes.summary,
            key_terms: notes.key_terms,
            quiz: notes.quiz,
            extracted_chars,
            chunk_count: notes.chunk_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub summary: String,
    pub key_terms: Vec<String>,
    pub quiz: String,
}
