//! Instruction templates for the three generation tasks. Kept in one place so
//! the pipeline and tests agree on exact wording.

pub fn chunk_summary(chunk: &str) -> String {
    format!(
        "You are an assistant that converts lecture text into concise study bullet points.\n\n\
         Text:\n{chunk}\n\n\
         Produce a short summary of the main points in 6-12 bullet points."
    )
}

pub fn combine_summaries(combined: &str) -> String {
    format!(
        "Combine and deduplicate the following summarized bullet points into a single \
         coherent set of 10-20 bullets suitable for study notes.\n\n{combined}"
    )
}

pub fn key_terms(text: &str) -> String {
    format!(
        "From the following lecture text, extract 12-20 important key terms or concepts. \
         Return as a comma-separated list.\n\nText:\n{text}"
    )
}

pub fn quiz(text: &str, count: u8) -> String {
    format!(
        "Create {count} short quiz questions (mix of multiple-choice and short-answer) \
         from the lecture text. For multiple choice provide 4 options and mark the \
         correct answer.\n\nText:\n{text}"
    )
}
