/// Separator inserted between paragraphs when a chunk is reassembled, and the
/// per-paragraph overhead counted against `max_chars`.
const PARAGRAPH_SEP: &str = "\n\n";
const SEP_OVERHEAD: usize = 2;

/// Split text into bounded-size chunks along paragraph boundaries.
///
/// Paragraphs (blank-line separated) are accumulated greedily until adding the
/// next one would push the running character count past `max_chars`; the chunk
/// is then closed and the paragraph starts a new one. A single paragraph
/// longer than `max_chars` is emitted alone, oversized — paragraphs are never
/// split mid-way. Blank paragraphs are skipped, so chunks cover exactly the
/// non-blank paragraphs in their original order.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for paragraph in text.split(PARAGRAPH_SEP) {
        if paragraph.trim().is_empty() {
            continue;
        }

        let para_len = paragraph.chars().count() + SEP_OVERHEAD;
        if !current.is_empty() && current_len + para_len > max_chars {
            chunks.push(current.join(PARAGRAPH_SEP));
            current.clear();
            current_len = 0;
        }

        current.push(paragraph);
        current_len += para_len;
    }

    if !current.is_empty() {
        chunks.push(current.join(PARAGRAPH_SEP));
    }

    chunks
}
