//! Offline answerer that quotes the context sentence sharing the most words
//! with the question. Deterministic, so pipeline tests can assert on it.

use std::collections::HashSet;

use newsqa_core::traits::Generator;

pub const NO_ANSWER: &str = "I don't know.";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let wanted = words(question);
        let mut best: Option<(usize, &str)> = None;
        for sentence in sentences(context) {
            let overlap = words(sentence).intersection(&wanted).count();
            if overlap > 0 && best.map_or(true, |(score, _)| overlap > score) {
                best = Some((overlap, sentence));
            }
        }
        Ok(best.map_or_else(|| NO_ANSWER.to_string(), |(_, s)| s.to_string()))
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Sentences end at `.`, `!` or `?` followed by whitespace, or at a newline.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                None => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            out.push(&text[start..end]);
            start = end;
        }
    }
    out.push(&text[start..]);
    out.into_iter().map(str::trim).filter(|s| !s.is_empty())
}
