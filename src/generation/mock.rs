use crate::config::DEFAULT_MAX_DRAFTS;
use crate::models::{Difficulty, FlashcardDraft};

const MAX_SENTENCES: usize = 5;
const MIN_SENTENCE_CHARS: usize = 20;
const MIN_SENTENCE_WORDS: usize = 5;
const MIN_KEY_TERM_CHARS: usize = 4;
const SUPPLEMENT_BELOW: usize = 3;
const SUPPLEMENT_MIN_TEXT_CHARS: usize = 100;
const KEY_CONCEPT_PREVIEW_CHARS: usize = 200;

/// Offline generator: one card per informative sentence, topped up with two
/// generic cards when the text is long but yields few sentences.
pub fn generate_mock_flashcards(text: &str) -> Vec<FlashcardDraft> {
    let material = text.trim();
    if material.is_empty() {
        return Vec::new();
    }

    let flattened = text.replace('\n', " ");
    let sentences = flattened
        .split('.')
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > MIN_SENTENCE_CHARS);

    let mut drafts = Vec::new();
    for (index, sentence) in sentences.take(MAX_SENTENCES).enumerate() {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() < MIN_SENTENCE_WORDS {
            continue;
        }

        let Some(key_term) = words.iter().find(|word| is_key_term(word)) else {
            continue;
        };

        drafts.push(FlashcardDraft {
            title: format!("Study Card {}", index + 1),
            question: format!("What is the main concept related to '{key_term}' in this context?"),
            answer: sentence.to_string(),
            difficulty: Difficulty::Medium,
        });
    }

    if drafts.len() < SUPPLEMENT_BELOW && material.chars().count() > SUPPLEMENT_MIN_TEXT_CHARS {
        drafts.push(FlashcardDraft {
            title: "Key Concept".to_string(),
            question: "What is the main topic discussed in this material?".to_string(),
            answer: preview(material, KEY_CONCEPT_PREVIEW_CHARS),
            difficulty: Difficulty::Easy,
        });
        drafts.push(FlashcardDraft {
            title: "Important Details".to_string(),
            question: "What are the important details mentioned in this study material?"
                .to_string(),
            answer: "The material covers various important concepts that require careful study and understanding."
                .to_string(),
            difficulty: Difficulty::Medium,
        });
    }

    drafts.truncate(DEFAULT_MAX_DRAFTS);
    drafts
}

fn is_key_term(word: &str) -> bool {
    word.chars().count() > MIN_KEY_TERM_CHARS && word.chars().all(char::is_alphabetic)
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
