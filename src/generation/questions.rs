use std::collections::HashSet;

const BASE_QUESTIONS: [&str; 4] = [
    "What is the main concept explained in this text?",
    "What are the key points mentioned here?",
    "How would you summarize this information?",
    "What is the most important detail in this passage?",
];

// Checked in order; each hit is pushed to the front.
const KEYWORD_QUESTIONS: [(&[&str], &str); 3] = [
    (
        &["definition", "define", "meaning"],
        "What is being defined in this text?",
    ),
    (
        &["process", "steps", "procedure"],
        "What process or steps are described here?",
    ),
    (
        &["cause", "effect", "result"],
        "What cause and effect relationship is explained?",
    ),
];

const MAX_QUESTIONS: usize = 3;

pub fn propose_questions(chunk: &str) -> Vec<&'static str> {
    let lowered = chunk.to_lowercase();
    let words: HashSet<&str> = lowered.split_whitespace().collect();

    let mut questions: Vec<&'static str> = BASE_QUESTIONS.to_vec();
    for (keywords, question) in KEYWORD_QUESTIONS {
        if keywords.iter().any(|keyword| words.contains(keyword)) {
            questions.insert(0, question);
        }
    }

    questions.truncate(MAX_QUESTIONS);
    questions
}
