use crate::models::Difficulty;

const LONG_WORD_CHARS: usize = 6;

pub fn score_difficulty(question: &str, answer: &str) -> Difficulty {
    let answer_length = answer.split_whitespace().count();
    let question_complexity = question
        .split_whitespace()
        .filter(|word| word.chars().count() > LONG_WORD_CHARS)
        .count();

    if answer_length < 10 && question_complexity < 2 {
        Difficulty::Easy
    } else if answer_length > 30 || question_complexity > 3 {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}
