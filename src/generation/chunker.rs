use std::str::SplitWhitespace;

/// Greedy word-packing iterator over a piece of text.
///
/// Each chunk is a single-space-joined run of consecutive words. A word is
/// never split; a word longer than `max_length` becomes a chunk of its own.
pub struct Chunks<'a> {
    words: SplitWhitespace<'a>,
    pending: Option<&'a str>,
    max_length: usize,
}

pub fn chunk_words(text: &str, max_length: usize) -> Chunks<'_> {
    let mut words = text.split_whitespace();
    let pending = words.next();
    Chunks {
        words,
        pending,
        max_length,
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let first = self.pending.take()?;
        let mut chunk = first.to_string();
        let mut length = first.chars().count();

        for word in self.words.by_ref() {
            let word_length = word.chars().count();
            if length + 1 + word_length > self.max_length {
                self.pending = Some(word);
                return Some(chunk);
            }
            chunk.push(' ');
            chunk.push_str(word);
            length += 1 + word_length;
        }

        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert_eq!(chunk_words("", 500).count(), 0);
        assert_eq!(chunk_words(" \n\t ", 500).count(), 0);
    }

    #[test]
    fn joining_chunks_restores_word_sequence() {
        let text = "alpha  beta\ngamma\tdelta epsilon   zeta eta theta iota kappa";
        let chunks: Vec<String> = chunk_words(text, 16).collect();
        assert!(chunks.len() > 1);

        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(chunks.join(" "), normalized);
    }

    #[test]
    fn chunks_stay_within_limit_unless_word_is_oversized() {
        let text = "one two three supercalifragilistic four five six seven";
        let chunks: Vec<String> = chunk_words(text, 10).collect();

        for chunk in &chunks {
            let single_word = !chunk.contains(' ');
            assert!(chunk.chars().count() <= 10 || single_word, "{chunk}");
        }
        assert!(chunks.contains(&"supercalifragilistic".to_string()));
    }

    #[test]
    fn packs_greedily_and_keeps_short_tail() {
        let chunks: Vec<String> = chunk_words("aaa bbb ccc d", 7).collect();
        assert_eq!(chunks, vec!["aaa bbb", "ccc d"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks: Vec<String> = chunk_words("été été", 7).collect();
        assert_eq!(chunks, vec!["été été"]);
    }
}
