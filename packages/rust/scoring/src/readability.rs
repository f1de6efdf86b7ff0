//! Flesch reading ease over plain text.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(\s|$)").expect("valid regex"));

/// `206.835 − 1.015 × (words / sentences) − 84.6 × (syllables / words)`.
///
/// Text with no words scores 0.0. The result is not clamped; very dense
/// prose goes negative.
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let sentences = SENTENCE_END.find_iter(text).count().max(1);
    let syllables: usize = words.iter().map(|w| syllables(w)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word
}

/// Vowel-group heuristic with a silent trailing `e`. Never less than 1.
pub fn syllables(word: &str) -> usize {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if word.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_vowel = false;
    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    if word.len() > 2 && word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllable_heuristic() {
        assert_eq!(syllables("cat"), 1);
        assert_eq!(syllables("make"), 1);
        assert_eq!(syllables("table"), 2);
        assert_eq!(syllables("reading"), 2);
        assert_eq!(syllables("123"), 1);
    }

    #[test]
    fn simple_text_reads_easily() {
        let score = flesch_reading_ease("The cat sat on the mat. The dog ran to the park.");
        assert!(score > 90.0, "got {score}");
    }

    #[test]
    fn dense_text_reads_poorly() {
        let score = flesch_reading_ease(
            "Comprehensive interoperability considerations necessitate organizational \
             standardization initiatives encompassing multidimensional infrastructural \
             modernization",
        );
        assert!(score < 30.0, "got {score}");
    }

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(flesch_reading_ease(""), 0.0);
        assert_eq!(flesch_reading_ease(" ... "), 0.0);
    }
}
