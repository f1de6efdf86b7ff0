//! Brand citation and attribute analysis over free-text completions.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Characters kept on each side of a mention.
const CONTEXT_CHARS: usize = 100;
/// Attributes at or below this many characters are dropped as noise.
const MIN_ATTRIBUTE_CHARS: usize = 10;
const MAX_ATTRIBUTES: usize = 10;

const POSITIVE_KEYWORDS: [&str; 11] = [
    "recommend",
    "best",
    "excellent",
    "great",
    "top",
    "leading",
    "popular",
    "trusted",
    "reliable",
    "quality",
    "premium",
];
const NEGATIVE_KEYWORDS: [&str; 9] = [
    "not recommend",
    "avoid",
    "poor",
    "lacking",
    "missing",
    "insufficient",
    "weak",
    "limited",
    "concerns",
];

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s*([^\n:]+)").expect("valid regex"));
static BULLETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-•*]\s+([^\n:]+)").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// How a brand appears in one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub cited: bool,
    /// Case-insensitive, non-overlapping mentions.
    pub count: u32,
    /// Text around each mention.
    pub contexts: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CitationAnalyzer;

impl CitationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, response: &str, brand: &str) -> Citation {
        let brand = brand.trim();
        if brand.is_empty() {
            return Citation {
                cited: false,
                count: 0,
                contexts: Vec::new(),
                sentiment: Sentiment::Neutral,
            };
        }

        let contexts = mention_contexts(response, brand);
        let count = u32::try_from(contexts.len()).unwrap_or(u32::MAX);
        let sentiment = sentiment(&contexts);

        Citation {
            cited: count > 0,
            count,
            contexts,
            sentiment,
        }
    }

    /// Attribute phrases from numbered items, bullets and bold runs.
    ///
    /// Deduplicated in first-seen order, longer than ten characters, at most
    /// ten.
    pub fn important_attributes(&self, response: &str) -> Vec<String> {
        let mut attributes: Vec<String> = Vec::new();
        for pattern in [&*NUMBERED, &*BULLETED, &*BOLD] {
            for caps in pattern.captures_iter(response) {
                let attribute = caps[1].trim().trim_matches('*').trim().to_string();
                if attribute.chars().count() > MIN_ATTRIBUTE_CHARS
                    && !attributes.contains(&attribute)
                {
                    attributes.push(attribute);
                }
            }
        }
        attributes.truncate(MAX_ATTRIBUTES);
        attributes
    }
}

fn mention_contexts(response: &str, brand: &str) -> Vec<String> {
    let Ok(pattern) = RegexBuilder::new(&regex::escape(brand))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };

    pattern
        .find_iter(response)
        .map(|m| {
            let from = response[..m.start()]
                .char_indices()
                .rev()
                .nth(CONTEXT_CHARS - 1)
                .map_or(0, |(i, _)| i);
            let to = response[m.end()..]
                .char_indices()
                .nth(CONTEXT_CHARS)
                .map_or(response.len(), |(i, _)| m.end() + i);
            response[from..to].trim().to_string()
        })
        .collect()
}

fn sentiment(contexts: &[String]) -> Sentiment {
    let (mut positive, mut negative) = (0usize, 0usize);
    for context in contexts {
        let lower = context.to_lowercase();
        positive += POSITIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
        negative += NEGATIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    }
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_case_insensitive_mentions() {
        let analyzer = CitationAnalyzer::new();
        let citation = analyzer.analyze(
            "1. ACME Trail Runner: a top pick. 2. Brand X. Acme also makes a trusted road shoe.",
            "Acme",
        );
        assert!(citation.cited);
        assert_eq!(citation.count, 2);
        assert_eq!(citation.contexts.len(), 2);
        assert_eq!(citation.sentiment, Sentiment::Positive);
    }

    #[test]
    fn absent_brand_is_uncited_and_neutral() {
        let citation = CitationAnalyzer.analyze("Brand X and Brand Y lead the market.", "Acme");
        assert!(!citation.cited);
        assert_eq!(citation.count, 0);
        assert!(citation.contexts.is_empty());
        assert_eq!(citation.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn empty_brand_never_matches() {
        assert!(!CitationAnalyzer.analyze("anything", "  ").cited);
    }

    #[test]
    fn negative_context() {
        let citation = CitationAnalyzer.analyze(
            "I would avoid Acme for now; reviews are limited and sizing info is missing.",
            "acme",
        );
        assert_eq!(citation.sentiment, Sentiment::Negative);
    }

    #[test]
    fn contexts_are_bounded_and_char_safe() {
        let text = format!("{}Acme{}", "é".repeat(300), "ü".repeat(300));
        let citation = CitationAnalyzer.analyze(&text, "Acme");
        assert_eq!(citation.contexts[0].chars().count(), 204);
    }

    #[test]
    fn regex_metacharacters_in_brand_are_literal() {
        let citation = CitationAnalyzer.analyze("Try the A+B (Pro) line.", "A+B (Pro)");
        assert_eq!(citation.count, 1);
    }

    #[test]
    fn extracts_attributes_from_lists_and_bold() {
        let response = "Here is what matters:\n\
            1. **Detailed specifications**: weight, drop, stack height\n\
            2. Verified customer reviews\n\
            - Clear return policy and warranty terms\n\
            - Price\n\
            Also **independent lab certifications** help.\n\
            3. Verified customer reviews\n";
        let attributes = CitationAnalyzer.important_attributes(response);
        assert_eq!(
            attributes,
            vec![
                "Detailed specifications",
                "Verified customer reviews",
                "Clear return policy and warranty terms",
                "independent lab certifications",
            ]
        );
    }

    #[test]
    fn attributes_are_capped() {
        let response: String = (1..=15)
            .map(|i| format!("{i}. Attribute number {i:02}\n"))
            .collect();
        assert_eq!(CitationAnalyzer.important_attributes(&response).len(), MAX_ATTRIBUTES);
    }
}
