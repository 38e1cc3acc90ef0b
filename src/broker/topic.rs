// Topic binding patterns with AMQP-style wildcards.

/// A compiled topic binding pattern.
///
/// Patterns are dot-separated words where `*` matches exactly one word and
/// `#` matches zero or more words.
///
/// ```
/// use catalog_sync::broker::TopicPattern;
///
/// let pattern = TopicPattern::new("product.*");
/// assert!(pattern.matches("product.created"));
/// assert!(pattern.matches("product.deleted"));
/// assert!(!pattern.matches("product.price.changed"));
/// assert!(!pattern.matches("cart.created"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    segments: Vec<Segment>,
    source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    // Exactly one word.
    OneWord,
    // Zero or more words.
    ManyWords,
}

impl TopicPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let segments = source
            .split('.')
            .map(|s| match s {
                "*" => Segment::OneWord,
                "#" => Segment::ManyWords,
                lit => Segment::Literal(lit.to_string()),
            })
            .collect();
        Self { segments, source }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, routing_key: &str) -> bool {
        let words: Vec<&str> = routing_key.split('.').collect();
        Self::matches_at(&self.segments, &words)
    }

    fn matches_at(segments: &[Segment], words: &[&str]) -> bool {
        match segments.split_first() {
            None => words.is_empty(),
            Some((Segment::Literal(lit), rest)) => match words.split_first() {
                Some((word, remaining)) => word == lit && Self::matches_at(rest, remaining),
                None => false,
            },
            Some((Segment::OneWord, rest)) => match words.split_first() {
                Some((_, remaining)) => Self::matches_at(rest, remaining),
                None => false,
            },
            Some((Segment::ManyWords, rest)) => {
                // Try consuming zero..=all remaining words.
                (0..=words.len()).any(|n| Self::matches_at(rest, &words[n..]))
            }
        }
    }
}
