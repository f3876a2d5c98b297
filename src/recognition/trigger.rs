use tracing::info;

/// Ephemeral match event: produced at most once per listening episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The transcript fragment that contained the phrase
    pub transcript_fragment: String,
    /// The configured phrase that matched
    pub matched_phrase: String,
}

/// Matches transcript fragments against the configured trigger phrase set
///
/// Matching is case-insensitive substring containment. When several phrases
/// would match, the first one in configured order wins. The detector itself
/// is stateless; at-most-once delivery per episode is guaranteed by the
/// controller stopping the recognition stream before acting on a match.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    phrases: Vec<String>,
}

impl TriggerDetector {
    pub fn new(phrases: Vec<String>) -> Self {
        let normalized: Vec<String> = phrases
            .into_iter()
            .map(|p| p.to_lowercase().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            phrases: normalized,
        }
    }

    /// Check one fragment; returns the match if any configured phrase is
    /// contained in it
    pub fn match_fragment(&self, fragment: &str) -> Option<TriggerMatch> {
        let lowered = fragment.to_lowercase();

        for phrase in &self.phrases {
            if lowered.contains(phrase.as_str()) {
                info!(
                    "trigger phrase detected: {:?} in fragment {:?}",
                    phrase, fragment
                );
                return Some(TriggerMatch {
                    transcript_fragment: fragment.to_string(),
                    matched_phrase: phrase.clone(),
                });
            }
        }

        None
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}
