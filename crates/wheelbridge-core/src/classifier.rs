//! Free-text → intent classification.
//!
//! The bridge only consumes the resulting [`Intent`]; any classifier can be
//! plugged in behind [`IntentClassifier`].

use crate::intent::Intent;

/// Turns an utterance into a movement intent.
pub trait IntentClassifier: Send + Sync {
    /// Classify `text`, or `None` when it carries no movement request.
    fn classify(&self, text: &str) -> Option<Intent>;
}

/// Keyword matcher for spoken commands.
///
/// Rules are checked in order and the first rule with a matching keyword
/// wins. A keyword may be a phrase; each of its words must begin a
/// consecutive lowercase word of the text, so `forward` also matches
/// `forwards` but `right` does not match `brighten`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(Intent, Vec<String>)>,
}

impl KeywordClassifier {
    /// Classifier with custom rules, checked in order.
    pub fn with_rules(rules: Vec<(Intent, Vec<String>)>) -> Self {
        Self { rules }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let rule = |intent, words: &[&str]| {
            (intent, words.iter().map(|w| (*w).to_owned()).collect())
        };
        Self::with_rules(vec![
            rule(Intent::Forward, &["forward", "ahead", "move up"]),
            rule(Intent::Backward, &["backward", "back", "reverse"]),
            rule(Intent::Left, &["left"]),
            rule(Intent::Right, &["right"]),
            rule(Intent::Stop, &["stop", "halt", "freeze", "stay", "pause"]),
        ])
    }
}

fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let parts: Vec<&str> = phrase.split_whitespace().collect();
    if parts.is_empty() {
        return false;
    }
    words
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(w, p)| w.starts_with(*p)))
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Option<Intent> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(&words, k)))
            .map(|(intent, _)| *intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Option<Intent> {
        KeywordClassifier::default().classify(text)
    }

    #[test]
    fn recognises_each_direction() {
        assert_eq!(classify("move forward please"), Some(Intent::Forward));
        assert_eq!(classify("go back"), Some(Intent::Backward));
        assert_eq!(classify("turn left"), Some(Intent::Left));
        assert_eq!(classify("turn right"), Some(Intent::Right));
        assert_eq!(classify("halt"), Some(Intent::Stop));
    }

    #[test]
    fn synonyms() {
        assert_eq!(classify("straight ahead"), Some(Intent::Forward));
        assert_eq!(classify("freeze!"), Some(Intent::Stop));
        assert_eq!(classify("stay"), Some(Intent::Stop));
    }

    #[test]
    fn case_and_punctuation_ignored() {
        assert_eq!(classify("LEFT, now."), Some(Intent::Left));
    }

    #[test]
    fn first_rule_wins() {
        // forward is checked before stop
        assert_eq!(classify("stop going forward"), Some(Intent::Forward));
    }

    #[test]
    fn keywords_match_word_starts() {
        assert_eq!(classify("go forwards"), Some(Intent::Forward));
        assert_eq!(classify("step backwards"), Some(Intent::Backward));
        assert_eq!(classify("stopping now"), Some(Intent::Stop));
        assert_eq!(classify("brighten the lights"), None);
        assert_eq!(classify("ahoy"), None);
    }

    #[test]
    fn phrases_and_extra_keywords() {
        assert_eq!(classify("move up a bit"), Some(Intent::Forward));
        assert_eq!(classify("reverse"), Some(Intent::Backward));
        assert_eq!(classify("pause"), Some(Intent::Stop));
        assert_eq!(classify("move"), None);
        assert_eq!(classify("up"), None);
    }

    #[test]
    fn blank_keyword_never_matches() {
        let c = KeywordClassifier::with_rules(vec![(Intent::Left, vec!["  ".into()])]);
        assert_eq!(c.classify("anything at all"), None);
    }

    #[test]
    fn nothing_recognised() {
        assert_eq!(classify("hello there"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn custom_rules() {
        let c = KeywordClassifier::with_rules(vec![(Intent::Stop, vec!["whoa".into()])]);
        assert_eq!(c.classify("whoa there"), Some(Intent::Stop));
        assert_eq!(c.classify("forward"), None);
    }

    #[test]
    fn usable_as_trait_object() {
        let c: Box<dyn IntentClassifier> = Box::new(KeywordClassifier::default());
        assert_eq!(c.classify("right"), Some(Intent::Right));
    }
}
