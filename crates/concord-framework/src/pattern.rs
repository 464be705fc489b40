//! Message content patterns.
//!
//! A pattern is a whitespace-separated template such as `"greet {name} {rest}"`.
//! Tokens wrapped in braces are placeholders; everything else is a literal.
//!
//! A message matches a pattern when either:
//!
//! 1. its whole content equals the pattern text, ignoring case, or
//! 2. it has at least as many tokens as the pattern has literal tokens **and**
//!    its first token starts with the pattern's first token, ignoring case.
//!    A placeholder in first position accepts any first token.
//!
//! Rule 2 is a prefix rule on the *first token only*: `"help"` matches
//! `"helpme now"`. Literal tokens after the first are not compared.
//!
//! Captures are positional. The placeholder at the final pattern position
//! receives every remaining content token joined by single spaces, so
//! `"greet {name} {rest}"` against `"greet Alice likes cake"` binds
//! `name = "Alice"` and `rest = "likes cake"`. Placeholders with no content
//! token bind to the empty string.

use std::fmt;

// ============================================================================
// Args
// ============================================================================

/// Placeholder bindings produced by matching a message against a pattern.
///
/// Bindings keep the order the placeholders appear in the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    pairs: Vec<(String, String)>,
}

impl Args {
    /// Returns the value bound to `name`, if the pattern declared it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value bound to `name`, or `""` when absent.
    pub fn arg(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn insert(&mut self, name: &str, value: String) {
        match self.pairs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((name.to_owned(), value)),
        }
    }
}

// ============================================================================
// Pattern
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Stored lowercased.
    Literal(String),
    Placeholder(String),
}

impl Token {
    fn parse(raw: &str) -> Self {
        if raw.len() >= 2 && raw.starts_with('{') && raw.ends_with('}') {
            let name = raw.trim_start_matches('{').trim_end_matches('}');
            Token::Placeholder(name.to_owned())
        } else {
            Token::Literal(raw.to_lowercase())
        }
    }
}

/// A compiled message pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    folded: String,
    tokens: Vec<Token>,
    literals: usize,
}

impl Pattern {
    /// Compiles a pattern.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let tokens: Vec<Token> = raw.split_whitespace().map(Token::parse).collect();
        let literals = tokens
            .iter()
            .filter(|t| matches!(t, Token::Literal(_)))
            .count();
        Self {
            folded: raw.to_lowercase(),
            raw,
            tokens,
            literals,
        }
    }

    /// Returns the pattern text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the placeholder names in pattern order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Placeholder(name) => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Returns `true` if `content` matches this pattern.
    pub fn matches(&self, content: &str) -> bool {
        if content.to_lowercase() == self.folded {
            return true;
        }

        let words: Vec<&str> = content.split_whitespace().collect();
        let Some(first) = self.tokens.first() else {
            return false;
        };
        if words.is_empty() || words.len() < self.literals {
            return false;
        }

        match first {
            Token::Literal(lit) => words[0].to_lowercase().starts_with(lit.as_str()),
            Token::Placeholder(_) => true,
        }
    }

    /// Binds placeholders positionally against `content`.
    ///
    /// Does not check for a match first; see [`match_content`](Self::match_content).
    pub fn capture(&self, content: &str) -> Args {
        let words: Vec<&str> = content.split_whitespace().collect();
        let last = self.tokens.len().saturating_sub(1);
        let mut args = Args::default();

        for (i, token) in self.tokens.iter().enumerate() {
            let Token::Placeholder(name) = token else {
                continue;
            };
            let value = if i == last {
                words.get(i..).map(|rest| rest.join(" ")).unwrap_or_default()
            } else {
                words.get(i).map(|w| (*w).to_owned()).unwrap_or_default()
            };
            args.insert(name, value);
        }

        args
    }

    /// Matches `content` and, on success, returns the captured arguments.
    pub fn match_content(&self, content: &str) -> Option<Args> {
        self.matches(content).then(|| self.capture(content))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Pattern {
    fn from(raw: &str) -> Self {
        Pattern::new(raw)
    }
}

impl From<String> for Pattern {
    fn from(raw: String) -> Self {
        Pattern::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_ignores_case() {
        assert!(Pattern::new("Ping").matches("pINg"));
        assert!(Pattern::new("hello there").matches("HELLO THERE"));
    }

    #[test]
    fn test_first_token_prefix() {
        let pattern = Pattern::new("help");
        assert!(pattern.matches("helpme now"));
        assert!(pattern.matches("HELP"));
        assert!(!pattern.matches("hel"));
        assert!(!pattern.matches("ahelp"));
    }

    #[test]
    fn test_too_few_tokens() {
        assert!(!Pattern::new("help me").matches("help"));
    }

    #[test]
    fn test_later_literals_are_not_compared() {
        assert!(Pattern::new("set mode {value}").matches("set volume 11"));
    }

    #[test]
    fn test_placeholder_first_accepts_anything() {
        let pattern = Pattern::new("{word}");
        assert!(pattern.matches("anything goes"));
        assert!(!pattern.matches("   "));
    }

    #[test]
    fn test_empty_pattern_only_matches_empty_content() {
        let pattern = Pattern::new("");
        assert!(pattern.matches(""));
        assert!(!pattern.matches("hi"));
    }

    #[test]
    fn test_last_placeholder_takes_the_rest() {
        let args = Pattern::new("greet {name} {rest}")
            .match_content("greet Alice likes cake and tea")
            .unwrap();
        assert_eq!(args.arg("name"), "Alice");
        assert_eq!(args.arg("rest"), "likes cake and tea");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_missing_placeholders_bind_empty() {
        let args = Pattern::new("greet {name} {rest}")
            .match_content("greet")
            .unwrap();
        assert_eq!(args.get("name"), Some(""));
        assert_eq!(args.get("rest"), Some(""));
        assert_eq!(args.get("other"), None);
        assert_eq!(args.arg("other"), "");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let args = Pattern::new("say {text}")
            .match_content("say   hello    world")
            .unwrap();
        assert_eq!(args.arg("text"), "hello world");
    }

    #[test]
    fn test_literals_are_not_bound() {
        let pattern = Pattern::new("ban {user} for {reason}");
        let args = pattern.capture("ban bob for spamming links");
        let names: Vec<_> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["user", "reason"]);
        assert_eq!(args.arg("reason"), "spamming links");
        assert_eq!(pattern.placeholders().collect::<Vec<_>>(), ["user", "reason"]);
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(Pattern::new("ping").match_content("pong").is_none());
    }
}
