use std::fmt;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// A single step of an analyzer chain
///
/// Each filter receives the full token list produced so far and returns the
/// new token list.
pub type TokenFilter = Arc<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;

/// Ordered chain of token filters applied to text values
#[derive(Clone, Default)]
pub struct Analyzer {
    filters: Vec<(String, TokenFilter)>,
}

impl Analyzer {
    /// Create an empty analyzer; analysis yields the input as one token
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named filter to the chain
    pub fn with_filter(mut self, name: impl Into<String>, filter: TokenFilter) -> Self {
        self.filters.push((name.into(), filter));
        self
    }

    /// Names of the filters, in application order
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Run the chain over `text`
    ///
    /// # Example
    ///
    /// ```
    /// use quarry::analysis::AnalyzerRegistry;
    ///
    /// let registry = AnalyzerRegistry::default();
    /// let analyzer = registry.build(&["whitespace", "lowercase"]).unwrap();
    /// assert_eq!(analyzer.analyze("Hello World"), vec!["hello", "world"]);
    /// ```
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.filters
            .iter()
            .fold(vec![text.to_string()], |tokens, (_, filter)| filter(tokens))
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("filters", &self.filter_names())
            .finish()
    }
}

/// Split every token on Unicode whitespace
pub fn whitespace() -> TokenFilter {
    Arc::new(|tokens: Vec<String>| {
        tokens
            .iter()
            .flat_map(|t| t.split_whitespace().map(str::to_string))
            .collect()
    })
}

/// Split every token on Unicode word boundaries, dropping punctuation
pub fn unicode() -> TokenFilter {
    Arc::new(|tokens: Vec<String>| {
        tokens
            .iter()
            .flat_map(|t| t.unicode_words().map(str::to_string))
            .collect()
    })
}

/// Lowercase every token
pub fn lowercase() -> TokenFilter {
    Arc::new(|tokens: Vec<String>| tokens.into_iter().map(|t| t.to_lowercase()).collect())
}

/// Remove repeated tokens, keeping the first occurrence
pub fn dedup() -> TokenFilter {
    Arc::new(|tokens: Vec<String>| {
        let mut seen = std::collections::HashSet::with_capacity(tokens.len());
        tokens
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    })
}

/// Strip leading and trailing punctuation, dropping tokens left empty
pub fn trim_punctuation() -> TokenFilter {
    Arc::new(|tokens: Vec<String>| {
        tokens
            .into_iter()
            .filter_map(|t| {
                let trimmed = t.trim_matches(|c: char| c.is_ascii_punctuation());
                if trimmed.is_empty() {
                    None
                } else if trimmed.len() == t.len() {
                    Some(t)
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_keeps_input() {
        let analyzer = Analyzer::new();
        assert_eq!(analyzer.analyze("Hello World"), vec!["Hello World"]);
    }

    #[test]
    fn test_whitespace() {
        let analyzer = Analyzer::new().with_filter("whitespace", whitespace());
        assert_eq!(
            analyzer.analyze("  quick\tbrown\nfox "),
            vec!["quick", "brown", "fox"]
        );
        assert!(analyzer.analyze("   ").is_empty());
    }

    #[test]
    fn test_unicode_words() {
        let analyzer = Analyzer::new().with_filter("unicode", unicode());
        assert_eq!(
            analyzer.analyze("Hello, world! It's fine."),
            vec!["Hello", "world", "It's", "fine"]
        );
    }

    #[test]
    fn test_dedup_keeps_first() {
        let analyzer = Analyzer::new()
            .with_filter("whitespace", whitespace())
            .with_filter("dedup", dedup());
        assert_eq!(
            analyzer.analyze("b a b c a"),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn test_chain_order() {
        // dedup before lowercase keeps case variants
        let before = Analyzer::new()
            .with_filter("whitespace", whitespace())
            .with_filter("dedup", dedup())
            .with_filter("lowercase", lowercase());
        assert_eq!(before.analyze("Rust rust"), vec!["rust", "rust"]);

        let after = Analyzer::new()
            .with_filter("whitespace", whitespace())
            .with_filter("lowercase", lowercase())
            .with_filter("dedup", dedup());
        assert_eq!(after.analyze("Rust rust"), vec!["rust"]);
    }

    #[test]
    fn test_trim_punctuation() {
        let analyzer = Analyzer::new()
            .with_filter("whitespace", whitespace())
            .with_filter("trim_punctuation", trim_punctuation());
        assert_eq!(
            analyzer.analyze("(hello) world! -- end."),
            vec!["hello", "world", "end"]
        );
    }

    #[test]
    fn test_debug_lists_filters() {
        let analyzer = Analyzer::new()
            .with_filter("whitespace", whitespace())
            .with_filter("lowercase", lowercase());
        assert_eq!(analyzer.filter_names(), vec!["whitespace", "lowercase"]);
        assert!(format!("{:?}", analyzer).contains("lowercase"));
    }
}
