/// Case-insensitive substring test against the configured search terms.
///
/// No tokenization or word boundaries: a term matches anywhere in the text.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    terms: Vec<String>,
    folded: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.is_empty())
            .collect();
        let folded = terms.iter().map(|t| t.to_lowercase()).collect();
        Self { terms, folded }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The first configured term found in `text`, in its original spelling
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let haystack = text.to_lowercase();
        self.folded
            .iter()
            .position(|term| haystack.contains(term.as_str()))
            .and_then(|idx| self.terms.get(idx))
            .map(String::as_str)
    }
}
