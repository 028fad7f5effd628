//! Utterance normalization shared by classification, context and caching

/// Lowercase and collapse runs of whitespace to single spaces
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased alphanumeric words, punctuation dropped
pub fn words(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words joined with single spaces and padded on both ends, so that
/// `padded.contains(" how many ")` is a whole-phrase test
pub fn padded_words(input: &str) -> String {
    format!(" {} ", words(input).join(" "))
}
