use std::collections::HashSet;
use lazy_static::lazy_static;
use regex::Regex;

/// Words carrying no topical signal.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Tokens must be longer than this to count as keywords.
pub const MIN_KEYWORD_LEN: usize = 3;

lazy_static! {
    // ASCII word runs, the same tokens `\b\w+\b` yields in ASCII mode
    static ref WORD: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
}

fn qualifies(word: &str) -> bool {
    word.len() > MIN_KEYWORD_LEN && !STOP_WORDS.contains(&word)
}

/// Lowercased qualifying words of `title`, in order, duplicates kept.
pub fn qualifying_words(title: &str) -> Vec<String> {
    let lowered = title.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| qualifies(w))
        .map(str::to_string)
        .collect()
}

/// The keyword set of a headline.
pub fn keywords(title: &str) -> HashSet<String> {
    qualifying_words(title).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_keywords_filter_short_and_stop_words() {
        assert_eq!(keywords("Senate debates election bill"), set(&["senate", "debates", "election", "bill"]));
        assert_eq!(keywords("House passes election reform"), set(&["house", "passes", "election", "reform"]));
        assert_eq!(keywords("Weather update for Tuesday"), set(&["weather", "update", "tuesday"]));
        // "with" is the only stop-word long enough to survive the length filter
        assert_eq!(keywords("Talks with Ukraine"), set(&["talks", "ukraine"]));
    }

    #[test]
    fn test_keywords_tokenize_on_word_boundaries() {
        assert_eq!(
            keywords("Trump's 2024 'situationship' -- Zelenskyy/Putin"),
            set(&["trump", "2024", "situationship", "zelenskyy", "putin"])
        );
        assert_eq!(keywords("snake_case_token"), set(&["snake_case_token"]));
    }

    #[test]
    fn test_keywords_empty_input() {
        assert!(keywords("").is_empty());
        assert!(keywords("a an the of").is_empty());
    }

    #[test]
    fn test_qualifying_words_keep_order_and_repeats() {
        assert_eq!(
            qualifying_words("Election night: ELECTION results"),
            vec!["election", "night", "election", "results"]
        );
    }

    #[test]
    fn test_keywords_deterministic() {
        let title = "Pentagon reviews Musk contracts amid Pentagon audit";
        assert_eq!(keywords(title), keywords(title));
    }
}
