//! Vendor-search intent detection.
//!
//! Deliberately naive case-insensitive substring containment against two
//! fixed keyword sets. There is no tokenization or word-boundary handling,
//! so "djembe" matches "dj"; the keyword lists are curated with that
//! trade-off in mind.

const VENDOR_KEYWORDS: &[&str] = &[
    "vendor",
    "vendors",
    "caterer",
    "caterers",
    "venue",
    "venues",
    "wedding",
    "photographer",
    "photographers",
    "makeup",
    "decorator",
    "decor",
    "dj",
    "banquet",
];

// The service currently only covers Mumbai.
const CITY_KEYWORDS: &[&str] = &["mumbai", "bombay"];

/// Returns true when the message should trigger a direct vendor search
/// instead of open-ended chat. Empty input is never a vendor query.
pub fn is_vendor_query(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let t = text.to_lowercase();
    VENDOR_KEYWORDS.iter().any(|k| t.contains(k)) || CITY_KEYWORDS.iter().any(|c| t.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_keyword_matches() {
        assert!(is_vendor_query("I need a caterer for 200 guests"));
        assert!(is_vendor_query("any good banquet halls?"));
        assert!(is_vendor_query("wedding planning help"));
    }

    #[test]
    fn test_city_keyword_matches() {
        assert!(is_vendor_query("Need a DJ in Bombay"));
        assert!(is_vendor_query("something in mumbai"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_vendor_query("PHOTOGRAPHERS near me"));
        assert!(is_vendor_query("MuMbAi"));
    }

    #[test]
    fn test_general_chat_does_not_match() {
        assert!(!is_vendor_query("What's the weather today?"));
        assert!(!is_vendor_query("tell me a joke"));
    }

    #[test]
    fn test_empty_is_not_vendor_query() {
        assert!(!is_vendor_query(""));
    }

    #[test]
    fn test_substring_containment_is_intentional() {
        // "djembe" contains "dj"; accepted behavior of substring matching
        assert!(is_vendor_query("who plays the djembe"));
    }
}
