//! Resource-key normalization and ticker validation.
//!
//! Company and sector names become resource keys through a deterministic
//! pipeline: lowercase, canonical decomposition, combining marks removed,
//! anything outside `[a-z0-9\s]` dropped, then whitespace runs joined with `_`.
//! Case and diacritics therefore never affect the key.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static RE_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}[0-9]{1,2}$").unwrap());

static RE_TICKER_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;\s]+").unwrap());

/// Normalize a display name into a resource key.
pub fn normalize_key(raw: &str) -> String {
    let stripped: String = raw
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_ascii_whitespace())
        .collect();
    stripped.split_ascii_whitespace().collect::<Vec<_>>().join("_")
}

/// Whether `candidate` is shaped like a B3 ticker (`PETR4`, `TAEE11`).
///
/// No case folding happens here: `petr4` is rejected.
pub fn is_ticker(candidate: &str) -> bool {
    RE_TICKER.is_match(candidate)
}

/// Split a ticker-list cell on any run of commas, semicolons or whitespace,
/// uppercase each token and keep only the ticker-shaped ones.
pub fn split_tickers(cell: &str) -> Vec<String> {
    RE_TICKER_SEPARATORS
        .split(cell)
        .map(|token| token.trim().to_uppercase())
        .filter(|token| is_ticker(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diacritics_and_case_do_not_affect_key() {
        let a = normalize_key("Petróleo Brasileiro S.A.");
        let b = normalize_key("PETROLEO BRASILEIRO S.A.");
        assert_eq!(a, b);
        assert_eq!(a, "petroleo_brasileiro_sa");
    }

    #[test]
    fn whitespace_is_trimmed_and_collapsed() {
        assert_eq!(normalize_key("  Petróleo   e\tGás "), "petroleo_e_gas");
    }

    #[test]
    fn punctuation_is_dropped() {
        assert_eq!(normalize_key("Itaú-Unibanco (Holding)"), "itauunibanco_holding");
        assert_eq!(normalize_key("!!!"), "");
    }

    #[test]
    fn ticker_shapes() {
        assert!(is_ticker("PETR4"));
        assert!(is_ticker("ITUB4"));
        assert!(is_ticker("TAEE11"));
        assert!(!is_ticker("PETR"));
        assert!(!is_ticker("PETR44A"));
        assert!(!is_ticker("PETR444"));
        assert!(!is_ticker("petr4"));
    }

    #[test]
    fn ticker_list_is_split_uppercased_and_filtered() {
        assert_eq!(split_tickers("PETR3, PETR4"), vec!["PETR3", "PETR4"]);
        assert_eq!(split_tickers("itub3;ITUB4  x"), vec!["ITUB3", "ITUB4"]);
        assert!(split_tickers("  ;, ").is_empty());
    }
}
