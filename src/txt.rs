//! Text helpers shared by the indexer: keyword extraction, title-casing,
//! slugs, and the canonical-filename heuristic.

/// Words shorter than this never become keywords.
const MIN_KEYWORD_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "and", "the", "with", "for", "from", "this", "that", "img", "jpg", "jpeg",
];

/// Split a string into lowercase words on non-alphanumeric boundaries.
pub fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Extract keyword candidates from a string: lowercase words, minimum
/// length, stop words removed.
pub fn keywords(s: &str) -> Vec<String> {
    words(s)
        .into_iter()
        .filter(|w| w.len() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Deduplicate words preserving first-seen order; empty entries are dropped.
pub fn unique_words(list: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::with_capacity(list.len());

    for word in list {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            continue;
        }
        if seen.insert(word.clone()) {
            result.push(word);
        }
    }

    result
}

/// Capitalize the first letter of every word.
pub fn title(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// URL-safe slug: lowercase alphanumerics with single dashes in between.
pub fn slug(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_dash = true;

    for c in s.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            result.push('-');
            last_dash = true;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// True if a base name carries meaning beyond a camera-generated sequence
/// name. Canonical names (IMG_1234, DSC01234, 20210601_120000_ABCD) say
/// nothing about the content and must not seed keywords.
pub fn non_canonical(base: &str) -> bool {
    !is_canonical(base)
}

fn is_canonical(base: &str) -> bool {
    let stem = match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            stem
        }
        _ => base,
    };

    if stem.is_empty() {
        return false;
    }

    // Timestamp exports: 20210601_120000, 20210601-120000_ABCD, ...
    let bytes = stem.as_bytes();
    if bytes.len() >= 15
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && (bytes[8] == b'_' || bytes[8] == b'-')
        && bytes[9..15].iter().all(u8::is_ascii_digit)
    {
        return true;
    }

    // Camera sequence names: a short letter prefix, an optional separator,
    // and a trailing run of at least three digits (IMG_1234, DSC01234,
    // P1040404, GOPR0042).
    let prefix_len = stem.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if prefix_len > 5 {
        return false;
    }

    let rest = &stem[prefix_len..];
    let rest = rest.strip_prefix(['_', '-']).unwrap_or(rest);

    rest.len() >= 3 && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_filters_short_and_stop_words() {
        let result = keywords("A dog and the Marienplatz in 2021");
        assert_eq!(result, vec!["dog", "marienplatz", "2021"]);
    }

    #[test]
    fn test_unique_words_keeps_first_seen_order() {
        let input = vec![
            "dog".to_string(),
            "munich".to_string(),
            "Dog".to_string(),
            "".to_string(),
            "beach".to_string(),
        ];
        assert_eq!(unique_words(input), vec!["dog", "munich", "beach"]);
    }

    #[test]
    fn test_title_capitalizes_words() {
        assert_eq!(title("dog"), "Dog");
        assert_eq!(title("golden retriever"), "Golden Retriever");
        assert_eq!(title(""), "");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Golden Retriever"), "golden-retriever");
        assert_eq!(slug("  Café -- Terrace "), "café-terrace");
    }

    #[test]
    fn test_canonical_names() {
        assert!(!non_canonical("IMG_1234.JPG"));
        assert!(!non_canonical("DSC01234.jpg"));
        assert!(!non_canonical("P1040404"));
        assert!(!non_canonical("20210601_120000_ABCD.jpg"));
        assert!(non_canonical("marienplatz-sunset.jpg"));
        assert!(non_canonical("holiday 2021.jpg"));
        assert!(non_canonical("a.jpg"));
    }
}
