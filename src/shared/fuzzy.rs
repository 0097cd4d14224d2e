use std::cmp;

/// Levenshtein distance over chars, two rows at a time.
pub(crate) fn distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return cmp::max(a.len(), b.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ac) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, bc) in b.iter().enumerate() {
            let sub_cost = usize::from(ac != bc);
            curr[j + 1] = cmp::min(
                cmp::min(prev[j + 1] + 1, curr[j] + 1),
                prev[j] + sub_cost,
            );
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// How well a stop name matches a search term, in `0.0..=1.0`.
///
/// Each token of the needle is scored against its best token in the hay, so
/// "lake st" ranks "Lake St & Hiawatha Ave" above "Lake Harriet Pkwy".
pub(crate) fn score(needle: &str, hay: &str) -> f64 {
    let hay = hay.to_lowercase();
    let hay_tokens: Vec<&str> = hay.split_whitespace().collect();
    let needle_tokens: Vec<&str> = needle.split_whitespace().collect();
    if needle_tokens.is_empty() || hay_tokens.is_empty() {
        return 0.0;
    }
    let total: f64 = needle_tokens
        .iter()
        .map(|needle| {
            hay_tokens
                .iter()
                .map(|hay| token_score(needle, hay))
                .fold(0.0, f64::max)
        })
        .sum();
    total / needle_tokens.len() as f64
}

fn token_score(needle: &str, hay: &str) -> f64 {
    if hay.starts_with(needle) {
        return 1.0;
    }
    let longest = cmp::max(needle.chars().count(), hay.chars().count());
    1.0 - distance(needle, hay) as f64 / longest as f64
}

#[test]
fn fuzzy_empty_vs_nonempty() {
    assert_eq!(distance("", "abc"), 3);
    assert_eq!(distance("abc", ""), 3);
}

#[test]
fn fuzzy_edits() {
    assert_eq!(distance("cat", "cut"), 1);
    assert_eq!(distance("cat", "cart"), 1);
    assert_eq!(distance("kitten", "sitting"), 3);
    assert_eq!(distance("intention", "execution"), 5);
}

#[test]
fn fuzzy_unicode() {
    assert_eq!(distance("café", "cafe"), 1);
}

#[test]
fn prefix_tokens_score_full() {
    assert_eq!(score("lake hia", "Lake St & Hiawatha Ave"), 1.0);
    assert!(score("lake st", "Lake St & Hiawatha Ave") > score("lake st", "Lake Harriet Pkwy"));
}
