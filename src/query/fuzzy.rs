//! Fuzzy string comparison operators (§4.5 filter evaluator).
//!
//! `strsim` backs Levenshtein distance/similarity and Jaro-Winkler, the two
//! general-purpose edit-distance metrics. Dice coefficient and the two
//! phonetic algorithms (Soundex, Metaphone) have no single crate in the
//! retrieval pack covering all four, so they are small self-contained
//! functions living alongside the `strsim`-backed ones.

/// Default similarity threshold for the `~=` fuzzy-equality operator.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Levenshtein edit distance.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Levenshtein similarity normalized to `[0, 1]`, `1.0` for identical
/// strings and `0.0` for completely dissimilar ones of any length.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f64 / max_len as f64)
}

/// Jaro-Winkler similarity, favoring strings sharing a common prefix —
/// well suited to names, which is the case the specification calls out.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b)
}

/// Dice coefficient over character bigrams.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let bigrams_a = bigrams(a);
    let bigrams_b = bigrams(b);
    if bigrams_a.is_empty() && bigrams_b.is_empty() {
        return 1.0;
    }
    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return 0.0;
    }
    let mut matches = 0usize;
    let mut used = vec![false; bigrams_b.len()];
    for bg in &bigrams_a {
        if let Some(pos) = bigrams_b.iter().position(|(i, b)| !used[*i] && b == &bg.1) {
            used[pos] = true;
            matches += 1;
        }
    }
    (2 * matches) as f64 / (bigrams_a.len() + bigrams_b.len()) as f64
}

fn bigrams(s: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 2 {
        return Vec::new();
    }
    chars
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, w.iter().collect()))
        .collect()
}

/// American Soundex: a letter followed by three digits coding consonant
/// groups, vowels and `h`/`w`/`y` dropped after the first letter.
pub fn soundex(s: &str) -> String {
    let letters: Vec<char> = s.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return String::new();
    }
    let code = |c: char| -> u8 {
        match c.to_ascii_uppercase() {
            'B' | 'F' | 'P' | 'V' => b'1',
            'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => b'2',
            'D' | 'T' => b'3',
            'L' => b'4',
            'M' | 'N' => b'5',
            'R' => b'6',
            _ => 0,
        }
    };
    let first = letters[0].to_ascii_uppercase();
    let mut digits = String::new();
    let mut last_code = code(first);
    for &c in &letters[1..] {
        let d = code(c);
        if d != 0 && d != last_code {
            digits.push(d as char);
        }
        if !matches!(c.to_ascii_uppercase(), 'H' | 'W') {
            last_code = d;
        }
        if digits.len() == 3 {
            break;
        }
    }
    while digits.len() < 3 {
        digits.push('0');
    }
    format!("{first}{digits}")
}

/// A simplified Metaphone: coarser than the reference algorithm (no silent
/// "gh", no Germanic-origin special cases) but deterministic and adequate
/// for the `soundsLike` filter operator's fuzzy-phonetic intent.
pub fn metaphone(s: &str) -> String {
    let letters: Vec<char> = s
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let mut i = 0;
    while i < letters.len() {
        let c = letters[i];
        let prev = if i > 0 { Some(letters[i - 1]) } else { None };
        let next = letters.get(i + 1).copied();
        if Some(c) == prev {
            i += 1;
            continue;
        }
        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == 0 {
                    out.push(c);
                }
            }
            'B' => {
                if !(i == letters.len() - 1 && prev == Some('M')) {
                    out.push('B');
                }
            }
            'C' => {
                if next == Some('H') {
                    out.push('X');
                    i += 1;
                } else if matches!(next, Some('I') | Some('E') | Some('Y')) {
                    out.push('S');
                } else {
                    out.push('K');
                }
            }
            'D' => {
                if next == Some('G') && matches!(letters.get(i + 2), Some('E') | Some('I') | Some('Y')) {
                    out.push('J');
                    i += 1;
                } else {
                    out.push('D');
                }
            }
            'G' => {
                if next == Some('H') {
                    out.push('F');
                    i += 1;
                } else {
                    out.push('K');
                }
            }
            'H' => {
                if matches!(prev, Some('A') | Some('E') | Some('I') | Some('O') | Some('U')) {
                    // vowel+H: silent, skip
                } else {
                    out.push('H');
                }
            }
            'K' => {
                if prev != Some('C') {
                    out.push('K');
                }
            }
            'P' => {
                if next == Some('H') {
                    out.push('F');
                    i += 1;
                } else {
                    out.push('P');
                }
            }
            'Q' => out.push('K'),
            'S' => {
                if next == Some('H') {
                    out.push('X');
                    i += 1;
                } else {
                    out.push('S');
                }
            }
            'T' => {
                if next == Some('H') {
                    out.push('0');
                    i += 1;
                } else {
                    out.push('T');
                }
            }
            'V' => out.push('F'),
            'W' | 'Y' => {
                if matches!(next, Some('A') | Some('E') | Some('I') | Some('O') | Some('U')) {
                    out.push(c);
                }
            }
            'X' => out.push_str("KS"),
            'Z' => out.push('S'),
            other => out.push(other),
        }
        i += 1;
    }
    out
}

/// Generic similarity score used by the `similar` filter operator: an
/// average of Levenshtein and Jaro-Winkler similarity, each catching
/// different kinds of near-miss (insert/delete vs transposition/prefix).
pub fn similar(a: &str, b: &str) -> f64 {
    (levenshtein_similarity(a, b) + jaro_winkler(a, b)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_similarity_identical_is_one() {
        assert_eq!(levenshtein_similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn jaro_winkler_rewards_common_prefix() {
        assert!(jaro_winkler("martha", "marhta") > 0.9);
    }

    #[test]
    fn dice_coefficient_identical_is_one() {
        assert_eq!(dice_coefficient("night", "night"), 1.0);
    }

    #[test]
    fn soundex_classic_examples() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
    }

    #[test]
    fn metaphone_is_deterministic() {
        assert_eq!(metaphone("Smith"), metaphone("Smith"));
        assert_ne!(metaphone("Smith"), metaphone("Jones"));
    }

    #[test]
    fn fuzzy_equality_threshold_behavior() {
        assert!(similar("Alice", "Alicia") > 0.5);
    }
}
