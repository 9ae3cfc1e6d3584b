//! Closest-match suggestions for mistyped commands and flags.

use strsim::levenshtein;

/// The closest candidate to `unknown`, if any lies within
/// `max(2, len/3)` edits. Callers pass only visible names.
pub fn suggest<'a, I>(unknown: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, &str)> = None;
    for candidate in candidates {
        let distance = levenshtein(unknown, candidate);
        if best.map(|(d, _)| distance < d).unwrap_or(true) {
            best = Some((distance, candidate));
        }
    }
    let limit = std::cmp::max(2, unknown.chars().count() / 3);
    best.filter(|&(distance, _)| distance <= limit)
        .map(|(_, name)| name.to_string())
}
