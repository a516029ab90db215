//! Name-based task matching: exact first, then fuzzy edit-distance.
//!
//! A source task's composed display name is resolved against the remote
//! task index snapshot. An exact match wins immediately; otherwise the
//! index entry with the highest normalised Levenshtein similarity is
//! accepted when it strictly exceeds [`MATCH_THRESHOLD`]. Ties and
//! duplicate names resolve to the first entry in fetch order.

use crate::types::RemoteTask;

/// Minimum similarity a fuzzy candidate must strictly exceed.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Standard single-character insert/delete/substitute edit distance,
/// computed over Unicode scalar values with the usual dynamic-programming
/// recurrence (rolling rows instead of the full matrix).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // prev[j] holds matrix[i-1][j]; base row matrix[0][j] = j.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution_cost = usize::from(ca != cb);
            current[j + 1] = (prev[j + 1] + 1)
                .min(current[j] + 1)
                .min(prev[j] + substitution_cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Normalised, case-insensitive similarity in `[0, 1]`:
/// `1 - distance / max(len(a), len(b))`. Two empty strings are fully
/// similar.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Resolve a composed display name against the remote task index.
///
/// Pass 1 scans for an exact name match and returns the first one. Pass 2
/// scores every entry and returns the best candidate only when its
/// similarity strictly exceeds [`MATCH_THRESHOLD`]; on equal scores the
/// earlier entry is kept, so resolution is stable in index order.
pub fn resolve<'a>(name: &str, index: &'a [RemoteTask]) -> Option<&'a RemoteTask> {
    if let Some(exact) = index.iter().find(|task| task.name == name) {
        return Some(exact);
    }

    let mut best: Option<(&RemoteTask, f64)> = None;
    for task in index {
        let score = similarity(name, &task.name);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((task, score));
        }
    }
    best.filter(|&(_, score)| score > MATCH_THRESHOLD)
        .map(|(task, _)| task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(names: &[&str]) -> Vec<RemoteTask> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RemoteTask {
                id: format!("t-{i}"),
                name: (*name).to_string(),
            })
            .collect()
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("Design Review", "Implement Login"),
            ("", "abc"),
            ("flaw", "lawn"),
        ];
        for (a, b) in pairs {
            assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        for s in ["", "a", "Design Review", "任务 1"] {
            assert_eq!(levenshtein(s, s), 0);
        }
    }

    #[test]
    fn known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("book", "back"), 2);
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        // One substitution regardless of UTF-8 byte width.
        assert_eq!(levenshtein("任务", "任何"), 1);
    }

    #[test]
    fn trailing_space_similarity_exceeds_threshold() {
        let score = similarity("Design Review", "Design Review ");
        assert!(score > MATCH_THRESHOLD, "score was {score}");
    }

    #[test]
    fn unrelated_names_fall_below_threshold() {
        let score = similarity("Design Review", "Implement Login");
        assert!(score <= MATCH_THRESHOLD, "score was {score}");
    }

    #[test]
    fn similarity_is_case_insensitive() {
        assert!((similarity("DESIGN REVIEW", "design review") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn both_empty_fully_similar() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_match_wins_over_better_positioned_fuzzy() {
        let index = index(&["Design Reviews", "Design Review"]);
        let matched = resolve("Design Review", &index).expect("should match");
        assert_eq!(matched.id, "t-1");
    }

    #[test]
    fn duplicate_exact_names_resolve_to_first() {
        let index = index(&["Design Review", "Design Review"]);
        let matched = resolve("Design Review", &index).expect("should match");
        assert_eq!(matched.id, "t-0");
    }

    #[test]
    fn fuzzy_match_picks_highest_similarity() {
        let index = index(&["Implement Login", "Design Reviw", "Deploy Service"]);
        let matched = resolve("Design Review", &index).expect("should match");
        assert_eq!(matched.name, "Design Reviw");
    }

    #[test]
    fn fuzzy_tie_resolves_to_first_seen() {
        // Both candidates are one substitution away from the query.
        let index = index(&["Design Reviev", "Design Reviex"]);
        let matched = resolve("Design Review", &index).expect("should match");
        assert_eq!(matched.id, "t-0");
    }

    #[test]
    fn no_candidate_above_threshold_is_unmatched() {
        let index = index(&["Implement Login", "Deploy Service"]);
        assert!(resolve("Design Review", &index).is_none());
    }

    #[test]
    fn empty_index_is_unmatched() {
        assert!(resolve("Design Review", &[]).is_none());
    }

    #[test]
    fn threshold_is_strict() {
        // "ab" vs "ax": distance 1 over max len 2 = similarity 0.5 exactly,
        // which must not match.
        let index = index(&["ax"]);
        assert!(resolve("ab", &index).is_none());
    }
}
