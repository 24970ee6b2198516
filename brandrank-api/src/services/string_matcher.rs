//! Fuzzy brand-name rank finder
//!
//! Locates a target company inside a model's ranked candidate list.
//! Candidates are checked in list order; for each candidate the cascade is:
//!
//! 1. Exact match (lowercased, trimmed)
//! 2. Containment in either direction ("Heineken" vs "Heineken International")
//! 3. Equality after stripping corporate boilerplate words
//! 4. Levenshtein distance ≤ 2 (both names longer than 3 chars)
//!
//! The first candidate matching any stage wins. Pure functions, safe to call
//! from any number of concurrent tasks.

/// Words removed before the boilerplate-stripped comparison (whole words only)
const BOILERPLATE_WORDS: &[&str] = &[
    "inc",
    "corp",
    "corporation",
    "ltd",
    "limited",
    "group",
    "international",
    "holdings",
    "brand",
    "the",
];

/// Stripped names shorter than this never match on stage 3
const MIN_STRIPPED_LEN: usize = 3;

/// Stage 4 only runs when both names are longer than this
const MIN_FUZZY_LEN: usize = 3;

/// Largest accepted edit distance
const MAX_EDIT_DISTANCE: usize = 2;

/// Returned by [`levenshtein`] when the length difference alone exceeds the threshold
pub const DISTANCE_SENTINEL: usize = 100;

/// Find the 1-based rank of `target` in `candidates`
///
/// Returns `None` for an empty target or when no candidate matches.
pub fn find_rank<S: AsRef<str>>(candidates: &[S], target: &str) -> Option<usize> {
    let target = normalize(target);
    if target.is_empty() {
        return None;
    }
    let target_stripped = strip_boilerplate(&target);

    candidates
        .iter()
        .position(|candidate| matches_target(&normalize(candidate.as_ref()), &target, &target_stripped))
        .map(|index| index + 1)
}

fn matches_target(candidate: &str, target: &str, target_stripped: &str) -> bool {
    // An empty candidate is contained in every target
    if candidate.is_empty() {
        return false;
    }

    if candidate == target {
        return true;
    }

    if candidate.contains(target) || target.contains(candidate) {
        return true;
    }

    let candidate_stripped = strip_boilerplate(candidate);
    if candidate_stripped.chars().count() >= MIN_STRIPPED_LEN && candidate_stripped == target_stripped {
        return true;
    }

    candidate.chars().count() > MIN_FUZZY_LEN
        && target.chars().count() > MIN_FUZZY_LEN
        && levenshtein(candidate, target) <= MAX_EDIT_DISTANCE
}

/// Edit distance (insert/delete/substitute, unit cost) between two strings
///
/// Short-circuits to [`DISTANCE_SENTINEL`] when the character counts differ by
/// more than 2, since the distance is then necessarily above the match threshold.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let len_a = a.chars().count();
    let len_b = b.chars().count();

    if len_a.abs_diff(len_b) > MAX_EDIT_DISTANCE {
        return DISTANCE_SENTINEL;
    }

    strsim::levenshtein(a, b)
}

/// Split a model reply into a candidate list (comma separated, trimmed)
///
/// Blank segments stay in place as empty strings so positions match the
/// model's own list; [`find_rank`] never matches them.
pub fn parse_candidate_list(reply: &str) -> Vec<String> {
    reply.split(',').map(|s| s.trim().to_string()).collect()
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn strip_boilerplate(name: &str) -> String {
    name.split_whitespace()
        .filter(|word| {
            let core = word.trim_matches(|c: char| !c.is_alphanumeric());
            !BOILERPLATE_WORDS.contains(&core)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
