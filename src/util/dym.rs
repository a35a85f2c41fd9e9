//! Levenshtein edit distance and "did you mean" suggestions.
//!
//! Used to propose a correction when a user names an unknown target,
//! package, or CLI flag.

/// Compute the Levenshtein edit distance between two strings.
pub fn lev_edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut row: Vec<usize> = (0..=b.len()).collect();

    for i in 1..=a.len() {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = tmp;
        }
    }

    row[b.len()]
}

/// Return the candidate with the smallest edit distance to `needle`.
pub fn did_you_mean<'a>(
    needle: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|c| (c, lev_edit_distance(needle, c)))
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_string_distance() {
        assert_eq!(lev_edit_distance("a", "a"), 0);
        assert_eq!(lev_edit_distance("a", "b"), 1);
        assert_eq!(lev_edit_distance("aa", "a"), 1);
    }

    #[test]
    fn finds_did_you_mean_candidate() {
        assert_eq!(did_you_mean("food", ["foo", "bar"]), Some("foo"));
        assert_eq!(
            did_you_mean("eatable", ["edible", "tangible"]),
            Some("edible")
        );
    }

    #[test]
    fn no_candidates_yields_none() {
        assert_eq!(did_you_mean("zzz", []), None);
    }
}
