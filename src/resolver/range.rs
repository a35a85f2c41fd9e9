//! Interval-set algebra over semver versions, and the `@`/`^`/`~`/`=`
//! range syntax used in manifest dependency declarations.
//!
//! A [`RangeSet`] is a sorted, non-overlapping list of [`Interval`]s. It
//! supports the boolean operations the resolver needs (union, intersection,
//! membership) independently of `pubgrub::Range`, and can be lowered into
//! one via [`RangeSet::to_pubgrub_range`] for feeding the solver.

use std::cmp::Ordering;
use std::ops::Bound;

use pubgrub::Range;
use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("empty range expression")]
    Empty,
    #[error("invalid version `{0}`")]
    InvalidVersion(String),
    #[error("unrecognized range operator in `{0}`")]
    UnknownOperator(String),
    #[error("malformed bracketed range `{0}`")]
    MalformedBracket(String),
}

/// A single contiguous span of versions, `[lower, upper)`-ish but with
/// independently inclusive/exclusive ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lower: Bound<Version>,
    pub upper: Bound<Version>,
}

impl Interval {
    pub fn full() -> Self {
        Interval {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn singleton(v: Version) -> Self {
        Interval {
            lower: Bound::Included(v.clone()),
            upper: Bound::Included(v),
        }
    }

    pub fn at_least(v: Version) -> Self {
        Interval {
            lower: Bound::Included(v),
            upper: Bound::Unbounded,
        }
    }

    pub fn greater_than(v: Version) -> Self {
        Interval {
            lower: Bound::Excluded(v),
            upper: Bound::Unbounded,
        }
    }

    pub fn less_than(v: Version) -> Self {
        Interval {
            lower: Bound::Unbounded,
            upper: Bound::Excluded(v),
        }
    }

    pub fn at_most(v: Version) -> Self {
        Interval {
            lower: Bound::Unbounded,
            upper: Bound::Included(v),
        }
    }

    pub fn between(lower: Version, upper: Version) -> Self {
        Interval {
            lower: Bound::Included(lower),
            upper: Bound::Excluded(upper),
        }
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(a), Bound::Included(b)) => a > b,
            (Bound::Included(a), Bound::Excluded(b))
            | (Bound::Excluded(a), Bound::Included(b))
            | (Bound::Excluded(a), Bound::Excluded(b)) => a >= b,
        }
    }

    pub fn contains(&self, v: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => v >= l,
            Bound::Excluded(l) => v > l,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => v <= u,
            Bound::Excluded(u) => v < u,
        };
        above_lower && below_upper
    }

    /// Intersect two intervals, returning `None` if the result is empty.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lower = max_lower(&self.lower, &other.lower);
        let upper = min_upper(&self.upper, &other.upper);
        let candidate = Interval { lower, upper };
        if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        }
    }

    /// Whether `self` and `other` overlap or touch (so their union is a
    /// single contiguous interval).
    fn adjoins(&self, other: &Interval) -> bool {
        !(strictly_before(&self.upper, &other.lower) || strictly_before(&other.upper, &self.lower))
    }

    fn union_contiguous(&self, other: &Interval) -> Interval {
        Interval {
            lower: min_lower(&self.lower, &other.lower),
            upper: max_upper(&self.upper, &other.upper),
        }
    }
}

fn lower_key(b: &Bound<Version>) -> (i8, Option<&Version>) {
    match b {
        Bound::Unbounded => (-2, None),
        Bound::Included(v) => (0, Some(v)),
        Bound::Excluded(v) => (1, Some(v)),
    }
}

fn upper_key(b: &Bound<Version>) -> (i8, Option<&Version>) {
    match b {
        Bound::Unbounded => (2, None),
        Bound::Excluded(v) => (0, Some(v)),
        Bound::Included(v) => (1, Some(v)),
    }
}

fn cmp_lower(a: &Bound<Version>, b: &Bound<Version>) -> Ordering {
    lower_key(a).cmp(&lower_key(b))
}

fn cmp_upper(a: &Bound<Version>, b: &Bound<Version>) -> Ordering {
    upper_key(a).cmp(&upper_key(b))
}

fn max_lower(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_lower(a, b) == Ordering::Less {
        b.clone()
    } else {
        a.clone()
    }
}

fn min_lower(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_lower(a, b) == Ordering::Greater {
        b.clone()
    } else {
        a.clone()
    }
}

fn min_upper(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_upper(a, b) == Ordering::Greater {
        b.clone()
    } else {
        a.clone()
    }
}

fn max_upper(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_upper(a, b) == Ordering::Less {
        b.clone()
    } else {
        a.clone()
    }
}

/// Whether interval-end `a` (an upper bound) lies strictly before
/// interval-start `b` (a lower bound), i.e. there's a gap between them.
fn strictly_before(a: &Bound<Version>, b: &Bound<Version>) -> bool {
    match (a, b) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (Bound::Included(x), Bound::Included(y)) => x < y,
        (Bound::Included(x), Bound::Excluded(y)) => x < y,
        (Bound::Excluded(x), Bound::Included(y)) => x < y,
        (Bound::Excluded(x), Bound::Excluded(y)) => x <= y,
    }
}

/// A union of disjoint, sorted [`Interval`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeSet {
    intervals: Vec<Interval>,
}

impl RangeSet {
    pub fn empty() -> Self {
        RangeSet { intervals: vec![] }
    }

    pub fn full() -> Self {
        RangeSet {
            intervals: vec![Interval::full()],
        }
    }

    pub fn from_interval(interval: Interval) -> Self {
        if interval.is_empty() {
            RangeSet::empty()
        } else {
            RangeSet {
                intervals: vec![interval],
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.intervals.iter().any(|i| i.contains(v))
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut merged: Vec<Interval> = self
            .intervals
            .iter()
            .chain(other.intervals.iter())
            .cloned()
            .collect();
        merged.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

        let mut out: Vec<Interval> = Vec::with_capacity(merged.len());
        for interval in merged {
            match out.last_mut() {
                Some(last) if last.adjoins(&interval) => {
                    *last = last.union_contiguous(&interval);
                }
                _ => out.push(interval),
            }
        }
        RangeSet { intervals: out }
    }

    pub fn intersection(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(i) = a.intersect(b) {
                    out.push(i);
                }
            }
        }
        out.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));
        RangeSet { intervals: out }
    }

    /// Lower this set into a `pubgrub::Range` for feeding the solver.
    pub fn to_pubgrub_range(&self) -> Range<Version> {
        let mut pieces = self.intervals.iter().map(interval_to_pubgrub_range);
        let Some(mut range) = pieces.next() else {
            // No intervals at all: a contradiction, i.e. the empty range.
            let zero = Version::new(0, 0, 0);
            return Range::strictly_lower_than(zero.clone())
                .intersection(&Range::strictly_higher_than(zero));
        };
        for piece in pieces {
            range = range.union(&piece);
        }
        range
    }
}

fn interval_to_pubgrub_range(interval: &Interval) -> Range<Version> {
    match (&interval.lower, &interval.upper) {
        (Bound::Unbounded, Bound::Unbounded) => Range::full(),
        (Bound::Unbounded, Bound::Excluded(u)) => Range::strictly_lower_than(u.clone()),
        (Bound::Unbounded, Bound::Included(u)) => Range::strictly_lower_than(bump_patch(u)),
        (Bound::Included(l), Bound::Unbounded) => Range::higher_than(l.clone()),
        (Bound::Excluded(l), Bound::Unbounded) => Range::strictly_higher_than(l.clone()),
        (Bound::Included(l), Bound::Excluded(u)) => Range::between(l.clone(), u.clone()),
        (Bound::Included(l), Bound::Included(u)) if l == u => Range::singleton(l.clone()),
        (Bound::Included(l), Bound::Included(u)) => Range::between(l.clone(), bump_patch(u)),
        (Bound::Excluded(l), Bound::Excluded(u)) => Range::strictly_higher_than(l.clone())
            .intersection(&Range::strictly_lower_than(u.clone())),
        (Bound::Excluded(l), Bound::Included(u)) => Range::strictly_higher_than(l.clone())
            .intersection(&Range::strictly_lower_than(bump_patch(u))),
    }
}

fn bump_patch(v: &Version) -> Version {
    Version::new(v.major, v.minor, v.patch + 1)
}

pub fn next_major(v: &Version) -> Version {
    Version::new(v.major + 1, 0, 0)
}

pub fn next_minor(v: &Version) -> Version {
    Version::new(v.major, v.minor + 1, 0)
}

pub fn next_patch(v: &Version) -> Version {
    Version::new(v.major, v.minor, v.patch + 1)
}

fn parse_bare_version(s: &str) -> Result<Version, RangeParseError> {
    Version::parse(s.trim()).map_err(|_| RangeParseError::InvalidVersion(s.trim().to_string()))
}

/// Parse a single `op` + version comparator token, e.g. `>=1.2.0`, `<2.0.0`,
/// `=1.0.0`.
fn parse_comparator(token: &str) -> Result<Interval, RangeParseError> {
    let token = token.trim();
    let (op, rest) = if let Some(r) = token.strip_prefix(">=") {
        (">=", r)
    } else if let Some(r) = token.strip_prefix("<=") {
        ("<=", r)
    } else if let Some(r) = token.strip_prefix('>') {
        (">", r)
    } else if let Some(r) = token.strip_prefix('<') {
        ("<", r)
    } else if let Some(r) = token.strip_prefix('=') {
        ("=", r)
    } else {
        return Err(RangeParseError::UnknownOperator(token.to_string()));
    };

    let version = parse_bare_version(rest)?;
    Ok(match op {
        ">=" => Interval::at_least(version),
        "<=" => Interval::at_most(version),
        ">" => Interval::greater_than(version),
        "<" => Interval::less_than(version),
        "=" => Interval::singleton(version),
        _ => unreachable!(),
    })
}

/// Parse one `(>=A <B)` clause into the intersection of its comparators.
fn parse_clause(clause: &str) -> Result<Interval, RangeParseError> {
    let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
    if clause.is_empty() {
        return Err(RangeParseError::MalformedBracket(clause.to_string()));
    }

    let mut interval = Interval::full();
    for token in clause.split_whitespace() {
        let comparator = parse_comparator(token)?;
        interval = interval
            .intersect(&comparator)
            .ok_or_else(|| RangeParseError::MalformedBracket(clause.to_string()))?;
    }
    Ok(interval)
}

/// Parse a manifest-facing version range expression.
///
/// Accepted forms:
/// - `@1.2.3` or `^1.2.3` — `[1.2.3, 2.0.0)`
/// - `~1.2.3` — `[1.2.3, 1.3.0)`
/// - `=1.2.3` — exactly `1.2.3`
/// - `[(>=1.0.0 <2.0.0) || (>=3.0.0 <4.0.0)]` — a union of clauses
pub fn parse_range(input: &str) -> Result<RangeSet, RangeParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(RangeParseError::Empty);
    }

    if let Some(bracketed) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let mut set = RangeSet::empty();
        for clause in bracketed.split("||") {
            let interval = parse_clause(clause)?;
            set = set.union(&RangeSet::from_interval(interval));
        }
        return Ok(set);
    }

    if let Some(rest) = s.strip_prefix('@').or_else(|| s.strip_prefix('^')) {
        let version = parse_bare_version(rest)?;
        let upper = next_major(&version);
        return Ok(RangeSet::from_interval(Interval::between(version, upper)));
    }

    if let Some(rest) = s.strip_prefix('~') {
        let version = parse_bare_version(rest)?;
        let upper = next_minor(&version);
        return Ok(RangeSet::from_interval(Interval::between(version, upper)));
    }

    if let Some(rest) = s.strip_prefix('=') {
        let version = parse_bare_version(rest)?;
        return Ok(RangeSet::from_interval(Interval::singleton(version)));
    }

    Err(RangeParseError::UnknownOperator(s.to_string()))
}

/// Convert a `RangeSet` into an equivalent `semver::VersionReq` when it's a
/// single interval expressible with comparator syntax, for feeding code
/// paths that only understand `VersionReq`. Falls back to `None` for
/// multi-interval sets, which must go through [`RangeSet::to_pubgrub_range`]
/// directly instead.
pub fn to_version_req(set: &RangeSet) -> Option<VersionReq> {
    if set.intervals.len() != 1 {
        return None;
    }
    let interval = &set.intervals[0];
    let clause = match (&interval.lower, &interval.upper) {
        (Bound::Included(l), Bound::Excluded(u)) => format!(">={}, <{}", l, u),
        (Bound::Included(l), Bound::Included(u)) if l == u => format!("={}", l),
        (Bound::Included(l), Bound::Included(u)) => format!(">={}, <={}", l, u),
        (Bound::Included(l), Bound::Unbounded) => format!(">={}", l),
        (Bound::Unbounded, Bound::Excluded(u)) => format!("<{}", u),
        (Bound::Unbounded, Bound::Included(u)) => format!("<={}", u),
        (Bound::Unbounded, Bound::Unbounded) => "*".to_string(),
        (Bound::Excluded(l), Bound::Excluded(u)) => format!(">{}, <{}", l, u),
        (Bound::Excluded(l), Bound::Included(u)) => format!(">{}, <={}", l, u),
        (Bound::Excluded(l), Bound::Unbounded) => format!(">{}", l),
    };
    VersionReq::parse(&clause).ok()
}

/// Whether `s` uses the custom range syntax this module understands, as
/// opposed to cargo-native `VersionReq` syntax.
pub fn looks_like_range_syntax(s: &str) -> bool {
    let s = s.trim();
    s.starts_with('@') || s.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn caret_range_is_until_next_major() {
        let set = parse_range("^1.2.3").unwrap();
        assert!(set.contains(&v("1.2.3")));
        assert!(set.contains(&v("1.9.9")));
        assert!(!set.contains(&v("2.0.0")));
        assert!(!set.contains(&v("1.2.2")));
    }

    #[test]
    fn at_range_matches_caret() {
        let set = parse_range("@1.2.3").unwrap();
        assert!(set.contains(&v("1.2.3")));
        assert!(!set.contains(&v("2.0.0")));
    }

    #[test]
    fn tilde_range_is_until_next_minor() {
        let set = parse_range("~1.2.3").unwrap();
        assert!(set.contains(&v("1.2.9")));
        assert!(!set.contains(&v("1.3.0")));
    }

    #[test]
    fn exact_range_matches_single_version() {
        let set = parse_range("=1.2.3").unwrap();
        assert!(set.contains(&v("1.2.3")));
        assert!(!set.contains(&v("1.2.4")));
    }

    #[test]
    fn bracketed_union_matches_either_clause() {
        let set = parse_range("[(>=1.0.0 <2.0.0) || (>=3.0.0 <4.0.0)]").unwrap();
        assert!(set.contains(&v("1.5.0")));
        assert!(set.contains(&v("3.0.0")));
        assert!(!set.contains(&v("2.5.0")));
        assert!(!set.contains(&v("4.0.0")));
        assert_eq!(set.intervals().len(), 2);
    }

    #[test]
    fn union_merges_overlapping_intervals() {
        let a = RangeSet::from_interval(Interval::between(v("1.0.0"), v("2.0.0")));
        let b = RangeSet::from_interval(Interval::between(v("1.5.0"), v("3.0.0")));
        let merged = a.union(&b);
        assert_eq!(merged.intervals().len(), 1);
        assert!(merged.contains(&v("2.5.0")));
    }

    #[test]
    fn intersection_of_disjoint_intervals_is_empty() {
        let a = RangeSet::from_interval(Interval::between(v("1.0.0"), v("2.0.0")));
        let b = RangeSet::from_interval(Interval::between(v("3.0.0"), v("4.0.0")));
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn intersection_of_overlapping_intervals() {
        let a = RangeSet::from_interval(Interval::between(v("1.0.0"), v("2.0.0")));
        let b = RangeSet::from_interval(Interval::between(v("1.5.0"), v("3.0.0")));
        let inter = a.intersection(&b);
        assert!(inter.contains(&v("1.7.0")));
        assert!(!inter.contains(&v("1.2.0")));
        assert!(!inter.contains(&v("2.5.0")));
    }

    #[test]
    fn to_version_req_round_trips_single_interval() {
        let set = parse_range("^1.2.3").unwrap();
        let req = to_version_req(&set).unwrap();
        assert!(req.matches(&v("1.5.0")));
        assert!(!req.matches(&v("2.0.0")));
    }

    #[test]
    fn to_version_req_is_none_for_multi_interval_sets() {
        let set = parse_range("[(>=1.0.0 <2.0.0) || (>=3.0.0 <4.0.0)]").unwrap();
        assert!(to_version_req(&set).is_none());
    }

    #[test]
    fn pubgrub_range_matches_interval_semantics() {
        let set = parse_range("[(>=1.0.0 <2.0.0) || (>=3.0.0 <4.0.0)]").unwrap();
        let range = set.to_pubgrub_range();
        assert!(range.contains(&v("1.5.0")));
        assert!(range.contains(&v("3.5.0")));
        assert!(!range.contains(&v("2.5.0")));
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(parse_range("").is_err());
        assert!(parse_range("banana").is_err());
    }

    #[test]
    fn detects_range_syntax_vs_version_req_syntax() {
        assert!(looks_like_range_syntax("@1.2.3"));
        assert!(looks_like_range_syntax("[(>=1.0.0 <2.0.0)]"));
        assert!(!looks_like_range_syntax("^1.2.3"));
        assert!(!looks_like_range_syntax(">=1.0, <2.0"));
    }
}
