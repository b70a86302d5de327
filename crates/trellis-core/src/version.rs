//! Module version strings and their ordering.
//!
//! Versions are compared token by token, where a token is a run of digits or
//! a run of non-digits. `.` and `-` only separate tokens:
//! - Numeric tokens compare as integers; a missing numeric token counts as `0`
//! - A present qualifier token ranks below a missing one, so `1.0.0` is
//!   newer than both `1.0.0.RC1` and `1.0.0-RC1`
//! - Known qualifiers order as `SNAPSHOT` < `M` < `RC` < `RELEASE`; other
//!   qualifiers compare lexically

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use trellis_util::errors::TrellisError;

/// A module version, kept verbatim.
///
/// Equality and hashing use the exact string so that a version always maps
/// back to the same artifact path. Use [`Version::compare`] for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Digits with leading zeros stripped.
    Numeric(String),
    Qualifier(String),
}

impl Version {
    /// Sentinel for "no version declared".
    pub const UNSPECIFIED: Version = Version {
        value: String::new(),
    };

    /// Create a version. `?` and blank strings both mean unspecified.
    ///
    /// The value is not checked. Parse it with `str::parse` to reject text
    /// holding `:` or whitespace, which would not survive a round trip
    /// through a coordinate.
    pub fn of(value: &str) -> Self {
        let value = value.trim();
        if value == "?" {
            return Self::UNSPECIFIED;
        }
        Self {
            value: value.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_unspecified(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_snapshot(&self) -> bool {
        self.value.to_uppercase().ends_with("SNAPSHOT")
    }

    /// `true` iff every dot-separated segment is made of digits only.
    pub fn is_digits_only(&self) -> bool {
        !self.value.is_empty()
            && self
                .value
                .split('.')
                .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
    }

    /// `+` (any version) or a prefix pattern such as `1.2.+`.
    pub fn is_dynamic(&self) -> bool {
        self.value.ends_with('+')
    }

    /// Whether `candidate` satisfies this dynamic version.
    pub fn matches_dynamic(&self, candidate: &Version) -> bool {
        match self.value.strip_suffix('+') {
            Some(prefix) => candidate.value.starts_with(prefix) && !candidate.is_dynamic(),
            None => self == candidate,
        }
    }

    pub fn is_greater_than(&self, other: &Version) -> bool {
        self.compare(other) == Ordering::Greater
    }

    /// Order two versions with the build-tool comparator described in the module docs.
    pub fn compare(&self, other: &Version) -> Ordering {
        let left = tokenize(&self.value);
        let right = tokenize(&other.value);
        let max_len = left.len().max(right.len());
        for i in 0..max_len {
            let ord = compare_tokens(left.get(i), right.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Version {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') || s.trim().chars().any(char::is_whitespace) {
            return Err(TrellisError::parse(format!("'{s}' is not a valid version")));
        }
        Ok(Self::of(s))
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::of(value)
    }
}

fn compare_tokens(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(t), None) => compare_to_missing(t),
        (None, Some(t)) => compare_to_missing(t).reverse(),
        (Some(Token::Numeric(a)), Some(Token::Numeric(b))) => compare_numeric(a, b),
        (Some(Token::Numeric(_)), Some(Token::Qualifier(_))) => Ordering::Greater,
        (Some(Token::Qualifier(_)), Some(Token::Numeric(_))) => Ordering::Less,
        (Some(Token::Qualifier(a)), Some(Token::Qualifier(b))) => compare_qualifiers(a, b),
    }
}

fn compare_to_missing(token: &Token) -> Ordering {
    match token {
        Token::Numeric(n) if n.is_empty() => Ordering::Equal,
        Token::Numeric(_) => Ordering::Greater,
        Token::Qualifier(_) => Ordering::Less,
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    match (qualifier_rank(a), qualifier_rank(b)) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        _ => a.cmp(b),
    }
}

fn qualifier_rank(word: &str) -> Option<u8> {
    match word.to_uppercase().as_str() {
        "SNAPSHOT" => Some(0),
        "M" | "MILESTONE" => Some(1),
        "RC" | "CR" => Some(2),
        "RELEASE" | "FINAL" | "GA" => Some(3),
        _ => None,
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut numeric = false;

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            flush(&mut tokens, &mut current, numeric);
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != numeric {
            flush(&mut tokens, &mut current, numeric);
        }
        numeric = is_digit;
        current.push(ch);
    }
    flush(&mut tokens, &mut current, numeric);
    tokens
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, numeric: bool) {
    if current.is_empty() {
        return;
    }
    let token = if numeric {
        Token::Numeric(current.trim_start_matches('0').to_string())
    } else {
        Token::Qualifier(current.clone())
    };
    tokens.push(token);
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        Version::of(a).compare(&Version::of(b))
    }

    #[test]
    fn basic_ordering() {
        assert_eq!(cmp("1", "2"), Ordering::Less);
        assert_eq!(cmp("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(cmp("0.8.9.RELEASE", "0.8.14.RELEASE"), Ordering::Less);
    }

    #[test]
    fn qualifier_ranks() {
        assert_eq!(cmp("1.0.1.RELEASE", "1.0.1.RC1"), Ordering::Greater);
        assert_eq!(cmp("0.8.9.M9", "0.8.9.M11"), Ordering::Less);
        assert_eq!(cmp("2.0.M3", "2.0.RC1"), Ordering::Less);
        assert_eq!(cmp("2.0-SNAPSHOT", "2.0.M1"), Ordering::Less);
    }

    #[test]
    fn missing_qualifier_outranks_present_one() {
        assert_eq!(cmp("1.0.0", "1.0.0.RC1"), Ordering::Greater);
        assert_eq!(cmp("1.0.0", "1.0.0-RC1"), Ordering::Greater);
        assert_eq!(cmp("1.0-SNAPSHOT", "1.0"), Ordering::Less);
    }

    #[test]
    fn missing_numeric_counts_as_zero() {
        assert_eq!(cmp("1.0.0", "1.0.0.1"), Ordering::Less);
        assert_eq!(cmp("1.0.0", "1.0.0.0"), Ordering::Equal);
        assert_eq!(cmp("1.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn unknown_qualifiers_compare_lexically() {
        assert_eq!(cmp("31.0-android", "31.0-jre"), Ordering::Less);
        assert_eq!(cmp("31.0-jre", "32.0-jre"), Ordering::Less);
    }

    #[test]
    fn large_numbers_do_not_overflow() {
        assert_eq!(
            cmp("1.99999999999999999999999", "1.100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(cmp("1.007", "1.7"), Ordering::Equal);
    }

    #[test]
    fn digits_only() {
        assert!(Version::of("1.0.12").is_digits_only());
        assert!(!Version::of("1.0-RC1").is_digits_only());
        assert!(!Version::of("1..0").is_digits_only());
        assert!(!Version::UNSPECIFIED.is_digits_only());
    }

    #[test]
    fn snapshot_detection() {
        assert!(Version::of("1.0-SNAPSHOT").is_snapshot());
        assert!(!Version::of("1.0").is_snapshot());
    }

    #[test]
    fn unspecified_forms() {
        assert!(Version::of("").is_unspecified());
        assert!(Version::of("?").is_unspecified());
        assert_eq!(Version::of("?"), Version::UNSPECIFIED);
    }

    #[test]
    fn dynamic_versions() {
        let any = Version::of("+");
        let minor = Version::of("1.2.+");
        assert!(any.is_dynamic());
        assert!(any.matches_dynamic(&Version::of("9.9")));
        assert!(minor.matches_dynamic(&Version::of("1.2.7")));
        assert!(!minor.matches_dynamic(&Version::of("1.3.0")));
        assert!(!Version::of("1.2").is_dynamic());
    }

    #[test]
    fn display() {
        assert_eq!(Version::of("1.8.0").to_string(), "1.8.0");
    }
}
