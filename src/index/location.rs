//! Location canonicalization and prefix decomposition.
//!
//! A canonical location starts with exactly one `/`, has no trailing `/` and
//! no empty segments (`/ru/svrd`). The root `/` is the canonical form of a
//! location without segments; it never appears among the prefixes.

use memchr::Memchr;
use std::borrow::Cow;

/// Canonical form of a location with no segments
pub const ROOT: &str = "/";

/// Bring a raw location string into canonical form
///
/// Surrounding whitespace is trimmed, a leading `/` is added when missing,
/// trailing and repeated `/` are dropped. Already canonical input is
/// returned borrowed.
pub fn normalize_location(raw: &str) -> Cow<'_, str> {
    // Trailing whitespace and slashes go together so `a /` ends up as `/a`
    let trimmed = raw
        .trim_start()
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace());
    if is_canonical(trimmed) {
        return Cow::Borrowed(trimmed);
    }

    let mut canonical = String::with_capacity(trimmed.len() + 1);
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        canonical.push('/');
        canonical.push_str(segment);
    }

    if canonical.is_empty() {
        Cow::Borrowed(ROOT)
    } else {
        Cow::Owned(canonical)
    }
}

/// Check whether `location` is already in canonical form
pub fn is_canonical(location: &str) -> bool {
    if location == ROOT {
        return true;
    }

    let bytes = location.as_bytes();
    bytes.first() == Some(&b'/')
        && bytes.last() != Some(&b'/')
        && location.trim().len() == location.len()
        && memchr::memmem::find(bytes, b"//").is_none()
}

/// Ancestor paths of a canonical location, shortest first, ending with the
/// location itself
///
/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`. The root yields nothing.
pub fn prefixes(canonical: &str) -> Prefixes<'_> {
    debug_assert!(is_canonical(canonical), "not canonical: {canonical:?}");
    Prefixes {
        location: canonical,
        boundaries: memchr::memchr_iter(b'/', canonical.as_bytes()),
        finished: false,
    }
}

/// Iterator returned by [`prefixes`]; every item borrows from the input
pub struct Prefixes<'a> {
    location: &'a str,
    boundaries: Memchr<'a>,
    finished: bool,
}

impl<'a> Iterator for Prefixes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.finished {
            return None;
        }

        // Every `/` after the leading one closes a prefix
        for pos in self.boundaries.by_ref() {
            if pos > 0 {
                return Some(&self.location[..pos]);
            }
        }

        self.finished = true;
        (self.location.len() > ROOT.len()).then_some(self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_location("ru"), "/ru");
        assert_eq!(normalize_location("/ru"), "/ru");
        assert_eq!(normalize_location("/ru/"), "/ru");
        assert_eq!(normalize_location("  /ru/svrd///  "), "/ru/svrd");
        assert_eq!(normalize_location("ru//svrd"), "/ru/svrd");
        assert_eq!(normalize_location("ru / "), "/ru");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["ru", "/ru/", " ru /svrd/ ", "/ a/b", "///x//y"] {
            let once = normalize_location(raw);
            assert!(is_canonical(&once), "{raw:?} -> {once:?}");
            assert_eq!(normalize_location(&once), once);
        }
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_location(""), ROOT);
        assert_eq!(normalize_location("   "), ROOT);
        assert_eq!(normalize_location("///"), ROOT);
    }

    #[test]
    fn test_canonical_input_is_borrowed() {
        assert!(matches!(normalize_location("/ru/msk"), Cow::Borrowed(_)));
        assert!(matches!(normalize_location(" /ru/msk "), Cow::Borrowed(_)));
        assert!(matches!(normalize_location("ru/msk"), Cow::Owned(_)));
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("/"));
        assert!(is_canonical("/ru/svrd"));
        assert!(!is_canonical(""));
        assert!(!is_canonical("ru"));
        assert!(!is_canonical("/ru/"));
        assert!(!is_canonical("/ru//svrd"));
        assert!(!is_canonical("/ru "));
    }

    #[test]
    fn test_prefixes() {
        let all: Vec<_> = prefixes("/ru/svrd/revda").collect();
        assert_eq!(all, vec!["/ru", "/ru/svrd", "/ru/svrd/revda"]);

        assert_eq!(prefixes("/ru").collect::<Vec<_>>(), vec!["/ru"]);
        assert_eq!(prefixes(ROOT).count(), 0);
    }

    #[test]
    fn test_prefixes_multibyte_segments() {
        let all: Vec<_> = prefixes("/россия/екб").collect();
        assert_eq!(all, vec!["/россия", "/россия/екб"]);
    }
}
