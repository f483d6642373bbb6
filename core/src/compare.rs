//! Answer equivalence and the zipping helpers used to build diffs.

use std::borrow::Cow;

use lazy_regex::regex_replace_all;

/// Removes whitespace (other than `\n`) right before every line break and at the end of input,
/// then one final line break.
pub fn strip_trailing_whitespace(text: &str) -> Cow<'_, str> {
    let stripped = regex_replace_all!(r"[^\S\n]+(\n|$)", text, |_, eol: &str| eol.to_owned());
    match stripped {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_suffix('\n').unwrap_or(s)),
        Cow::Owned(mut s) => {
            if s.ends_with('\n') {
                s.pop();
            }
            Cow::Owned(s)
        }
    }
}

/// The equivalence every judge uses unless told otherwise.
///
/// Trailing spaces on a line and a single final newline do not matter; blank lines, internal
/// whitespace and case do.
pub fn eq_ignore_trailing_whitespace(a: &str, b: &str) -> bool {
    strip_trailing_whitespace(a) == strip_trailing_whitespace(b)
}

/// Pairs two sequences, stopping at the shorter one.
pub fn zip<A, B>(a: A, b: B) -> impl Iterator<Item = (A::Item, B::Item)>
where
    A: IntoIterator,
    B: IntoIterator,
{
    a.into_iter().zip(b)
}

/// Pairs two sequences until both are exhausted. A side that ran out yields `None`.
pub fn zip_longest<A, B>(a: A, b: B) -> ZipLongest<A::IntoIter, B::IntoIter>
where
    A: IntoIterator,
    B: IntoIterator,
{
    ZipLongest {
        a: a.into_iter(),
        b: b.into_iter(),
    }
}

#[derive(Debug, Clone)]
pub struct ZipLongest<A, B> {
    a: A,
    b: B,
}

impl<A, B> Iterator for ZipLongest<A, B>
where
    A: Iterator,
    B: Iterator,
{
    type Item = (Option<A::Item>, Option<B::Item>);

    fn next(&mut self) -> Option<Self::Item> {
        match (self.a.next(), self.b.next()) {
            (None, None) => None,
            pair => Some(pair),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (a_lo, a_hi) = self.a.size_hint();
        let (b_lo, b_hi) = self.b.size_hint();
        let hi = match (a_hi, b_hi) {
            (Some(x), Some(y)) => Some(x.max(y)),
            _ => None,
        };
        (a_lo.max(b_lo), hi)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailing_whitespace_per_line_is_ignored() {
        assert!(eq_ignore_trailing_whitespace("x \n", "x\n"));
        assert!(eq_ignore_trailing_whitespace("a\t\nb  ", "a\nb"));
        assert!(eq_ignore_trailing_whitespace("a\r\nb\r\n", "a\nb\n"));
    }

    #[test]
    fn final_newline_is_ignored() {
        assert!(eq_ignore_trailing_whitespace("x\n", "x"));
        assert!(eq_ignore_trailing_whitespace("x  \n", "x"));
    }

    #[test]
    fn line_count_matters() {
        assert!(!eq_ignore_trailing_whitespace("x\n\n", "x\n"));
        assert!(!eq_ignore_trailing_whitespace("a\n\nb", "a\nb"));
        assert!(!eq_ignore_trailing_whitespace("\nx", "x"));
    }

    #[test]
    fn everything_else_matters() {
        assert!(!eq_ignore_trailing_whitespace("a b", "a  b"));
        assert!(!eq_ignore_trailing_whitespace(" x", "x"));
        assert!(!eq_ignore_trailing_whitespace("X", "x"));
    }

    #[test]
    fn reflexive_and_symmetric() {
        let samples = ["", "\n", "x", "x \n", "x\n\n", " a\tb \n c", "\r\n"];
        for a in samples {
            assert!(eq_ignore_trailing_whitespace(a, a), "{:?}", a);
            for b in samples {
                assert_eq!(
                    eq_ignore_trailing_whitespace(a, b),
                    eq_ignore_trailing_whitespace(b, a),
                    "{:?} vs {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn strip_keeps_borrowed_when_untouched() {
        assert!(matches!(strip_trailing_whitespace("abc"), Cow::Borrowed("abc")));
        assert_eq!(strip_trailing_whitespace("abc\n"), "abc");
        assert_eq!(strip_trailing_whitespace("a \nb \n"), "a\nb");
    }

    #[test]
    fn zip_stops_at_shortest() {
        let v: Vec<_> = zip([1, 2, 3], [1, 2]).collect();
        assert_eq!(v, [(1, 1), (2, 2)]);
    }

    #[test]
    fn zip_longest_marks_missing() {
        let v: Vec<_> = zip_longest([1, 2, 3], [1, 2]).collect();
        assert_eq!(v, [(Some(1), Some(1)), (Some(2), Some(2)), (Some(3), None)]);

        let v: Vec<_> = zip_longest(Vec::<i32>::new(), ["a"]).collect();
        assert_eq!(v, [(None, Some("a"))]);

        assert_eq!(zip_longest(Vec::<i32>::new(), Vec::<i32>::new()).count(), 0);
    }
}
