//! Natural ("human") ordering for entry and file names.
//!
//! Digit runs compare by numeric value, so `page2` sorts before `page10`.
//! Runs are compared as strings with leading zeros stripped, which keeps
//! arbitrarily long numbers exact. Everything else compares case-insensitively.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ra = take_digits(&mut ai);
                let rb = take_digits(&mut bi);
                let ord = cmp_digit_runs(&ra, &rb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                // Case differences are settled by the final tie-break only.
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }

    // Equal under natural rules ("a01" vs "a1", "A" vs "a"); keep the order total.
    a.cmp(b)
}

/// Sort names in place using [`natural_cmp`].
pub fn sort_natural<T: AsRef<str>>(names: &mut [T]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

fn take_digits(it: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = it.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        it.next();
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(natural_cmp("page9", "page10"), Ordering::Less);
        assert_eq!(natural_cmp("page10", "page9"), Ordering::Greater);
        assert_eq!(natural_cmp("page2.jpg", "page10.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("page1.jpg", "page1.jpg"), Ordering::Equal);
    }

    #[test]
    fn letters_ignore_case() {
        assert_eq!(natural_cmp("Apple.png", "banana.png"), Ordering::Less);
        assert_eq!(natural_cmp("chapter2/b", "Chapter10/a"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_do_not_change_magnitude() {
        assert_eq!(natural_cmp("p007", "p10"), Ordering::Less);
        assert_ne!(natural_cmp("p01", "p1"), Ordering::Equal);
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        let a = "vol99999999999999999999999999";
        let b = "vol100000000000000000000000000";
        assert_eq!(natural_cmp(a, b), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("page", "page1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn sorts_mixed_list() {
        let mut names = vec![
            "page10.jpg",
            "page2.jpg",
            "Page1.jpg",
            "page9.jpg",
            "cover.png",
            "page100.jpg",
        ];
        sort_natural(&mut names);
        assert_eq!(
            names,
            vec![
                "cover.png",
                "Page1.jpg",
                "page2.jpg",
                "page9.jpg",
                "page10.jpg",
                "page100.jpg"
            ]
        );
    }
}
