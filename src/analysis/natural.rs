//! Natural ("human") string ordering.
//!
//! Strings are split into alternating runs of digits and non-digits.
//! Digit runs are compared by numeric value, everything else byte-wise,
//! so `file2` sorts before `file10`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How series keys and runs are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Compare embedded numbers by value (default).
    #[default]
    Natural,
    /// Plain lexicographic comparison.
    Simple,
}

impl SortMode {
    /// Compare two strings according to this mode.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            SortMode::Natural => natural_cmp(a, b),
            SortMode::Simple => a.cmp(b),
        }
    }

    /// Stable sort of `items` by a string key.
    pub fn sort_by_key<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> String,
    {
        items.sort_by(|a, b| self.compare(&key(a), &key(b)));
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Text(&'a str),
}

impl Token<'_> {
    fn as_str(&self) -> &str {
        match self {
            Token::Number(s) | Token::Text(s) => s,
        }
    }
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                tokens.push(make_token(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(digit) = in_digits {
        tokens.push(make_token(&s[start..], digit));
    }

    tokens
}

fn make_token(s: &str, digit: bool) -> Token<'_> {
    if digit {
        Token::Number(s)
    } else {
        Token::Text(s)
    }
}

/// Compare two digit runs by value without parsing, so any length works.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Token-wise natural comparison.
///
/// Number tokens compare by value, any other pair of tokens compares
/// lexicographically. When one token sequence is a prefix of the other the
/// shorter one sorts first. Strings that only differ in leading zeros fall
/// back to plain comparison so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);

    for (x, y) in ta.iter().zip(tb.iter()) {
        let ord = match (x, y) {
            (Token::Number(x), Token::Number(y)) => cmp_digits(x, y),
            _ => x.as_str().cmp(y.as_str()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    ta.len().cmp(&tb.len()).then_with(|| a.cmp(b))
}
