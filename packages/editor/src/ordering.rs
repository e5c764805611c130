//! # Fractional Indexing
//!
//! Siblings are ordered by a dense string key (`fractionalIndex`), so an
//! element can be inserted between two others without renumbering.
//! Keys are base-62 digit strings compared lexicographically; a valid key is
//! non-empty and never ends in `0`.

use std::cmp::Ordering;
use thiserror::Error;

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    #[error("invalid fractional index '{0}'")]
    InvalidKey(String),

    #[error("fractional index '{before}' is not before '{after}'")]
    OutOfOrder { before: String, after: String },
}

/// Sibling order: keyed documents ascending, keyless ones after all keyed ones.
///
/// Keyless documents compare equal to each other, so a stable sort keeps
/// their original order.
pub fn compare_fractional_index(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Generate a key strictly between `before` and `after`; `None` leaves that side open.
pub fn key_between(before: Option<&str>, after: Option<&str>) -> Result<String, OrderingError> {
    if let Some(key) = before {
        validate_key(key)?;
    }
    if let Some(key) = after {
        validate_key(key)?;
    }
    if let (Some(before), Some(after)) = (before, after) {
        if before >= after {
            return Err(OrderingError::OutOfOrder {
                before: before.to_string(),
                after: after.to_string(),
            });
        }
    }

    let key = midpoint(before.unwrap_or("").as_bytes(), after.map(str::as_bytes));
    Ok(String::from_utf8_lossy(&key).into_owned())
}

/// `count` keys spread between `before` and `after`, ascending
pub fn keys_between(
    before: Option<&str>,
    after: Option<&str>,
    count: usize,
) -> Result<Vec<String>, OrderingError> {
    let mut keys = Vec::with_capacity(count);
    let mut previous = before.map(str::to_string);
    for _ in 0..count {
        let key = key_between(previous.as_deref(), after)?;
        previous = Some(key.clone());
        keys.push(key);
    }
    Ok(keys)
}

fn validate_key(key: &str) -> Result<(), OrderingError> {
    let valid = !key.is_empty()
        && key.bytes().all(|b| DIGITS.contains(&b))
        && !key.ends_with('0');
    if valid {
        Ok(())
    } else {
        Err(OrderingError::InvalidKey(key.to_string()))
    }
}

fn digit_value(b: u8) -> usize {
    match b {
        b'0'..=b'9' => (b - b'0') as usize,
        b'A'..=b'Z' => (b - b'A') as usize + 10,
        b'a'..=b'z' => (b - b'a') as usize + 36,
        _ => 0,
    }
}

// `a` < `b`; a missing digit of `a` reads as '0', a missing `b` as one past the last digit
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(b'0') == b[n] {
            n += 1;
        }
        if n > 0 {
            let mut key = b[..n].to_vec();
            key.extend(midpoint(a.get(n..).unwrap_or(&[]), Some(&b[n..])));
            return key;
        }
    }

    let digit_a = a.first().map_or(0, |d| digit_value(*d));
    let digit_b = b
        .and_then(|b| b.first())
        .map_or(DIGITS.len(), |d| digit_value(*d));

    if digit_b.saturating_sub(digit_a) > 1 {
        return vec![DIGITS[(digit_a + digit_b + 1) / 2]];
    }

    match b {
        Some(b) if b.len() > 1 => vec![b[0]],
        _ => {
            let mut key = vec![DIGITS[digit_a]];
            key.extend(midpoint(a.get(1..).unwrap_or(&[]), None));
            key
        }
    }
}
