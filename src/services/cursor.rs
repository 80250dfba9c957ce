//! Continuation tokens handed out with each page.
//!
//! The indexed walk encodes the recency position of the last entry it
//! returned (`p.<micros>.<seq>`); the filtered scan encodes a plain offset
//! into the filtered list. Anything that does not parse, or points past the
//! end of the list, restarts from the beginning instead of failing the page.

use crate::models::Position;

const POSITION_PREFIX: &str = "p.";

pub fn encode_position(position: Position) -> String {
    format!(
        "{}{}.{}",
        POSITION_PREFIX, position.added_at_micros, position.seq
    )
}

pub fn decode_position(token: Option<&str>) -> Option<Position> {
    let token = token?.trim();
    if token.is_empty() {
        return None;
    }

    let parsed = token
        .strip_prefix(POSITION_PREFIX)
        .and_then(|rest| rest.split_once('.'))
        .and_then(|(micros, seq)| {
            Some(Position {
                added_at_micros: micros.parse().ok()?,
                seq: seq.parse().ok()?,
            })
        });

    if parsed.is_none() {
        tracing::debug!(cursor = %token, "Ignoring malformed position cursor");
    }
    parsed
}

pub fn encode_offset(offset: usize) -> String {
    offset.to_string()
}

/// Offset into a filtered list of `len` entries
pub fn decode_offset(token: Option<&str>, len: usize) -> usize {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0;
    };

    match token.parse::<usize>() {
        Ok(offset) if offset < len => offset,
        Ok(offset) => {
            tracing::debug!(offset, len, "Offset cursor past end of list, restarting");
            0
        }
        Err(_) => {
            tracing::debug!(cursor = %token, "Ignoring malformed offset cursor");
            0
        }
    }
}

/// Moves an offset cursor by `delta` entries, flooring at zero
///
/// Returns `None` for anything that is not an offset; position tokens stay
/// valid when entries before them disappear.
pub fn shift_offset(token: &str, delta: isize) -> Option<String> {
    let offset = token.trim().parse::<usize>().ok()?;
    Some(encode_offset(offset.saturating_add_signed(delta)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_token_parses_back() {
        let position = Position {
            added_at_micros: 1_700_000_000_123_456,
            seq: 42,
        };
        let token = encode_position(position);
        assert_eq!(token, "p.1700000000123456.42");
        assert_eq!(decode_position(Some(&token)), Some(position));
    }

    #[test]
    fn test_malformed_position_is_start() {
        assert_eq!(decode_position(None), None);
        assert_eq!(decode_position(Some("")), None);
        assert_eq!(decode_position(Some("20")), None);
        assert_eq!(decode_position(Some("p.abc.1")), None);
        assert_eq!(decode_position(Some("p.123")), None);
    }

    #[test]
    fn test_offset_in_range() {
        assert_eq!(decode_offset(Some("20"), 25), 20);
        assert_eq!(encode_offset(20), "20");
    }

    #[test]
    fn test_offset_out_of_range_or_malformed_is_start() {
        assert_eq!(decode_offset(Some("25"), 25), 0);
        assert_eq!(decode_offset(Some("999"), 3), 0);
        assert_eq!(decode_offset(Some("-1"), 25), 0);
        assert_eq!(decode_offset(Some("p.1.2"), 25), 0);
        assert_eq!(decode_offset(None, 25), 0);
    }

    #[test]
    fn test_shift_offset() {
        assert_eq!(shift_offset("2", -1).as_deref(), Some("1"));
        assert_eq!(shift_offset("0", -1).as_deref(), Some("0"));
        assert_eq!(shift_offset("p.1700000000123456.42", -1), None);
    }
}
