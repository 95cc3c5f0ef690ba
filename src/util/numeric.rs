//! Decimal ASCII parsing helpers shared by every cgroup/procfs reader.
//!
//! Every value file in the cgroup/procfs interfaces this crate reads is
//! decimal ASCII with optional surrounding whitespace, so every parser
//! routes through these two functions rather than re-deriving
//! `str::parse` error handling at each call site.

use atoi::atoi;

use crate::util::byte::trim;

/// Parses a single decimal unsigned integer out of a whitespace-padded byte
/// slice. Returns `None` if the trimmed content isn't a valid `u64`.
#[must_use]
pub fn parse_u64(raw: &[u8]) -> Option<u64> { atoi::<u64>(trim(raw)) }

/// Parses a single decimal unsigned integer out of a string, trimming
/// surrounding whitespace first.
#[must_use]
pub fn parse_u64_str(raw: &str) -> Option<u64> { raw.trim().parse::<u64>().ok() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_decimal() {
        assert_eq!(parse_u64(b"  1234\n"), Some(1234));
        assert_eq!(parse_u64(b"not-a-number"), None);
    }

    #[test]
    fn parses_str_decimal() {
        assert_eq!(parse_u64_str(" 42 \n"), Some(42));
        assert_eq!(parse_u64_str("max"), None);
    }
}
