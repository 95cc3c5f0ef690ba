//! Low-level helpers for treating raw file contents as whitespace/line
//! delimited ASCII, without going through a full UTF-8 validation pass.
//!
//! Adapted from the line/whitespace scanning style used across rAdvisor's
//! cgroup v1 collectors.

/// Trims leading/trailing ASCII whitespace (space, tab, CR, LF) from a byte
/// slice and returns the remaining sub-slice.
#[must_use]
pub fn trim(buf: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = buf.len();
    while start < end && is_whitespace(buf[start]) {
        start += 1;
    }
    while end > start && is_whitespace(buf[end - 1]) {
        end -= 1;
    }
    &buf[start..end]
}

#[must_use]
pub const fn is_whitespace(c: u8) -> bool { matches!(c, b' ' | b'\t' | b'\n' | b'\r') }

/// Splits a line into whitespace-delimited fields, treating any run of
/// whitespace as a single delimiter (mirrors Go's `strings.Fields`).
#[must_use]
pub fn fields(line: &str) -> Vec<&str> { line.split_whitespace().collect() }

/// Iterates over the non-empty, trimmed lines of a file's contents.
pub fn lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(trim(b"  42\n"), b"42");
        assert_eq!(trim(b"42"), b"42");
        assert_eq!(trim(b"   "), b"");
    }

    #[test]
    fn splits_fields() {
        assert_eq!(fields("8:0 Read 100"), vec!["8:0", "Read", "100"]);
        assert_eq!(fields("  a   b  c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn iterates_nonempty_lines() {
        let out: Vec<&str> = lines("a\n\n b \n").collect();
        assert_eq!(out, vec!["a", "b"]);
    }
}
