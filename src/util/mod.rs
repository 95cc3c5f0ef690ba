//! Small, reusable building blocks used by the parsers and the resolver:
//! byte-level line/field scanning, decimal parsing, and timestamping.
#![allow(clippy::module_name_repetitions)]

pub mod byte;
pub mod numeric;
pub mod system;

pub use byte::*;
pub use numeric::*;
pub use system::*;

/// Formats a hugepage byte quantity as a human label using the same
/// progression the kernel names its `hugepages-<n>kB` directories with,
/// base-1024: `B`, `kB`, `MB`, `GB`, `TB`, `PB`.
#[must_use]
pub fn humanize_hugepage_bytes(bytes: u64) -> String {
    use byte_unit::Byte;

    // byte-unit's binary-unit label already matches the B/kB/MB/.../PB
    // progression the kernel's directory names use, so delegate to it
    // rather than hand-rolling the scaling loop.
    let byte = Byte::from_bytes(u128::from(bytes));
    let adjusted = byte.get_appropriate_unit(true);
    let (value, unit) = (adjusted.get_value(), adjusted.get_unit());
    let unit_label = match unit {
        byte_unit::ByteUnit::B => "B",
        byte_unit::ByteUnit::KB => "kB",
        byte_unit::ByteUnit::MB => "MB",
        byte_unit::ByteUnit::GB => "GB",
        byte_unit::ByteUnit::TB => "TB",
        byte_unit::ByteUnit::PB => "PB",
        _ => "B",
    };
    if value.fract() == 0.0 {
        format!("{}{}", value as u64, unit_label)
    } else {
        format!("{:.0}{}", value, unit_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanizes_hugepage_sizes() {
        assert_eq!(humanize_hugepage_bytes(2 * 1024 * 1024), "2MB");
        assert_eq!(humanize_hugepage_bytes(1024 * 1024 * 1024), "1GB");
        assert_eq!(humanize_hugepage_bytes(64 * 1024), "64kB");
    }
}
