//! Directory subtree sizing (spec.md §4.3, §6): "bytes ÷ 1024 of the
//! directory subtree", delegated to `du -sx` in production.

use std::path::Path;
use std::process::Command;

use crate::errors::{CollectorError, Result};
use crate::util;

/// Abstract interface over directory sizing so tests never shell out.
pub trait Sizer: Send + Sync {
    /// Returns the size of `path`'s subtree in kB.
    fn size_kb(&self, path: &Path) -> Result<u64>;
}

/// Production sizer: `du -sx <dir>`; the first whitespace-separated
/// field of stdout is a decimal kB count (spec.md §6).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellSizer;

impl Sizer for ShellSizer {
    fn size_kb(&self, path: &Path) -> Result<u64> {
        let output = Command::new("du")
            .arg("-sx")
            .arg(path)
            .output()
            .map_err(|e| CollectorError::Other(e.into()))?;
        if !output.status.success() {
            return Err(CollectorError::UsageUnknown(path.to_path_buf()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let field = stdout.split_whitespace().next().ok_or_else(|| CollectorError::UsageUnknown(path.to_path_buf()))?;
        util::parse_u64_str(field).ok_or_else(|| CollectorError::UsageUnknown(path.to_path_buf()))
    }
}

#[cfg(test)]
pub struct FakeSizer {
    pub sizes: std::collections::HashMap<std::path::PathBuf, u64>,
}

#[cfg(test)]
impl Sizer for FakeSizer {
    fn size_kb(&self, path: &Path) -> Result<u64> {
        self.sizes.get(path).copied().ok_or_else(|| CollectorError::UsageUnknown(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_sizer_returns_configured_size() {
        let mut sizes = std::collections::HashMap::new();
        sizes.insert(std::path::PathBuf::from("/a"), 123);
        let sizer = FakeSizer { sizes };
        assert_eq!(sizer.size_kb(Path::new("/a")).unwrap(), 123);
        assert!(sizer.size_kb(Path::new("/b")).is_err());
    }
}
