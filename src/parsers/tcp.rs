//! TCP/TCP6 connection state tally (spec.md §4.2.11). One parser struct
//! parameterized by file suffix, matching the design note that `tcp`
//! and `tcp6` differ only in which `net/tcp*` file they read.

use crate::errors::{CollectorError, Result};
use crate::model::{Statistics, TcpStat};

use super::{cgroup_file, Options, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpVariant {
    V4,
    V6,
}

impl TcpVariant {
    fn file_name(self) -> &'static str {
        match self {
            Self::V4 => "tcp",
            Self::V6 => "tcp6",
        }
    }
}

pub struct TcpParser {
    variant: TcpVariant,
}

impl TcpParser {
    #[must_use]
    pub fn new(variant: TcpVariant) -> Self { Self { variant } }
}

impl Parser for TcpParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        // Not collected for root (spec.md §4.2.11).
        if opts.is_host {
            return Ok(());
        }

        let path = opts.procfs()?.join(opts.pid()?.to_string()).join("net").join(self.variant.file_name());
        let content = cgroup_file::read_string(&path)?;

        let mut tally = TcpStat::default();
        for line in content.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let state = match fields.get(3) {
                Some(state) => state,
                None => continue,
            };
            if !tally.increment(state) {
                return Err(CollectorError::BadTcpState((*state).to_owned()));
            }
        }

        match self.variant {
            TcpVariant::V4 => stats.connection.tcp = tally,
            TcpVariant::V6 => stats.connection.tcp6 = tally,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_known_states() {
        let dir = tempfile::tempdir().unwrap();
        let net_dir = dir.path().join("123/net");
        std::fs::create_dir_all(&net_dir).unwrap();
        std::fs::write(
            net_dir.join("tcp"),
            "  sl  local_address rem_address   st\n\
             0: 0100007F:0050 00000000:0000 0A\n\
             1: 0100007F:0050 00000000:0000 01\n",
        )
        .unwrap();

        let mut stats = Statistics::default();
        let opts = Options { procfs: Some(dir.path().to_path_buf()), pid: Some(123), ..Default::default() };
        TcpParser::new(TcpVariant::V4).update(&mut stats, &opts).unwrap();

        assert_eq!(stats.connection.tcp.listen, 1);
        assert_eq!(stats.connection.tcp.established, 1);
    }

    #[test]
    fn unknown_state_fails() {
        let dir = tempfile::tempdir().unwrap();
        let net_dir = dir.path().join("123/net");
        std::fs::create_dir_all(&net_dir).unwrap();
        std::fs::write(net_dir.join("tcp"), "header\n0: 0100007F:0050 00000000:0000 FF\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { procfs: Some(dir.path().to_path_buf()), pid: Some(123), ..Default::default() };
        let err = TcpParser::new(TcpVariant::V4).update(&mut stats, &opts).unwrap_err();
        assert!(matches!(err, CollectorError::BadTcpState(_)));
    }

    #[test]
    fn root_is_skipped() {
        let mut stats = Statistics::default();
        let opts = Options { is_host: true, ..Default::default() };
        TcpParser::new(TcpVariant::V4).update(&mut stats, &opts).unwrap();
        assert_eq!(stats.connection.tcp, TcpStat::default());
    }
}
