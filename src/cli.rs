//! Auto-parsed CLI options, in the same resolve-defaults-after-parse
//! style as rAdvisor's own `cli.rs`.

use clap::Clap;

use crate::config::{Config, DEFAULT_ENDPOINT, DEFAULT_PROCFS};
use crate::shell::Verbosity;

/// Auto-parsed CLI options for the collector service.
#[derive(Clap)]
#[clap(
    version = "0.1.0",
    author = "rAdvisor-style container telemetry contributors",
    about = "Serves addressable cgroup/procfs container metrics on demand"
)]
struct Opts {
    /// Docker daemon endpoint to connect to
    #[clap(short = "e", long = "endpoint", help = "docker daemon endpoint, e.g. unix:///var/run/docker.sock")]
    endpoint: Option<String>,

    /// Root of the procfs mount to read from
    #[clap(short = "p", long = "procfs", help = "root of the procfs mount to read from")]
    procfs: Option<String>,

    /// Suppress all but error output
    #[clap(short = "q", long = "quiet", help = "suppress all but error output")]
    quiet: bool,

    /// Emit info-level diagnostics in addition to status/warning/error
    #[clap(short = "v", long = "verbose", help = "emit info-level diagnostics", conflicts_with = "quiet")]
    verbose: bool,

    /// Newline-delimited metric names to resolve, read from stdin if
    /// omitted
    #[clap(help = "metric names to resolve; reads newline-delimited names from stdin if omitted")]
    names: Vec<String>,

    /// Print every addressable metric name template and exit
    #[clap(long = "list", help = "print every addressable metric name template and exit")]
    list: bool,
}

/// Resolved version of [`Opts`], with defaults folded in.
pub struct ResolvedOpts {
    pub config: Config,
    pub verbosity: Verbosity,
    pub names: Vec<String>,
    pub list: bool,
}

/// Parses and resolves defaults for all CLI arguments, handling
/// help/version text automatically.
#[must_use]
pub fn load() -> ResolvedOpts {
    let opts: Opts = Opts::parse();

    let config = Config::new(
        opts.endpoint.or_else(|| Some(DEFAULT_ENDPOINT.to_owned())),
        opts.procfs.or_else(|| Some(DEFAULT_PROCFS.to_owned())),
    );
    let verbosity = match (opts.quiet, opts.verbose) {
        (true, _) => Verbosity::Quiet,
        (false, true) => Verbosity::Verbose,
        (false, false) => Verbosity::Normal,
    };

    ResolvedOpts { config, verbosity, names: opts.names, list: opts.list }
}
