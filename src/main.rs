mod cli;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use docker_metrics_collector::fs::{ShellDmSetup, ShellSizer, ShellZfs};
use docker_metrics_collector::fsusage::{CancellationToken, FilesystemUsage};
use docker_metrics_collector::shell::Shell;
use docker_metrics_collector::Orchestrator;

/// Parses CLI args and serves metric requests against the live daemon.
fn main() {
    human_panic::setup_panic!(human_panic::Metadata {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        authors: env!("CARGO_PKG_AUTHORS").into(),
        homepage: "https://github.com/elba-kubernetes/radvisor/issues/new".into(),
    });

    let opts = cli::load();
    let shell = Arc::new(Shell::new(opts.verbosity));

    if !cfg!(target_os = "linux") {
        shell.error(
            "this collector only runs on Linux due to its reliance on cgroups and procfs",
        );
        std::process::exit(1);
    }

    let usage = FilesystemUsage::new();
    let token = CancellationToken::new();
    {
        let token = Arc::clone(&token);
        ctrlc::set_handler(move || token.cancel()).expect("error setting Ctrl-C handler");
    }
    usage.spawn_workers(
        Arc::new(ShellSizer),
        vec![PathBuf::from(&opts.config.procfs).join("self/mounts")],
        vec![PathBuf::from("/var/lib/docker/containers")],
        Arc::clone(&shell),
        Arc::clone(&token),
    );

    let mut orchestrator = Orchestrator::new(
        opts.config,
        Arc::clone(&shell),
        usage,
        Arc::new(ShellSizer),
        Arc::new(ShellDmSetup),
        Arc::new(ShellZfs),
    );

    if opts.list {
        for name in orchestrator.list_metric_names() {
            println!("{}", name);
        }
        return;
    }

    let names = if opts.names.is_empty() { read_names_from_stdin() } else { opts.names };

    match orchestrator.collect(&names) {
        Ok(values) => {
            for value in values {
                println!("{} {} {}", value.name, value.value, value.timestamp_ms);
            }
        },
        Err(e) => {
            shell.error(format!("collection failed: {}", e));
            std::process::exit(1);
        },
    }
}

fn read_names_from_stdin() -> Vec<String> {
    io::stdin()
        .lock()
        .lines()
        .filter_map(std::result::Result::ok)
        .map(|line| line.trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}
