//! Git LFS API server compliance tester.
//!
//! # Usage
//!
//! Test a server, uploading fresh fixtures:
//! ```bash
//! lfs-test-server-api --url https://lfs.example.com/api
//! ```
//!
//! Derive the API URL from a clone URL:
//! ```bash
//! lfs-test-server-api --clone git@git.example.com:org/repo.git
//! ```
//!
//! Use pre-existing fixtures without modifying the server:
//! ```bash
//! lfs-test-server-api --url https://lfs.example.com/api exists.txt missing.txt
//! ```
//!
//! List the tests:
//! ```bash
//! lfs-test-server-api --list
//! ```
//!
//! # Exit Codes
//!
//! - 0: All tests passed
//! - 1: At least one test failed
//! - 2: Configuration or fixture setup error

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lfs_conformance::config::{Args, Config};
use lfs_conformance::fixture::{FixtureSource, prepare_fixtures};
use lfs_conformance::{HarnessError, Registry, RunSummary, run_with_fixtures, suite};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list {
        list_tests(args.filter.as_deref());
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(summary) if summary.all_passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn list_tests(filter: Option<&str>) {
    let names: Vec<_> = suite::names()
        .into_iter()
        .filter(|name| filter.is_none_or(|f| name.contains(f)))
        .collect();
    for name in &names {
        println!("{name}");
    }
    println!("\nTotal: {} tests", names.len());
}

fn run(args: Args) -> Result<RunSummary, HarnessError> {
    let config = Config::from_args(args)?;
    let client = config.client()?;
    info!(endpoint = %client.endpoint(), "testing LFS API");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(HarnessError::Runtime)?;

    let mut registry = Registry::new();
    suite::register(&mut registry, client.clone(), Arc::new(runtime));
    if let Some(filter) = &config.filter {
        registry.retain_matching(filter);
    }

    if matches!(config.source, FixtureSource::Files { .. }) {
        println!("Reading test data from files (no server content changes)");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = run_with_fixtures(
        &registry,
        || prepare_fixtures(&config.source, &client, config.concurrency),
        &mut out,
    )?;

    writeln!(out, "\n{} passed, {} failed", summary.passed, summary.failed)
        .map_err(HarnessError::Output)?;
    Ok(summary)
}
