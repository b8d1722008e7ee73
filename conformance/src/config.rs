//! Command-line configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::builder::TypedValueParser;
use lfs_api::{Client, Credentials, DEFAULT_CONCURRENCY, Endpoint};

use crate::error::HarnessError;
use crate::fixture::{DEFAULT_COUNT, FixtureSource};

#[derive(Parser, Debug, Clone)]
#[command(name = "lfs-test-server-api")]
#[command(about = "Test a Git LFS API server for compliance")]
#[command(version)]
pub struct Args {
    /// URL of the LFS API to test
    #[arg(short = 'u', long, env = "LFS_TEST_API_URL")]
    pub url: Option<String>,

    /// Clone URL from which to derive the LFS API URL
    #[arg(short = 'c', long = "clone", env = "LFS_TEST_CLONE_URL")]
    pub clone_url: Option<String>,

    /// User for HTTP basic auth against the batch API
    #[arg(long, env = "LFS_TEST_USER")]
    pub user: Option<String>,

    /// Password for HTTP basic auth
    #[arg(long, env = "LFS_TEST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Number of objects in each generated fixture set
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// Maximum concurrent uploads while creating fixtures
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub concurrency: usize,

    /// List available tests and exit
    #[arg(long)]
    pub list: bool,

    /// Only run tests whose name contains this string
    #[arg(long)]
    pub filter: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional fixture files: EXISTS_FILE MISSING_FILE
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub credentials: Option<Credentials>,
    pub source: FixtureSource,
    pub concurrency: usize,
    pub filter: Option<String>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, HarnessError> {
        let url = args.url.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let clone_url = args.clone_url.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let endpoint = match (url, clone_url) {
            (Some(url), None) => Endpoint::new(url),
            (None, Some(clone)) => Endpoint::from_clone_url(clone)
                .map_err(|e| HarnessError::Config(e.to_string()))?,
            _ => {
                return Err(HarnessError::Config(
                    "Must supply either --url or --clone (and not both)".to_string(),
                ));
            }
        };

        let source = match <[PathBuf; 2]>::try_from(args.files) {
            Ok([exists, missing]) => FixtureSource::Files { exists, missing },
            Err(files) if files.is_empty() => FixtureSource::Generate { count: args.count },
            Err(_) => {
                return Err(HarnessError::Config(
                    "Must supply either no file arguments or both the exists AND missing file"
                        .to_string(),
                ));
            }
        };

        let credentials = args.user.map(|user| Credentials {
            user,
            password: args.password,
        });

        Ok(Self {
            endpoint,
            credentials,
            source,
            concurrency: args.concurrency,
            filter: args.filter,
        })
    }

    /// An API client for the configured endpoint.
    pub fn client(&self) -> Result<Arc<Client>, HarnessError> {
        let mut client = Client::new(self.endpoint.clone())?;
        if let Some(credentials) = &self.credentials {
            client = client.with_credentials(credentials.clone());
        }
        Ok(Arc::new(client))
    }
}
