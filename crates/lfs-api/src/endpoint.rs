//! API endpoint resolution.

use std::fmt;

use crate::error::ApiError;

/// Base URL of a Git LFS API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// Use `url` as the API base directly.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Derive the API base from a repository clone URL.
    ///
    /// HTTP(S) remotes map to `<remote>.git/info/lfs`. SSH remotes, both
    /// `ssh://` and scp-like `user@host:path`, map to the HTTPS URL on the
    /// same host.
    pub fn from_clone_url(clone_url: &str) -> Result<Self, ApiError> {
        let invalid = |reason| ApiError::Endpoint {
            url: clone_url.to_string(),
            reason,
        };

        let trimmed = clone_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("empty clone url"));
        }

        let base = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            trimmed.to_string()
        } else if let Some(rest) = trimmed.strip_prefix("ssh://") {
            let (authority, path) = rest
                .split_once('/')
                .ok_or_else(|| invalid("ssh url has no repository path"))?;
            let host = strip_user(authority);
            let host = host.split_once(':').map_or(host, |(h, _port)| h);
            https_base(host, path).ok_or_else(|| invalid("ssh url has no host"))?
        } else if !trimmed.contains("://")
            && let Some((authority, path)) = trimmed.split_once(':')
        {
            https_base(strip_user(authority), path)
                .ok_or_else(|| invalid("scp-style url has no host"))?
        } else {
            return Err(invalid("unsupported clone url scheme"));
        };

        let base = if base.ends_with(".git") {
            base
        } else {
            format!("{base}.git")
        };

        Ok(Self::new(format!("{base}/info/lfs")))
    }

    /// The API base URL, without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL of the batch API.
    pub fn batch_url(&self) -> String {
        format!("{}/objects/batch", self.url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn strip_user(authority: &str) -> &str {
    authority.rsplit_once('@').map_or(authority, |(_, host)| host)
}

fn https_base(host: &str, path: &str) -> Option<String> {
    if host.is_empty() {
        return None;
    }
    let path = path.trim_start_matches('/');
    Some(format!("https://{host}/{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_url_trims_slash() {
        let endpoint = Endpoint::new("http://localhost:8080/api/");
        assert_eq!(endpoint.url(), "http://localhost:8080/api");
        assert_eq!(
            endpoint.batch_url(),
            "http://localhost:8080/api/objects/batch"
        );
        assert_eq!(endpoint.to_string(), "http://localhost:8080/api");
    }

    #[test]
    fn test_https_clone_url() {
        for url in [
            "https://git-server.com/foo/bar",
            "https://git-server.com/foo/bar.git",
            "https://git-server.com/foo/bar/",
        ] {
            let endpoint = Endpoint::from_clone_url(url).unwrap();
            assert_eq!(
                endpoint.url(),
                "https://git-server.com/foo/bar.git/info/lfs",
                "from {url}"
            );
        }
    }

    #[test]
    fn test_ssh_clone_urls() {
        let endpoint = Endpoint::from_clone_url("ssh://git@git-server.com:2222/foo/bar.git").unwrap();
        assert_eq!(endpoint.url(), "https://git-server.com/foo/bar.git/info/lfs");

        let endpoint = Endpoint::from_clone_url("git@git-server.com:foo/bar").unwrap();
        assert_eq!(endpoint.url(), "https://git-server.com/foo/bar.git/info/lfs");
    }

    #[test]
    fn test_unsupported_clone_urls() {
        assert!(Endpoint::from_clone_url("file:///tmp/repo").is_err());
        assert!(Endpoint::from_clone_url("").is_err());
        assert!(Endpoint::from_clone_url("ssh://host-without-path").is_err());
        assert!(Endpoint::from_clone_url(":foo/bar").is_err());
    }
}
