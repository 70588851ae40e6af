//! Discovery of the wiki repository that belongs to a mirrored remote.
//!
//! GitHub, GitLab and Gogs serve wikis at `<repo>.wiki.git`, Bitbucket at
//! `<repo>.git/wiki`.

use crate::config::{GitConfig, NetworkConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Checks whether a git remote URL can be read.
#[async_trait]
pub trait RemoteProber: Send + Sync {
    async fn is_accessible(&self, url: &str) -> bool;
}

/// Return the first accessible wiki URL for `remote`, if any.
pub async fn wiki_remote_url(prober: &dyn RemoteProber, remote: &str) -> Option<String> {
    let remote = remote.strip_suffix(".git").unwrap_or(remote);
    for suffix in GitConfig::WIKI_URL_SUFFIXES {
        let wiki_url = format!("{}{}", remote, suffix);
        if prober.is_accessible(&wiki_url).await {
            return Some(wiki_url);
        }
    }
    None
}

/// Probes with `git ls-remote`, which understands every transport git does.
#[derive(Debug, Clone, Default)]
pub struct GitRemoteProber;

#[async_trait]
impl RemoteProber for GitRemoteProber {
    async fn is_accessible(&self, url: &str) -> bool {
        let output = Command::new(GitConfig::GIT_BINARY)
            .args(["ls-remote", "-q", "-h", url, "HEAD"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output();
        match tokio::time::timeout(NetworkConfig::QUICK_REQUEST_TIMEOUT, output).await {
            Ok(Ok(output)) => output.status.success(),
            Ok(Err(e)) => {
                debug!("git ls-remote {} failed to run: {}", url, e);
                false
            }
            Err(_) => {
                debug!("git ls-remote {} timed out", url);
                false
            }
        }
    }
}

/// Probes smart-HTTP remotes by requesting their upload-pack ref
/// advertisement.
#[derive(Debug, Clone)]
pub struct HttpRemoteProber {
    client: reqwest::Client,
}

impl HttpRemoteProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NetworkConfig::QUICK_REQUEST_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// `<url>/info/refs?service=git-upload-pack`, or `None` for non-HTTP URLs.
    fn refs_url(url: &str) -> Option<Url> {
        let mut parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let path = format!("{}/info/refs", parsed.path().trim_end_matches('/'));
        parsed.set_path(&path);
        parsed.set_query(Some("service=git-upload-pack"));
        Some(parsed)
    }
}

#[async_trait]
impl RemoteProber for HttpRemoteProber {
    async fn is_accessible(&self, url: &str) -> bool {
        let Some(refs_url) = Self::refs_url(url) else {
            debug!("Not probing non-HTTP remote {}", url);
            return false;
        };
        match self.client.get(refs_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeProber {
        accessible: HashSet<String>,
        probed: Mutex<Vec<String>>,
    }

    impl FakeProber {
        fn new(accessible: &[&str]) -> Self {
            Self {
                accessible: accessible.iter().map(|s| s.to_string()).collect(),
                probed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteProber for FakeProber {
        async fn is_accessible(&self, url: &str) -> bool {
            self.probed.lock().unwrap().push(url.to_string());
            self.accessible.contains(url)
        }
    }

    #[tokio::test]
    async fn test_prefers_wiki_git_suffix() {
        let prober = FakeProber::new(&[
            "https://github.com/vim/vim.wiki.git",
            "https://github.com/vim/vim.git/wiki",
        ]);
        let url = wiki_remote_url(&prober, "https://github.com/vim/vim.git").await;
        assert_eq!(url.as_deref(), Some("https://github.com/vim/vim.wiki.git"));
        assert_eq!(prober.probed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_bitbucket_layout() {
        let prober = FakeProber::new(&["https://bitbucket.org/team/repo.git/wiki"]);
        let url = wiki_remote_url(&prober, "https://bitbucket.org/team/repo").await;
        assert_eq!(url.as_deref(), Some("https://bitbucket.org/team/repo.git/wiki"));
    }

    #[tokio::test]
    async fn test_none_when_nothing_accessible() {
        let prober = FakeProber::new(&[]);
        assert!(wiki_remote_url(&prober, "https://example.com/a/b.git").await.is_none());
        assert_eq!(
            *prober.probed.lock().unwrap(),
            vec![
                "https://example.com/a/b.wiki.git".to_string(),
                "https://example.com/a/b.git/wiki".to_string(),
            ]
        );
    }

    #[test]
    fn test_refs_url() {
        let url = HttpRemoteProber::refs_url("https://example.com/a/b.wiki.git").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/a/b.wiki.git/info/refs?service=git-upload-pack"
        );
        assert!(HttpRemoteProber::refs_url("git@example.com:a/b.git").is_none());
        assert!(HttpRemoteProber::refs_url("file:///srv/git/a.git").is_none());
    }
}
