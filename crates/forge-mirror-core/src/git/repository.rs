//! Git repositories driven through the `git` binary.

use super::{PointerScanner, TagSource};
use crate::cancel::CancellationToken;
use crate::config::{GitConfig, LfsConfig};
use crate::error::{MirrorError, Result};
use crate::lfs::{LfsPointer, PointerBlob};
use crate::models::Tag;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

const TAG_FORMAT: &str =
    "--format=%(refname:strip=2)%00%(objectname)%00%(*objectname)%00%(taggerdate:unix)%00%(creatordate:unix)";
const BATCH_CHECK_FORMAT: &str = "--batch-check=%(objectname) %(objecttype) %(objectsize)";

/// A repository on disk, bare or with a work tree.
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    /// Open the repository at `path`, failing if git does not recognise it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Self {
            path: path.as_ref().to_path_buf(),
        };
        repo.run(&["rev-parse", "--git-dir"]).await.map_err(|e| MirrorError::Git {
            message: format!("{} is not a git repository: {}", repo.path.display(), e),
        })?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(GitConfig::GIT_BINARY);
        cmd.arg("-C").arg(&self.path).env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    /// Run a git command and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| MirrorError::Git {
                message: format!("failed to run git {}: {}", args.join(" "), e),
            })?;
        if !output.status.success() {
            return Err(MirrorError::Git {
                message: format!(
                    "git {} exited with {}: {}",
                    args.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(output.stdout)
    }

    fn spawn_piped(&self, args: &[&str], stdin: bool) -> Result<tokio::process::Child> {
        let mut cmd = self.command();
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(if stdin { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);
        cmd.spawn().map_err(|e| MirrorError::Git {
            message: format!("failed to spawn git {}: {}", args.join(" "), e),
        })
    }
}

fn parse_tag_line(line: &str) -> Option<Tag> {
    let fields: Vec<&str> = line.split('\0').collect();
    if fields.len() != 5 {
        return None;
    }
    let (name, object, peeled, tagger_date, creator_date) =
        (fields[0], fields[1], fields[2], fields[3], fields[4]);

    let object_id = if peeled.is_empty() { object } else { peeled };
    let when = [tagger_date, creator_date]
        .iter()
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    Some(Tag {
        name: name.to_string(),
        object_id: object_id.to_string(),
        tagger_time: when,
    })
}

#[async_trait]
impl TagSource for GitRepository {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let stdout = self.run(&["for-each-ref", TAG_FORMAT, "refs/tags"]).await?;
        let text = String::from_utf8_lossy(&stdout);
        let tags: Vec<Tag> = text
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let tag = parse_tag_line(line);
                if tag.is_none() {
                    debug!("Ignoring unparsable tag line {:?}", line);
                }
                tag
            })
            .collect();
        trace!("Listed {} tags in {}", tags.len(), self.path.display());
        Ok(tags)
    }
}

fn missing_pipe(what: &str) -> MirrorError {
    MirrorError::Scan {
        message: format!("git {} pipe unavailable", what),
    }
}

fn joined(result: std::result::Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(inner) => inner.map_err(|e| MirrorError::Scan {
            message: format!("git pipe failed: {}", e),
        }),
        Err(e) => Err(MirrorError::Scan {
            message: format!("git pipe task failed: {}", e),
        }),
    }
}

/// Scans every object reachable from any ref:
/// `rev-list --objects --all` feeds `cat-file --batch-check`, blobs small
/// enough to be pointers feed `cat-file --batch`, and their content is
/// parsed here.
#[async_trait]
impl PointerScanner for GitRepository {
    async fn scan(&self, _cancel: &CancellationToken, tx: tokio::sync::mpsc::Sender<PointerBlob>) -> Result<()> {
        let mut rev_list = self.spawn_piped(&["rev-list", "--objects", "--all"], false)?;
        let mut check = self.spawn_piped(&["cat-file", BATCH_CHECK_FORMAT], true)?;
        let mut batch = self.spawn_piped(&["cat-file", "--batch"], true)?;

        let rev_out = rev_list.stdout.take().ok_or_else(|| missing_pipe("rev-list stdout"))?;
        let mut check_in = check.stdin.take().ok_or_else(|| missing_pipe("batch-check stdin"))?;
        let feed_check = tokio::spawn(async move {
            let mut reader = BufReader::new(rev_out);
            let mut line = Vec::new();
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line).await? == 0 {
                    break;
                }
                // `<oid> <path>`, where the path is arbitrary bytes
                let oid = line
                    .split(|b| *b == b' ' || *b == b'\n')
                    .next()
                    .unwrap_or_default();
                if !oid.is_empty() {
                    check_in.write_all(oid).await?;
                    check_in.write_all(b"\n").await?;
                }
            }
            check_in.shutdown().await
        });

        let check_out = check.stdout.take().ok_or_else(|| missing_pipe("batch-check stdout"))?;
        let mut batch_in = batch.stdin.take().ok_or_else(|| missing_pipe("batch stdin"))?;
        let feed_batch = tokio::spawn(async move {
            let mut lines = BufReader::new(check_out).lines();
            let mut seen = HashSet::new();
            while let Some(line) = lines.next_line().await? {
                let mut parts = line.split(' ');
                if let (Some(oid), Some("blob"), Some(size)) = (parts.next(), parts.next(), parts.next()) {
                    let small = size
                        .parse::<i64>()
                        .map(|s| s < LfsConfig::POINTER_BLOB_MAX_SIZE)
                        .unwrap_or(false);
                    if small && seen.insert(oid.to_string()) {
                        batch_in.write_all(oid.as_bytes()).await?;
                        batch_in.write_all(b"\n").await?;
                    }
                }
            }
            batch_in.shutdown().await
        });

        let batch_out = batch.stdout.take().ok_or_else(|| missing_pipe("batch stdout"))?;
        let mut reader = BufReader::new(batch_out);
        let mut header = String::new();
        let mut emitted = 0usize;
        loop {
            header.clear();
            if reader.read_line(&mut header).await? == 0 {
                break;
            }
            let fields: Vec<&str> = header.trim_end().split(' ').collect();
            if fields.len() == 2 && fields[1] == "missing" {
                continue;
            }
            if fields.len() != 3 {
                return Err(MirrorError::Scan {
                    message: format!("unexpected cat-file header {:?}", header.trim_end()),
                });
            }
            let size: usize = fields[2].parse().map_err(|_| MirrorError::Scan {
                message: format!("bad object size in {:?}", header.trim_end()),
            })?;

            // Content is followed by a single LF.
            let mut content = vec![0u8; size + 1];
            reader.read_exact(&mut content).await?;
            content.truncate(size);

            if let Ok(pointer) = LfsPointer::parse(&content) {
                let blob = PointerBlob {
                    blob_id: fields[0].to_string(),
                    pointer,
                };
                if tx.send(blob).await.is_err() {
                    debug!("Pointer consumer went away, stopping scan of {}", self.path.display());
                    return Ok(());
                }
                emitted += 1;
            }
        }

        joined(feed_check.await)?;
        joined(feed_batch.await)?;
        for (name, child) in [("rev-list", &mut rev_list), ("cat-file --batch-check", &mut check), ("cat-file --batch", &mut batch)] {
            let status = child.wait().await?;
            if !status.success() {
                return Err(MirrorError::Git {
                    message: format!("git {} exited with {}", name, status),
                });
            }
        }

        debug!("Found {} LFS pointers in {}", emitted, self.path.display());
        Ok(())
    }
}
