//! Command implementations.

use anyhow::{Context, Result};
use forge_mirror::{
    sync_repo_tags, wiki_remote_url, CancellationToken, Database, FilesystemClient,
    FsContentStore, GitRemoteProber, GitRepository, HttpRemoteProber, LfsBackfill, MirrorConfig,
    NewRepository, RemoteProber,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn open_database(config: &MirrorConfig) -> Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))
}

fn load_config(path: &Path) -> Result<MirrorConfig> {
    MirrorConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

pub async fn add_repo(
    config_path: &Path,
    owner: String,
    name: String,
    path: PathBuf,
    mirror: bool,
) -> Result<Value> {
    let config = load_config(config_path)?;
    let git_repo = GitRepository::open(&path).await?;
    let db = open_database(&config)?;

    let repo = db.insert_repository(&NewRepository {
        owner_name: owner,
        name,
        path: git_repo.path().to_path_buf(),
        is_mirror: mirror,
    })?;
    info!("Registered {}", repo);
    Ok(serde_json::to_value(&repo)?)
}

pub async fn sync_tags(config_path: &Path, repo_id: i64) -> Result<Value> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;
    let summary = sync_repo_tags(&db, repo_id).await?;
    Ok(serde_json::to_value(summary)?)
}

pub async fn backfill_lfs(
    config_path: &Path,
    repo_id: i64,
    upstream: PathBuf,
    cancel: CancellationToken,
) -> Result<Value> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;
    let repo = db.get_repository_by_id(repo_id)?;
    let git_repo = GitRepository::open(&repo.path).await?;

    let content = FsContentStore::new(&config.lfs.content_path);
    let client = FilesystemClient::new(upstream).with_batch_size(config.lfs.batch_size);
    let summary = LfsBackfill::new(&repo, &db, &content, &client, &config.lfs)
        .with_cancellation(cancel)
        .run(Arc::new(git_repo))
        .await?;
    Ok(serde_json::to_value(summary)?)
}

pub async fn wiki_url(remote: &str, http: bool) -> Result<Value> {
    let prober: Box<dyn RemoteProber> = if http {
        Box::new(HttpRemoteProber::new()?)
    } else {
        Box::new(GitRemoteProber)
    };
    let url = wiki_remote_url(prober.as_ref(), remote).await;
    Ok(json!({ "remote": remote, "wikiUrl": url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sync_tags_unknown_repository_fails() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("forge-mirror.json");
        std::fs::write(&config_path, r#"{"database_path": "mirror.sqlite"}"#).unwrap();

        let err = sync_tags(&config_path, 7).await.unwrap_err();
        assert!(err.to_string().contains('7'));
        assert!(temp.path().join("mirror.sqlite").exists());
    }

    #[tokio::test]
    async fn test_add_repo_rejects_non_git_directory() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("forge-mirror.json");
        let not_a_repo = temp.path().join("plain");
        std::fs::create_dir(&not_a_repo).unwrap();

        let result = add_repo(&config_path, "o".into(), "n".into(), not_a_repo, false).await;
        assert!(result.is_err());
    }
}
