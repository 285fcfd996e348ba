//! Fund constituent file refresh.
//!
//! Fund exports change rarely, so a local copy younger than the configured
//! maximum age is reused as-is. Download failures are logged and non-fatal: a
//! stale file still feeds the run, and a fund with no file at all surfaces
//! later as a constituent lookup miss.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::FundSource;

fn is_fresh(path: &Path, max_age_days: u64) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    Utc::now() - modified < Duration::days(max_age_days as i64)
}

/// Downloads each fund export into `dir` unless a fresh local copy exists.
/// Returns the local paths of every file that exists after the refresh.
pub async fn refresh_fund_files(
    client: &reqwest::Client,
    sources: &[FundSource],
    dir: &Path,
    max_age_days: u64,
) -> Vec<PathBuf> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        warn!("Could not create fund directory {}: {err}", dir.display());
    }

    let mut paths = Vec::new();
    for source in sources {
        let path = dir.join(&source.file);
        if is_fresh(&path, max_age_days) {
            debug!(
                "Fund file '{}' is younger than {} days; skipping download",
                source.file, max_age_days
            );
            paths.push(path);
            continue;
        }
        match download(client, &source.url, &path).await {
            Ok(()) => {
                info!("Downloaded fund file '{}'", source.file);
                paths.push(path);
            }
            Err(err) => {
                warn!("Failed to download '{}' from {}: {err}", source.file, source.url);
                if path.exists() {
                    // Keep serving the stale copy.
                    paths.push(path);
                }
            }
        }
    }
    paths
}

async fn download(client: &reqwest::Client, url: &str, path: &Path) -> anyhow::Result<()> {
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(url: &str, file: &str) -> FundSource {
        FundSource { url: url.to_string(), file: file.to_string() }
    }

    #[tokio::test]
    async fn downloads_missing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/world.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Name,Weight (%)\nApple,5.0\n"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let sources = vec![source(&format!("{}/world.csv", server.uri()), "World.csv")];
        let paths = refresh_fund_files(&client, &sources, dir.path(), 30).await;

        assert_eq!(paths.len(), 1);
        let content = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(content.contains("Apple"));
    }

    #[tokio::test]
    async fn fresh_file_is_not_redownloaded() {
        let server = MockServer::start().await;
        // No mock mounted: any request would return 404 and be logged as a
        // failure, so a returned path proves the download was skipped.
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("World.csv");
        std::fs::write(&local, "cached").unwrap();

        let client = reqwest::Client::new();
        let sources = vec![source(&format!("{}/world.csv", server.uri()), "World.csv")];
        let paths = refresh_fund_files(&client, &sources, dir.path(), 30).await;

        assert_eq!(paths, vec![local.clone()]);
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "cached");
    }

    #[tokio::test]
    async fn failed_download_keeps_stale_copy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/world.csv"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("World.csv");
        std::fs::write(&local, "stale").unwrap();

        let client = reqwest::Client::new();
        let sources = vec![source(&format!("{}/world.csv", server.uri()), "World.csv")];
        let paths = refresh_fund_files(&client, &sources, dir.path(), 0).await;

        assert_eq!(paths, vec![local.clone()]);
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "stale");
    }

    #[tokio::test]
    async fn failed_download_without_local_copy_yields_nothing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let sources = vec![source(&format!("{}/gone.csv", server.uri()), "Gone.csv")];
        let paths = refresh_fund_files(&client, &sources, dir.path(), 30).await;
        assert!(paths.is_empty());
    }
}
