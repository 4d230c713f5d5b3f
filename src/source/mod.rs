use crate::builder::step::{run_step, StepCommand};
use crate::store::paths::get_partial_path;
use crate::system::{command_exists, require_command};
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

/// Downloader requested by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DownloaderKind {
    /// First of curl, wget and fetch found on PATH
    #[default]
    Auto,
    Curl,
    Wget,
    Fetch,
    /// Built-in HTTP client
    Http,
}

/// Downloader actually used for fetching sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Downloader {
    Curl,
    Wget,
    Fetch,
    Http,
}

/// External download tools in order of preference.
pub const DOWNLOAD_TOOLS: [Downloader; 3] = [Downloader::Curl, Downloader::Wget, Downloader::Fetch];

impl Downloader {
    pub fn program(&self) -> Option<&'static str> {
        match self {
            Downloader::Curl => Some("curl"),
            Downloader::Wget => Some("wget"),
            Downloader::Fetch => Some("fetch"),
            Downloader::Http => None,
        }
    }

    /// Command line writing `url` to `output`, for the external tools.
    pub fn command(&self, url: &Url, output: &Path) -> Option<StepCommand> {
        let output = output.display().to_string();
        let output = output.as_str();

        let step = match self {
            Downloader::Curl => StepCommand::new("curl").args(["-fL", "-o", output, url.as_str()]),
            Downloader::Wget => StepCommand::new("wget").args(["-O", output, url.as_str()]),
            Downloader::Fetch => StepCommand::new("fetch").args(["-o", output, url.as_str()]),
            Downloader::Http => return None,
        };

        Some(step)
    }

    async fn download(&self, url: &Url, output: &Path) -> Result<()> {
        match self.command(url, output) {
            Some(step) => run_step("download", &step).await,
            None => download_http(url, output).await,
        }
    }
}

/// Resolves the requested kind against the tools available, as reported by
/// `exists`.
pub fn select_downloader<F>(kind: DownloaderKind, exists: F) -> Result<Downloader>
where
    F: Fn(&str) -> bool,
{
    let requested = match kind {
        DownloaderKind::Auto => {
            return DOWNLOAD_TOOLS
                .into_iter()
                .find(|tool| tool.program().is_some_and(&exists))
                .ok_or_else(|| {
                    anyhow!("install curl, wget or fetch to download toolchain sources")
                });
        }
        DownloaderKind::Curl => Downloader::Curl,
        DownloaderKind::Wget => Downloader::Wget,
        DownloaderKind::Fetch => Downloader::Fetch,
        DownloaderKind::Http => Downloader::Http,
    };

    if let Some(program) = requested.program() {
        if !exists(program) {
            bail!("required tool not found: {}", program);
        }
    }

    Ok(requested)
}

pub fn resolve_downloader(kind: DownloaderKind) -> Result<Downloader> {
    let downloader = select_downloader(kind, command_exists)?;

    if let Some(program) = downloader.program() {
        let path = require_command(program)?;
        info!("downloader: {}", path.display());
    } else {
        info!("downloader: built-in http");
    }

    Ok(downloader)
}

pub fn parse_url(url: &str) -> Result<Url> {
    let url = Url::parse(url).with_context(|| format!("invalid source url: {}", url))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("invalid source url scheme: {}", url);
    }

    Ok(url)
}

async fn download_http(url: &Url, output: &Path) -> Result<()> {
    info!("downloading: {}", url);

    let mut response = reqwest::get(url.as_str()).await?.error_for_status()?;

    let mut file = File::create(output).await?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }

    file.flush().await?;

    Ok(())
}

/// Downloads `url` to `archive` unless the file already exists. Returns
/// whether a download happened.
pub async fn fetch_if_absent(downloader: Downloader, url: &str, archive: &Path) -> Result<bool> {
    if archive.is_file() {
        info!("using downloaded source: {}", archive.display());
        return Ok(false);
    }

    let url = parse_url(url)?;

    let partial = get_partial_path(archive);

    if let Err(err) = downloader.download(&url, &partial).await {
        if partial.exists() {
            if let Err(remove_err) = fs::remove_file(&partial).await {
                warn!("failed to remove {}: {}", partial.display(), remove_err);
            }
        }

        return Err(err.context(format!("failed to download {}", url)));
    }

    fs::rename(&partial, archive)
        .await
        .with_context(|| format!("failed to move download into {}", archive.display()))?;

    info!("downloaded: {}", archive.display());

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_curl() {
        let downloader = select_downloader(DownloaderKind::Auto, |_| true).unwrap();

        assert_eq!(downloader, Downloader::Curl);
    }

    #[test]
    fn auto_falls_back_in_order() {
        let wget = select_downloader(DownloaderKind::Auto, |tool| tool != "curl").unwrap();
        let fetch = select_downloader(DownloaderKind::Auto, |tool| tool == "fetch").unwrap();

        assert_eq!(wget, Downloader::Wget);
        assert_eq!(fetch, Downloader::Fetch);
    }

    #[test]
    fn auto_without_tools_fails() {
        let err = select_downloader(DownloaderKind::Auto, |_| false)
            .unwrap_err()
            .to_string();

        assert!(err.contains("curl, wget or fetch"));
    }

    #[test]
    fn explicit_tool_must_exist() {
        assert!(select_downloader(DownloaderKind::Wget, |tool| tool == "curl").is_err());
        assert_eq!(
            select_downloader(DownloaderKind::Http, |_| false).unwrap(),
            Downloader::Http
        );
    }

    #[test]
    fn tool_command_lines() {
        let url = Url::parse("https://ftp.gnu.org/gnu/gmp/gmp-6.2.0.tar.bz2").unwrap();
        let output = Path::new("/dl/gmp.part");

        assert_eq!(
            Downloader::Curl.command(&url, output).unwrap().argv(),
            vec!["curl", "-fL", "-o", "/dl/gmp.part", url.as_str()]
        );
        assert_eq!(
            Downloader::Wget.command(&url, output).unwrap().argv(),
            vec!["wget", "-O", "/dl/gmp.part", url.as_str()]
        );
        assert_eq!(
            Downloader::Fetch.command(&url, output).unwrap().argv(),
            vec!["fetch", "-o", "/dl/gmp.part", url.as_str()]
        );
        assert!(Downloader::Http.command(&url, output).is_none());
    }

    #[test]
    fn only_http_urls() {
        assert!(parse_url("https://sourceware.org/pub/newlib/x.tar.gz").is_ok());
        assert!(parse_url("ftp://sourceware.org/pub/newlib/x.tar.gz").is_err());
        assert!(parse_url("not a url").is_err());
    }

    #[tokio::test]
    async fn existing_archive_is_not_downloaded() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("binutils-2.39.tar.gz");
        fs::write(&archive, "cached").await.unwrap();

        let downloaded = fetch_if_absent(Downloader::Http, "http://127.0.0.1:1/never", &archive)
            .await
            .unwrap();

        assert!(!downloaded);
        assert_eq!(fs::read_to_string(&archive).await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("mpc-1.2.1.tar.gz");

        let result =
            fetch_if_absent(Downloader::Http, "http://127.0.0.1:1/mpc-1.2.1.tar.gz", &archive).await;

        assert!(result.is_err());
        assert!(!archive.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
