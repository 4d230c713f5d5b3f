use crate::config::Config;
use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

pub mod archives;
pub mod paths;

pub async fn check(config: &Config) -> Result<()> {
    for (label, dir) in [
        ("build", &config.build_path),
        ("download", &config.download_path),
    ] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create {} directory", label))?;
        }

        info!("{} directory: {}", label, dir.display());
    }

    info!("install directory: {}", config.install_path.display());

    Ok(())
}
