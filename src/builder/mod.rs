use crate::config::Config;
use crate::package::{self, Package, Recipe};
use crate::source::{fetch_if_absent, resolve_downloader, Downloader};
use crate::store::{self, archives, paths};
use crate::system::require_command;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub mod install;
pub mod patch;
pub mod step;

use install::{run_install, ESCALATION_CHAIN};
use step::{run_step, StepCommand};

/// The three commands of one package build.
pub struct BuildSteps {
    pub configure: StepCommand,
    pub make: StepCommand,
    pub install: StepCommand,
}

impl BuildSteps {
    pub fn iter(&self) -> impl Iterator<Item = &StepCommand> {
        [&self.configure, &self.make, &self.install].into_iter()
    }
}

pub struct Builder {
    config: Config,
    packages: Vec<Package>,
}

impl Builder {
    pub fn new(config: Config) -> Self {
        let packages = package::toolchain(&config);

        Self::with_packages(config, packages)
    }

    pub fn with_packages(config: Config, packages: Vec<Package>) -> Self {
        Self { config, packages }
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Downloads, extracts, patches and links every source tree.
    pub async fn fetch(&self) -> Result<()> {
        store::check(&self.config).await?;

        if self.packages.iter().any(|p| !p.patches.is_empty()) {
            require_command("patch")?;
        }

        let downloader = resolve_downloader(self.config.downloader)?;

        for package in &self.packages {
            self.prepare_source(downloader, package)
                .await
                .with_context(|| format!("failed to prepare {}", package.source_dir_name()))?;
        }

        for package in &self.packages {
            self.link_dependencies(package).await?;
        }

        Ok(())
    }

    /// The full sequence: sources, the three builds, then verification.
    pub async fn run(&self) -> Result<()> {
        require_command("make")?;

        self.fetch().await?;

        for package in &self.packages {
            if let Some(recipe) = &package.recipe {
                self.build_package(package, recipe)
                    .await
                    .with_context(|| format!("failed to build {}", package.source_dir_name()))?;
            }
        }

        self.verify()
    }

    /// Describes every action `run` performs, without performing any.
    pub fn plan(&self) -> Result<Vec<String>> {
        let mut lines = vec![];

        for package in &self.packages {
            lines.push(format!(
                "{}: fetch {} -> {}",
                package.name,
                package.source.url,
                paths::get_archive_path(&self.config, package).display()
            ));

            let source_dir = paths::get_source_path(&self.config, package);

            lines.push(format!(
                "{}: extract into {}",
                package.name,
                source_dir.display()
            ));

            for patch in &package.patches {
                let patch_path = paths::get_patch_path(&self.config, patch);
                lines.push(format!(
                    "{}: {}",
                    package.name,
                    patch::command(&source_dir, &patch_path)
                ));
            }
        }

        for package in &self.packages {
            for link in &package.links {
                let target = self.link_target(&link.package)?;
                lines.push(format!(
                    "{}: link {} -> {}",
                    package.name,
                    paths::get_source_path(&self.config, package)
                        .join(&link.name)
                        .display(),
                    target.display()
                ));
            }
        }

        for package in &self.packages {
            if let Some(recipe) = &package.recipe {
                for step in self.build_steps(package, recipe)?.iter() {
                    lines.push(format!("{}: {}", package.name, step));
                }
            }
        }

        lines.push(format!(
            "verify {}",
            paths::get_compiler_path(&self.config).display()
        ));

        Ok(lines)
    }

    async fn prepare_source(&self, downloader: Downloader, package: &Package) -> Result<()> {
        let archive = paths::get_archive_path(&self.config, package);

        fetch_if_absent(downloader, &package.source.url, &archive).await?;

        let source_dir = paths::get_source_path(&self.config, package);

        if source_dir.exists() {
            info!("using extracted source: {}", source_dir.display());
            return Ok(());
        }

        self.extract(package, &archive, &source_dir).await?;

        // an unpatched tree must not survive to the next run
        if let Err(err) = patch::apply(&self.config, package, &source_dir).await {
            if let Err(remove_err) = fs::remove_dir_all(&source_dir).await {
                warn!("failed to remove {}: {}", source_dir.display(), remove_err);
            }

            return Err(err);
        }

        Ok(())
    }

    async fn extract(&self, package: &Package, archive: &Path, source_dir: &Path) -> Result<()> {
        let staging = paths::get_staging_path(&self.config, package);

        fs::create_dir_all(&staging).await?;

        info!("extracting: {}", archive.display());

        let result = async {
            archives::unpack(archive, &staging).await?;

            let extracted = staging.join(package.source_dir_name());

            if !extracted.is_dir() {
                bail!(
                    "{} does not contain {}",
                    archive.display(),
                    package.source_dir_name()
                );
            }

            fs::rename(&extracted, source_dir).await?;

            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(err) = fs::remove_dir_all(&staging).await {
            warn!("failed to remove {}: {}", staging.display(), err);
        }

        result
    }

    fn link_target(&self, name: &str) -> Result<PathBuf> {
        let dependency = self
            .packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| anyhow!("unknown package: {}", name))?;

        Ok(Path::new("..").join(dependency.source_dir_name()))
    }

    async fn link_dependencies(&self, package: &Package) -> Result<()> {
        let source_dir = paths::get_source_path(&self.config, package);

        for link in &package.links {
            let link_path = source_dir.join(&link.name);

            if fs::symlink_metadata(&link_path).await.is_ok() {
                continue;
            }

            let target = self.link_target(&link.package)?;

            fs::symlink(&target, &link_path)
                .await
                .with_context(|| format!("failed to link {}", link_path.display()))?;

            info!("linked {} -> {}", link_path.display(), target.display());
        }

        Ok(())
    }

    fn build_steps(&self, package: &Package, recipe: &Recipe) -> Result<BuildSteps> {
        let source_dir = paths::get_source_path(&self.config, package);
        let build_dir = paths::get_build_path(&self.config, package);
        let search_path = self.config.search_path()?;

        let base = |program: String| {
            recipe
                .environment
                .iter()
                .fold(StepCommand::new(program), |step, (key, value)| {
                    step.env(key.as_str(), value.as_str())
                })
                .env("PATH", search_path.clone())
                .current_dir(&build_dir)
        };

        let configure = base(source_dir.join("configure").display().to_string())
            .args(recipe.configure.iter().cloned());

        let make = base("make".to_string())
            .arg(format!("-j{}", self.config.jobs))
            .args(recipe.make.iter().cloned());

        let install = base("make".to_string()).args(recipe.install.iter().cloned());

        Ok(BuildSteps {
            configure,
            make,
            install,
        })
    }

    async fn build_package(&self, package: &Package, recipe: &Recipe) -> Result<()> {
        let build_dir = paths::get_build_path(&self.config, package);

        fs::create_dir_all(&build_dir).await?;

        let BuildSteps {
            configure,
            make,
            install,
        } = self.build_steps(package, recipe)?;

        run_step(&package.name, &configure).await?;
        run_step(&package.name, &make).await?;
        run_install(&package.name, &install, &ESCALATION_CHAIN).await?;

        info!("{} installed", package.source_dir_name());

        Ok(())
    }

    fn verify(&self) -> Result<()> {
        let compiler = paths::get_compiler_path(&self.config);

        if !compiler.is_file() {
            bail!("compiler not installed: {}", compiler.display());
        }

        info!("toolchain ready: {}", compiler.display());

        Ok(())
    }
}

/// Removes the build tree. With `downloads`, also removes the package
/// archives and partial downloads, then the download directory if nothing
/// else is left in it.
pub async fn clean(
    build_path: &Path,
    download_path: &Path,
    archives: &[String],
    downloads: bool,
) -> Result<()> {
    if downloads {
        remove_downloads(download_path, archives).await?;
    }

    if build_path.exists() {
        if download_path.starts_with(build_path) {
            clean_build_entries(build_path, download_path).await?;
            remove_if_empty(build_path).await;
        } else {
            fs::remove_dir_all(build_path)
                .await
                .with_context(|| format!("failed to remove {}", build_path.display()))?;
            info!("removed: {}", build_path.display());
        }
    }

    if downloads {
        remove_if_empty(download_path).await;
    }

    Ok(())
}

async fn remove_downloads(download_path: &Path, archives: &[String]) -> Result<()> {
    if !download_path.is_dir() {
        return Ok(());
    }

    let mut entries = fs::read_dir(download_path).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();

        let is_archive = archives.iter().any(|archive| *archive == name);
        let is_partial = name.ends_with(".part")
            && archives
                .iter()
                .any(|archive| name.starts_with(&format!(".{}.", archive)));

        if (is_archive || is_partial) && entry.file_type().await?.is_file() {
            let path = entry.path();

            fs::remove_file(&path)
                .await
                .with_context(|| format!("failed to remove {}", path.display()))?;
            info!("removed: {}", path.display());
        }
    }

    Ok(())
}

/// Removes source and build trees inside the build directory, keeping the
/// download directory and any archives sharing the build directory.
async fn clean_build_entries(build_path: &Path, download_path: &Path) -> Result<()> {
    let mut entries = fs::read_dir(build_path).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;

        if download_path.starts_with(&path) {
            continue;
        }

        if file_type.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else if download_path == build_path {
            continue;
        } else {
            fs::remove_file(&path).await?;
        }

        info!("removed: {}", path.display());
    }

    Ok(())
}

async fn remove_if_empty(dir: &Path) {
    if fs::remove_dir(dir).await.is_ok() {
        info!("removed: {}", dir.display());
    }
}
