use crate::source::DownloaderKind;
use crate::system;
use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_BUILD_PATH: &str = "toolchain";
pub const DEFAULT_PATCH_PATH: &str = "patches";
pub const DEFAULT_TARGET: &str = "mips64-elf";

/// Options shared by every command. Each one can also be set through the
/// environment.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Installation directory of the toolchain
    #[arg(env = "TOOLCHAIN_INST", global = true, long)]
    pub install: Option<PathBuf>,

    /// Directory holding extracted sources and build trees
    #[arg(env = "BUILD_PATH", global = true, long)]
    pub build_path: Option<PathBuf>,

    /// Directory holding downloaded archives (defaults to the build path)
    #[arg(env = "DOWNLOAD_PATH", global = true, long)]
    pub download_path: Option<PathBuf>,

    /// Directory holding the patch files
    #[arg(env = "PATCH_PATH", global = true, long)]
    pub patch_path: Option<PathBuf>,

    /// Build system triplet passed to every configure
    #[arg(env = "TOOLCHAIN_BUILD", global = true, long = "build")]
    pub build_triplet: Option<String>,

    /// Host system triplet passed to every configure
    #[arg(env = "TOOLCHAIN_HOST", global = true, long = "host")]
    pub host_triplet: Option<String>,

    /// Target triplet of the produced toolchain
    #[arg(env = "TOOLCHAIN_TARGET", global = true, long = "target")]
    pub target_triplet: Option<String>,

    /// Parallel make jobs (defaults to the processor count)
    #[arg(env = "JOBS", global = true, long)]
    pub jobs: Option<usize>,

    /// Download tool
    #[arg(default_value_t = DownloaderKind::Auto, env = "DOWNLOADER", global = true, long, value_enum)]
    pub downloader: DownloaderKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Triplets {
    pub build: Option<String>,
    pub host: Option<String>,
    pub target: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub install_path: PathBuf,
    pub build_path: PathBuf,
    pub download_path: PathBuf,
    pub patch_path: PathBuf,
    pub triplets: Triplets,
    pub jobs: usize,
    pub downloader: DownloaderKind,
}

impl Config {
    pub fn resolve(args: &ConfigArgs) -> Result<Self> {
        let cwd = env::current_dir()?;

        Self::resolve_in(args, &cwd, system::processor_count())
    }

    pub fn resolve_in(args: &ConfigArgs, cwd: &Path, processors: Option<usize>) -> Result<Self> {
        let install_path = args
            .install
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "TOOLCHAIN_INST environment variable is not defined; \
                     set it (or pass --install) to the requested installation directory"
                )
            })?;

        let (build_path, download_path) = resolve_work_paths(args, cwd);

        let patch_path = absolute(
            cwd,
            args.patch_path
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_PATCH_PATH)),
        );

        let triplets = Triplets {
            build: non_empty(args.build_triplet.as_deref()),
            host: non_empty(args.host_triplet.as_deref()),
            target: non_empty(args.target_triplet.as_deref())
                .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        };

        Ok(Self {
            install_path: absolute(cwd, install_path),
            build_path,
            download_path,
            patch_path,
            triplets,
            jobs: resolve_jobs(args.jobs, processors)?,
            downloader: args.downloader,
        })
    }

    /// `PATH` for build steps: the inherited one with the install `bin`
    /// directory appended so later packages find the new cross tools.
    pub fn search_path(&self) -> Result<OsString> {
        let mut paths: Vec<PathBuf> = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();

        paths.push(self.install_path.join("bin"));

        Ok(env::join_paths(paths)?)
    }
}

/// Build and download directories, which `clean` needs without an install
/// directory.
pub fn resolve_work_paths(args: &ConfigArgs, cwd: &Path) -> (PathBuf, PathBuf) {
    let build_path = absolute(
        cwd,
        args.build_path
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_BUILD_PATH)),
    );

    let download_path = args
        .download_path
        .as_deref()
        .map(|path| absolute(cwd, path))
        .unwrap_or_else(|| build_path.clone());

    (build_path, download_path)
}

pub fn resolve_jobs(jobs: Option<usize>, processors: Option<usize>) -> Result<usize> {
    match jobs {
        Some(0) => bail!("JOBS must be greater than zero"),
        Some(jobs) => Ok(jobs),
        None => Ok(processors.filter(|count| *count > 0).unwrap_or(1)),
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
