use crate::config::Config;
use crate::package::Package;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn get_source_path(config: &Config, package: &Package) -> PathBuf {
    config.build_path.join(package.source_dir_name())
}

pub fn get_build_path(config: &Config, package: &Package) -> PathBuf {
    config
        .build_path
        .join(format!("{}_compile_target", package.name))
}

pub fn get_archive_path(config: &Config, package: &Package) -> PathBuf {
    config.download_path.join(&package.source.archive)
}

pub fn get_patch_path(config: &Config, patch: &str) -> PathBuf {
    config.patch_path.join(patch)
}

/// Download target that is renamed into place once complete.
pub fn get_partial_path(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    archive.with_file_name(format!(".{}.{}.part", name, Uuid::now_v7()))
}

/// Extraction directory inside the build path.
pub fn get_staging_path(config: &Config, package: &Package) -> PathBuf {
    config
        .build_path
        .join(format!(".{}.{}", package.name, Uuid::now_v7()))
}

pub fn get_install_bin_path(config: &Config) -> PathBuf {
    config.install_path.join("bin")
}

pub fn get_compiler_path(config: &Config) -> PathBuf {
    get_install_bin_path(config).join(format!("{}-gcc", config.triplets.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigArgs};
    use crate::package;

    fn config() -> Config {
        let args = ConfigArgs {
            install: Some(PathBuf::from("/opt/mips")),
            download_path: Some(PathBuf::from("/cache")),
            ..Default::default()
        };

        Config::resolve_in(&args, Path::new("/work"), Some(2)).unwrap()
    }

    #[test]
    fn source_and_build_dirs() {
        let config = config();
        let gcc = package::gcc::package(&config);

        assert_eq!(
            get_source_path(&config, &gcc),
            PathBuf::from("/work/toolchain/gcc-12.2.0")
        );
        assert_eq!(
            get_build_path(&config, &gcc),
            PathBuf::from("/work/toolchain/gcc_compile_target")
        );
    }

    #[test]
    fn archive_in_download_dir() {
        let config = config();
        let gmp = package::gmp::package();

        assert_eq!(
            get_archive_path(&config, &gmp),
            PathBuf::from("/cache/gmp-6.2.0.tar.bz2")
        );
    }

    #[test]
    fn partial_is_hidden_sibling() {
        let archive = PathBuf::from("/cache/mpc-1.2.1.tar.gz");
        let partial = get_partial_path(&archive);

        assert_eq!(partial.parent(), archive.parent());
        assert_ne!(partial, archive);
        assert!(partial
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".mpc-1.2.1.tar.gz."));
    }

    #[test]
    fn compiler_path() {
        assert_eq!(
            get_compiler_path(&config()),
            PathBuf::from("/opt/mips/bin/mips64-elf-gcc")
        );
    }
}
