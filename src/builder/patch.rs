use crate::builder::step::{run_step, StepCommand};
use crate::config::Config;
use crate::package::Package;
use crate::store::paths::get_patch_path;
use anyhow::{bail, Result};
use std::path::Path;

pub fn command(source_dir: &Path, patch: &Path) -> StepCommand {
    StepCommand::new("patch").args([
        "-d".to_string(),
        source_dir.display().to_string(),
        "-p1".to_string(),
        "-i".to_string(),
        patch.display().to_string(),
    ])
}

/// Applies the package's patches, in order, to an extracted source tree.
pub async fn apply(config: &Config, package: &Package, source_dir: &Path) -> Result<()> {
    for patch in &package.patches {
        let patch_path = get_patch_path(config, patch);

        if !patch_path.is_file() {
            bail!("patch not found: {}", patch_path.display());
        }

        run_step(&package.name, &command(source_dir, &patch_path)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigArgs;
    use crate::package::{Package, PackageSource};
    use std::path::PathBuf;
    use tokio::fs;

    fn hello_package() -> Package {
        Package::new(
            "hello",
            "1.0",
            PackageSource {
                url: "https://example.invalid/hello-1.0.tar.gz".to_string(),
                archive: "hello-1.0.tar.gz".to_string(),
            },
        )
        .with_patch("hello.patch")
    }

    fn config(root: &Path) -> Config {
        let args = ConfigArgs {
            install: Some(PathBuf::from("inst")),
            ..Default::default()
        };

        Config::resolve_in(&args, root, Some(1)).unwrap()
    }

    #[test]
    fn patch_command_line() {
        let step = command(Path::new("/b/gcc-12.2.0"), Path::new("/p/gcc-12.2.0.patch"));

        assert_eq!(
            step.argv(),
            vec!["patch", "-d", "/b/gcc-12.2.0", "-p1", "-i", "/p/gcc-12.2.0.patch"]
        );
    }

    #[tokio::test]
    async fn missing_patch_fails() {
        let temp = tempfile::tempdir().unwrap();

        let err = apply(&config(temp.path()), &hello_package(), temp.path())
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("patch not found"));
    }

    #[tokio::test]
    async fn applies_unified_diff() {
        if !crate::system::command_exists("patch") {
            return;
        }

        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        let source_dir = temp.path().join("hello-1.0");

        fs::create_dir_all(&source_dir).await.unwrap();
        fs::create_dir_all(&config.patch_path).await.unwrap();
        fs::write(source_dir.join("greeting.txt"), "hello\n")
            .await
            .unwrap();
        fs::write(
            config.patch_path.join("hello.patch"),
            "--- a/greeting.txt\n+++ b/greeting.txt\n@@ -1 +1 @@\n-hello\n+hello mips\n",
        )
        .await
        .unwrap();

        apply(&config, &hello_package(), &source_dir).await.unwrap();

        assert_eq!(
            fs::read_to_string(source_dir.join("greeting.txt"))
                .await
                .unwrap(),
            "hello mips\n"
        );
    }
}
