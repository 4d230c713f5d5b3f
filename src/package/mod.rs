use crate::config::Config;

pub mod binutils;
pub mod gcc;
pub mod gmp;
pub mod mpc;
pub mod mpfr;
pub mod newlib;

pub const GNU_MIRROR: &str = "https://ftp.gnu.org/gnu";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageSource {
    pub url: String,
    /// Expected archive file name, also the fetch-if-absent key.
    pub archive: String,
}

/// Symlink `name` inside the package source tree pointing at the source
/// tree of `package`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageLink {
    pub name: String,
    pub package: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recipe {
    pub configure: Vec<String>,
    pub environment: Vec<(String, String)>,
    pub make: Vec<String>,
    pub install: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub source: PackageSource,
    pub patches: Vec<String>,
    pub links: Vec<PackageLink>,
    pub recipe: Option<Recipe>,
}

impl Package {
    /// A package fetched from `<mirror>/<name>/<name>-<version>.<extension>`.
    pub fn gnu(name: &str, version: &str, extension: &str) -> Self {
        let archive = format!("{}-{}.{}", name, version, extension);

        Self::new(
            name,
            version,
            PackageSource {
                url: format!("{}/{}/{}", GNU_MIRROR, name, archive),
                archive,
            },
        )
    }

    pub fn new(name: &str, version: &str, source: PackageSource) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            source,
            patches: vec![],
            links: vec![],
            recipe: None,
        }
    }

    pub fn with_patch(mut self, patch: &str) -> Self {
        self.patches.push(patch.to_string());
        self
    }

    pub fn with_link(mut self, name: &str, package: &str) -> Self {
        self.links.push(PackageLink {
            name: name.to_string(),
            package: package.to_string(),
        });
        self
    }

    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    /// Top-level directory of the extracted archive.
    pub fn source_dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Configure arguments every recipe starts with.
pub fn configure_defaults(config: &Config) -> Vec<String> {
    let mut args = vec![
        format!("--prefix={}", config.install_path.display()),
        format!("--target={}", config.triplets.target),
    ];

    if let Some(build) = &config.triplets.build {
        args.push(format!("--build={}", build));
    }

    if let Some(host) = &config.triplets.host {
        args.push(format!("--host={}", host));
    }

    args
}

/// Every package in processing order: source-only dependencies first, then
/// the three toolchain builds.
pub fn toolchain(config: &Config) -> Vec<Package> {
    vec![
        gmp::package(),
        mpc::package(),
        mpfr::package(),
        binutils::package(config),
        gcc::package(config),
        newlib::package(config),
    ]
}

/// Archive file names of every package; needs no install directory.
pub fn archives() -> Vec<String> {
    [
        gmp::package(),
        mpc::package(),
        mpfr::package(),
        binutils::source(),
        gcc::source(),
        newlib::source(),
    ]
    .into_iter()
    .map(|package| package.source.archive)
    .collect()
}
