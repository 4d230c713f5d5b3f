use crate::config::Config;
use crate::package::{configure_defaults, gmp, mpc, mpfr, Package, Recipe};

pub const VERSION: &str = "12.2.0";

const CONFIGURE_FLAGS: &[&str] = &[
    "--with-arch=vr4300",
    "--with-tune=vr4300",
    "--enable-languages=c,c++",
    "--without-headers",
    "--with-newlib",
    "--disable-libssp",
    "--enable-multilib",
    "--disable-shared",
    "--with-gcc",
    "--disable-threads",
    "--disable-win32-registry",
    "--disable-nls",
    "--disable-werror",
    "--with-system-zlib",
];

pub fn source() -> Package {
    Package::gnu("gcc", VERSION, "tar.gz")
        .with_patch(&format!("gcc-{}.patch", VERSION))
        .with_link("gmp", &gmp::package().name)
        .with_link("mpc", &mpc::package().name)
        .with_link("mpfr", &mpfr::package().name)
}

pub fn package(config: &Config) -> Package {
    let mut configure = configure_defaults(config);

    configure.extend(CONFIGURE_FLAGS.iter().map(|flag| flag.to_string()));

    // libgcc only: libstdc++ needs the C library, which is built afterwards
    source().with_recipe(Recipe {
        configure,
        environment: vec![],
        make: vec!["all-gcc".to_string(), "all-target-libgcc".to_string()],
        install: vec![
            "install-strip-gcc".to_string(),
            "install-target-libgcc".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::tests::config;

    #[test]
    fn target_flags() {
        let gcc = package(&config(None, None));
        let recipe = gcc.recipe.unwrap();

        assert!(recipe.configure.contains(&"--with-arch=vr4300".to_string()));
        assert!(recipe.configure.contains(&"--with-newlib".to_string()));
        assert_eq!(recipe.make, ["all-gcc", "all-target-libgcc"]);
    }

    #[test]
    fn links_math_libraries() {
        let gcc = package(&config(None, None));
        let links: Vec<_> = gcc.links.iter().map(|l| l.name.as_str()).collect();

        assert_eq!(links, ["gmp", "mpc", "mpfr"]);
        assert_eq!(gcc.patches, ["gcc-12.2.0.patch"]);
    }
}
