use crate::config::Config;
use crate::package::{configure_defaults, Package, PackageSource, Recipe};

pub const VERSION: &str = "4.2.0.20211231";

pub const CFLAGS_FOR_TARGET: &str = "-DHAVE_ASSERT_FUNC -O2";

pub fn source() -> Package {
    let archive = format!("newlib-{}.tar.gz", VERSION);

    Package::new(
        "newlib",
        VERSION,
        PackageSource {
            url: format!("https://sourceware.org/pub/newlib/{}", archive),
            archive,
        },
    )
    .with_patch(&format!("newlib-{}.patch", VERSION))
}

pub fn package(config: &Config) -> Package {
    let mut configure = configure_defaults(config);

    configure.extend([
        "--with-cpu=mips64vr4300".to_string(),
        "--disable-threads".to_string(),
        "--disable-libssp".to_string(),
        "--disable-werror".to_string(),
    ]);

    source().with_recipe(Recipe {
        configure,
        environment: vec![(
            "CFLAGS_FOR_TARGET".to_string(),
            CFLAGS_FOR_TARGET.to_string(),
        )],
        make: vec!["all".to_string()],
        install: vec!["install".to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::tests::config;

    #[test]
    fn sourceware_url() {
        let newlib = package(&config(None, None));

        assert_eq!(
            newlib.source.url,
            "https://sourceware.org/pub/newlib/newlib-4.2.0.20211231.tar.gz"
        );
        assert_eq!(newlib.source_dir_name(), "newlib-4.2.0.20211231");
    }

    #[test]
    fn target_cflags() {
        let recipe = package(&config(None, None)).recipe.unwrap();

        assert_eq!(
            recipe.environment,
            [(
                "CFLAGS_FOR_TARGET".to_string(),
                "-DHAVE_ASSERT_FUNC -O2".to_string()
            )]
        );
    }
}
