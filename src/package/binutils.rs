use crate::config::Config;
use crate::package::{configure_defaults, Package, Recipe};

pub const VERSION: &str = "2.39";

pub fn source() -> Package {
    Package::gnu("binutils", VERSION, "tar.gz")
}

pub fn package(config: &Config) -> Package {
    let mut configure = configure_defaults(config);

    configure.extend([
        "--with-cpu=mips64vr4300".to_string(),
        "--disable-werror".to_string(),
    ]);

    source().with_recipe(Recipe {
        configure,
        environment: vec![],
        make: vec!["all".to_string()],
        install: vec!["install-strip".to_string()],
    })
}
