use crate::package::Package;

pub const VERSION: &str = "4.1.0";

pub fn package() -> Package {
    Package::gnu("mpfr", VERSION, "tar.gz")
}
