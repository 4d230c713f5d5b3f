use crate::package::Package;

pub const VERSION: &str = "6.2.0";

pub fn package() -> Package {
    Package::gnu("gmp", VERSION, "tar.bz2")
}
