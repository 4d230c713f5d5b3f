use crate::package::Package;

pub const VERSION: &str = "1.2.1";

pub fn package() -> Package {
    Package::gnu("mpc", VERSION, "tar.gz")
}
