use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::thread::available_parallelism;

pub fn command_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

pub fn require_command(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| anyhow!("required tool not found: {}", name))
}

pub fn processor_count() -> Option<usize> {
    available_parallelism().ok().map(|count| count.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_exists() {
        assert!(command_exists("sh"));
    }

    #[test]
    fn missing_command() {
        let name = "crossforge-no-such-tool";

        assert!(!command_exists(name));

        let err = require_command(name).unwrap_err().to_string();
        assert!(err.contains(name));
    }

    #[test]
    fn processors_detected() {
        assert!(processor_count().unwrap_or(1) >= 1);
    }
}
