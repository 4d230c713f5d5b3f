use anyhow::{anyhow, bail, Context, Result};
use console::style;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::{wrappers::SplitStream, StreamExt};
use tracing::{debug, info, warn};

/// One external command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
    pub environment: Vec<(String, OsString)>,
    pub current_dir: Option<PathBuf>,
}

impl StepCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.current_dir {
            write!(f, "(cd {} && ", dir.display())?;
        }

        for (key, value) in &self.environment {
            if key != "PATH" {
                write!(f, "{}={} ", key, shell_quote(&value.to_string_lossy()))?;
            }
        }

        let argv = self
            .argv()
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");

        write!(f, "{}", argv)?;

        if self.current_dir.is_some() {
            write!(f, ")")?;
        }

        Ok(())
    }
}

/// Quotes an argument for `sh` when it contains anything beyond a safe set.
pub fn shell_quote(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c);

    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub fn get_prefix(name: &str) -> String {
    style(format!("{} |>", name)).bold().to_string()
}

/// Runs a command to completion, logging its merged output line by line.
pub async fn run_step(name: &str, step: &StepCommand) -> Result<()> {
    info!("{} {}", get_prefix(name), step);

    let mut command = Command::new(&step.program);

    command.args(&step.args);

    if let Some(dir) = &step.current_dir {
        command.current_dir(dir);
    }

    for (key, value) in &step.environment {
        command.env(key, value);
    }

    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn: {}", step.program))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to capture stdout of {}", step.program))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("failed to capture stderr of {}", step.program))?;

    // raw lines: build tools may print bytes that are not utf-8
    let stdout = SplitStream::new(BufReader::new(stdout).split(b'\n'));
    let stderr = SplitStream::new(BufReader::new(stderr).split(b'\n'));

    let mut stdio_merged = StreamExt::merge(stdout, stderr);

    let prefix = get_prefix(name);

    while let Some(line) = stdio_merged.next().await {
        let output = match line {
            Ok(output) => output,
            Err(err) => {
                if let Err(kill_err) = child.kill().await {
                    warn!("failed to kill {}: {}", step.program, kill_err);
                }

                return Err(anyhow::Error::new(err)
                    .context(format!("failed to read output of {}", step.program)));
            }
        };

        let output = String::from_utf8_lossy(&output);

        info!("{} {}", prefix, output.trim_end_matches('\r'));
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to wait for {}", step.program))?;

    debug!("{} exited with {}", step.program, status);

    if !status.success() {
        bail!("command failed ({}): {}", status, step);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(shell_quote("--prefix=/opt/mips"), "--prefix=/opt/mips");
        assert_eq!(shell_quote("-DHAVE_ASSERT_FUNC -O2"), "'-DHAVE_ASSERT_FUNC -O2'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn display_hides_path() {
        let step = StepCommand::new("make")
            .args(["-j4", "all"])
            .env("PATH", "/usr/bin")
            .env("CFLAGS_FOR_TARGET", "-O2 -g")
            .current_dir("/work/newlib_compile_target");

        assert_eq!(
            step.to_string(),
            "(cd /work/newlib_compile_target && CFLAGS_FOR_TARGET='-O2 -g' make -j4 all)"
        );
    }

    #[tokio::test]
    async fn successful_step() {
        let temp = tempfile::tempdir().unwrap();
        let step = StepCommand::new("sh")
            .args(["-c", "echo out; echo err >&2; touch marker"])
            .current_dir(temp.path());

        run_step("test", &step).await.unwrap();

        assert!(temp.path().join("marker").exists());
    }

    #[tokio::test]
    async fn environment_is_passed() {
        let temp = tempfile::tempdir().unwrap();
        let step = StepCommand::new("sh")
            .args(["-c", "test \"$CROSSFORGE_TEST\" = yes"])
            .env("CROSSFORGE_TEST", "yes")
            .current_dir(temp.path());

        run_step("test", &step).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_utf8_output_is_logged() {
        let temp = tempfile::tempdir().unwrap();
        let step = StepCommand::new("sh")
            .args(["-c", "printf 'caf\\351\\n'; printf 'ok\\n' >&2; touch done"])
            .current_dir(temp.path());

        run_step("test", &step).await.unwrap();

        assert!(temp.path().join("done").exists());
    }

    #[tokio::test]
    async fn failing_step() {
        let step = StepCommand::new("sh").args(["-c", "exit 3"]);

        let err = run_step("test", &step).await.unwrap_err().to_string();

        assert!(err.contains("command failed"));
    }

    #[tokio::test]
    async fn missing_program() {
        let step = StepCommand::new("crossforge-no-such-tool");

        assert!(run_step("test", &step).await.is_err());
    }
}
