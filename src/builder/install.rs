use crate::builder::step::{run_step, shell_quote, StepCommand};
use crate::system::command_exists;
use anyhow::{bail, Result};
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Privilege strategies tried, in order, for install steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escalation {
    Direct,
    Sudo,
    Su,
}

pub const ESCALATION_CHAIN: [Escalation; 3] =
    [Escalation::Direct, Escalation::Sudo, Escalation::Su];

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Escalation::Direct => "direct",
            Escalation::Sudo => "sudo",
            Escalation::Su => "su",
        };

        f.write_str(name)
    }
}

/// The step's argv, preceded by `env KEY=VALUE...` when it carries an
/// environment. `sudo` and `su` reset the environment otherwise.
fn env_argv(step: &StepCommand) -> Vec<String> {
    let mut argv = vec![];

    if !step.environment.is_empty() {
        argv.push("env".to_string());
        argv.extend(
            step.environment
                .iter()
                .map(|(key, value)| format!("{}={}", key, value.to_string_lossy())),
        );
    }

    argv.extend(step.argv());
    argv
}

impl Escalation {
    /// Tool the strategy depends on, if any.
    pub fn program(&self) -> Option<&'static str> {
        match self {
            Escalation::Direct => None,
            Escalation::Sudo => Some("sudo"),
            Escalation::Su => Some("su"),
        }
    }

    pub fn wrap(&self, step: &StepCommand) -> StepCommand {
        match self {
            Escalation::Direct => step.clone(),
            Escalation::Sudo => StepCommand {
                program: "sudo".to_string(),
                args: env_argv(step),
                ..step.clone()
            },
            Escalation::Su => {
                let command = env_argv(step)
                    .iter()
                    .map(|arg| shell_quote(arg))
                    .collect::<Vec<_>>()
                    .join(" ");

                StepCommand {
                    program: "su".to_string(),
                    args: vec!["-c".to_string(), command],
                    ..step.clone()
                }
            }
        }
    }
}

/// Runs an install step through each strategy until one succeeds.
pub async fn run_install(name: &str, step: &StepCommand, chain: &[Escalation]) -> Result<()> {
    run_install_with(step, chain, command_exists, |wrapped| async move {
        run_step(name, &wrapped).await
    })
    .await
}

/// Escalation loop over an injected tool lookup and step runner.
pub async fn run_install_with<E, R, F>(
    step: &StepCommand,
    chain: &[Escalation],
    exists: E,
    mut run: R,
) -> Result<()>
where
    E: Fn(&str) -> bool,
    R: FnMut(StepCommand) -> F,
    F: Future<Output = Result<()>>,
{
    let mut failures = vec![];

    for escalation in chain {
        if let Some(program) = escalation.program() {
            if !exists(program) {
                warn!("install ({}) skipped: {} not found", escalation, program);
                failures.push(format!("{}: {} not found", escalation, program));
                continue;
            }
        }

        match run(escalation.wrap(step)).await {
            Ok(()) => {
                info!("install ({}) succeeded", escalation);
                return Ok(());
            }
            Err(err) => {
                warn!("install ({}) failed: {}", escalation, err);
                failures.push(format!("{}: {}", escalation, err));
            }
        }
    }

    bail!(
        "install failed with every strategy: {}",
        failures.join("; ")
    )
}
