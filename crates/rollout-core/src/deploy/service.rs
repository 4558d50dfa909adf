//! Post-cutover service hooks

use std::process::Command;

use crate::release::Release;
use crate::target::DeploymentTarget;
use crate::{Error, Result};

/// Reloads or restarts whatever serves a target after a cutover
pub trait ServiceController {
    fn reload(&self, target: &DeploymentTarget, release: &Release) -> Result<()>;
}

/// Controller for targets without a hook
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopController;

impl ServiceController for NoopController {
    fn reload(&self, target: &DeploymentTarget, _release: &Release) -> Result<()> {
        tracing::debug!(target_name = %target.name, "No post-activate hook configured");
        Ok(())
    }
}

/// Runs a shell command after cutover.
///
/// `{target}`, `{release}` and `{path}` in the command are replaced with the
/// target name, release id and release directory.
#[derive(Debug, Clone)]
pub struct ShellHook {
    command: String,
}

impl ShellHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The command with placeholders filled in
    pub fn render(&self, target: &DeploymentTarget, release: &Release) -> String {
        self.command
            .replace("{target}", &target.name)
            .replace("{release}", release.id.as_str())
            .replace("{path}", release.path.as_str())
    }
}

impl ServiceController for ShellHook {
    fn reload(&self, target: &DeploymentTarget, release: &Release) -> Result<()> {
        let command = self.render(target, release);
        tracing::info!("Running post-activate: {}", command);

        let status = Command::new("sh")
            .args(["-c", &command])
            .current_dir(&target.root)
            .env("ROLLOUT_TARGET", &target.name)
            .env("ROLLOUT_RELEASE", release.id.as_str())
            .env("ROLLOUT_RELEASE_PATH", release.path.as_str())
            .status()?;

        if !status.success() {
            return Err(Error::service(
                format!(
                    "post_activate command failed with exit code: {:?}",
                    status.code()
                ),
                "Check the post_activate command in your rollout.toml",
            ));
        }

        Ok(())
    }
}
