//! Command runners: the local shell vs. the Multipass instance.
//!
//! Operations are written against `CommandRunner` and never pick a strategy
//! themselves; the context resolved at startup decides which implementation
//! they get, and every source-tree command of an operation goes through the
//! same one.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::host::ExecutionContext;
use crate::process::{Cmd, CommandResult};

/// A command as an argument vector plus an optional working directory.
///
/// Specs are data, not strings: arguments are never joined, quoted, or
/// re-parsed on the way to the tool.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// One-line rendering for `--echo` tracing and error messages.
    pub fn render(&self) -> String {
        let mut parts = vec![self.program.clone()];
        for arg in &self.args {
            if arg.contains(char::is_whitespace) || arg.is_empty() {
                parts.push(format!("'{}'", arg));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Executes command specs in one execution context.
pub trait CommandRunner {
    /// Human-readable name of the context, for error messages.
    fn context_name(&self) -> String;

    /// Run a spec, capturing output. A non-zero exit is returned in the
    /// result, not an error; use this for idempotency probes.
    fn try_run(&self, spec: &CommandSpec) -> Result<CommandResult>;

    /// Run a spec with inherited stdio, failing on non-zero exit.
    fn stream(&self, spec: &CommandSpec) -> Result<()>;

    /// Run a spec, capturing output and failing on non-zero exit.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let result = self.try_run(spec)?;
        if !result.success() {
            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!(
                    "`{}` failed in {} (exit code {})",
                    spec.render(),
                    self.context_name(),
                    result.code()
                );
            } else {
                bail!(
                    "`{}` failed in {} (exit code {}):\n{}",
                    spec.render(),
                    self.context_name(),
                    result.code(),
                    stderr
                );
            }
        }
        Ok(result)
    }
}

/// Runs commands directly on this host.
pub struct LocalRunner {
    echo: bool,
}

impl LocalRunner {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }

    fn trace(&self, spec: &CommandSpec) {
        if self.echo {
            println!("+ {}", spec.render());
        }
    }
}

impl CommandRunner for LocalRunner {
    fn context_name(&self) -> String {
        "local shell".to_string()
    }

    fn try_run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        self.trace(spec);
        let mut cmd = Cmd::from_parts(&spec.program, &spec.args).allow_fail();
        if let Some(ref dir) = spec.dir {
            cmd = cmd.dir(dir);
        }
        cmd.run()
    }

    fn stream(&self, spec: &CommandSpec) -> Result<()> {
        self.trace(spec);
        let mut cmd = Cmd::from_parts(&spec.program, &spec.args)
            .error_msg(format!("`{}` failed in {}", spec.render(), self.context_name()));
        if let Some(ref dir) = spec.dir {
            cmd = cmd.dir(dir);
        }
        cmd.run_streamed()?;
        Ok(())
    }
}

/// Runs commands inside a Multipass instance via `multipass exec`.
pub struct MultipassRunner {
    instance: String,
    echo: bool,
}

impl MultipassRunner {
    pub fn new(instance: impl AsRef<str>, echo: bool) -> Self {
        Self {
            instance: instance.as_ref().to_string(),
            echo,
        }
    }

    fn wrap(&self, spec: &CommandSpec) -> CommandSpec {
        CommandSpec {
            program: "multipass".to_string(),
            args: multipass_exec_argv(&self.instance, spec),
            dir: None,
        }
    }
}

impl CommandRunner for MultipassRunner {
    fn context_name(&self) -> String {
        format!("Multipass instance '{}'", self.instance)
    }

    fn try_run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let wrapped = self.wrap(spec);
        if self.echo {
            println!("+ {}", wrapped.render());
        }
        Cmd::from_parts(&wrapped.program, &wrapped.args)
            .allow_fail()
            .run()
    }

    fn stream(&self, spec: &CommandSpec) -> Result<()> {
        let wrapped = self.wrap(spec);
        if self.echo {
            println!("+ {}", wrapped.render());
        }
        Cmd::from_parts(&wrapped.program, &wrapped.args)
            .error_msg(format!("`{}` failed in {}", spec.render(), self.context_name()))
            .run_streamed()?;
        Ok(())
    }
}

/// Build the `multipass exec` argument vector for a spec.
///
/// The working directory travels as `--working-directory`; the guest argv
/// follows the `--` separator untouched.
pub fn multipass_exec_argv(instance: &str, spec: &CommandSpec) -> Vec<String> {
    let mut argv = vec!["exec".to_string(), instance.to_string()];
    if let Some(ref dir) = spec.dir {
        argv.push("--working-directory".to_string());
        argv.push(dir.to_string_lossy().into_owned());
    }
    argv.push("--".to_string());
    argv.push(spec.program.clone());
    argv.extend(spec.args.iter().cloned());
    argv
}

/// Pick the runner for the resolved execution context.
pub fn for_context(context: ExecutionContext, config: &Config) -> Box<dyn CommandRunner> {
    match context {
        ExecutionContext::Local => Box::new(LocalRunner::new(config.echo)),
        ExecutionContext::RemoteVm => Box::new(MultipassRunner::new(&config.instance, config.echo)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipass_exec_argv_with_dir() {
        let spec = CommandSpec::new("make")
            .arg("clean")
            .dir(Path::new("/home/ubuntu/shim"));
        let argv = multipass_exec_argv("shim-builder", &spec);

        assert_eq!(
            argv,
            vec![
                "exec",
                "shim-builder",
                "--working-directory",
                "/home/ubuntu/shim",
                "--",
                "make",
                "clean",
            ]
        );
    }

    #[test]
    fn test_multipass_exec_argv_without_dir() {
        let spec = CommandSpec::new("git").args(["clone", "url", "dest"]);
        let argv = multipass_exec_argv("vm", &spec);

        assert_eq!(argv, vec!["exec", "vm", "--", "git", "clone", "url", "dest"]);
    }

    #[test]
    fn test_render_quotes_whitespace_args() {
        let spec = CommandSpec::new("make").arg("VENDOR=a b");
        assert_eq!(spec.render(), "make 'VENDOR=a b'");
    }

    #[test]
    fn test_local_runner_try_run_reports_failure() {
        let runner = LocalRunner::new(false);
        let result = runner.try_run(&CommandSpec::new("false")).unwrap();
        assert!(!result.success());
    }

    #[test]
    fn test_local_runner_run_bails_on_failure() {
        let runner = LocalRunner::new(false);
        let err = runner.run(&CommandSpec::new("false")).unwrap_err();
        assert!(err.to_string().contains("local shell"));
    }

    #[test]
    fn test_local_runner_respects_dir() {
        let runner = LocalRunner::new(false);
        let spec = CommandSpec::new("pwd").dir(Path::new("/tmp"));
        let result = runner.run(&spec).unwrap();
        assert!(result.stdout_trimmed().contains("tmp"));
    }
}
