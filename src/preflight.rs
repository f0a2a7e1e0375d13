//! Tooling checks run before provisioning an environment.

use serde::Serialize;
use std::process::Command;
use tracing::{info, warn};

/// A required command line tool, checked by running it.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub name: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub hint: &'static str,
}

pub const REQUIREMENTS: [Requirement; 3] = [
    Requirement {
        name: "aws-cli",
        program: "aws",
        args: &["--version"],
        hint: "install the AWS CLI",
    },
    Requirement {
        name: "aws-credentials",
        program: "aws",
        args: &["sts", "get-caller-identity"],
        hint: "run `aws configure`",
    },
    Requirement {
        name: "cargo",
        program: "cargo",
        args: &["--version"],
        hint: "install a Rust toolchain",
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// One command line run with its environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: &'static str,
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(&'static str, String)>,
    pub hint: &'static str,
}

impl Invocation {
    pub fn new(name: &'static str, program: &str, args: &[&str], hint: &'static str) -> Self {
        Self {
            name,
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            envs: Vec::new(),
            hint,
        }
    }

    pub fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.envs.push((key, value.into()));
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&Requirement> for Invocation {
    fn from(requirement: &Requirement) -> Self {
        Invocation::new(
            requirement.name,
            requirement.program,
            requirement.args,
            requirement.hint,
        )
    }
}

/// Run an invocation, returning its result and captured stdout.
pub fn invoke(invocation: &Invocation) -> (CheckResult, String) {
    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .envs(invocation.envs.iter().map(|(k, v)| (*k, v.as_str())))
        .output();

    let (passed, detail, stdout) = match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            // some tools print their version on stderr
            let first_line = stdout
                .lines()
                .chain(stderr.lines())
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            (true, first_line, stdout)
        }
        Ok(output) => (
            false,
            format!(
                "`{}` exited with {}; {}",
                invocation.command_line(),
                output.status,
                invocation.hint
            ),
            String::new(),
        ),
        Err(e) => (
            false,
            format!("{} not runnable ({}); {}", invocation.program, e, invocation.hint),
            String::new(),
        ),
    };

    if passed {
        info!("[{}] ok: {}", invocation.name, detail);
    } else {
        warn!("[{}] failed: {}", invocation.name, detail);
    }

    (
        CheckResult {
            name: invocation.name,
            passed,
            detail,
        },
        stdout,
    )
}

pub fn check(requirement: &Requirement) -> CheckResult {
    invoke(&Invocation::from(requirement)).0
}

pub fn run(requirements: &[Requirement]) -> Vec<CheckResult> {
    requirements.iter().map(check).collect()
}
