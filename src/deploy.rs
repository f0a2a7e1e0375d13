//! Deployment driver: preflight, dependency install, build, provision, stack outputs.
//!
//! Every step shells out through [`preflight::invoke`] and the run stops at
//! the first failing step. Provisioning is done by the CDK CLI reading the
//! manifest written from [`PipelineResources`].

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::preflight::{self, CheckResult, Invocation, Requirement};
use crate::resources::PipelineResources;

pub const DEFAULT_STACK_NAME: &str = "DataPipelineStack";
pub const MANIFEST_ENV: &str = "DATA_PIPELINE_MANIFEST";

/// Provisioner required on top of the preflight checks.
pub const CDK_REQUIREMENT: Requirement = Requirement {
    name: "cdk",
    program: "cdk",
    args: &["--version"],
    hint: "install the AWS CDK CLI (`npm install -g aws-cdk`)",
};

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub account: String,
    pub region: String,
    pub stack_name: String,
    pub manifest_path: PathBuf,
    pub skip_bootstrap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DeployReport {
    pub steps: Vec<CheckResult>,
    pub outputs: Vec<StackOutput>,
}

impl DeployReport {
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|step| step.passed)
    }

    fn push(&mut self, result: CheckResult) -> bool {
        let passed = result.passed;
        self.steps.push(result);
        passed
    }
}

/// Commands run before the manifest is written.
pub fn prepare_steps() -> Vec<Invocation> {
    preflight::REQUIREMENTS
        .iter()
        .chain(std::iter::once(&CDK_REQUIREMENT))
        .map(Invocation::from)
        .chain([
            Invocation::new("install", "cargo", &["fetch"], "check network access to crates.io"),
            Invocation::new(
                "build",
                "cargo",
                &["build", "--release"],
                "fix the build before deploying",
            ),
        ])
        .collect()
}

/// Commands run after the manifest is written.
pub fn provision_steps(options: &DeployOptions) -> Vec<Invocation> {
    let manifest = options.manifest_path.display().to_string();
    let mut steps = Vec::new();

    if !options.skip_bootstrap {
        let environment = format!("aws://{}/{}", options.account, options.region);
        steps.push(
            Invocation::new(
                "bootstrap",
                "cdk",
                &["bootstrap", environment.as_str()],
                "check that the account allows CDK bootstrapping",
            )
            .env(MANIFEST_ENV, manifest.clone()),
        );
    }

    steps.push(
        Invocation::new(
            "deploy",
            "cdk",
            &["deploy", options.stack_name.as_str(), "--require-approval", "never"],
            "inspect the CloudFormation events for the stack",
        )
        .env(MANIFEST_ENV, manifest)
        .env("AWS_DEFAULT_REGION", options.region.clone()),
    );

    steps
}

fn outputs_step(options: &DeployOptions) -> Invocation {
    Invocation::new(
        "outputs",
        "aws",
        &[
            "cloudformation",
            "describe-stacks",
            "--stack-name",
            options.stack_name.as_str(),
            "--region",
            options.region.as_str(),
            "--output",
            "json",
        ],
        "the stack may not have finished deploying",
    )
}

/// Pull `OutputKey`/`OutputValue` pairs out of `describe-stacks` JSON.
pub fn parse_outputs(describe_stacks: &str) -> Result<Vec<StackOutput>, serde_json::Error> {
    let document: Value = serde_json::from_str(describe_stacks)?;
    let outputs = document["Stacks"][0]["Outputs"]
        .as_array()
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|output| {
                    Some(StackOutput {
                        key: output["OutputKey"].as_str()?.to_string(),
                        value: output["OutputValue"].as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(outputs)
}

fn write_manifest(options: &DeployOptions) -> CheckResult {
    let resources = PipelineResources::for_environment(&options.account, &options.region);
    let written = resources
        .to_json()
        .map_err(|e| e.to_string())
        .and_then(|json| {
            if let Some(parent) = options.manifest_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            std::fs::write(&options.manifest_path, json).map_err(|e| e.to_string())
        });

    let (passed, detail) = match written {
        Ok(()) => (true, options.manifest_path.display().to_string()),
        Err(e) => (false, e),
    };
    CheckResult {
        name: "manifest",
        passed,
        detail,
    }
}

fn run_all(report: &mut DeployReport, steps: &[Invocation]) -> bool {
    steps
        .iter()
        .all(|step| report.push(preflight::invoke(step).0))
}

/// Run the whole deployment, stopping at the first failure.
pub fn run(options: &DeployOptions) -> DeployReport {
    let mut report = DeployReport::default();
    info!(
        "Deploying {} to {}/{}",
        options.stack_name, options.account, options.region
    );

    if !run_all(&mut report, &prepare_steps()) {
        return report;
    }
    if !report.push(write_manifest(options)) {
        return report;
    }
    if !run_all(&mut report, &provision_steps(options)) {
        return report;
    }

    let (result, stdout) = preflight::invoke(&outputs_step(options));
    if report.push(result) {
        match parse_outputs(&stdout) {
            Ok(outputs) => report.outputs = outputs,
            Err(e) => {
                report.push(CheckResult {
                    name: "outputs",
                    passed: false,
                    detail: format!("unreadable describe-stacks output: {e}"),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(skip_bootstrap: bool) -> DeployOptions {
        DeployOptions {
            account: "123456789012".to_string(),
            region: "eu-west-1".to_string(),
            stack_name: DEFAULT_STACK_NAME.to_string(),
            manifest_path: PathBuf::from("deploy/resources.json"),
            skip_bootstrap,
        }
    }

    #[test]
    fn test_prepare_runs_checks_before_build() {
        let names: Vec<&str> = prepare_steps().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["aws-cli", "aws-credentials", "cargo", "cdk", "install", "build"]
        );
    }

    #[test]
    fn test_provision_targets_environment() {
        let steps = provision_steps(&options(false));

        assert_eq!(steps[0].command_line(), "cdk bootstrap aws://123456789012/eu-west-1");
        assert_eq!(
            steps[1].command_line(),
            "cdk deploy DataPipelineStack --require-approval never"
        );
        assert!(steps[1]
            .envs
            .contains(&(MANIFEST_ENV, "deploy/resources.json".to_string())));
    }

    #[test]
    fn test_skip_bootstrap() {
        let steps = provision_steps(&options(true));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "deploy");
    }

    #[test]
    fn test_stops_at_first_failing_step() {
        let mut report = DeployReport::default();
        let steps = [
            Invocation::new("missing", "definitely-not-an-installed-tool", &[], "n/a"),
            Invocation::new("never", "cargo", &["--version"], "n/a"),
        ];

        assert!(!run_all(&mut report, &steps));
        assert_eq!(report.steps.len(), 1);
        assert!(!report.passed());
    }

    #[test]
    fn test_parse_stack_outputs() {
        let describe = r#"{"Stacks": [{"StackName": "DataPipelineStack", "Outputs": [
            {"OutputKey": "DataBucketName", "OutputValue": "data-pipeline-bucket-1-eu"},
            {"OutputKey": "ApiUrl", "OutputValue": "https://abc.execute-api.eu-west-1.amazonaws.com/prod/"},
            {"Description": "no key"}
        ]}]}"#;

        let outputs = parse_outputs(describe).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].key, "DataBucketName");
        assert_eq!(parse_outputs(r#"{"Stacks": []}"#).unwrap(), vec![]);
        assert!(parse_outputs("not json").is_err());
    }

    #[test]
    fn test_manifest_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(true);
        opts.manifest_path = dir.path().join("nested").join("resources.json");

        let result = write_manifest(&opts);

        assert!(result.passed, "{}", result.detail);
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&opts.manifest_path).unwrap()).unwrap();
        assert_eq!(written["account"], "123456789012");
    }
}
