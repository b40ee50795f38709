//! `kubectl` lifecycle for integration tests that deploy Kubernetes resources.
//!
//! Directory operations require a directory holding at least one
//! `.yml`/`.yaml`/`.json` manifest and pass its absolute path to `-f`.
//! Waits, availability checks and status queries run from the current
//! directory; single-file operations run from the file's parent.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace, warn};

use crate::config::{RunnerConfig, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT};
use crate::error::{Error, PreconditionError, Result};
use crate::process::{absolute, CommandInvocation, CommandResult, ProcessExecutor, SystemExecutor};
use crate::validation::ValidationTarget;

/// Prefix of the text [`KubectlRunner::get_status`] returns when the query fails.
pub const STATUS_FAILURE_PREFIX: &str = "Failed to get resource status: ";

/// Kubernetes workload kinds that `kubectl wait` can block on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    Deployments,
    Pods,
}

impl WaitTarget {
    fn condition(self) -> &'static str {
        match self {
            WaitTarget::Deployments => "--for=condition=available",
            WaitTarget::Pods => "--for=condition=ready",
        }
    }

    fn resource(self) -> &'static str {
        match self {
            WaitTarget::Deployments => "deployment",
            WaitTarget::Pods => "pod",
        }
    }
}

/// Drives `kubectl` against manifest directories, files and namespaces.
#[derive(Debug, Clone)]
pub struct KubectlRunner<E = SystemExecutor> {
    executor: E,
    program: String,
    namespace: String,
    timeout: String,
}

impl KubectlRunner<SystemExecutor> {
    /// Runner that spawns the `kubectl` found on `PATH`.
    pub fn new() -> Self {
        Self::with_executor(SystemExecutor)
    }

    /// Runner using the program and defaults named in `config`.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::with_executor(SystemExecutor).with_config(config)
    }
}

impl Default for KubectlRunner<SystemExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ProcessExecutor> KubectlRunner<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            program: "kubectl".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT.to_string(),
        }
    }

    pub fn with_config(mut self, config: &RunnerConfig) -> Self {
        self.program = config.kubectl_program.clone();
        self.namespace = config.default_namespace.clone();
        self.timeout = config.default_timeout.clone();
        self
    }

    /// Replace the program invoked in place of `kubectl`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Namespace used by the `*_default` helpers.
    pub fn default_namespace(&self) -> &str {
        &self.namespace
    }

    /// Timeout used by the `*_default` helpers.
    pub fn default_timeout(&self) -> &str {
        &self.timeout
    }

    /// `kubectl apply -f <dir>`
    pub fn apply_directory(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = ValidationTarget::manifest_directory(dir.as_ref()).validate()?;
        debug!(dir = %dir.display(), "Applying Kubernetes resources");
        self.run_in_current_dir([OsStr::new("apply"), OsStr::new("-f"), dir.as_os_str()])?;
        debug!("Kubernetes resources applied");
        Ok(())
    }

    /// `kubectl apply -f <dir> --wait --timeout=<timeout>`
    pub fn apply_directory_and_wait(&self, dir: impl AsRef<Path>, timeout: &str) -> Result<()> {
        let dir = ValidationTarget::manifest_directory(dir.as_ref()).validate()?;
        debug!(dir = %dir.display(), timeout, "Applying Kubernetes resources and waiting");
        let timeout_arg = format!("--timeout={timeout}");
        self.run_in_current_dir([
            OsStr::new("apply"),
            OsStr::new("-f"),
            dir.as_os_str(),
            OsStr::new("--wait"),
            OsStr::new(&timeout_arg),
        ])?;
        debug!("Kubernetes resources applied and ready");
        Ok(())
    }

    /// [`Self::apply_directory_and_wait`] with the configured timeout.
    pub fn apply_directory_and_wait_default(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.apply_directory_and_wait(dir, &self.timeout)
    }

    /// `kubectl delete -f <dir> --ignore-not-found=true`
    pub fn delete_directory(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = ValidationTarget::manifest_directory(dir.as_ref()).validate()?;
        debug!(dir = %dir.display(), "Deleting Kubernetes resources");
        self.run_in_current_dir([
            OsStr::new("delete"),
            OsStr::new("-f"),
            dir.as_os_str(),
            OsStr::new("--ignore-not-found=true"),
        ])?;
        debug!("Kubernetes resources deleted");
        Ok(())
    }

    /// `kubectl apply -f <file>`, run from the file's parent directory.
    pub fn apply_file(&self, file: impl AsRef<Path>) -> Result<()> {
        let file = absolute(file.as_ref())?;
        debug!(file = %file.display(), "Applying Kubernetes resource file");
        self.run(parent_of(&file), [OsStr::new("apply"), OsStr::new("-f"), file.as_os_str()])?;
        debug!("Kubernetes resource file applied");
        Ok(())
    }

    /// `kubectl delete -f <file> --ignore-not-found=true`, run from the
    /// file's parent directory.
    pub fn delete_file(&self, file: impl AsRef<Path>) -> Result<()> {
        let file = absolute(file.as_ref())?;
        debug!(file = %file.display(), "Deleting Kubernetes resource file");
        self.run(
            parent_of(&file),
            [
                OsStr::new("delete"),
                OsStr::new("-f"),
                file.as_os_str(),
                OsStr::new("--ignore-not-found=true"),
            ],
        )?;
        debug!("Kubernetes resource file deleted");
        Ok(())
    }

    /// Block until every deployment in `namespace` is available.
    pub fn wait_for_deployments(&self, namespace: &str, timeout: &str) -> Result<()> {
        self.wait_for(WaitTarget::Deployments, namespace, timeout)
    }

    /// Block until every pod in `namespace` is ready.
    pub fn wait_for_pods(&self, namespace: &str, timeout: &str) -> Result<()> {
        self.wait_for(WaitTarget::Pods, namespace, timeout)
    }

    /// `kubectl wait --for=condition=<..> --timeout=<t> <kind> --all -n <ns>`
    pub fn wait_for(&self, target: WaitTarget, namespace: &str, timeout: &str) -> Result<()> {
        debug!(?target, namespace, timeout, "Waiting for resources");
        let timeout_arg = format!("--timeout={timeout}");
        self.run_in_current_dir([
            "wait",
            target.condition(),
            timeout_arg.as_str(),
            target.resource(),
            "--all",
            "-n",
            namespace,
        ])?;
        debug!(?target, namespace, "Resources ready");
        Ok(())
    }

    /// Confirm the client runs and the cluster answers.
    ///
    /// Runs `version --client` then `cluster-info`. Any failure is reported
    /// as [`Error::Unavailable`] with the original error as its source.
    pub fn check_availability(&self) -> Result<()> {
        trace!("Checking kubectl availability and cluster connection");
        let checked = self
            .run_in_current_dir(["version", "--client"])
            .and_then(|_| self.run_in_current_dir(["cluster-info"]));

        match checked {
            Ok(_) => {
                debug!("kubectl is available and cluster is accessible");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "kubectl is not available or cluster is not accessible");
                Err(Error::Unavailable {
                    tool: self.program.clone(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// `kubectl get all -n <namespace>` output, for diagnostics.
    ///
    /// A non-zero exit is not an error here: the captured output is returned
    /// behind [`STATUS_FAILURE_PREFIX`]. Failing to start kubectl still is.
    pub fn get_status(&self, namespace: &str) -> Result<String> {
        trace!(namespace, "Getting resource status");
        let invocation = self.invocation(Path::new("."), ["get", "all", "-n", namespace]);
        let result = self.executor.execute(&invocation)?;

        if !result.success() {
            warn!(output = %result.output, "Could not get resource status");
            return Ok(format!("{STATUS_FAILURE_PREFIX}{}", result.output));
        }

        trace!("Resource status retrieved");
        Ok(result.output)
    }

    /// [`Self::get_status`] for the configured namespace.
    pub fn get_status_default(&self) -> Result<String> {
        self.get_status(&self.namespace)
    }

    /// Run `kubectl <args...>` from `working_dir`, which must exist.
    pub fn run<I, S>(&self, working_dir: impl AsRef<Path>, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let working_dir = absolute(working_dir.as_ref())?;
        trace!(dir = %working_dir.display(), "Checking working directory");
        if !working_dir.exists() {
            error!(dir = %working_dir.display(), "Working directory not found");
            return Err(PreconditionError::WorkingDirectoryNotFound { path: working_dir }.into());
        }

        let invocation = self.invocation(&working_dir, args);
        trace!(command = %invocation, "Executing kubectl command");

        let result = self.executor.execute(&invocation)?;
        if !result.success() {
            error!(
                exit_code = result.exit_code,
                output = %result.output,
                "kubectl command failed"
            );
        }
        result.into_checked(&invocation)
    }

    fn run_in_current_dir<I, S>(&self, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run(".", args)
    }

    fn invocation<I, S>(&self, working_dir: &Path, args: I) -> CommandInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let argv = std::iter::once(OsString::from(&self.program))
            .chain(args.into_iter().map(Into::into));
        CommandInvocation::new(argv, working_dir)
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;
    use std::error::Error as _;
    use tempfile::{tempdir, TempDir};

    fn manifest_dir() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("deployment.yaml"), "kind: Deployment\n").unwrap();
        dir
    }

    fn runner() -> KubectlRunner<ScriptedExecutor> {
        KubectlRunner::with_executor(ScriptedExecutor::new())
    }

    fn argv(runner: &KubectlRunner<ScriptedExecutor>) -> Vec<Vec<OsString>> {
        runner
            .executor()
            .invocations()
            .into_iter()
            .map(|i| i.argv)
            .collect()
    }

    #[test]
    fn test_apply_directory() {
        let dir = manifest_dir();
        let runner = runner();
        runner.apply_directory(dir.path()).unwrap();

        let abs = dir.path().display().to_string();
        assert_eq!(argv(&runner), vec![vec!["kubectl", "apply", "-f", abs.as_str()]]);
    }

    #[test]
    fn test_apply_directory_and_wait() {
        let dir = manifest_dir();
        let runner = runner();
        runner.apply_directory_and_wait(dir.path(), "60s").unwrap();

        let abs = dir.path().display().to_string();
        assert_eq!(
            argv(&runner),
            vec![vec![
                "kubectl",
                "apply",
                "-f",
                abs.as_str(),
                "--wait",
                "--timeout=60s"
            ]]
        );
    }

    #[test]
    fn test_apply_directory_and_wait_default_timeout() {
        let dir = manifest_dir();
        let runner = runner();
        runner.apply_directory_and_wait_default(dir.path()).unwrap();
        assert_eq!(argv(&runner)[0].last().unwrap(), "--timeout=300s");
    }

    #[test]
    fn test_delete_directory_ignores_not_found() {
        let dir = manifest_dir();
        let runner = runner();
        runner.delete_directory(dir.path()).unwrap();

        let calls = argv(&runner);
        assert_eq!(calls[0][1], "delete");
        assert_eq!(calls[0].last().unwrap(), "--ignore-not-found=true");
    }

    #[test]
    fn test_directory_without_manifests_spawns_nothing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let runner = runner();

        for err in [
            runner.apply_directory(dir.path()).unwrap_err(),
            runner.apply_directory_and_wait(dir.path(), "60s").unwrap_err(),
            runner.delete_directory(dir.path()).unwrap_err(),
        ] {
            assert!(err.is_precondition());
            assert!(err.to_string().contains("No YAML/JSON files found"));
        }
        assert!(runner.executor().invocations().is_empty());
    }

    #[test]
    fn test_apply_and_delete_file_run_from_parent() {
        let dir = manifest_dir();
        let file = dir.path().join("deployment.yaml");
        let runner = runner();

        runner.apply_file(&file).unwrap();
        runner.delete_file(&file).unwrap();

        let calls = runner.executor().invocations();
        assert_eq!(calls[0].args(), ["apply", "-f", file.to_str().unwrap()]);
        assert_eq!(calls[0].working_dir, dir.path());
        assert_eq!(calls[1].args()[0], "delete");
        assert_eq!(calls[1].args()[3], "--ignore-not-found=true");
        assert_eq!(calls[1].working_dir, dir.path());
    }

    #[test]
    fn test_wait_for_deployments_and_pods() {
        let runner = runner();
        runner.wait_for_deployments("monitoring-app", "600s").unwrap();
        runner.wait_for_pods("default", "300s").unwrap();

        assert_eq!(
            argv(&runner),
            vec![
                vec![
                    "kubectl",
                    "wait",
                    "--for=condition=available",
                    "--timeout=600s",
                    "deployment",
                    "--all",
                    "-n",
                    "monitoring-app"
                ],
                vec![
                    "kubectl",
                    "wait",
                    "--for=condition=ready",
                    "--timeout=300s",
                    "pod",
                    "--all",
                    "-n",
                    "default"
                ],
            ]
        );
    }

    #[test]
    fn test_check_availability_runs_both_checks() {
        let runner = runner();
        runner.check_availability().unwrap();
        assert_eq!(
            argv(&runner),
            vec![
                vec!["kubectl", "version", "--client"],
                vec!["kubectl", "cluster-info"]
            ]
        );
    }

    #[test]
    fn test_check_availability_wraps_cluster_failure() {
        let runner = runner();
        runner.executor().push_result(CommandResult::new(0, "Client Version: v1.30.0"));
        runner.executor().push_result(CommandResult::new(
            1,
            "The connection to the server localhost:8080 was refused",
        ));

        let err = runner.check_availability().unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
        assert_eq!(
            err.to_string(),
            "kubectl is not available or cluster is not accessible"
        );
        let cause = err.source().expect("cause preserved");
        assert!(cause.to_string().contains("was refused"));
    }

    #[test]
    fn test_check_availability_wraps_missing_tool() {
        let runner = runner();
        runner.executor().push_spawn_failure();

        let err = runner.check_availability().unwrap_err();
        match err {
            Error::Unavailable { source, .. } => {
                assert!(matches!(*source, Error::Spawn { .. }))
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        // cluster-info is never attempted once the client check fails
        assert_eq!(runner.executor().invocations().len(), 1);
    }

    #[test]
    fn test_get_status_success() {
        let runner = runner();
        runner
            .executor()
            .push_result(CommandResult::new(0, "NAME READY\npod/web 1/1\n"));

        let status = runner.get_status("default").unwrap();
        assert_eq!(status, "NAME READY\npod/web 1/1\n");
        assert_eq!(argv(&runner)[0], vec!["kubectl", "get", "all", "-n", "default"]);
    }

    #[test]
    fn test_get_status_failure_is_returned_not_raised() {
        let runner = runner();
        runner.executor().push_result(CommandResult::new(
            1,
            "Error from server (NotFound): namespaces \"ghost\" not found",
        ));

        let status = runner.get_status("ghost").unwrap();
        assert!(status.starts_with(STATUS_FAILURE_PREFIX));
        assert!(status.contains("namespaces \"ghost\" not found"));
    }

    #[test]
    fn test_run_requires_existing_working_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let runner = runner();

        let err = runner.run(&missing, ["get", "pods"]).unwrap_err();
        assert!(err.to_string().contains("Working directory not found"));
        assert!(runner.executor().invocations().is_empty());
    }

    #[test]
    fn test_run_propagates_exit_code_and_output() {
        let runner = runner();
        runner.executor().push_result(CommandResult::new(
            1,
            "error: the server doesn't have a resource type \"widgets\"",
        ));

        let err = runner.run(".", ["get", "widgets"]).unwrap_err();
        let exec = err.as_execution().expect("execution error");
        assert_eq!(exec.exit_code, 1);
        assert!(err
            .to_string()
            .contains("the server doesn't have a resource type \"widgets\""));
    }

    #[test]
    fn test_config_applies_program_and_defaults() {
        let config = RunnerConfig {
            kubectl_program: "k3s-kubectl".to_string(),
            default_namespace: "monitoring-app".to_string(),
            default_timeout: "90s".to_string(),
            ..RunnerConfig::default()
        };
        let runner = KubectlRunner::with_executor(ScriptedExecutor::new()).with_config(&config);

        runner.get_status_default().unwrap();
        assert_eq!(runner.default_timeout(), "90s");
        assert_eq!(
            argv(&runner)[0],
            vec!["k3s-kubectl", "get", "all", "-n", "monitoring-app"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_manifest_paths_reach_kubectl_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let root = tempdir().unwrap();
        let dir = root.path().join(OsStr::from_bytes(b"proj\xff"));
        std::fs::create_dir(&dir).unwrap();
        let file = dir.join("deployment.yaml");
        std::fs::write(&file, "kind: Deployment\n").unwrap();
        let runner = runner();

        runner.apply_directory(&dir).unwrap();
        runner.apply_file(&file).unwrap();

        let calls = argv(&runner);
        assert_eq!(Path::new(&calls[0][3]), dir.as_path());
        assert_eq!(Path::new(&calls[1][3]), file.as_path());
        assert!(Path::new(&calls[0][3]).is_dir());
        assert!(Path::new(&calls[1][3]).is_file());
    }
}
