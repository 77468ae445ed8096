//! Process-spawning tool adapter.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::ToolConfig;
use crate::metrics;

use super::error::ToolError;
use super::traits::ToolAdapter;
use super::types::{ToolInvocation, ToolOperation, ToolOutput};

/// Runs toolkit operations as child processes.
pub struct ProcessToolAdapter {
    config: ToolConfig,
    working_dir: PathBuf,
}

impl ProcessToolAdapter {
    /// Creates an adapter whose children run inside `working_dir`.
    pub fn new(config: ToolConfig, working_dir: PathBuf) -> Self {
        Self {
            config,
            working_dir,
        }
    }

    /// Resolves the executable for an operation.
    fn program_path(&self, operation: ToolOperation) -> PathBuf {
        match &self.config.bin_dir {
            Some(dir) => dir.join(operation.program()),
            None => PathBuf::from(operation.program()),
        }
    }

    /// Builds the command for an invocation.
    ///
    /// The unit namespace is applied to this child only.
    fn build_command(&self, invocation: &ToolInvocation) -> Command {
        let mut command = Command::new(self.program_path(invocation.operation));
        command
            .args(invocation.command_args())
            .current_dir(&self.working_dir)
            .env("ASCDS_INSTALL", &self.config.install_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in invocation.env.vars() {
            command.env(key, value);
        }
        command
    }

    fn map_spawn_error(&self, e: std::io::Error, program: &Path) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::ToolNotFound {
                path: program.to_path_buf(),
            }
        } else {
            ToolError::Io(e)
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = self.program_path(invocation.operation);
        debug!(
            "Running {} for unit {}: {:?}",
            invocation.operation,
            invocation.unit_id,
            invocation.command_args()
        );

        let mut child = self
            .build_command(invocation)
            .spawn()
            .map_err(|e| self.map_spawn_error(e, &program))?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            ToolError::Io(std::io::Error::other("stdout was not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            ToolError::Io(std::io::Error::other("stderr was not captured"))
        })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut out = String::new();
            let mut err = String::new();
            let (out_res, err_res) = tokio::join!(
                stdout.read_to_string(&mut out),
                stderr.read_to_string(&mut err)
            );
            out_res?;
            err_res?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, err))
        })
        .await;

        match result {
            Ok(Ok((status, out, err))) => {
                if !status.success() {
                    return Err(ToolError::failed(invocation.operation, status.code(), err));
                }
                Ok(ToolOutput::new(out))
            }
            Ok(Err(e)) => Err(ToolError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                Err(ToolError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        }
    }
}

#[async_trait]
impl ToolAdapter for ProcessToolAdapter {
    fn name(&self) -> &str {
        "process"
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let result = self.run(&invocation).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::TOOL_INVOCATIONS
            .with_label_values(&[invocation.operation.program(), status])
            .inc();
        metrics::TOOL_DURATION
            .with_label_values(&[invocation.operation.program()])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn validate(&self) -> Result<(), ToolError> {
        if !self.config.install_dir.exists() {
            return Err(ToolError::ToolNotFound {
                path: self.config.install_dir.clone(),
            });
        }

        if let Some(dir) = &self.config.bin_dir {
            for operation in [
                ToolOperation::Download,
                ToolOperation::Reprocess,
                ToolOperation::FluxImage,
                ToolOperation::WavDetect,
            ] {
                let path = dir.join(operation.program());
                if !path.exists() {
                    return Err(ToolError::ToolNotFound { path });
                }
            }
        }

        tokio::fs::create_dir_all(&self.working_dir).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolEnvironment;

    fn adapter_with_bin_dir(bin_dir: Option<PathBuf>) -> ProcessToolAdapter {
        let config = ToolConfig {
            bin_dir,
            ..ToolConfig::default()
        };
        ProcessToolAdapter::new(config, PathBuf::from("/archive"))
    }

    #[test]
    fn test_program_path_uses_bin_dir() {
        let adapter = adapter_with_bin_dir(Some(PathBuf::from("/opt/ciao/bin")));
        assert_eq!(
            adapter.program_path(ToolOperation::WavDetect),
            PathBuf::from("/opt/ciao/bin/wavdetect")
        );
    }

    #[test]
    fn test_program_path_falls_back_to_search_path() {
        let adapter = adapter_with_bin_dir(None);
        assert_eq!(
            adapter.program_path(ToolOperation::Reprocess),
            PathBuf::from("chandra_repro")
        );
    }

    #[tokio::test]
    async fn test_missing_tool_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig {
            bin_dir: Some(dir.path().join("no-such-bin")),
            timeout_secs: 5,
            ..ToolConfig::default()
        };
        let adapter = ProcessToolAdapter::new(config, dir.path().to_path_buf());
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), dir.path().join("tmp"));
        let inv = ToolInvocation::new("1843", ToolOperation::Download, env).arg("1843");

        let err = adapter.invoke(inv).await.unwrap_err();
        assert!(matches!(err, ToolError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_sees_only_its_namespace() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let script = bin_dir.join("wavdetect");
        std::fs::write(&script, "#!/bin/sh\necho \"$ASCDS_WORK_PATH|$PFILES|$1\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ToolConfig {
            bin_dir: Some(bin_dir),
            install_dir: PathBuf::from("/opt/ciao"),
            timeout_secs: 10,
            ..ToolConfig::default()
        };
        let adapter = ProcessToolAdapter::new(config, dir.path().to_path_buf());
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), PathBuf::from("/arc/u1/tmp"));
        let inv = ToolInvocation::new("u1", ToolOperation::WavDetect, env).param("clobber", "yes");

        let output = adapter.invoke(inv).await.unwrap();
        assert_eq!(
            output.log.trim(),
            "/arc/u1/tmp|/arc/u1/tmp;/opt/ciao/param:/opt/ciao/contrib/param|clobber=yes"
        );
        assert!(std::env::var("PFILES").map_or(true, |v| !v.contains("/arc/u1/tmp")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("chandra_repro");
        std::fs::write(&script, "#!/bin/sh\necho 'no evt1 file' >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ToolConfig {
            bin_dir: Some(dir.path().to_path_buf()),
            timeout_secs: 10,
            ..ToolConfig::default()
        };
        let adapter = ProcessToolAdapter::new(config, dir.path().to_path_buf());
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), dir.path().join("tmp"));
        let inv = ToolInvocation::new("u1", ToolOperation::Reprocess, env);

        match adapter.invoke(inv).await.unwrap_err() {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.as_deref().map(str::trim), Some("no evt1 file"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
