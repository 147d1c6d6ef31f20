use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;

use crate::error::Result;

/// Version line this process reports for `--version`. The self-update guard
/// compares it byte-for-byte against what the on-disk binary prints.
pub const RUNNING_VERSION: &str = concat!("gentup ", env!("CARGO_PKG_VERSION"));

/// Resolved executable path and original argument vector of this invocation.
/// Created at startup, read-only afterwards; used only to re-launch the
/// orchestrator after a self-update so the restarted run sees the exact flags
/// the operator supplied.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub exe: PathBuf,
    /// argv[1..] as originally supplied.
    pub args: Vec<OsString>,
}

impl ExecutionContext {
    pub fn capture() -> std::io::Result<Self> {
        Ok(Self {
            exe: std::env::current_exe()?,
            args: std::env::args_os().skip(1).collect(),
        })
    }
}

/// Asks the binary at the original executable path (possibly just replaced on
/// disk by the self-update stage) for its version and compares it against the
/// version compiled into this process.
///
/// A binary that fails to report a version is treated as unchanged; aborting
/// the pipeline over a broken version probe would be worse than finishing the
/// run under the old version.
pub async fn self_version_changed(ctx: &ExecutionContext) -> Result<bool> {
    let probe = Command::new(&ctx.exe).arg("--version").output().await?;
    if !probe.status.success() {
        tracing::warn!(
            "version probe of {} exited with {}; assuming unchanged",
            ctx.exe.display(),
            probe.status
        );
        return Ok(false);
    }

    let reported = String::from_utf8_lossy(&probe.stdout);
    Ok(reported.trim() != RUNNING_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_binary(dir: &std::path::Path, version_line: &str) -> PathBuf {
        let path = dir.join("gentup");
        std::fs::write(&path, format!("#!/bin/sh\necho \"{version_line}\"\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn same_version_means_no_restart() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext {
            exe: fake_binary(dir.path(), RUNNING_VERSION),
            args: vec![],
        };
        assert!(!self_version_changed(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn different_version_means_restart() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext {
            exe: fake_binary(dir.path(), "gentup 99.0.0"),
            args: vec![],
        };
        assert!(self_version_changed(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn failing_probe_is_treated_as_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup");
        std::fs::write(&path, "#!/bin/sh\nexit 1\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let ctx = ExecutionContext {
            exe: path,
            args: vec![],
        };
        assert!(!self_version_changed(&ctx).await.unwrap());
    }
}
