//! Process execution seam.
//!
//! [`Executor`] runs one [`Invocation`] to completion. [`SystemExecutor`]
//! spawns a real child process; tests substitute a recorder so ordering and
//! invocation counts can be checked without ImageMagick installed.

use crate::command::Invocation;
use std::future::Future;
use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs converter invocations.
///
/// `execute` must not return until the process has exited.
pub trait Executor: Send + Sync {
    fn execute(&self, invocation: &Invocation)
        -> impl Future<Output = io::Result<ProcessExit>> + Send;
}

/// Spawns the converter as a child process.
///
/// stdin is closed; stdout and stderr are inherited so the tool's own
/// diagnostics reach the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    async fn execute(&self, invocation: &Invocation) -> io::Result<ProcessExit> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(ref dir) = invocation.current_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().await?;
        debug!("{} exited: {:?}", invocation.program, status.code());
        Ok(ProcessExit {
            code: status.code(),
        })
    }
}
