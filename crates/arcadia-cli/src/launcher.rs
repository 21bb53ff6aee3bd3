use std::path::{Path, PathBuf};
use std::process::Command;

use arcadia_tasks::{ContentLoader, DispatchError, LoadMode, SessionEvent, SessionInitiator};

/// Starts the frontend executable with the resolved core and content.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    dry_run: bool,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            program: program.into(),
            dry_run,
        }
    }

    fn command(&self, core_path: &Path, content_path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-L").arg(core_path).arg(content_path);
        command
    }
}

impl ContentLoader for ProcessLauncher {
    fn load_with_new_core(
        &self,
        core_path: &Path,
        content_path: &Path,
        mode: LoadMode,
    ) -> Result<(), DispatchError> {
        tracing::debug!(?mode, core = %core_path.display(), "launching frontend");
        let mut command = self.command(core_path, content_path);
        if self.dry_run {
            println!("would run: {command:?}");
            return Ok(());
        }
        command
            .spawn()
            .map(|child| tracing::info!(pid = child.id(), "frontend started"))
            .map_err(|err| DispatchError::Launch {
                program: self.program.display().to_string(),
                message: err.to_string(),
            })
    }
}

/// Reports pending netplay sessions; the frontend connects on load.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSession;

impl SessionInitiator for ConsoleSession {
    fn notify(&self, event: SessionEvent, hostname: &str) {
        tracing::info!(?event, host = hostname, "netplay session requested");
        println!("Netplay session pending with {hostname}");
    }
}
