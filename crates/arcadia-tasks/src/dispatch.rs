use std::path::{Path, PathBuf};

use arcadia_playlist::CoreRegistry;
use thiserror::Error;

use crate::crc_scan::FoundContent;

/// How the frontend should load matched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Unload the running core, start the given one and load the content.
    ReplaceCoreAndLoadContent,
}

/// Notifications understood by the peer session subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connect to the host once the next content load completes.
    InitDirectDeferred,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("failed to launch {program}: {message}")]
    Launch { program: String, message: String },
    #[error("content loader rejected {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("core `{0}` is not registered")]
    CoreUnresolved(String),
    #[error(transparent)]
    Load(#[from] DispatchError),
}

impl CompletionError {
    pub fn title(&self) -> String {
        match self {
            CompletionError::CoreUnresolved(name) => format!("Core not found: {name}."),
            CompletionError::Load(_) => "Failed to load content.".to_string(),
        }
    }
}

pub trait ContentLoader: Send + Sync {
    fn load_with_new_core(
        &self,
        core_path: &Path,
        content_path: &Path,
        mode: LoadMode,
    ) -> Result<(), DispatchError>;
}

pub trait SessionInitiator: Send + Sync {
    fn notify(&self, event: SessionEvent, hostname: &str);
}

/// What was handed to the loader after a successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub hostname: String,
    pub core_path: PathBuf,
    pub content_path: PathBuf,
}

/// Resolves the requested core, readies the peer session and loads the
/// matched content. Nothing is sent when the core is not registered.
pub fn complete_scan(
    found: FoundContent,
    cores: &dyn CoreRegistry,
    session: &dyn SessionInitiator,
    loader: &dyn ContentLoader,
) -> Result<DispatchReport, CompletionError> {
    let FoundContent {
        request,
        content_path,
    } = found;
    let core_path = cores
        .resolve(&request.core_name)
        .ok_or_else(|| CompletionError::CoreUnresolved(request.core_name.clone()))?;

    tracing::info!(
        host = %request.hostname,
        content = %content_path.display(),
        core = %request.core_name,
        core_path = %core_path.display(),
        "dispatching netplay content"
    );

    session.notify(SessionEvent::InitDirectDeferred, &request.hostname);
    loader.load_with_new_core(
        &core_path,
        &content_path,
        LoadMode::ReplaceCoreAndLoadContent,
    )?;

    Ok(DispatchReport {
        hostname: request.hostname,
        core_path,
        content_path,
    })
}

#[cfg(test)]
mod tests {
    use arcadia_playlist::{CoreInfo, Crc32};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::crc_scan::ScanRequest;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        reject: bool,
    }

    impl SessionInitiator for Recorder {
        fn notify(&self, event: SessionEvent, hostname: &str) {
            self.calls.lock().push(format!("{event:?}:{hostname}"));
        }
    }

    impl ContentLoader for Recorder {
        fn load_with_new_core(
            &self,
            core_path: &Path,
            content_path: &Path,
            mode: LoadMode,
        ) -> Result<(), DispatchError> {
            self.calls.lock().push(format!(
                "{mode:?}:{}:{}",
                core_path.display(),
                content_path.display()
            ));
            if self.reject {
                return Err(DispatchError::Rejected(content_path.display().to_string()));
            }
            Ok(())
        }
    }

    fn found(core: &str) -> FoundContent {
        FoundContent {
            request: ScanRequest::new(Crc32(1), "peer.local", core),
            content_path: PathBuf::from("/games/a.rom"),
        }
    }

    #[test]
    fn notifies_session_before_loading() {
        let cores = vec![CoreInfo::new("Snes9x", "/cores/snes9x.so")];
        let recorder = Recorder::default();
        let report = complete_scan(found("Snes9x"), &cores, &recorder, &recorder).unwrap();
        assert_eq!(report.core_path, PathBuf::from("/cores/snes9x.so"));
        assert_eq!(
            *recorder.calls.lock(),
            vec![
                "InitDirectDeferred:peer.local".to_string(),
                "ReplaceCoreAndLoadContent:/cores/snes9x.so:/games/a.rom".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_core_dispatches_nothing() {
        let cores = vec![CoreInfo::new("Snes9x", "/cores/snes9x.so")];
        let recorder = Recorder::default();
        let err = complete_scan(found("bsnes"), &cores, &recorder, &recorder).unwrap_err();
        assert_eq!(err, CompletionError::CoreUnresolved("bsnes".into()));
        assert_eq!(err.title(), "Core not found: bsnes.");
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn loader_failure_is_reported() {
        let cores = vec![CoreInfo::new("Snes9x", "/cores/snes9x.so")];
        let recorder = Recorder {
            reject: true,
            ..Recorder::default()
        };
        let err = complete_scan(found("Snes9x"), &cores, &recorder, &recorder).unwrap_err();
        assert!(matches!(err, CompletionError::Load(DispatchError::Rejected(_))));
    }
}
