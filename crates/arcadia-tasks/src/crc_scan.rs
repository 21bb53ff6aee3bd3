use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arcadia_playlist::{
    has_playlist_extension, CatalogLister, CoreRegistry, Crc32, PlaylistStore,
    DEFAULT_PLAYLIST_CAPACITY, PLAYLIST_EXTENSION,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dispatch::{
    complete_scan, CompletionError, ContentLoader, DispatchReport, SessionInitiator,
};
use crate::queue::{QueueError, Task, TaskKind, TaskQueue};
use crate::status::{TaskContext, TaskHandle, TaskSnapshot};

pub const TITLE_CHECKING: &str = "Checking for ROM presence.";
pub const TITLE_DIRECTORY_NOT_FOUND: &str = "Playlist directory not found.";
pub const TITLE_FOUND: &str = "Game found.";
pub const TITLE_NOT_FOUND: &str = "No game found.";
pub const TITLE_CANCELLED: &str = "Scan cancelled.";

/// Where and how to look for playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    pub playlist_dir: PathBuf,
    pub playlist_extension: String,
    pub playlist_capacity: usize,
}

impl ScanSettings {
    pub fn new(playlist_dir: impl Into<PathBuf>) -> Self {
        Self {
            playlist_dir: playlist_dir.into(),
            playlist_extension: PLAYLIST_EXTENSION.to_string(),
            playlist_capacity: DEFAULT_PLAYLIST_CAPACITY,
        }
    }
}

/// Content to find and the peer to join once it is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub checksum: Crc32,
    pub hostname: String,
    pub core_name: String,
}

impl ScanRequest {
    pub fn new(
        checksum: impl Into<Crc32>,
        hostname: impl Into<String>,
        core_name: impl Into<String>,
    ) -> Self {
        Self {
            checksum: checksum.into(),
            hostname: hostname.into(),
            core_name: core_name.into(),
        }
    }
}

/// Terminal result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found { content_path: PathBuf },
    NotFound,
    CatalogUnavailable,
    Cancelled,
}

impl ScanOutcome {
    pub fn title(&self) -> &'static str {
        match self {
            ScanOutcome::Found { .. } => TITLE_FOUND,
            ScanOutcome::NotFound => TITLE_NOT_FOUND,
            ScanOutcome::CatalogUnavailable => TITLE_DIRECTORY_NOT_FOUND,
            ScanOutcome::Cancelled => TITLE_CANCELLED,
        }
    }

    pub fn matched_path(&self) -> Option<&Path> {
        match self {
            ScanOutcome::Found { content_path } => Some(content_path),
            _ => None,
        }
    }
}

/// Payload moved into the completion callback when a scan finds content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundContent {
    pub request: ScanRequest,
    pub content_path: PathBuf,
}

#[derive(Debug, Default)]
struct ScanRecord {
    outcome: Mutex<Option<ScanOutcome>>,
    dispatch: Mutex<Option<Result<DispatchReport, CompletionError>>>,
}

/// Exclusive task searching the playlist catalog for a checksum.
pub struct CrcScanTask {
    request: ScanRequest,
    settings: ScanSettings,
    catalog: Arc<dyn CatalogLister>,
    playlists: Arc<dyn PlaylistStore>,
    record: Arc<ScanRecord>,
}

impl CrcScanTask {
    fn scan(&self, ctx: &TaskContext) -> ScanOutcome {
        let catalog = match self.catalog.list(&self.settings.playlist_dir) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(%err, "playlist catalog unavailable");
                return ScanOutcome::CatalogUnavailable;
            }
        };
        let key = self.request.checksum.key();

        for playlist_path in catalog.paths() {
            if ctx.is_cancelled() {
                return ScanOutcome::Cancelled;
            }
            if !has_playlist_extension(playlist_path, &self.settings.playlist_extension) {
                continue;
            }
            tracing::debug!(playlist = %playlist_path.display(), "scanning playlist");
            let playlist = match self
                .playlists
                .open(playlist_path, self.settings.playlist_capacity)
            {
                Ok(playlist) => playlist,
                Err(err) => {
                    tracing::warn!(%err, "skipping unreadable playlist");
                    continue;
                }
            };
            let size = playlist.len();
            for (index, entry) in playlist.entries().iter().enumerate() {
                if entry.matches_key(&key) {
                    return ScanOutcome::Found {
                        content_path: PathBuf::from(&entry.path),
                    };
                }
                // Restarts for every playlist, so not monotonic across the catalog.
                ctx.set_progress(progress_within(index, size));
            }
        }

        ScanOutcome::NotFound
    }
}

fn progress_within(index: usize, size: usize) -> u8 {
    (index.saturating_mul(100) / size.max(1)).min(100) as u8
}

impl Task for CrcScanTask {
    type Output = FoundContent;

    fn kind(&self) -> TaskKind {
        TaskKind::Exclusive
    }

    fn title(&self) -> String {
        TITLE_CHECKING.to_string()
    }

    fn run(&mut self, ctx: &TaskContext) -> Option<FoundContent> {
        ctx.set_progress(0);
        ctx.set_title(TITLE_CHECKING);

        let outcome = self.scan(ctx);
        tracing::info!(
            checksum = %self.request.checksum,
            outcome = ?outcome,
            "checksum scan finished"
        );
        *self.record.outcome.lock() = Some(outcome.clone());
        ctx.finish(outcome.title());

        match outcome {
            ScanOutcome::Found { content_path } => Some(FoundContent {
                request: self.request.clone(),
                content_path,
            }),
            _ => None,
        }
    }
}

/// Collaborators the scan and its completion talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogLister>,
    pub playlists: Arc<dyn PlaylistStore>,
    pub cores: Arc<dyn CoreRegistry>,
    pub loader: Arc<dyn ContentLoader>,
    pub session: Arc<dyn SessionInitiator>,
}

/// Pushes an exclusive checksum scan. An error means nothing was enqueued.
pub fn submit_crc_scan(
    queue: &TaskQueue,
    settings: ScanSettings,
    request: ScanRequest,
    collaborators: &Collaborators,
) -> Result<ScanHandle, QueueError> {
    let record = Arc::new(ScanRecord::default());
    let task = CrcScanTask {
        request,
        settings,
        catalog: Arc::clone(&collaborators.catalog),
        playlists: Arc::clone(&collaborators.playlists),
        record: Arc::clone(&record),
    };

    let cores = Arc::clone(&collaborators.cores);
    let loader = Arc::clone(&collaborators.loader);
    let session = Arc::clone(&collaborators.session);
    let callback_record = Arc::clone(&record);
    let task = queue.push(task, move |found, ctx| {
        let result = complete_scan(found, cores.as_ref(), session.as_ref(), loader.as_ref());
        if let Err(err) = &result {
            tracing::warn!(%err, "netplay content dispatch failed");
            ctx.set_title(err.title());
        }
        *callback_record.dispatch.lock() = Some(result);
    })?;

    Ok(ScanHandle { task, record })
}

/// Status surface of a submitted scan.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    task: TaskHandle,
    record: Arc<ScanRecord>,
}

impl ScanHandle {
    pub fn progress(&self) -> u8 {
        self.task.progress()
    }

    pub fn title(&self) -> String {
        self.task.title()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Result of the scan stage alone.
    ///
    /// A scan that found content stays `Found` even when the completion
    /// dispatch fails afterwards (for example an unregistered core). That
    /// failure shows up in [`ScanHandle::dispatch`] and in the title.
    pub fn outcome(&self) -> Option<ScanOutcome> {
        self.record.outcome.lock().clone()
    }

    /// Path of the matched entry; set only when the scan found content.
    pub fn matched_path(&self) -> Option<PathBuf> {
        self.outcome()
            .and_then(|outcome| outcome.matched_path().map(Path::to_path_buf))
    }

    /// Result of the completion dispatch; `None` unless the scan found content.
    pub fn dispatch(&self) -> Option<Result<DispatchReport, CompletionError>> {
        self.record.dispatch.lock().clone()
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn wait(&self) -> TaskSnapshot {
        self.task.wait()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskSnapshot> {
        self.task.wait_timeout(timeout)
    }

    pub fn task(&self) -> &TaskHandle {
        &self.task
    }
}
