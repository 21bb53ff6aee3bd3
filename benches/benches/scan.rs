use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arcadia_playlist::{
    CoreInfo, Crc32, DirCatalogLister, JsonPlaylistStore, Playlist, PlaylistEntry,
};
use arcadia_tasks::{
    submit_crc_scan, Collaborators, ContentLoader, DispatchError, LoadMode, ScanRequest,
    ScanSettings, SessionEvent, SessionInitiator, TaskQueue,
};
use criterion::{criterion_group, criterion_main, Criterion};

struct Discard;

impl ContentLoader for Discard {
    fn load_with_new_core(&self, _: &Path, _: &Path, _: LoadMode) -> Result<(), DispatchError> {
        Ok(())
    }
}

impl SessionInitiator for Discard {
    fn notify(&self, _: SessionEvent, _: &str) {}
}

fn catalog_200_playlists(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    for list in 0..200u32 {
        let entries = (0..500u32)
            .map(|n| {
                PlaylistEntry::new(format!("/roms/{list}/{n}.bin"), Crc32(list * 1_000 + n))
            })
            .collect();
        Playlist::new(dir.path().join(format!("{list:03}.lpl")), entries)
            .save()
            .expect("write playlist");
    }

    let discard = Arc::new(Discard);
    let collaborators = Collaborators {
        catalog: Arc::new(DirCatalogLister),
        playlists: Arc::new(JsonPlaylistStore),
        cores: Arc::new(vec![CoreInfo::new("Bench", "/cores/bench.so")]),
        loader: discard.clone(),
        session: discard,
    };
    let queue = TaskQueue::new().expect("queue");
    let settings = ScanSettings::new(dir.path());

    let mut group = c.benchmark_group("crc_scan");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    group.bench_function("miss_200x500", |b| {
        b.iter(|| {
            let request = ScanRequest::new(Crc32(u32::MAX), "bench", "Bench");
            let handle = submit_crc_scan(&queue, settings.clone(), request, &collaborators)
                .expect("submit");
            handle.wait();
        });
    });

    group.bench_function("hit_last_playlist", |b| {
        b.iter(|| {
            let request = ScanRequest::new(Crc32(199 * 1_000 + 499), "bench", "Bench");
            let handle = submit_crc_scan(&queue, settings.clone(), request, &collaborators)
                .expect("submit");
            handle.wait();
        });
    });

    group.finish();
}

criterion_group!(benches, catalog_200_playlists);
criterion_main!(benches);
