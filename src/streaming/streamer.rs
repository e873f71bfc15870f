//! Per-frame terrain streaming
//!
//! [`TerrainStreamer`] owns the height field, the chunk store, a build
//! worker and the merged render buffer. `update_chunks` is called once per
//! frame with the camera position and runs the whole cycle:
//!
//! 1. fold finished builds into the store
//! 2. when the camera moved far enough (or terrain is dirty), re-derive the
//!    view set and dispatch the nearest unknown chunks, up to a batch cap
//! 3. queue an active-set update if the ready chunks changed
//! 4. evict chunks beyond the eviction distance
//! 5. apply a bounded number of queued updates and re-merge
//!
//! Nothing here waits on a build; chunks that are not ready are simply
//! missing from the merged buffer until they arrive.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::core::types::Vec3;
use crate::physics::TerrainQuery;
use crate::streaming::coord::ChunkCoord;
use crate::streaming::merge::{MergedTerrain, TerrainData, anchor_for};
use crate::streaming::priority::{scan_candidates, view_set};
use crate::streaming::store::{ApplyOutcome, ChunkState, ChunkStore};
use crate::streaming::worker::{
    BuildOutcome, BuildRequest, ChunkWorker, build_guarded, worker_for,
};
use crate::terrain::equation::Equation;
use crate::terrain::field::HeightField;
use crate::terrain::generator::ChunkGenerator;
use crate::terrain::geometry::ChunkGeometry;
use crate::terrain::settings::{PerformanceSettings, TerrainSettings};

/// A deferred change to the store, applied under the per-frame cap
#[derive(Debug, Clone, PartialEq)]
enum PendingUpdate {
    SetActive(BTreeSet<ChunkCoord>),
}

/// Counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingStats {
    pub active_chunks: usize,
    pub cached_chunks: usize,
    pub empty_chunks: usize,
    pub generating_chunks: usize,
    pub pending_updates: usize,
    pub chunk_update_threshold: f64,
    pub chunks_per_frame: usize,
    pub view_distance: i32,
    pub generate_distance: i32,
    pub vertical_chunks: i32,
    pub merged_vertices: usize,
    pub merged_triangles: usize,
    pub merge_version: u64,
    pub epoch: u64,
}

/// Per-chunk details for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub coord: ChunkCoord,
    pub state: ChunkState,
    pub active: bool,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub height_range: Option<(f32, f32)>,
}

/// Streams chunks around the camera into a merged buffer
pub struct TerrainStreamer {
    settings: TerrainSettings,
    field: Arc<HeightField>,
    generator: ChunkGenerator,
    store: ChunkStore,
    worker: Box<dyn ChunkWorker>,
    merged: MergedTerrain,
    pending: VecDeque<PendingUpdate>,
    /// View candidates from the last scheduling pass
    wanted: BTreeSet<ChunkCoord>,
    last_position: Option<Vec3>,
    terrain_dirty: bool,
    /// Equation-set generation; results from older epochs are dropped
    epoch: u64,
}

impl TerrainStreamer {
    /// Create a streamer with no equations (fallback terrain)
    pub fn new(settings: TerrainSettings, worker: Box<dyn ChunkWorker>) -> Result<Self> {
        settings.validate()?;
        let field = Arc::new(HeightField::default().with_lattice_scale(settings.lattice_scale));
        let generator = ChunkGenerator::new(field.clone(), &settings);
        Ok(Self {
            settings,
            field,
            generator,
            store: ChunkStore::new(),
            worker,
            merged: MergedTerrain::new(),
            pending: VecDeque::new(),
            wanted: BTreeSet::new(),
            last_position: None,
            terrain_dirty: true,
            epoch: 0,
        })
    }

    /// Create a streamer with the worker selected by `settings.worker_threads`
    pub fn with_default_worker(settings: TerrainSettings) -> Result<Self> {
        let worker = worker_for(settings.worker_threads)?;
        Self::new(settings, worker)
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn field(&self) -> &Arc<HeightField> {
        &self.field
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_terrain_dirty(&self) -> bool {
        self.terrain_dirty
    }

    /// Replace the equation set and regenerate the world from scratch
    pub fn set_equations(&mut self, equations: Vec<Equation>) {
        log::info!("Installing {} terrain equations", equations.len());
        self.field = Arc::new(HeightField::new(equations).with_lattice_scale(self.settings.lattice_scale));
        self.generator = ChunkGenerator::new(self.field.clone(), &self.settings);
        self.epoch += 1;
        self.clear_chunks();
    }

    /// Drop every chunk, queued update and the merged buffer
    pub fn clear_chunks(&mut self) {
        self.store.clear();
        self.pending.clear();
        self.wanted.clear();
        self.merged.reset();
        self.last_position = None;
        self.terrain_dirty = true;
    }

    /// Force the next update to re-derive the wanted chunks
    pub fn force_terrain_update(&mut self) {
        self.terrain_dirty = true;
    }

    /// Run one streaming tick for the camera at `position`
    pub fn update_chunks(&mut self, position: Vec3) {
        self.fold_results();

        let moved = self
            .last_position
            .is_none_or(|last| last.distance(position) as f64 > self.settings.chunk_update_threshold);
        if moved || self.terrain_dirty {
            self.last_position = Some(position);
            self.schedule(position);
        }

        self.queue_active_update();

        let center = self.center_of(position);
        self.evict_distant(center);

        self.apply_pending(position);
    }

    fn center_of(&self, position: Vec3) -> ChunkCoord {
        ChunkCoord::from_world_pos(position, self.settings.chunk_size, self.settings.chunk_height)
    }

    /// Re-derive the view set and dispatch the nearest unknown chunks
    fn schedule(&mut self, position: Vec3) {
        let center = self.center_of(position);
        let candidates = scan_candidates(center, &self.settings);
        self.wanted = view_set(&candidates);

        let requests: Vec<ChunkCoord> = candidates
            .iter()
            .map(|c| c.coord)
            .filter(|&c| self.store.state(c) == ChunkState::Unknown)
            .collect();
        let batch: Vec<ChunkCoord> = requests
            .iter()
            .copied()
            .take(self.settings.max_batch_size)
            .filter(|&c| self.store.mark_generating(c))
            .collect();

        // Keep scheduling next frame until the backlog is drained
        self.terrain_dirty = requests.len() > self.settings.max_batch_size;

        if !batch.is_empty() {
            log::trace!("Dispatching {} chunk builds around {}", batch.len(), center);
            self.worker.dispatch(BuildRequest {
                coords: batch,
                generator: self.generator.clone(),
                epoch: self.epoch,
            });
            self.fold_results();
        }
    }

    /// Apply finished builds that are still wanted
    fn fold_results(&mut self) {
        for result in self.worker.poll() {
            if result.epoch != self.epoch {
                log::debug!("Discarding chunk {} from epoch {}", result.coord, result.epoch);
                continue;
            }
            match result.outcome {
                BuildOutcome::Built(geometry) => match self.store.complete(result.coord, geometry) {
                    ApplyOutcome::Stored => {
                        if self.wanted.contains(&result.coord) {
                            self.terrain_dirty = true;
                        }
                    }
                    ApplyOutcome::StoredEmpty => {}
                    ApplyOutcome::Discarded => {
                        log::debug!("Discarding chunk {} that is no longer in flight", result.coord);
                    }
                },
                BuildOutcome::Failed(message) => {
                    log::warn!("Chunk {} failed to build: {}", result.coord, message);
                    self.store.abandon(result.coord);
                }
            }
        }
    }

    /// Queue the set of wanted chunks that are ready to show, if it changed
    fn queue_active_update(&mut self) {
        let ready: BTreeSet<ChunkCoord> = self
            .wanted
            .iter()
            .copied()
            .filter(|&c| self.store.state(c) == ChunkState::CachedNonEmpty)
            .collect();

        let latest = match self.pending.back() {
            Some(PendingUpdate::SetActive(keys)) => keys,
            None => self.store.active(),
        };
        if &ready != latest {
            self.pending.push_back(PendingUpdate::SetActive(ready));
        }
    }

    /// Forget every key beyond the eviction distance from `center`
    fn evict_distant(&mut self, center: ChunkCoord) {
        let limit = self.settings.eviction_distance();
        let mut evicted = 0;
        for coord in self.store.known_keys() {
            if center.distance(coord) > limit && self.store.evict(coord) {
                evicted += 1;
            }
        }
        if evicted > 0 {
            log::debug!("Evicted {} distant chunks around {}", evicted, center);
        }
    }

    /// Apply up to `chunks_per_frame` queued updates, then re-merge if needed
    fn apply_pending(&mut self, position: Vec3) {
        for _ in 0..self.settings.chunks_per_frame {
            let Some(update) = self.pending.pop_front() else {
                break;
            };
            match update {
                PendingUpdate::SetActive(keys) => {
                    let dropped = self.store.set_active(keys);
                    if dropped > 0 {
                        log::trace!("{} queued active chunks were gone at apply time", dropped);
                    }
                }
            }
        }

        let anchor = anchor_for(position, self.settings.anchor_grid);
        self.merged.merge(&self.store, anchor);
    }

    /// Trim the cache to `max_cached_chunks`, sparing active chunks
    pub fn cleanup(&mut self) -> usize {
        let removed = self.store.cleanup(self.settings.max_cached_chunks);
        if removed > 0 {
            log::info!(
                "Cache cleanup removed {} chunks, {} remain",
                removed,
                self.store.cached_count()
            );
        }
        removed
    }

    /// Apply runtime tuning; invalid combinations leave settings unchanged
    pub fn adjust_performance_settings(&mut self, overrides: &PerformanceSettings) -> Result<()> {
        self.settings.apply(overrides)?;
        log::info!(
            "Performance settings: view {}, generate {}, threshold {}, chunks/frame {}",
            self.settings.view_distance,
            self.settings.generate_distance,
            self.settings.chunk_update_threshold,
            self.settings.chunks_per_frame
        );
        self.terrain_dirty = true;
        Ok(())
    }

    /// Build a chunk right now, or return it from the cache
    ///
    /// Supersedes an in-flight build of the same key; its late result is
    /// discarded when it arrives.
    pub fn generate_chunk(&mut self, coord: ChunkCoord) -> Arc<ChunkGeometry> {
        if let Some(geometry) = self.store.get(coord) {
            return geometry;
        }
        if self.store.state(coord) == ChunkState::CachedEmpty {
            return Arc::new(ChunkGeometry::empty());
        }
        let geometry = match build_guarded(&self.generator, coord) {
            BuildOutcome::Built(geometry) => geometry,
            BuildOutcome::Failed(message) => {
                log::warn!("Chunk {} failed to build: {}", coord, message);
                self.store.abandon(coord);
                return Arc::new(ChunkGeometry::empty());
            }
        };
        self.store.insert_built(coord, geometry);
        self.store
            .peek(coord)
            .cloned()
            .unwrap_or_else(|| Arc::new(ChunkGeometry::empty()))
    }

    pub fn chunk_state(&self, coord: ChunkCoord) -> ChunkState {
        self.store.state(coord)
    }

    pub fn chunk_info(&self, coord: ChunkCoord) -> ChunkInfo {
        let geometry = self.store.peek(coord);
        ChunkInfo {
            coord,
            state: self.store.state(coord),
            active: self.store.is_active(coord),
            vertex_count: geometry.map_or(0, |g| g.vertex_count()),
            triangle_count: geometry.map_or(0, |g| g.triangle_count()),
            height_range: geometry.and_then(|g| g.height_range()),
        }
    }

    /// Merged buffers for the renderer
    pub fn terrain_data(&self) -> &TerrainData {
        self.merged.data()
    }

    pub fn merge_version(&self) -> u64 {
        self.merged.version()
    }

    pub fn camera_offset(&self) -> Vec3 {
        self.merged.data().camera_offset
    }

    pub fn stats(&self) -> StreamingStats {
        let data = self.merged.data();
        StreamingStats {
            active_chunks: self.store.active_count(),
            cached_chunks: self.store.cached_count(),
            empty_chunks: self.store.empty_count(),
            generating_chunks: self.store.generating_count(),
            pending_updates: self.pending.len(),
            chunk_update_threshold: self.settings.chunk_update_threshold,
            chunks_per_frame: self.settings.chunks_per_frame,
            view_distance: self.settings.view_distance,
            generate_distance: self.settings.generate_distance,
            vertical_chunks: self.settings.vertical_chunks,
            merged_vertices: data.vertex_count(),
            merged_triangles: data.triangle_count(),
            merge_version: self.merged.version(),
            epoch: self.epoch,
        }
    }

    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        self.field.height_at(x, y)
    }

    pub fn interpolated_height(&self, x: f64, y: f64) -> f64 {
        self.field.interpolated_height(x, y)
    }

    pub fn normal_at(&self, x: f64, y: f64) -> [f64; 3] {
        self.field.normal_at(x, y)
    }
}

impl TerrainQuery for TerrainStreamer {
    fn interpolated_height(&self, x: f32, y: f32) -> f32 {
        TerrainQuery::interpolated_height(self.field.as_ref(), x, y)
    }

    fn normal_at(&self, x: f32, y: f32) -> Vec3 {
        TerrainQuery::normal_at(self.field.as_ref(), x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::worker::{BuildResult, InlineWorker};
    use std::collections::HashSet;
    use std::sync::Mutex;

    const RED: [f32; 3] = [1.0, 0.0, 0.0];

    fn small_settings() -> TerrainSettings {
        TerrainSettings {
            chunk_resolution: 6,
            view_distance: 1,
            generate_distance: 2,
            vertical_chunks: 0,
            ..Default::default()
        }
    }

    fn sine() -> Vec<Equation> {
        vec![Equation::from_fn("sin(x)", RED, |x, _, _| x.sin())]
    }

    fn streamer(settings: TerrainSettings) -> TerrainStreamer {
        let mut streamer = TerrainStreamer::new(settings, Box::new(InlineWorker::new())).unwrap();
        streamer.set_equations(sine());
        streamer
    }

    /// Holds builds until the test releases them
    #[derive(Clone, Default)]
    struct ManualWorker {
        held: Arc<Mutex<Vec<BuildRequest>>>,
        ready: Arc<Mutex<Vec<BuildResult>>>,
    }

    impl ManualWorker {
        fn release(&self) {
            let requests: Vec<BuildRequest> = self.held.lock().unwrap().drain(..).collect();
            let mut ready = self.ready.lock().unwrap();
            for request in requests {
                for coord in request.coords {
                    ready.push(BuildResult {
                        coord,
                        epoch: request.epoch,
                        outcome: BuildOutcome::Built(request.generator.build(coord)),
                    });
                }
            }
        }

        fn held_count(&self) -> usize {
            self.held.lock().unwrap().iter().map(|r| r.coords.len()).sum()
        }
    }

    impl ChunkWorker for ManualWorker {
        fn dispatch(&mut self, request: BuildRequest) {
            self.held.lock().unwrap().push(request);
        }

        fn poll(&mut self) -> Vec<BuildResult> {
            self.ready.lock().unwrap().drain(..).collect()
        }

        fn in_flight(&self) -> usize {
            self.held_count() + self.ready.lock().unwrap().len()
        }
    }

    fn assert_exclusive_states(streamer: &TerrainStreamer) {
        let store = streamer.store();
        let unique: HashSet<ChunkCoord> = store.known_keys().into_iter().collect();
        assert_eq!(
            unique.len(),
            store.cached_count() + store.empty_count() + store.generating_count()
        );
        for key in store.active() {
            assert_eq!(store.state(*key), ChunkState::CachedNonEmpty);
        }
    }

    #[test]
    fn test_first_update_shows_view_chunks() {
        let mut streamer = streamer(small_settings());
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));

        let stats = streamer.stats();
        // Radius 2 disc: 13 chunks, radius 1: 5
        assert_eq!(stats.cached_chunks, 13);
        assert_eq!(stats.generating_chunks, 0);
        assert_eq!(stats.active_chunks, 5);
        assert!(stats.merged_triangles > 0);
        assert_eq!(streamer.camera_offset(), Vec3::ZERO);
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_still_camera_does_not_remerge() {
        let mut streamer = streamer(small_settings());
        let pos = Vec3::new(10.0, 10.0, 5.0);
        streamer.update_chunks(pos);
        streamer.update_chunks(pos);
        let version = streamer.merge_version();
        for _ in 0..5 {
            streamer.update_chunks(pos);
        }
        assert_eq!(streamer.merge_version(), version);
        assert!(!streamer.is_terrain_dirty());
    }

    #[test]
    fn test_batch_cap_spreads_work_over_frames() {
        let settings = TerrainSettings {
            max_batch_size: 4,
            ..small_settings()
        };
        let mut streamer = streamer(settings);
        let pos = Vec3::new(10.0, 10.0, 5.0);

        streamer.update_chunks(pos);
        assert_eq!(streamer.stats().cached_chunks, 4);
        assert!(streamer.is_terrain_dirty());

        for _ in 0..4 {
            streamer.update_chunks(pos);
        }
        assert_eq!(streamer.stats().cached_chunks, 13);
        assert_eq!(streamer.stats().active_chunks, 5);
    }

    #[test]
    fn test_pending_updates_are_capped_per_frame() {
        let settings = TerrainSettings {
            chunks_per_frame: 1,
            ..small_settings()
        };
        let mut streamer = streamer(settings);
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(streamer.stats().pending_updates, 0);
        assert_eq!(streamer.stats().active_chunks, 5);
    }

    #[test]
    fn test_small_moves_skip_rescheduling() {
        let mut streamer = streamer(small_settings());
        streamer.update_chunks(Vec3::new(22.0, 10.0, 5.0));
        streamer.update_chunks(Vec3::new(22.0, 10.0, 5.0));
        assert!(!streamer.is_terrain_dirty());

        // 5 units is under the threshold, even though it crosses into chunk (1, 0)
        streamer.update_chunks(Vec3::new(27.0, 10.0, 5.0));
        assert_eq!(streamer.chunk_state(ChunkCoord::new(3, 0, 0)), ChunkState::Unknown);

        // Past the threshold from the last scheduling origin
        streamer.update_chunks(Vec3::new(31.0, 10.0, 5.0));
        assert_eq!(streamer.chunk_state(ChunkCoord::new(3, 0, 0)), ChunkState::CachedNonEmpty);
    }

    #[test]
    fn test_far_move_evicts_old_chunks() {
        let mut streamer = streamer(small_settings());
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, 0)), ChunkState::CachedNonEmpty);

        let far = Vec3::new(1010.0, 10.0, 5.0);
        streamer.update_chunks(far);
        streamer.update_chunks(far);
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, 0)), ChunkState::Unknown);
        assert_eq!(streamer.stats().active_chunks, 5);
        assert!(streamer.store().active().iter().all(|c| c.x >= 39));
        assert_eq!(streamer.camera_offset(), Vec3::new(1000.0, 0.0, 0.0));

        // Merged positions stay small relative to the anchor
        let data = streamer.terrain_data();
        assert!(data.vertices.chunks_exact(3).all(|v| v[0].abs() < 200.0));
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_results_for_evicted_chunks_are_discarded() {
        let worker = ManualWorker::default();
        let mut streamer = TerrainStreamer::new(small_settings(), Box::new(worker.clone())).unwrap();
        streamer.set_equations(sine());

        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(streamer.stats().generating_chunks, 13);
        assert_eq!(worker.in_flight(), 13);

        // Move away before anything lands
        streamer.update_chunks(Vec3::new(1010.0, 10.0, 5.0));
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, 0)), ChunkState::Unknown);

        worker.release();
        streamer.update_chunks(Vec3::new(1010.0, 10.0, 5.0));
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, 0)), ChunkState::Unknown);
        assert!(streamer.store().known_keys().iter().all(|c| c.x >= 36));
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_new_equations_discard_old_results() {
        let worker = ManualWorker::default();
        let mut streamer = TerrainStreamer::new(small_settings(), Box::new(worker.clone())).unwrap();
        streamer.set_equations(sine());
        let pos = Vec3::new(10.0, 10.0, 5.0);
        streamer.update_chunks(pos);
        worker.release();

        // Old builds are ready but a new equation set arrives first
        streamer.set_equations(vec![Equation::from_fn("flat", RED, |_, _, _| 5.0)]);
        assert_eq!(streamer.stats().cached_chunks, 0);
        streamer.update_chunks(pos);
        assert_eq!(streamer.stats().cached_chunks, 0);
        assert_eq!(streamer.stats().generating_chunks, 13);

        worker.release();
        streamer.update_chunks(pos);
        let geometry = streamer.store().peek(ChunkCoord::new(0, 0, 0)).cloned().unwrap();
        assert!(geometry.vertices.chunks_exact(3).all(|v| (v[2] - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_generate_chunk_is_cached_and_supersedes_flight() {
        let worker = ManualWorker::default();
        let mut streamer = TerrainStreamer::new(small_settings(), Box::new(worker.clone())).unwrap();
        streamer.set_equations(sine());
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));

        let coord = ChunkCoord::new(0, 0, 0);
        assert_eq!(streamer.chunk_state(coord), ChunkState::Generating);
        let built = streamer.generate_chunk(coord);
        assert!(!built.is_empty);
        assert_eq!(streamer.chunk_state(coord), ChunkState::CachedNonEmpty);

        let again = streamer.generate_chunk(coord);
        assert!(Arc::ptr_eq(&built, &again));

        // The late pool result does not replace the synchronous build
        worker.release();
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        let stored = streamer.store().peek(coord).cloned().unwrap();
        assert!(Arc::ptr_eq(&built, &stored));
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_empty_chunks_are_remembered() {
        let settings = TerrainSettings {
            vertical_chunks: 2,
            ..small_settings()
        };
        let mut streamer = streamer(settings);
        for _ in 0..5 {
            streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        }
        // Band [100, 150] is beyond sin(x) plus slack; [-50, 0] is not
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, 2)), ChunkState::CachedEmpty);
        assert_eq!(streamer.chunk_state(ChunkCoord::new(0, 0, -1)), ChunkState::CachedNonEmpty);
        assert_eq!(streamer.stats().generating_chunks, 0);
        assert!(streamer.stats().empty_chunks > 0);
        assert!(!streamer.store().is_active(ChunkCoord::new(0, 0, 2)));
        assert!(streamer.store().is_active(ChunkCoord::new(0, 0, -1)));
    }

    #[test]
    fn test_generate_chunk_skips_known_empty() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let samples = Arc::new(AtomicUsize::new(0));
        let counter = samples.clone();
        let settings = TerrainSettings {
            vertical_chunks: 2,
            ..small_settings()
        };
        let mut streamer = TerrainStreamer::new(settings, Box::new(InlineWorker::new())).unwrap();
        streamer.set_equations(vec![Equation::from_fn("sin(x)", RED, move |x, _, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            x.sin()
        })]);
        for _ in 0..5 {
            streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        }

        let coord = ChunkCoord::new(0, 0, 2);
        assert_eq!(streamer.chunk_state(coord), ChunkState::CachedEmpty);
        let empty_before = streamer.stats().empty_chunks;
        let samples_before = samples.load(Ordering::Relaxed);

        let geometry = streamer.generate_chunk(coord);
        assert!(geometry.is_empty);
        assert_eq!(samples.load(Ordering::Relaxed), samples_before);
        assert_eq!(streamer.chunk_state(coord), ChunkState::CachedEmpty);
        assert_eq!(streamer.stats().empty_chunks, empty_before);
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_cleanup_caps_cache() {
        let settings = TerrainSettings {
            max_cached_chunks: 8,
            ..small_settings()
        };
        let mut streamer = streamer(settings);
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(streamer.stats().cached_chunks, 13);

        assert_eq!(streamer.cleanup(), 5);
        assert_eq!(streamer.stats().cached_chunks, 8);
        assert_eq!(streamer.stats().active_chunks, 5);
        assert_exclusive_states(&streamer);
    }

    #[test]
    fn test_adjust_performance_settings() {
        let mut streamer = streamer(small_settings());
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));

        let grow = PerformanceSettings {
            view_distance: Some(2),
            generate_distance: Some(3),
            ..Default::default()
        };
        streamer.adjust_performance_settings(&grow).unwrap();
        assert!(streamer.is_terrain_dirty());
        streamer.update_chunks(Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(streamer.stats().active_chunks, 13);

        let bad = PerformanceSettings {
            view_distance: Some(9),
            ..Default::default()
        };
        assert!(streamer.adjust_performance_settings(&bad).is_err());
        assert_eq!(streamer.settings().view_distance, 2);
    }

    #[test]
    fn test_random_walk_keeps_states_exclusive() {
        let worker = ManualWorker::default();
        let mut streamer = TerrainStreamer::new(small_settings(), Box::new(worker.clone())).unwrap();
        streamer.set_equations(sine());

        let mut pos = Vec3::new(0.0, 0.0, 5.0);
        for step in 0..60u32 {
            let angle = step as f32 * 0.7;
            pos += Vec3::new(angle.cos(), angle.sin(), 0.0) * 12.0;
            if step % 3 == 0 {
                worker.release();
            }
            streamer.update_chunks(pos);
            if step % 10 == 0 {
                streamer.cleanup();
            }
            assert_exclusive_states(&streamer);
        }
    }

    #[test]
    fn test_fallback_terrain_without_equations() {
        let mut streamer = TerrainStreamer::new(small_settings(), Box::new(InlineWorker::new())).unwrap();
        assert_eq!(streamer.interpolated_height(3.0, 4.0), 0.0);
        assert_eq!(streamer.normal_at(3.0, 4.0), [0.0, 0.0, 1.0]);
        let expected = (3.0f64 * 0.1).sin() * (4.0f64 * 0.1).cos() * 2.0;
        assert_eq!(streamer.height_at(3.0, 4.0), expected);

        streamer.update_chunks(Vec3::ZERO);
        assert!(streamer.stats().active_chunks > 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = TerrainSettings {
            view_distance: 5,
            generate_distance: 2,
            ..Default::default()
        };
        assert!(TerrainStreamer::new(settings, Box::new(InlineWorker::new())).is_err());
    }
}
