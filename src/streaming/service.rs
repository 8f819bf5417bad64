//! Scheduler actor and debounce timers
//!
//! The scheduler runs as a single tokio task owning all of its state.
//! Public operations arrive as messages through the handle; two
//! single-shot debounce timers coalesce bursts of camera updates and
//! quad deliveries into update and purge passes. Outbound events leave
//! through typed channels: `quads_requested` toward the fetcher,
//! `gpu_quads_updated` toward the renderer. Within one update pass the
//! request emission precedes the GPU delta.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::core::camera::Definition;
use crate::render::texture::CompressionAlgorithm;
use crate::tile::bounds::AabbDecoratorPtr;
use crate::tile::{TileId, TileQuad};
use super::config::SchedulerConfig;
use super::scheduler::{GpuQuadDelta, Scheduler};

/// Inbox of the scheduler task
#[derive(Clone)]
pub enum SchedulerMessage {
    UpdateCamera(Definition),
    ReceiveQuads(Vec<TileQuad>),
    SetAabbDecorator(AabbDecoratorPtr),
    SetPermissibleScreenSpaceError(f32),
    SetRamQuadLimit(usize),
    SetGpuQuadLimit(usize),
    SetUpdateTimeout(Duration),
    SetPurgeTimeout(Duration),
    SetCompressionAlgorithm(CompressionAlgorithm),
    SetEnabled(bool),
}

/// Sending side of the scheduler inbox. Cloneable; dropping every handle
/// shuts the scheduler task down and cancels its timers.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerMessage>,
}

impl SchedulerHandle {
    fn send(&self, message: SchedulerMessage) {
        // a closed inbox means the scheduler is shutting down
        let _ = self.tx.send(message);
    }

    pub fn update_camera(&self, camera: Definition) {
        self.send(SchedulerMessage::UpdateCamera(camera));
    }

    pub fn receive_quads(&self, quads: Vec<TileQuad>) {
        self.send(SchedulerMessage::ReceiveQuads(quads));
    }

    pub fn set_aabb_decorator(&self, decorator: AabbDecoratorPtr) {
        self.send(SchedulerMessage::SetAabbDecorator(decorator));
    }

    pub fn set_permissible_screen_space_error(&self, error_px: f32) {
        self.send(SchedulerMessage::SetPermissibleScreenSpaceError(error_px));
    }

    pub fn set_ram_quad_limit(&self, limit: usize) {
        self.send(SchedulerMessage::SetRamQuadLimit(limit));
    }

    pub fn set_gpu_quad_limit(&self, limit: usize) {
        self.send(SchedulerMessage::SetGpuQuadLimit(limit));
    }

    pub fn set_update_timeout(&self, timeout: Duration) {
        self.send(SchedulerMessage::SetUpdateTimeout(timeout));
    }

    pub fn set_purge_timeout(&self, timeout: Duration) {
        self.send(SchedulerMessage::SetPurgeTimeout(timeout));
    }

    pub fn set_compression_algorithm(&self, algorithm: CompressionAlgorithm) {
        self.send(SchedulerMessage::SetCompressionAlgorithm(algorithm));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.send(SchedulerMessage::SetEnabled(enabled));
    }
}

/// Outbound event channels of the scheduler task
pub struct SchedulerEvents {
    /// Quad ids needed but not yet in RAM; the fetcher subscribes here
    pub quads_requested: mpsc::UnboundedReceiver<Vec<TileId>>,
    /// Residency deltas; the renderer subscribes here
    pub gpu_quads_updated: mpsc::UnboundedReceiver<GpuQuadDelta>,
}

/// The scheduler task: owns the synchronous core and drives it from the
/// inbox and the two debounce deadlines.
pub struct SchedulerService {
    scheduler: Scheduler,
    inbox: mpsc::UnboundedReceiver<SchedulerMessage>,
    quads_requested_tx: mpsc::UnboundedSender<Vec<TileId>>,
    gpu_quads_updated_tx: mpsc::UnboundedSender<GpuQuadDelta>,
    update_deadline: Option<Instant>,
    purge_deadline: Option<Instant>,
}

impl SchedulerService {
    /// Spawn the scheduler task on the current runtime
    pub fn spawn(config: SchedulerConfig) -> (SchedulerHandle, SchedulerEvents, JoinHandle<()>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (quads_requested_tx, quads_requested) = mpsc::unbounded_channel();
        let (gpu_quads_updated_tx, gpu_quads_updated) = mpsc::unbounded_channel();

        let service = Self {
            scheduler: Scheduler::new(config),
            inbox,
            quads_requested_tx,
            gpu_quads_updated_tx,
            update_deadline: None,
            purge_deadline: None,
        };
        let join = tokio::spawn(service.run());

        (
            SchedulerHandle { tx },
            SchedulerEvents {
                quads_requested,
                gpu_quads_updated,
            },
            join,
        )
    }

    async fn run(mut self) {
        loop {
            let update_at = self.update_deadline;
            let purge_at = self.purge_deadline;

            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    // all handles dropped: cancel timers by exiting
                    None => break,
                },
                _ = sleep_until(update_at.unwrap_or_else(Instant::now)), if update_at.is_some() => {
                    self.update_deadline = None;
                    self.run_update_pass();
                }
                _ = sleep_until(purge_at.unwrap_or_else(Instant::now)), if purge_at.is_some() => {
                    self.purge_deadline = None;
                    self.scheduler.purge_ram_cache();
                }
            }
        }
    }

    fn handle_message(&mut self, message: SchedulerMessage) {
        match message {
            SchedulerMessage::UpdateCamera(camera) => {
                self.scheduler.update_camera(camera);
                self.schedule_update();
            }
            SchedulerMessage::ReceiveQuads(quads) => {
                self.scheduler.receive_quads(quads);
                self.schedule_purge();
                self.schedule_update();
            }
            SchedulerMessage::SetAabbDecorator(decorator) => {
                self.scheduler.set_aabb_decorator(decorator);
            }
            SchedulerMessage::SetPermissibleScreenSpaceError(error_px) => {
                self.scheduler.set_permissible_screen_space_error(error_px);
            }
            SchedulerMessage::SetRamQuadLimit(limit) => {
                self.scheduler.set_ram_quad_limit(limit);
            }
            SchedulerMessage::SetGpuQuadLimit(limit) => {
                self.scheduler.set_gpu_quad_limit(limit);
            }
            SchedulerMessage::SetUpdateTimeout(timeout) => {
                self.scheduler.set_update_timeout(timeout);
                // a change while armed re-arms with the new value
                if self.update_deadline.is_some() {
                    self.update_deadline =
                        Some(Instant::now() + self.scheduler.update_timeout());
                }
            }
            SchedulerMessage::SetPurgeTimeout(timeout) => {
                self.scheduler.set_purge_timeout(timeout);
                if self.purge_deadline.is_some() {
                    self.purge_deadline =
                        Some(Instant::now() + self.scheduler.purge_timeout());
                }
            }
            SchedulerMessage::SetCompressionAlgorithm(algorithm) => {
                self.scheduler.set_compression_algorithm(algorithm);
            }
            SchedulerMessage::SetEnabled(enabled) => {
                self.scheduler.set_enabled(enabled);
                if enabled {
                    self.schedule_update();
                }
            }
        }
    }

    /// Arm the update timer unless disabled or already armed
    fn schedule_update(&mut self) {
        if self.scheduler.enabled() && self.update_deadline.is_none() {
            self.update_deadline = Some(Instant::now() + self.scheduler.update_timeout());
        }
    }

    /// Arm the purge timer unless disabled or already armed
    fn schedule_purge(&mut self) {
        if self.scheduler.enabled() && self.purge_deadline.is_none() {
            self.purge_deadline = Some(Instant::now() + self.scheduler.purge_timeout());
        }
    }

    fn run_update_pass(&mut self) {
        let requests = self.scheduler.collect_quad_requests();
        let _ = self.quads_requested_tx.send(requests);

        let delta = self.scheduler.update_gpu_quads();
        let _ = self.gpu_quads_updated_tx.send(delta);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::types::{DVec2, DVec3, UVec2};
    use crate::tile::{PlanarBounds, TileData};

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            ram_quad_limit: 100,
            gpu_quad_limit: 20,
            ortho_tile_size: 64,
            height_tile_size: 17,
            ..SchedulerConfig::default()
        }
    }

    fn decorator() -> AabbDecoratorPtr {
        Arc::new(PlanarBounds::new(DVec2::ZERO, DVec2::splat(1000.0), 0.0, 100.0))
    }

    fn overhead_camera() -> Definition {
        let mut camera = Definition::look_at(
            DVec3::new(500.0, 500.0, 250.0),
            DVec3::new(500.0, 500.0, 0.0),
            DVec3::Y,
        );
        camera.viewport = UVec2::new(512, 384);
        camera
    }

    fn quad_for(id: TileId) -> TileQuad {
        TileQuad {
            id,
            tiles: id
                .children()
                .iter()
                .map(|&child| TileData {
                    id: child,
                    ortho: None,
                    height: None,
                })
                .collect(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_pass_emits_requests_then_delta() {
        let (handle, mut events, _join) = SchedulerService::spawn(test_config());

        handle.set_aabb_decorator(decorator());
        handle.update_camera(overhead_camera());

        let requests = events.quads_requested.recv().await.unwrap();
        assert!(!requests.is_empty());

        // the matching gpu delta is emitted in the same pass
        let delta = events.gpu_quads_updated.recv().await.unwrap();
        assert!(delta.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_bursts_coalesce_into_one_pass() {
        let (handle, mut events, _join) = SchedulerService::spawn(test_config());

        handle.set_aabb_decorator(decorator());
        for _ in 0..5 {
            handle.update_camera(overhead_camera());
        }

        let first = events.quads_requested.recv().await.unwrap();
        assert!(!first.is_empty());

        // no further pass is armed; well past another timeout nothing arrives
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(events.quads_requested.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quad_delivery_triggers_promotion() {
        let (handle, mut events, _join) = SchedulerService::spawn(test_config());

        handle.set_aabb_decorator(decorator());
        handle.update_camera(overhead_camera());

        let requests = events.quads_requested.recv().await.unwrap();
        let _ = events.gpu_quads_updated.recv().await.unwrap();

        handle.receive_quads(requests.iter().map(|&id| quad_for(id)).collect());

        let followup = events.quads_requested.recv().await.unwrap();
        assert!(followup.is_empty());
        let delta = events.gpu_quads_updated.recv().await.unwrap();
        assert_eq!(delta.added.len(), requests.len().min(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_scheduler_arms_no_timers() {
        let mut config = test_config();
        config.enabled = false;
        let (handle, mut events, _join) = SchedulerService::spawn(config);

        handle.set_aabb_decorator(decorator());
        handle.update_camera(overhead_camera());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.quads_requested.try_recv().is_err());

        // enabling re-arms the update timer
        handle.set_enabled(true);
        let requests = events.quads_requested.recv().await.unwrap();
        assert!(!requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_change_rearms_armed_timer() {
        let (handle, mut events, _join) = SchedulerService::spawn(test_config());

        handle.set_aabb_decorator(decorator());
        handle.update_camera(overhead_camera());
        // stretch the debounce while the timer is armed
        handle.set_update_timeout(Duration::from_secs(60));

        // give the actor a chance to process both messages
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        // the original deadline passes silently
        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert!(events.quads_requested.try_recv().is_err());

        // the new deadline fires
        tokio::time::advance(Duration::from_secs(60)).await;
        let requests = events.quads_requested.recv().await.unwrap();
        assert!(!requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_timer_reclaims_overflowing_quads() {
        let mut config = test_config();
        config.ram_quad_limit = 1;
        let (handle, mut events, _join) = SchedulerService::spawn(config);

        handle.set_aabb_decorator(decorator());
        handle.update_camera(overhead_camera());
        let requests = events.quads_requested.recv().await.unwrap();
        let _ = events.gpu_quads_updated.recv().await.unwrap();
        assert!(requests.len() > 1);

        // the delivery overflows the tiny RAM cache and arms the purge timer
        handle.receive_quads(requests.iter().map(|&id| quad_for(id)).collect());

        // the update timer fires first: everything is cached
        let followup = events.quads_requested.recv().await.unwrap();
        assert!(followup.is_empty());
        let _ = events.gpu_quads_updated.recv().await.unwrap();

        // let the purge timer evict down to capacity, then ask again:
        // all but the surviving quad are re-requested
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.update_camera(overhead_camera());
        let refetch = events.quads_requested.recv().await.unwrap();
        assert_eq!(refetch.len(), requests.len() - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_the_task() {
        let (handle, events, join) = SchedulerService::spawn(test_config());
        drop(handle);
        drop(events);
        join.await.unwrap();
    }
}
