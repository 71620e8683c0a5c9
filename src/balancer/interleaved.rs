use std::sync::Arc;

use crate::balancer::task::RenderTask;
use crate::balancer::{BalancerKind, TiledLoadBalancer};
use crate::device::ErrorReporter;
use crate::foundation::core::{ChannelFlags, FrameStats};
use crate::foundation::error::RaytileResult;
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use crate::scheduler::TaskScheduler;
use crate::tile::partition::TileAssignment;

/// Renders this device's round-robin share of a frame shared by `num_devices` local devices.
///
/// Device `device_id` owns global tiles `device_id, device_id + num_devices, ...`. A successful
/// `render_frame` only guarantees that this share is stored; knowing that the whole frame is done
/// across devices is up to whoever composes the devices' calls.
pub struct InterleavedTiledLoadBalancer {
    device_id: usize,
    num_devices: usize,
    assignment: TileAssignment,
    scheduler: Arc<dyn TaskScheduler>,
    reporter: Arc<dyn ErrorReporter>,
}

impl InterleavedTiledLoadBalancer {
    /// Balancer for device `device_id` of `num_devices`.
    pub fn new(
        device_id: usize,
        num_devices: usize,
        scheduler: Arc<dyn TaskScheduler>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> RaytileResult<Self> {
        let assignment = TileAssignment::interleaved(device_id, num_devices)?;
        tracing::info!(
            device_id,
            num_devices,
            threads = scheduler.num_threads(),
            "interleaved tiled load balancer"
        );
        Ok(Self {
            device_id,
            num_devices,
            assignment,
            scheduler,
            reporter,
        })
    }

    /// This device's id.
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// Number of cooperating devices.
    pub fn num_devices(&self) -> usize {
        self.num_devices
    }
}

impl TiledLoadBalancer for InterleavedTiledLoadBalancer {
    fn kind(&self) -> BalancerKind {
        BalancerKind::Interleaved
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(kind = "interleaved", device_id = self.device_id, num_devices = self.num_devices, ?channels)
    )]
    fn render_frame(
        &self,
        renderer: &Arc<dyn Renderer>,
        fb: &Arc<dyn FrameBuffer>,
        channels: ChannelFlags,
    ) -> RaytileResult<FrameStats> {
        let task = RenderTask::new(renderer, fb, channels, self.assignment)?;
        let total = task.grid().total();
        tracing::debug!(
            tiles = total,
            tiles_mine = self.assignment.owned_count(total),
            dispatched = task.dispatch_count(),
            "dispatching frame share"
        );
        task.execute(self.scheduler.as_ref(), self.reporter.as_ref())
    }
}

impl std::fmt::Debug for InterleavedTiledLoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterleavedTiledLoadBalancer")
            .field("device_id", &self.device_id)
            .field("num_devices", &self.num_devices)
            .field("threads", &self.scheduler.num_threads())
            .finish()
    }
}
