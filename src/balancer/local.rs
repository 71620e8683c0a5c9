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

/// Renders every tile of a frame on this machine's thread pool.
///
/// No cross-process or cross-device coordination happens here, even if several application
/// processes each run their own local balancer.
pub struct LocalTiledLoadBalancer {
    scheduler: Arc<dyn TaskScheduler>,
    reporter: Arc<dyn ErrorReporter>,
}

impl LocalTiledLoadBalancer {
    /// Balancer dispatching onto `scheduler` and surfacing tile failures through `reporter`.
    pub fn new(scheduler: Arc<dyn TaskScheduler>, reporter: Arc<dyn ErrorReporter>) -> Self {
        tracing::info!(
            threads = scheduler.num_threads(),
            "local tiled load balancer"
        );
        Self {
            scheduler,
            reporter,
        }
    }
}

impl TiledLoadBalancer for LocalTiledLoadBalancer {
    fn kind(&self) -> BalancerKind {
        BalancerKind::Local
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = "local", ?channels))]
    fn render_frame(
        &self,
        renderer: &Arc<dyn Renderer>,
        fb: &Arc<dyn FrameBuffer>,
        channels: ChannelFlags,
    ) -> RaytileResult<FrameStats> {
        let task = RenderTask::new(renderer, fb, channels, TileAssignment::All)?;
        tracing::debug!(
            tiles_x = task.grid().num_tiles_x(),
            tiles_y = task.grid().num_tiles_y(),
            tiles = task.grid().total(),
            "dispatching frame"
        );
        task.execute(self.scheduler.as_ref(), self.reporter.as_ref())
    }
}

impl std::fmt::Debug for LocalTiledLoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTiledLoadBalancer")
            .field("threads", &self.scheduler.num_threads())
            .finish()
    }
}
