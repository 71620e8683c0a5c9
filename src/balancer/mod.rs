use std::sync::Arc;

use crate::config::ExecutionMode;
use crate::device::ErrorReporter;
use crate::foundation::core::{ChannelFlags, FrameStats};
use crate::foundation::error::RaytileResult;
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use crate::scheduler::TaskScheduler;

pub(crate) mod interleaved;
pub(crate) mod local;
pub(crate) mod task;

use interleaved::InterleavedTiledLoadBalancer;
use local::LocalTiledLoadBalancer;

/// Decides how the tiles of one frame are partitioned and dispatched.
pub trait TiledLoadBalancer: Send + Sync {
    /// Which strategy this balancer implements.
    fn kind(&self) -> BalancerKind;

    /// Render every tile this execution context owns and finalize the frame.
    ///
    /// Blocks until all owned tiles and the finish step completed. Precondition violations
    /// (empty frame, zero tile size, unsupported channels) fail before any tile is dispatched.
    /// A tile failure aborts the remaining dispatch and is reported exactly once.
    ///
    /// Calls for the same frame buffer must not overlap.
    fn render_frame(
        &self,
        renderer: &Arc<dyn Renderer>,
        fb: &Arc<dyn FrameBuffer>,
        channels: ChannelFlags,
    ) -> RaytileResult<FrameStats>;
}

/// Available load balancing strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalancerKind {
    /// All tiles on this machine's pool.
    Local,
    /// Static round-robin share of a frame rendered by several local devices.
    Interleaved,
}

/// Create the load balancer for `mode`.
pub fn create_balancer(
    mode: &ExecutionMode,
    scheduler: Arc<dyn TaskScheduler>,
    reporter: Arc<dyn ErrorReporter>,
) -> RaytileResult<Box<dyn TiledLoadBalancer>> {
    match *mode {
        ExecutionMode::Local => Ok(Box::new(LocalTiledLoadBalancer::new(scheduler, reporter))),
        ExecutionMode::Interleaved {
            device_id,
            num_devices,
        } => Ok(Box::new(InterleavedTiledLoadBalancer::new(
            device_id,
            num_devices,
            scheduler,
            reporter,
        )?)),
    }
}
