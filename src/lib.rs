//! raytile is the tiled frame load balancer of a CPU ray tracer.
//!
//! Given a [`Renderer`] and a destination [`FrameBuffer`], a [`TiledLoadBalancer`] splits the
//! image into fixed-size tiles, renders the tiles its execution context owns in parallel, and
//! finalizes the frame once every owned tile is stored:
//!
//! - [`LocalTiledLoadBalancer`] renders every tile on this machine's thread pool.
//! - [`InterleavedTiledLoadBalancer`] renders a static round-robin share, so several local
//!   devices can cooperatively fill one shared frame buffer.
//!
//! Most applications build a [`Device`] from a [`DeviceConfig`] and call
//! [`Device::render_frame`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Load balancing strategies and the per-frame render task.
pub mod balancer;
/// Startup configuration.
pub mod config;
/// Device context, error reporting and the process-wide device handle.
pub mod device;
/// Frame buffer capability and the in-memory implementation.
pub mod framebuffer;
/// Renderer capability and a deterministic reference renderer.
pub mod renderer;
/// Thread-pool abstraction used to dispatch tiles.
pub mod scheduler;
pub(crate) mod tile;

pub use crate::foundation::core::{ChannelFlags, FrameStats, Size2, TileRect};
pub use crate::foundation::error::{RaytileError, RaytileResult};

pub use crate::balancer::interleaved::InterleavedTiledLoadBalancer;
pub use crate::balancer::local::LocalTiledLoadBalancer;
pub use crate::balancer::task::{FramePhase, RenderTask};
pub use crate::balancer::{BalancerKind, TiledLoadBalancer, create_balancer};
pub use crate::config::{DeviceConfig, ExecutionMode};
pub use crate::device::{
    Device, ErrorReporter, TracingErrorReporter, global, init_global, shutdown_global,
};
pub use crate::framebuffer::{DEFAULT_TILE_SIZE, FrameBuffer, LocalFrameBuffer};
pub use crate::renderer::{GradientRenderer, Renderer};
pub use crate::scheduler::{ParallelTask, RayonScheduler, SerialScheduler, TaskScheduler};
pub use crate::tile::buffer::Tile;
pub use crate::tile::grid::TileGrid;
pub use crate::tile::partition::TileAssignment;
