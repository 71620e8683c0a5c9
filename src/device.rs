use std::sync::{Arc, RwLock};

use crate::balancer::{BalancerKind, TiledLoadBalancer, create_balancer};
use crate::config::DeviceConfig;
use crate::foundation::core::{ChannelFlags, FrameStats};
use crate::foundation::error::{RaytileError, RaytileResult};
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use crate::scheduler::{RayonScheduler, SerialScheduler, TaskScheduler};

/// Device-level sink for frame failures.
///
/// A failed frame is reported exactly once, however many tiles were in flight.
pub trait ErrorReporter: Send + Sync {
    /// Surface `err` to the application.
    fn report(&self, err: &RaytileError);
}

/// Default reporter: logs through `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, err: &RaytileError) {
        match err.failed_tile() {
            Some(tile) => tracing::error!(tile, error = %err, "frame aborted"),
            None => tracing::error!(error = %err, "frame failed"),
        }
    }
}

/// Explicitly constructed rendering context: the active load balancer plus its scheduler and
/// error reporter.
///
/// Tests and embedders create as many as they like; [`init_global`] installs one process-wide.
pub struct Device {
    config: DeviceConfig,
    balancer: Box<dyn TiledLoadBalancer>,
}

impl Device {
    /// Build a device from `config`, using a rayon pool when `config.parallel` is set.
    pub fn new(config: DeviceConfig) -> RaytileResult<Self> {
        config.validate()?;
        let scheduler: Arc<dyn TaskScheduler> = if config.parallel {
            Arc::new(RayonScheduler::new(config.threads)?)
        } else {
            Arc::new(SerialScheduler)
        };
        Self::with_parts(config, scheduler, Arc::new(TracingErrorReporter))
    }

    /// Build a device with an injected scheduler and reporter.
    pub fn with_parts(
        config: DeviceConfig,
        scheduler: Arc<dyn TaskScheduler>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> RaytileResult<Self> {
        config.validate()?;
        let balancer = create_balancer(&config.mode, scheduler, reporter)?;
        tracing::info!(mode = ?config.mode, "device initialized");
        Ok(Self { config, balancer })
    }

    /// Configuration this device was built from.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Strategy of the active load balancer.
    pub fn balancer_kind(&self) -> BalancerKind {
        self.balancer.kind()
    }

    /// The active load balancer.
    pub fn balancer(&self) -> &dyn TiledLoadBalancer {
        self.balancer.as_ref()
    }

    /// Render one frame through the active load balancer.
    pub fn render_frame(
        &self,
        renderer: &Arc<dyn Renderer>,
        fb: &Arc<dyn FrameBuffer>,
        channels: ChannelFlags,
    ) -> RaytileResult<FrameStats> {
        self.balancer.render_frame(renderer, fb, channels)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("balancer", &self.balancer.kind())
            .finish()
    }
}

static GLOBAL_DEVICE: RwLock<Option<Arc<Device>>> = RwLock::new(None);

/// Create the process-wide device. Fails if one is already installed.
///
/// In-flight frames hold their own `Arc<Device>`, so [`shutdown_global`] never pulls the
/// balancer out from under a running frame.
pub fn init_global(config: DeviceConfig) -> RaytileResult<Arc<Device>> {
    let mut slot = GLOBAL_DEVICE
        .write()
        .map_err(|_| RaytileError::validation("global device lock poisoned"))?;
    if slot.is_some() {
        return Err(RaytileError::validation(
            "global device already initialized; call shutdown_global first",
        ));
    }
    let device = Arc::new(Device::new(config)?);
    *slot = Some(Arc::clone(&device));
    Ok(device)
}

/// The process-wide device installed by [`init_global`].
pub fn global() -> RaytileResult<Arc<Device>> {
    GLOBAL_DEVICE
        .read()
        .map_err(|_| RaytileError::validation("global device lock poisoned"))?
        .clone()
        .ok_or_else(|| RaytileError::validation("global device not initialized"))
}

/// Remove the process-wide device. Returns `true` if one was installed.
pub fn shutdown_global() -> RaytileResult<bool> {
    let mut slot = GLOBAL_DEVICE
        .write()
        .map_err(|_| RaytileError::validation("global device lock poisoned"))?;
    let had = slot.take().is_some();
    if had {
        tracing::info!("global device shut down");
    }
    Ok(had)
}
