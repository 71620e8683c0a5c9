use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::device::ErrorReporter;
use crate::foundation::core::{ChannelFlags, FrameStats};
use crate::foundation::error::{RaytileError, RaytileResult};
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use crate::scheduler::{ParallelTask, TaskScheduler};
use crate::tile::buffer::Tile;
use crate::tile::grid::TileGrid;
use crate::tile::partition::TileAssignment;

/// Lifecycle of one frame on one execution context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FramePhase {
    /// No frame in flight.
    Idle = 0,
    /// Validating inputs and calling `begin_frame` hooks.
    Dispatching = 1,
    /// Tiles handed to the scheduler.
    TilesInFlight = 2,
    /// All owned tiles done, running `end_frame` hooks.
    Finalizing = 3,
}

impl FramePhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Dispatching,
            2 => Self::TilesInFlight,
            3 => Self::Finalizing,
            _ => Self::Idle,
        }
    }
}

/// The unit of scheduled work for one frame.
///
/// Holds shared ownership of the renderer and frame buffer for the duration of the frame. `run`
/// is the per-item work; [`RenderTask::finish`] consumes the task, so it executes exactly once and
/// releases both references when it returns.
pub struct RenderTask {
    fb: Arc<dyn FrameBuffer>,
    renderer: Arc<dyn Renderer>,
    grid: TileGrid,
    assignment: TileAssignment,
    channels: ChannelFlags,

    phase: AtomicU8,
    aborted: AtomicBool,
    first_error: Mutex<Option<RaytileError>>,
    rendered: AtomicUsize,
}

impl RenderTask {
    /// Validate inputs and build the task. Nothing is dispatched yet.
    pub(crate) fn new(
        renderer: &Arc<dyn Renderer>,
        fb: &Arc<dyn FrameBuffer>,
        channels: ChannelFlags,
        assignment: TileAssignment,
    ) -> RaytileResult<Self> {
        let grid = TileGrid::new(fb.size(), fb.tile_size())?;
        let unsupported = channels - fb.channels() - ChannelFlags::ACCUM;
        if !unsupported.is_empty() {
            return Err(RaytileError::validation(format!(
                "frame buffer does not store requested channels {unsupported:?}"
            )));
        }
        let unsupported = channels - renderer.channels();
        if !unsupported.is_empty() {
            return Err(RaytileError::validation(format!(
                "renderer cannot produce requested channels {unsupported:?}"
            )));
        }
        renderer.validate_target(fb.as_ref())?;

        Ok(Self {
            fb: Arc::clone(fb),
            renderer: Arc::clone(renderer),
            grid,
            assignment,
            channels,
            phase: AtomicU8::new(FramePhase::Idle as u8),
            aborted: AtomicBool::new(false),
            first_error: Mutex::new(None),
            rendered: AtomicUsize::new(0),
        })
    }

    /// Tile grid of this frame.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Tiles owned by this execution context.
    pub fn assignment(&self) -> TileAssignment {
        self.assignment
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> FramePhase {
        FramePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Length of the item range handed to the scheduler.
    pub fn dispatch_count(&self) -> usize {
        self.assignment.dispatch_count(self.grid.total())
    }

    fn set_phase(&self, phase: FramePhase) {
        tracing::debug!(?phase, "frame phase");
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Run the whole frame: begin hooks, parallel tile dispatch, then [`RenderTask::finish`].
    ///
    /// Blocks until the scheduler's join barrier and the finish step completed.
    pub(crate) fn execute(
        self,
        scheduler: &dyn TaskScheduler,
        reporter: &dyn ErrorReporter,
    ) -> RaytileResult<FrameStats> {
        self.set_phase(FramePhase::Dispatching);
        let begun = self
            .fb
            .begin_frame()
            .and_then(|()| self.renderer.begin_frame(self.fb.as_ref()));
        if let Err(e) = begun {
            self.set_phase(FramePhase::Idle);
            return Err(e);
        }

        self.set_phase(FramePhase::TilesInFlight);
        let outcome = scheduler.parallel_for(self.dispatch_count(), &self);
        self.finish(outcome, reporter)
    }

    /// Frame-level finalization. Runs once, after every dispatched item returned.
    ///
    /// On failure the first recorded tile error is reported once and returned; `end_frame` hooks
    /// do not run and the frame buffer keeps whatever tiles were already stored.
    pub(crate) fn finish(
        self,
        outcome: RaytileResult<()>,
        reporter: &dyn ErrorReporter,
    ) -> RaytileResult<FrameStats> {
        let recorded = self
            .first_error
            .lock()
            .map_err(|_| RaytileError::scheduler("render task error slot poisoned"))?
            .take();

        // A recorded tile error wins over whatever the scheduler chose to return.
        let failure = match (recorded, outcome) {
            (Some(e), _) => Some(e),
            (None, Err(e)) => Some(e),
            (None, Ok(())) => None,
        };
        if let Some(err) = failure {
            reporter.report(&err);
            self.set_phase(FramePhase::Idle);
            return Err(err);
        }

        self.set_phase(FramePhase::Finalizing);
        let total = self.grid.total();
        let rendered = self.rendered.load(Ordering::Acquire);
        let owned = self.assignment.owned_count(total);
        if rendered != owned {
            let err = RaytileError::partition(format!(
                "rendered {rendered} tile(s) but {:?} owns {owned} of {total}",
                self.assignment
            ));
            reporter.report(&err);
            self.set_phase(FramePhase::Idle);
            return Err(err);
        }

        let ended = self
            .renderer
            .end_frame(self.fb.as_ref(), self.channels)
            .and_then(|()| self.fb.end_frame(self.assignment));
        self.set_phase(FramePhase::Idle);
        if let Err(e) = ended {
            reporter.report(&e);
            return Err(e);
        }

        Ok(FrameStats {
            frame_id: self.fb.frame_id(),
            tiles_total: total,
            tiles_dispatched: self.dispatch_count(),
            tiles_rendered: rendered,
        })
    }

    fn render_one(&self, tile_index: usize) -> RaytileResult<()> {
        let rect = self.grid.rect(tile_index).ok_or_else(|| {
            RaytileError::partition(format!("tile {tile_index} outside the grid"))
        })?;
        let mut tile = Tile::new(tile_index, rect, self.channels);
        self.renderer.render_tile(&mut tile, self.channels)?;
        self.fb.set_tile(&tile)
    }

    fn record_failure(&self, tile_index: usize, err: RaytileError) -> RaytileError {
        let already_aborted = self.aborted.swap(true, Ordering::AcqRel);
        tracing::debug!(tile = tile_index, already_aborted, "tile failed");
        if let Ok(mut slot) = self.first_error.lock()
            && slot.is_none()
        {
            *slot = Some(RaytileError::tile_render(tile_index, err));
        }
        // Only a stop signal for the scheduler; `finish` surfaces the recorded error.
        RaytileError::scheduler(format!("dispatch aborted after tile {tile_index} failed"))
    }
}

impl ParallelTask for RenderTask {
    fn run(&self, item: usize) -> RaytileResult<()> {
        if self.aborted.load(Ordering::Acquire) {
            return Ok(());
        }
        let Some(tile_index) = self.assignment.global_tile(item, self.grid.total()) else {
            return Ok(());
        };

        tracing::trace!(item, tile = tile_index, "render tile");
        // The tile scratch buffer is dropped with the panic; the frame buffer slot lock is not
        // held while the renderer runs.
        let rendered = catch_unwind(AssertUnwindSafe(|| self.render_one(tile_index)))
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));
        match rendered {
            Ok(()) => {
                self.rendered.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            Err(e) => Err(self.record_failure(tile_index, e)),
        }
    }
}

fn panic_error(payload: &(dyn std::any::Any + Send)) -> RaytileError {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    RaytileError::Other(anyhow::anyhow!("tile render panicked: {msg}"))
}

impl std::fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTask")
            .field("grid", &self.grid)
            .field("assignment", &self.assignment)
            .field("channels", &self.channels)
            .field("phase", &self.phase())
            .field("rendered", &self.rendered.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/balancer/task.rs"]
mod tests;
