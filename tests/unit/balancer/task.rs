use super::*;
use crate::foundation::core::Size2;
use crate::framebuffer::LocalFrameBuffer;
use crate::scheduler::{RayonScheduler, SerialScheduler};

#[derive(Default)]
struct Probe {
    renders: AtomicUsize,
    begins: AtomicUsize,
    ends: AtomicUsize,
    fail_tile: Option<usize>,
    panic_tile: Option<usize>,
    produces: Option<ChannelFlags>,
}

impl Renderer for Probe {
    fn channels(&self) -> ChannelFlags {
        self.produces.unwrap_or(ChannelFlags::all())
    }

    fn begin_frame(&self, _fb: &dyn FrameBuffer) -> RaytileResult<()> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render_tile(&self, tile: &mut Tile, _channels: ChannelFlags) -> RaytileResult<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.panic_tile == Some(tile.index()) {
            panic!("bvh traversal out of bounds");
        }
        if self.fail_tile == Some(tile.index()) {
            return Err(RaytileError::Other(anyhow::anyhow!("shader exploded")));
        }
        Ok(())
    }

    fn end_frame(&self, _fb: &dyn FrameBuffer, _channels: ChannelFlags) -> RaytileResult<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Reports(Mutex<Vec<String>>);

impl ErrorReporter for Reports {
    fn report(&self, err: &RaytileError) {
        self.0.lock().unwrap().push(err.to_string());
    }
}

fn fb_1024x768() -> Arc<LocalFrameBuffer> {
    Arc::new(
        LocalFrameBuffer::with_tile_size(Size2::new(1024, 768), 64, ChannelFlags::COLOR).unwrap(),
    )
}

#[test]
fn new_task_is_idle_and_sized() {
    let fb: Arc<dyn FrameBuffer> = fb_1024x768();
    let renderer: Arc<dyn Renderer> = Arc::new(Probe::default());
    let task = RenderTask::new(
        &renderer,
        &fb,
        ChannelFlags::COLOR,
        TileAssignment::interleaved(1, 5).unwrap(),
    )
    .unwrap();
    assert_eq!(task.phase(), FramePhase::Idle);
    assert_eq!(task.grid().total(), 192);
    assert_eq!(task.dispatch_count(), 39);
    assert_eq!(Arc::strong_count(&fb), 2);
    drop(task);
    assert_eq!(Arc::strong_count(&fb), 1);
}

#[test]
fn execute_runs_hooks_once_and_releases_references() {
    let local = fb_1024x768();
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let probe = Arc::new(Probe::default());
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let stats = task.execute(&SerialScheduler, &reports).unwrap();

    assert_eq!(stats.tiles_total, 192);
    assert_eq!(stats.tiles_rendered, 192);
    assert_eq!(stats.frame_id, 1);
    assert_eq!(probe.renders.load(Ordering::SeqCst), 192);
    assert_eq!(probe.begins.load(Ordering::SeqCst), 1);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 1);
    assert!(local.is_frame_complete());
    assert!(reports.0.lock().unwrap().is_empty());
    // local + fb; the task's share is gone.
    assert_eq!(Arc::strong_count(&local), 2);
    assert_eq!(Arc::strong_count(&probe), 2);
}

#[test]
fn failure_at_tile_five_aborts_and_reports_once() {
    let local = fb_1024x768();
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let probe = Arc::new(Probe {
        fail_tile: Some(5),
        ..Probe::default()
    });
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let err = task.execute(&SerialScheduler, &reports).unwrap_err();

    assert_eq!(err.failed_tile(), Some(5));
    assert_eq!(probe.renders.load(Ordering::SeqCst), 6);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 0);
    assert!(!local.is_frame_complete());
    assert_eq!(local.frame_id(), 0);
    let reports = reports.0.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("shader exploded"));
}

#[test]
fn panicking_tile_aborts_and_reports_once() {
    let local = fb_1024x768();
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let probe = Arc::new(Probe {
        panic_tile: Some(5),
        ..Probe::default()
    });
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let err = task.execute(&SerialScheduler, &reports).unwrap_err();

    assert_eq!(err.failed_tile(), Some(5));
    assert!(err.to_string().contains("bvh traversal out of bounds"));
    assert_eq!(probe.renders.load(Ordering::SeqCst), 6);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 0);
    assert!(!local.is_frame_complete());
    assert_eq!(reports.0.lock().unwrap().len(), 1);
    assert_eq!(Arc::strong_count(&probe), 2);
}

#[test]
fn parallel_panic_is_contained_and_reported_once() {
    let fb: Arc<dyn FrameBuffer> = fb_1024x768();
    let probe = Arc::new(Probe {
        panic_tile: Some(5),
        ..Probe::default()
    });
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();
    let sched = RayonScheduler::new(Some(4)).unwrap();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let err = task.execute(&sched, &reports).unwrap_err();

    assert_eq!(err.failed_tile(), Some(5));
    assert_eq!(reports.0.lock().unwrap().len(), 1);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 0);
}

#[test]
fn finish_without_rendering_owned_tiles_is_a_partition_error() {
    let local = fb_1024x768();
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let probe = Arc::new(Probe::default());
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let err = task.finish(Ok(()), &reports).unwrap_err();

    assert!(matches!(err, RaytileError::Partition(_)), "{err:?}");
    assert!(err.to_string().contains("rendered 0 tile(s)"));
    assert_eq!(reports.0.lock().unwrap().len(), 1);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 0);
    assert!(!local.is_frame_complete());
    assert_eq!(local.frame_id(), 0);
}

#[test]
fn renderer_sized_for_another_frame_is_rejected() {
    use crate::renderer::GradientRenderer;

    let fb: Arc<dyn FrameBuffer> = fb_1024x768();
    let renderer: Arc<dyn Renderer> = Arc::new(GradientRenderer::new(Size2::new(640, 480)));
    let err = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap_err();
    assert!(matches!(err, RaytileError::Validation(_)));
    assert!(err.to_string().contains("640x480"));

    let matching: Arc<dyn Renderer> = Arc::new(GradientRenderer::new(Size2::new(1024, 768)));
    assert!(RenderTask::new(&matching, &fb, ChannelFlags::COLOR, TileAssignment::All).is_ok());
}

#[test]
fn parallel_failure_reports_once() {
    let fb: Arc<dyn FrameBuffer> = fb_1024x768();
    let probe = Arc::new(Probe {
        fail_tile: Some(5),
        ..Probe::default()
    });
    let renderer: Arc<dyn Renderer> = probe.clone();
    let reports = Reports::default();
    let sched = RayonScheduler::new(Some(4)).unwrap();

    let task = RenderTask::new(&renderer, &fb, ChannelFlags::COLOR, TileAssignment::All).unwrap();
    let err = task.execute(&sched, &reports).unwrap_err();

    assert_eq!(err.failed_tile(), Some(5));
    assert_eq!(reports.0.lock().unwrap().len(), 1);
    assert!(probe.renders.load(Ordering::SeqCst) <= 192);
    assert_eq!(probe.ends.load(Ordering::SeqCst), 0);
}

#[test]
fn unsupported_channels_fail_before_dispatch() {
    let fb: Arc<dyn FrameBuffer> = fb_1024x768();
    let probe = Arc::new(Probe {
        produces: Some(ChannelFlags::COLOR | ChannelFlags::DEPTH),
        ..Probe::default()
    });
    let renderer: Arc<dyn Renderer> = probe.clone();

    let err = RenderTask::new(&renderer, &fb, ChannelFlags::DEPTH, TileAssignment::All).unwrap_err();
    assert!(err.to_string().contains("frame buffer does not store"));

    let full: Arc<dyn FrameBuffer> = Arc::new(
        LocalFrameBuffer::new(Size2::new(64, 64), ChannelFlags::all()).unwrap(),
    );
    let err = RenderTask::new(&renderer, &full, ChannelFlags::NORMAL, TileAssignment::All)
        .unwrap_err();
    assert!(err.to_string().contains("renderer cannot produce"));

    // ACCUM is a pass-through request and never rejected by the frame buffer.
    let accumulating: Arc<dyn Renderer> = Arc::new(Probe::default());
    assert!(
        RenderTask::new(
            &accumulating,
            &fb,
            ChannelFlags::COLOR | ChannelFlags::ACCUM,
            TileAssignment::All
        )
        .is_ok()
    );
    assert_eq!(probe.begins.load(Ordering::SeqCst), 0);
    assert_eq!(probe.renders.load(Ordering::SeqCst), 0);
}

#[test]
fn interleaved_task_skips_tail_items() {
    // 3x3 tiles = 9, 4 devices: device 3 dispatches ceil(9/4) = 3 items but owns only 2 tiles.
    let local = Arc::new(
        LocalFrameBuffer::with_tile_size(Size2::new(12, 12), 4, ChannelFlags::COLOR).unwrap(),
    );
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let probe = Arc::new(Probe::default());
    let renderer: Arc<dyn Renderer> = probe.clone();
    let task = RenderTask::new(
        &renderer,
        &fb,
        ChannelFlags::COLOR,
        TileAssignment::interleaved(3, 4).unwrap(),
    )
    .unwrap();
    let stats = task.execute(&SerialScheduler, &Reports::default()).unwrap();
    assert_eq!(stats.tiles_dispatched, 3);
    assert_eq!(stats.tiles_rendered, 2);
    assert_eq!(
        local.tile_write_counts().unwrap(),
        vec![0, 0, 0, 1, 0, 0, 0, 1, 0]
    );
}
