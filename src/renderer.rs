use crate::foundation::core::{ChannelFlags, Size2};
use crate::foundation::error::{RaytileError, RaytileResult};
use crate::framebuffer::FrameBuffer;
use crate::tile::buffer::Tile;

/// Scene-owning renderer that produces pixels one tile at a time.
///
/// Scene state is read-only while a frame is in flight; [`Renderer::render_tile`] is called
/// concurrently from pool threads, each with its own exclusive [`Tile`].
pub trait Renderer: Send + Sync {
    /// Channels this renderer can produce.
    fn channels(&self) -> ChannelFlags {
        ChannelFlags::all()
    }

    /// Reject a frame buffer this renderer cannot fill, before anything is dispatched.
    fn validate_target(&self, _fb: &dyn FrameBuffer) -> RaytileResult<()> {
        Ok(())
    }

    /// Called once per frame before tiles are dispatched.
    fn begin_frame(&self, _fb: &dyn FrameBuffer) -> RaytileResult<()> {
        Ok(())
    }

    /// Render every pixel of `tile` for the requested `channels`.
    fn render_tile(&self, tile: &mut Tile, channels: ChannelFlags) -> RaytileResult<()>;

    /// Called once per frame after all owned tiles completed successfully.
    fn end_frame(&self, _fb: &dyn FrameBuffer, _channels: ChannelFlags) -> RaytileResult<()> {
        Ok(())
    }
}

/// Deterministic renderer used for smoke tests and benchmarks.
///
/// Color is a gradient over the frame, depth is the distance to the frame center, normals face
/// the camera and albedo is a constant grey. Output depends only on pixel coordinates, so every
/// tiling and every device split of a frame yields identical pixels.
#[derive(Clone, Debug)]
pub struct GradientRenderer {
    size: Size2,
    /// Samples per pixel averaged into the color channel.
    pub spp: u32,
}

impl GradientRenderer {
    /// Renderer for frames of `size` pixels.
    pub fn new(size: Size2) -> Self {
        Self { size, spp: 1 }
    }

    /// Same renderer averaging `spp` jittered samples per pixel.
    pub fn with_spp(mut self, spp: u32) -> Self {
        self.spp = spp;
        self
    }

    fn shade(&self, x: u32, y: u32) -> [f32; 4] {
        let spp = self.spp.max(1);
        let w = self.size.width.max(1) as f32;
        let h = self.size.height.max(1) as f32;
        let mut acc = [0.0f32; 3];
        for s in 0..spp {
            let jitter = (s as f32 + 0.5) / spp as f32;
            let u = (x as f32 + jitter) / w;
            let v = (y as f32 + jitter) / h;
            acc[0] += u;
            acc[1] += v;
            acc[2] += 1.0 - 0.5 * (u + v);
        }
        let inv = 1.0 / spp as f32;
        [acc[0] * inv, acc[1] * inv, acc[2] * inv, 1.0]
    }
}

impl Renderer for GradientRenderer {
    fn validate_target(&self, fb: &dyn FrameBuffer) -> RaytileResult<()> {
        if fb.size() != self.size {
            return Err(RaytileError::validation(format!(
                "renderer is set up for {}x{} but the frame buffer is {}x{}",
                self.size.width,
                self.size.height,
                fb.size().width,
                fb.size().height
            )));
        }
        Ok(())
    }

    fn render_tile(&self, tile: &mut Tile, channels: ChannelFlags) -> RaytileResult<()> {
        let cx = self.size.width as f32 * 0.5;
        let cy = self.size.height as f32 * 0.5;
        for (x, y) in tile.pixels() {
            if channels.contains(ChannelFlags::COLOR) {
                tile.set_color(x, y, self.shade(x, y));
            }
            if channels.contains(ChannelFlags::DEPTH) {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                tile.set_depth(x, y, 1.0 + (dx * dx + dy * dy).sqrt());
            }
            if channels.contains(ChannelFlags::NORMAL) {
                tile.set_normal(x, y, [0.0, 0.0, 1.0]);
            }
            if channels.contains(ChannelFlags::ALBEDO) {
                tile.set_albedo(x, y, [0.18, 0.18, 0.18]);
            }
        }
        Ok(())
    }
}
