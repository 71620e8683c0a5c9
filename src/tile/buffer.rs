use crate::foundation::core::{ChannelFlags, TileRect};

/// Scratch pixels for one tile, filled by a [`Renderer`](crate::Renderer) and then handed to
/// [`FrameBuffer::set_tile`](crate::FrameBuffer::set_tile).
///
/// Each worker owns its `Tile` exclusively, so rendering never touches shared pixel storage.
/// Channel vectors are row-major over [`Tile::rect`] and allocated only for requested channels.
#[derive(Clone, Debug)]
pub struct Tile {
    index: usize,
    rect: TileRect,
    channels: ChannelFlags,
    /// Linear RGBA color, when [`ChannelFlags::COLOR`] was requested.
    pub color: Vec<[f32; 4]>,
    /// Depth, when [`ChannelFlags::DEPTH`] was requested.
    pub depth: Vec<f32>,
    /// Normals, when [`ChannelFlags::NORMAL`] was requested.
    pub normal: Vec<[f32; 3]>,
    /// Albedo, when [`ChannelFlags::ALBEDO`] was requested.
    pub albedo: Vec<[f32; 3]>,
}

impl Tile {
    /// Allocate cleared storage for global tile `index` covering `rect`.
    pub fn new(index: usize, rect: TileRect, channels: ChannelFlags) -> Self {
        let n = rect.area();
        let alloc = |flag: ChannelFlags| if channels.contains(flag) { n } else { 0 };
        Self {
            index,
            rect,
            channels,
            color: vec![[0.0; 4]; alloc(ChannelFlags::COLOR)],
            depth: vec![f32::INFINITY; alloc(ChannelFlags::DEPTH)],
            normal: vec![[0.0; 3]; alloc(ChannelFlags::NORMAL)],
            albedo: vec![[0.0; 3]; alloc(ChannelFlags::ALBEDO)],
        }
    }

    /// Global tile index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Pixel rectangle in frame coordinates.
    pub fn rect(&self) -> TileRect {
        self.rect
    }

    /// Channels this tile carries storage for.
    pub fn channels(&self) -> ChannelFlags {
        self.channels
    }

    /// Absolute pixel coordinates covered by this tile, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let r = self.rect;
        (r.y0..r.y1).flat_map(move |y| (r.x0..r.x1).map(move |x| (x, y)))
    }

    /// Write color at absolute pixel `(x, y)`. Returns `false` when out of bounds or not stored.
    pub fn set_color(&mut self, x: u32, y: u32, rgba: [f32; 4]) -> bool {
        write_px(&mut self.color, self.rect, x, y, rgba)
    }

    /// Write depth at absolute pixel `(x, y)`.
    pub fn set_depth(&mut self, x: u32, y: u32, depth: f32) -> bool {
        write_px(&mut self.depth, self.rect, x, y, depth)
    }

    /// Write a normal at absolute pixel `(x, y)`.
    pub fn set_normal(&mut self, x: u32, y: u32, n: [f32; 3]) -> bool {
        write_px(&mut self.normal, self.rect, x, y, n)
    }

    /// Write albedo at absolute pixel `(x, y)`.
    pub fn set_albedo(&mut self, x: u32, y: u32, a: [f32; 3]) -> bool {
        write_px(&mut self.albedo, self.rect, x, y, a)
    }
}

fn write_px<T>(buf: &mut [T], rect: TileRect, x: u32, y: u32, v: T) -> bool {
    match rect.local_offset(x, y).and_then(|i| buf.get_mut(i)) {
        Some(slot) => {
            *slot = v;
            true
        }
        None => false,
    }
}
