use bitflags::bitflags;

bitflags! {
    /// Output channels a frame must produce.
    ///
    /// Passed through unmodified from the caller of
    /// [`TiledLoadBalancer::render_frame`](crate::TiledLoadBalancer::render_frame) to every
    /// per-tile render call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
    pub struct ChannelFlags: u32 {
        /// RGBA color.
        const COLOR  = 1 << 0;
        /// Linear depth along the primary ray.
        const DEPTH  = 1 << 1;
        /// Shading normal of the first hit.
        const NORMAL = 1 << 2;
        /// Surface albedo of the first hit.
        const ALBEDO = 1 << 3;
        /// Accumulation request. Carried through, never stored by this crate.
        const ACCUM  = 1 << 4;
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size2 {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size2 {
    /// Construct a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)` in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRect {
    /// Inclusive left edge.
    pub x0: u32,
    /// Inclusive top edge.
    pub y0: u32,
    /// Exclusive right edge.
    pub x1: u32,
    /// Exclusive bottom edge.
    pub y1: u32,
}

impl TileRect {
    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        (self.width() as usize) * (self.height() as usize)
    }

    /// Return `true` when `(x, y)` lies inside the rectangle.
    pub fn contains(self, x: u32, y: u32) -> bool {
        self.x0 <= x && x < self.x1 && self.y0 <= y && y < self.y1
    }

    /// Row-major offset of absolute pixel `(x, y)` inside this rectangle.
    pub(crate) fn local_offset(self, x: u32, y: u32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        let lx = (x - self.x0) as usize;
        let ly = (y - self.y0) as usize;
        Some(ly * self.width() as usize + lx)
    }
}

/// Counters for one `render_frame` call on one execution context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame buffer frame id after the frame completed.
    pub frame_id: u64,
    /// Tiles in the full grid.
    pub tiles_total: usize,
    /// Items handed to the scheduler (may include skipped tail items).
    pub tiles_dispatched: usize,
    /// Tiles actually rendered by this execution context.
    pub tiles_rendered: usize,
}
