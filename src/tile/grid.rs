use crate::foundation::core::{Size2, TileRect};
use crate::foundation::error::{RaytileError, RaytileResult};

/// Tile geometry of one frame: a `num_tiles_x × num_tiles_y` grid of square tiles.
///
/// Tiles are numbered row-major. Tiles in the last column/row are clipped to the frame bounds
/// rather than padded, so the union of all tile rectangles is exactly `[0, W) × [0, H)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    size: Size2,
    tile_size: u32,
    num_tiles_x: usize,
    num_tiles_y: usize,
}

impl TileGrid {
    /// Build the grid for a frame of `size` pixels split into `tile_size` square tiles.
    pub fn new(size: Size2, tile_size: u32) -> RaytileResult<Self> {
        if size.is_empty() {
            return Err(RaytileError::validation(format!(
                "frame buffer must be non-empty (got {}x{})",
                size.width, size.height
            )));
        }
        if tile_size == 0 {
            return Err(RaytileError::validation("tile size must be > 0"));
        }
        Ok(Self {
            size,
            tile_size,
            num_tiles_x: size.width.div_ceil(tile_size) as usize,
            num_tiles_y: size.height.div_ceil(tile_size) as usize,
        })
    }

    /// Frame dimensions this grid covers.
    pub fn size(&self) -> Size2 {
        self.size
    }

    /// Edge length of an unclipped tile.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tile columns, `ceil(W / S)`.
    pub fn num_tiles_x(&self) -> usize {
        self.num_tiles_x
    }

    /// Number of tile rows, `ceil(H / S)`.
    pub fn num_tiles_y(&self) -> usize {
        self.num_tiles_y
    }

    /// Total tile count `T`.
    pub fn total(&self) -> usize {
        self.num_tiles_x * self.num_tiles_y
    }

    /// Map a linear tile index to `(tx, ty)`.
    pub fn coords(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.total() {
            return None;
        }
        Some((index % self.num_tiles_x, index / self.num_tiles_x))
    }

    /// Inverse of [`TileGrid::coords`].
    pub fn index_of(&self, tx: usize, ty: usize) -> Option<usize> {
        if tx >= self.num_tiles_x || ty >= self.num_tiles_y {
            return None;
        }
        Some(ty * self.num_tiles_x + tx)
    }

    /// Pixel rectangle of tile `index`, clipped to the frame.
    pub fn rect(&self, index: usize) -> Option<TileRect> {
        let (tx, ty) = self.coords(index)?;
        // tx < ceil(W / S) keeps tx * S below W, so the casts cannot truncate.
        let x0 = tx as u32 * self.tile_size;
        let y0 = ty as u32 * self.tile_size;
        Some(TileRect {
            x0,
            y0,
            x1: x0.saturating_add(self.tile_size).min(self.size.width),
            y1: y0.saturating_add(self.tile_size).min(self.size.height),
        })
    }

    /// Index of the tile owning pixel `(x, y)`.
    pub fn tile_at(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.index_of(
            (x / self.tile_size) as usize,
            (y / self.tile_size) as usize,
        )
    }

    /// All tile rectangles in index order.
    pub fn rects(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.total()).filter_map(|i| self.rect(i))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tile/grid.rs"]
mod tests;
