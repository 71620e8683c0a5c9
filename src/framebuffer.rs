use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::{ChannelFlags, Size2};
use crate::foundation::error::{RaytileError, RaytileResult};
use crate::tile::buffer::Tile;
use crate::tile::grid::TileGrid;
use crate::tile::partition::TileAssignment;

/// Edge length of a frame buffer tile unless configured otherwise.
pub const DEFAULT_TILE_SIZE: u32 = 64;

const XXH3_SEED: u64 = 0x5f3c_9a71_e4d2_0b86;

/// Destination image of a frame.
///
/// Dimensions, tile size and channel set must stay fixed while a frame is in flight.
/// [`FrameBuffer::set_tile`] is called concurrently for disjoint tiles.
pub trait FrameBuffer: Send + Sync {
    /// Pixel dimensions.
    fn size(&self) -> Size2;

    /// Logical tile edge length.
    fn tile_size(&self) -> u32;

    /// Channels this buffer stores.
    fn channels(&self) -> ChannelFlags;

    /// Called once before any tile of a frame is dispatched.
    fn begin_frame(&self) -> RaytileResult<()> {
        Ok(())
    }

    /// Store one rendered tile.
    fn set_tile(&self, tile: &Tile) -> RaytileResult<()>;

    /// Called once per execution context after every tile of its `share` has been stored.
    ///
    /// With [`TileAssignment::All`] the frame is complete. With an interleaved share other
    /// devices may still be writing; the frame is complete only once every tile of the buffer
    /// has been stored, and only that call may advance [`FrameBuffer::frame_id`].
    fn end_frame(&self, share: TileAssignment) -> RaytileResult<()>;

    /// Number of frames completed so far.
    fn frame_id(&self) -> u64;
}

#[derive(Debug)]
struct TileSlot {
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
    normal: Vec<[f32; 3]>,
    albedo: Vec<[f32; 3]>,
    writes: u32,
    // Frame (`frame_id + 1`) this slot was last written for.
    stamp: u64,
}

impl TileSlot {
    fn cleared(area: usize, channels: ChannelFlags) -> Self {
        let alloc = |flag: ChannelFlags| if channels.contains(flag) { area } else { 0 };
        Self {
            color: vec![[0.0; 4]; alloc(ChannelFlags::COLOR)],
            depth: vec![f32::INFINITY; alloc(ChannelFlags::DEPTH)],
            normal: vec![[0.0; 3]; alloc(ChannelFlags::NORMAL)],
            albedo: vec![[0.0; 3]; alloc(ChannelFlags::ALBEDO)],
            writes: 0,
            stamp: 0,
        }
    }
}

/// In-memory frame buffer with tile-major storage.
///
/// Every tile owns its own slot behind its own lock. Disjoint tiles never contend, and no lock
/// is ever taken per pixel.
#[derive(Debug)]
pub struct LocalFrameBuffer {
    grid: TileGrid,
    channels: ChannelFlags,
    slots: Vec<Mutex<TileSlot>>,
    frame_id: AtomicU64,
    complete: AtomicBool,
}

impl LocalFrameBuffer {
    /// Create a cleared buffer using [`DEFAULT_TILE_SIZE`].
    pub fn new(size: Size2, channels: ChannelFlags) -> RaytileResult<Self> {
        Self::with_tile_size(size, DEFAULT_TILE_SIZE, channels)
    }

    /// Create a cleared buffer with an explicit tile size.
    pub fn with_tile_size(
        size: Size2,
        tile_size: u32,
        channels: ChannelFlags,
    ) -> RaytileResult<Self> {
        let grid = TileGrid::new(size, tile_size)?;
        let slots = grid
            .rects()
            .map(|r| Mutex::new(TileSlot::cleared(r.area(), channels)))
            .collect();
        Ok(Self {
            grid,
            channels,
            slots,
            frame_id: AtomicU64::new(0),
            complete: AtomicBool::new(false),
        })
    }

    /// Tile geometry of this buffer.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Reset every channel and per-tile write counter.
    pub fn clear(&self) -> RaytileResult<()> {
        for (i, slot) in self.slots.iter().enumerate() {
            let area = self.grid.rect(i).map(|r| r.area()).unwrap_or(0);
            *lock_slot(slot, i)? = TileSlot::cleared(area, self.channels);
        }
        self.complete.store(false, Ordering::Release);
        Ok(())
    }

    /// `true` once every tile of the current frame was stored and [`FrameBuffer::end_frame`] ran.
    pub fn is_frame_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn all_tiles_stamped(&self, stamp: u64) -> RaytileResult<bool> {
        for (i, slot) in self.slots.iter().enumerate() {
            if lock_slot(slot, i)?.stamp != stamp {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// How often each tile was written since the last [`LocalFrameBuffer::clear`].
    pub fn tile_write_counts(&self) -> RaytileResult<Vec<u32>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| Ok(lock_slot(s, i)?.writes))
            .collect()
    }

    /// Color at pixel `(x, y)`, if stored.
    pub fn color_at(&self, x: u32, y: u32) -> RaytileResult<Option<[f32; 4]>> {
        self.read_px(x, y, |s, i| s.color.get(i).copied())
    }

    /// Depth at pixel `(x, y)`, if stored.
    pub fn depth_at(&self, x: u32, y: u32) -> RaytileResult<Option<f32>> {
        self.read_px(x, y, |s, i| s.depth.get(i).copied())
    }

    /// Normal at pixel `(x, y)`, if stored.
    pub fn normal_at(&self, x: u32, y: u32) -> RaytileResult<Option<[f32; 3]>> {
        self.read_px(x, y, |s, i| s.normal.get(i).copied())
    }

    /// Albedo at pixel `(x, y)`, if stored.
    pub fn albedo_at(&self, x: u32, y: u32) -> RaytileResult<Option<[f32; 3]>> {
        self.read_px(x, y, |s, i| s.albedo.get(i).copied())
    }

    fn read_px<T>(
        &self,
        x: u32,
        y: u32,
        f: impl FnOnce(&TileSlot, usize) -> Option<T>,
    ) -> RaytileResult<Option<T>> {
        let Some(tile) = self.grid.tile_at(x, y) else {
            return Ok(None);
        };
        let Some(offset) = self.grid.rect(tile).and_then(|r| r.local_offset(x, y)) else {
            return Ok(None);
        };
        let slot = lock_slot(&self.slots[tile], tile)?;
        Ok(f(&slot, offset))
    }

    /// Color channel as tightly packed, row-major RGBA8 (clamped, no tone mapping).
    pub fn color_rgba8(&self) -> RaytileResult<Vec<u8>> {
        let size = self.grid.size();
        let mut out = vec![0u8; size.area() * 4];
        if !self.channels.contains(ChannelFlags::COLOR) {
            return Ok(out);
        }
        let stride = size.width as usize * 4;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(rect) = self.grid.rect(i) else {
                continue;
            };
            let slot = lock_slot(slot, i)?;
            let w = rect.width() as usize;
            for (row, y) in (rect.y0..rect.y1).enumerate() {
                let src = &slot.color[row * w..(row + 1) * w];
                let dst_start = y as usize * stride + rect.x0 as usize * 4;
                let dst = &mut out[dst_start..dst_start + w * 4];
                for (px, c) in dst.chunks_exact_mut(4).zip(src) {
                    for (d, v) in px.iter_mut().zip(c) {
                        *d = to_u8(*v);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Color channel as an [`image::RgbaImage`].
    pub fn to_image(&self) -> RaytileResult<image::RgbaImage> {
        let size = self.grid.size();
        image::RgbaImage::from_raw(size.width, size.height, self.color_rgba8()?)
            .ok_or_else(|| RaytileError::validation("color buffer size does not match frame"))
    }

    /// Write the color channel to a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> RaytileResult<()> {
        let path = path.as_ref();
        self.to_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| {
                RaytileError::Other(anyhow::anyhow!(
                    "failed to write PNG '{}': {e}",
                    path.display()
                ))
            })
    }

    /// Stable 128-bit hash over every stored channel, in tile order.
    pub fn fingerprint(&self) -> RaytileResult<u128> {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        for (i, slot) in self.slots.iter().enumerate() {
            let slot = lock_slot(slot, i)?;
            for c in &slot.color {
                c.iter().for_each(|v| h.update(&v.to_bits().to_le_bytes()));
            }
            for d in &slot.depth {
                h.update(&d.to_bits().to_le_bytes());
            }
            for n in slot.normal.iter().chain(&slot.albedo) {
                n.iter().for_each(|v| h.update(&v.to_bits().to_le_bytes()));
            }
        }
        Ok(h.digest128())
    }
}

impl FrameBuffer for LocalFrameBuffer {
    fn size(&self) -> Size2 {
        self.grid.size()
    }

    fn tile_size(&self) -> u32 {
        self.grid.tile_size()
    }

    fn channels(&self) -> ChannelFlags {
        self.channels
    }

    fn begin_frame(&self) -> RaytileResult<()> {
        self.complete.store(false, Ordering::Release);
        Ok(())
    }

    fn set_tile(&self, tile: &Tile) -> RaytileResult<()> {
        let index = tile.index();
        let Some(expected) = self.grid.rect(index) else {
            return Err(RaytileError::validation(format!(
                "tile index {index} out of range ({} tiles)",
                self.grid.total()
            )));
        };
        if expected != tile.rect() {
            return Err(RaytileError::validation(format!(
                "tile {index} rect {:?} does not match frame buffer tile {:?}",
                tile.rect(),
                expected
            )));
        }

        let stored = self.channels & tile.channels();
        let mut slot = lock_slot(&self.slots[index], index)?;
        if stored.contains(ChannelFlags::COLOR) {
            copy_channel(&mut slot.color, &tile.color, "color", index)?;
        }
        if stored.contains(ChannelFlags::DEPTH) {
            copy_channel(&mut slot.depth, &tile.depth, "depth", index)?;
        }
        if stored.contains(ChannelFlags::NORMAL) {
            copy_channel(&mut slot.normal, &tile.normal, "normal", index)?;
        }
        if stored.contains(ChannelFlags::ALBEDO) {
            copy_channel(&mut slot.albedo, &tile.albedo, "albedo", index)?;
        }
        slot.writes += 1;
        slot.stamp = self.frame_id.load(Ordering::Acquire) + 1;
        Ok(())
    }

    fn end_frame(&self, share: TileAssignment) -> RaytileResult<()> {
        let current = self.frame_id.load(Ordering::Acquire);
        if let TileAssignment::Interleaved { .. } = share
            && !self.all_tiles_stamped(current + 1)?
        {
            tracing::debug!(?share, frame = current + 1, "share stored, frame still open");
            return Ok(());
        }
        // Concurrent devices may all observe the last tile; only one advances the frame.
        if self
            .frame_id
            .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.complete.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }
}

fn lock_slot(slot: &Mutex<TileSlot>, index: usize) -> RaytileResult<MutexGuard<'_, TileSlot>> {
    slot.lock()
        .map_err(|_| RaytileError::validation(format!("tile slot {index} lock poisoned")))
}

fn copy_channel<T: Copy>(dst: &mut [T], src: &[T], name: &str, index: usize) -> RaytileResult<()> {
    if dst.len() != src.len() {
        return Err(RaytileError::validation(format!(
            "tile {index} {name} channel has {} pixels, expected {}",
            src.len(),
            dst.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
#[path = "../tests/unit/framebuffer.rs"]
mod tests;
