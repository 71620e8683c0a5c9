use crate::foundation::error::{RaytileError, RaytileResult};

/// Which tiles of the full grid one execution context owns.
///
/// `Interleaved` implements a static round-robin split: local item `j` maps to global tile
/// `j * num_devices + device_id`. For a fixed `num_devices`, the union over all device ids covers
/// `0..T` exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileAssignment {
    /// Every tile, `0..T`.
    All,
    /// Round-robin share of device `device_id` out of `num_devices`.
    Interleaved {
        /// This device, `0 <= device_id < num_devices`.
        device_id: usize,
        /// Number of cooperating devices, `>= 1`.
        num_devices: usize,
    },
}

impl TileAssignment {
    /// Validated interleaved assignment.
    pub fn interleaved(device_id: usize, num_devices: usize) -> RaytileResult<Self> {
        if num_devices == 0 {
            return Err(RaytileError::validation("num_devices must be >= 1"));
        }
        if device_id >= num_devices {
            return Err(RaytileError::validation(format!(
                "device_id {device_id} out of range for {num_devices} device(s)"
            )));
        }
        Ok(Self::Interleaved {
            device_id,
            num_devices,
        })
    }

    /// Length of the item range handed to the scheduler for a grid of `total` tiles.
    ///
    /// For `Interleaved` this is `ceil(total / num_devices)` for every device; trailing items
    /// that map past `total` are skipped at run time.
    pub fn dispatch_count(&self, total: usize) -> usize {
        match *self {
            Self::All => total,
            Self::Interleaved { num_devices, .. } => total.div_ceil(num_devices),
        }
    }

    /// Exact number of tiles this context renders.
    pub fn owned_count(&self, total: usize) -> usize {
        match *self {
            Self::All => total,
            Self::Interleaved {
                device_id,
                num_devices,
            } => {
                if device_id >= total {
                    0
                } else {
                    (total - device_id).div_ceil(num_devices)
                }
            }
        }
    }

    /// Global tile for local item `item`, or `None` when the item falls past the grid.
    pub fn global_tile(&self, item: usize, total: usize) -> Option<usize> {
        let tile = match *self {
            Self::All => item,
            Self::Interleaved {
                device_id,
                num_devices,
            } => item.checked_mul(num_devices)?.checked_add(device_id)?,
        };
        (tile < total).then_some(tile)
    }

    /// Global tiles owned by this context, ascending.
    pub fn owned_tiles(&self, total: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.dispatch_count(total)).filter_map(move |j| self.global_tile(j, total))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tile/partition.rs"]
mod tests;
