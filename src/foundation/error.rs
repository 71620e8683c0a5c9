/// Convenience result type used across raytile.
pub type RaytileResult<T> = Result<T, RaytileError>;

/// Top-level error taxonomy used by load balancer and device APIs.
#[derive(thiserror::Error, Debug)]
pub enum RaytileError {
    /// Precondition violation detected before any tile is dispatched.
    #[error("validation error: {0}")]
    Validation(String),

    /// A renderer or frame buffer failed while producing one tile.
    #[error("tile {tile} failed: {source}")]
    TileRender {
        /// Global index of the tile that failed.
        tile: usize,
        /// Underlying failure.
        #[source]
        source: Box<RaytileError>,
    },

    /// Internal tile-partition invariant violated. Always a defect.
    #[error("partition invariant violated: {0}")]
    Partition(String),

    /// Failure inside the task scheduler itself (pool construction, dispatch).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// IO failures (config files, image export).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from renderers or dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RaytileError {
    /// Build a [`RaytileError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RaytileError::Partition`] value.
    pub fn partition(msg: impl Into<String>) -> Self {
        Self::Partition(msg.into())
    }

    /// Build a [`RaytileError::Scheduler`] value.
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }

    /// Build a [`RaytileError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap `source` as the failure of global tile `tile`.
    pub fn tile_render(tile: usize, source: RaytileError) -> Self {
        Self::TileRender {
            tile,
            source: Box::new(source),
        }
    }

    /// Global tile index for [`RaytileError::TileRender`], `None` otherwise.
    pub fn failed_tile(&self) -> Option<usize> {
        match self {
            Self::TileRender { tile, .. } => Some(*tile),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
