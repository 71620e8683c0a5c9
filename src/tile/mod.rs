pub(crate) mod buffer;
pub(crate) mod grid;
pub(crate) mod partition;
