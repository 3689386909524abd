//! Data-loading collaborators: lazy, restartable signal sources.
//!
//! Concrete container parsers live outside the framework; they plug in by
//! implementing [`DataLoader`].

use crate::core::Signal;
use crate::errors::NodeExecutionError;
use std::fmt;

/// A lazy, finite iterator of signal chunks.
pub type SignalStream = Box<dyn Iterator<Item = Result<Signal, NodeExecutionError>>>;

/// Trait for loader collaborators exposing raw recordings as chunk streams.
///
/// `load` must be restartable: each call re-opens the source data and yields
/// the same finite chunk sequence from the start. Consumers pull the stream
/// synchronously, at most once per pipeline run.
pub trait DataLoader: Send + Sync {
    /// Stable descriptive label, used for logging and fingerprinting.
    fn tag(&self) -> &str;

    /// Opens the source and returns a fresh chunk stream.
    fn load(&self) -> Result<SignalStream, NodeExecutionError>;
}

/// A loader over in-memory chunks, for composition and tests.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    tag: String,
    chunks: Vec<Signal>,
}

impl MemoryLoader {
    /// Creates a loader yielding the given chunks in order.
    #[must_use]
    pub fn new(tag: impl Into<String>, chunks: Vec<Signal>) -> Self {
        Self {
            tag: tag.into(),
            chunks,
        }
    }
}

impl DataLoader for MemoryLoader {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn load(&self) -> Result<SignalStream, NodeExecutionError> {
        Ok(Box::new(self.chunks.clone().into_iter().map(Ok)))
    }
}

/// A closure-backed loader.
pub struct FnLoader<F>
where
    F: Fn() -> Result<SignalStream, NodeExecutionError> + Send + Sync,
{
    tag: String,
    func: F,
}

impl<F> FnLoader<F>
where
    F: Fn() -> Result<SignalStream, NodeExecutionError> + Send + Sync,
{
    /// Creates a new closure-backed loader.
    pub fn new(tag: impl Into<String>, func: F) -> Self {
        Self {
            tag: tag.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnLoader<F>
where
    F: Fn() -> Result<SignalStream, NodeExecutionError> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").field("tag", &self.tag).finish()
    }
}

impl<F> DataLoader for FnLoader<F>
where
    F: Fn() -> Result<SignalStream, NodeExecutionError> + Send + Sync,
{
    fn tag(&self) -> &str {
        &self.tag
    }

    fn load(&self) -> Result<SignalStream, NodeExecutionError> {
        (self.func)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn chunk(value: f64) -> Signal {
        Signal::new(
            Array2::from_elem((4, 1), value),
            Array1::from_iter((0..4).map(|i| i as f64)),
            1.0,
        )
    }

    #[test]
    fn test_memory_loader_is_restartable() {
        let loader = MemoryLoader::new("import", vec![chunk(1.0), chunk(2.0)]);

        for _ in 0..2 {
            let chunks: Vec<_> = loader.load().unwrap().collect::<Result<_, _>>().unwrap();
            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[0].data[[0, 0]], 1.0);
            assert_eq!(chunks[1].data[[0, 0]], 2.0);
        }
    }

    #[test]
    fn test_fn_loader() {
        let loader = FnLoader::new("synthetic", || {
            Ok(Box::new(vec![Ok(chunk(3.0))].into_iter()) as SignalStream)
        });

        assert_eq!(loader.tag(), "synthetic");
        let chunks: Vec<_> = loader.load().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
