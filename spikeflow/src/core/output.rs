//! The output slot of a node after a pipeline run.

use super::Payload;
use crate::io::DataLoader;
use std::fmt;
use std::sync::Arc;

/// What a node produced the last time it ran.
#[derive(Clone)]
pub enum NodeOutput {
    /// A materialized, cacheable value.
    Value(Payload),
    /// A lazy, restartable chunk source, pulled by the consuming node.
    Stream(Arc<dyn DataLoader>),
    /// Dry-run placeholder: inputs resolved, nothing computed or persisted.
    Planned,
}

impl fmt::Debug for NodeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(payload) => f.debug_tuple("Value").field(&payload.kind()).finish(),
            Self::Stream(source) => f.debug_tuple("Stream").field(&source.tag()).finish(),
            Self::Planned => write!(f, "Planned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_forms() {
        assert_eq!(format!("{:?}", NodeOutput::Planned), "Planned");
        assert_eq!(
            format!("{:?}", NodeOutput::Value(Payload::Empty)),
            "Value(\"empty\")"
        );
    }
}
