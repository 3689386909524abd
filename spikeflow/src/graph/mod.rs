//! Chainable processing nodes and the execution DAG.

mod node;

pub use node::{Node, NodeId};
