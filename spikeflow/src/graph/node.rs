//! The chainable node type.
//!
//! A [`Node`] is a cheaply clonable handle over shared state; chaining
//! mutates the shared graph, so handles built before an edge was added still
//! observe it.

use crate::cache::{fingerprint, hash_params, CachePolicy, Cacher};
use crate::core::{NodeOutput, Payload, Signal};
use crate::errors::{CycleError, NodeExecutionError, SpikeflowError};
use crate::io::DataLoader;
use crate::operator::{Operator, StreamMode};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Stable identity of a node, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    fn new() -> Self {
        Self(crate::utils::generate_uuid())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

enum Runner {
    Operator(Arc<dyn Operator>),
    Loader(Arc<dyn DataLoader>),
}

struct NodeInner {
    id: NodeId,
    tag: String,
    runner: Runner,
    cacher: Option<Cacher>,
    upstream: RwLock<Vec<Node>>,
    downstream: RwLock<Vec<Weak<NodeInner>>>,
    output: RwLock<Option<NodeOutput>>,
    last_fingerprint: RwLock<Option<String>>,
    computed: AtomicUsize,
}

/// A unit of work in the processing DAG.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Wraps a computation as a cache-bearing node.
    ///
    /// The node's tag is taken from the operator.
    #[must_use]
    pub fn operator(operator: Arc<dyn Operator>) -> Self {
        let tag = operator.tag().to_string();
        Self::build(tag, Runner::Operator(operator), Some(Cacher::new()))
    }

    /// Wraps a data loader as a plain, uncached node.
    ///
    /// Loader output is a lazy stream; downstream nodes pull it fresh on
    /// every run, so there is nothing to cache here.
    #[must_use]
    pub fn loader(loader: Arc<dyn DataLoader>) -> Self {
        let tag = loader.tag().to_string();
        Self::build(tag, Runner::Loader(loader), None)
    }

    fn build(tag: String, runner: Runner, cacher: Option<Cacher>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: NodeId::new(),
                tag,
                runner,
                cacher,
                upstream: RwLock::new(Vec::new()),
                downstream: RwLock::new(Vec::new()),
                output: RwLock::new(None),
                last_fingerprint: RwLock::new(None),
                computed: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the node's identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Returns the node's tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Returns the node's cache controller, when it carries one.
    #[must_use]
    pub fn cacher(&self) -> Option<&Cacher> {
        self.inner.cacher.as_ref()
    }

    /// Returns the output produced by the most recent run.
    #[must_use]
    pub fn output(&self) -> Option<NodeOutput> {
        self.inner.output.read().clone()
    }

    /// Returns how many times this node actually computed, as opposed to
    /// serving a cached artifact.
    #[must_use]
    pub fn recompute_count(&self) -> usize {
        self.inner.computed.load(Ordering::Relaxed)
    }

    /// Returns the node's upstream dependencies in chaining order.
    #[must_use]
    pub fn upstream(&self) -> Vec<Node> {
        self.inner.upstream.read().clone()
    }

    /// Returns the node's live downstream dependents in chaining order.
    #[must_use]
    pub fn downstream(&self) -> Vec<Node> {
        self.inner
            .downstream
            .read()
            .iter()
            .filter_map(|weak| weak.upgrade().map(|inner| Node { inner }))
            .collect()
    }

    /// Registers `other` as a downstream dependent of this node.
    ///
    /// Returns a clone of `other` so chains read fluently:
    /// `a.chain(&b)?.chain(&c)?`. Fails with [`CycleError`] when the new edge
    /// would make the graph cyclic; on failure the graph is left unmodified.
    pub fn chain(&self, other: &Self) -> Result<Self, CycleError> {
        if self.inner.id == other.inner.id {
            return Err(CycleError::new(vec![
                self.tag().to_string(),
                self.tag().to_string(),
            ]));
        }
        if let Some(mut path) = self.dependency_path_from(other) {
            // `other` is already a transitive ancestor: the edge closes a cycle.
            path.push(other.tag().to_string());
            return Err(CycleError::new(path));
        }

        other.inner.upstream.write().push(self.clone());
        self.inner
            .downstream
            .write()
            .push(Arc::downgrade(&other.inner));
        Ok(other.clone())
    }

    /// Returns the dependency path `target -> ... -> self` when `target` is
    /// a transitive ancestor of this node.
    fn dependency_path_from(&self, target: &Self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        self.dependency_path_inner(target, &mut visited)
    }

    fn dependency_path_inner(
        &self,
        target: &Self,
        visited: &mut HashSet<NodeId>,
    ) -> Option<Vec<String>> {
        if self.inner.id == target.inner.id {
            return Some(vec![self.tag().to_string()]);
        }
        if !visited.insert(self.inner.id) {
            return None;
        }
        for parent in self.inner.upstream.read().iter() {
            if let Some(mut path) = parent.dependency_path_inner(target, visited) {
                path.push(self.tag().to_string());
                return Some(path);
            }
        }
        None
    }

    /// Returns every node this one transitively depends on, dependencies
    /// first, ending with this node.
    ///
    /// The order is deterministic for a fixed construction sequence, and a
    /// node appears once even when reachable through multiple paths.
    #[must_use]
    pub fn topological_sort(&self) -> Vec<Node> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.visit(&mut visited, &mut order);
        order
    }

    fn visit(&self, visited: &mut HashSet<NodeId>, order: &mut Vec<Node>) {
        if !visited.insert(self.inner.id) {
            return;
        }
        for parent in self.inner.upstream.read().iter() {
            parent.visit(visited, order);
        }
        order.push(self.clone());
    }

    /// Runs this node's work, consulting the cache controller when present.
    ///
    /// With `dry_run`, inputs are resolved and validated but nothing is
    /// computed or persisted; the node records a placeholder output so
    /// downstream dry runs resolve too.
    pub fn run(&self, dry_run: bool, save_path: &Path) -> Result<(), SpikeflowError> {
        let inputs = self.resolve_inputs()?;
        if dry_run {
            *self.inner.output.write() = Some(NodeOutput::Planned);
            return Ok(());
        }
        match &self.inner.runner {
            Runner::Loader(loader) => {
                *self.inner.output.write() = Some(NodeOutput::Stream(Arc::clone(loader)));
                Ok(())
            }
            Runner::Operator(operator) => self.run_operator(operator.as_ref(), inputs, save_path),
        }
    }

    /// Resolves upstream outputs; every dependency must have produced one.
    fn resolve_inputs(&self) -> Result<Vec<NodeOutput>, SpikeflowError> {
        let mut inputs = Vec::new();
        for parent in self.inner.upstream.read().iter() {
            let output = parent.output().ok_or_else(|| {
                NodeExecutionError::new(
                    self.tag(),
                    format!("upstream node '{}' has not produced an output", parent.tag()),
                )
            })?;
            inputs.push(output);
        }
        Ok(inputs)
    }

    fn run_operator(
        &self,
        operator: &dyn Operator,
        inputs: Vec<NodeOutput>,
        save_path: &Path,
    ) -> Result<(), SpikeflowError> {
        let fp = self.fingerprint_for(operator);
        *self.inner.last_fingerprint.write() = Some(fp.clone());

        if let Some(cacher) = &self.inner.cacher {
            cacher.configure(save_path, &self.inner.tag)?;
            if cacher.policy() != CachePolicy::Off {
                if let Some(payload) = cacher.load(&fp) {
                    tracing::debug!(node = %self.inner.tag, fingerprint = %fp, "cache hit");
                    *self.inner.output.write() = Some(NodeOutput::Value(payload));
                    return Ok(());
                }
            }
        }

        let result = self.compute(operator, inputs)?;
        self.inner.computed.fetch_add(1, Ordering::Relaxed);

        if let Some(cacher) = &self.inner.cacher {
            cacher.store(&self.inner.tag, &fp, &result)?;
        }
        *self.inner.output.write() = Some(NodeOutput::Value(result));
        Ok(())
    }

    /// Derives this run's cache fingerprint from the node tag, the
    /// operator's parameters, and the identities of upstream outputs.
    fn fingerprint_for(&self, operator: &dyn Operator) -> String {
        let params_hash = hash_params(&operator.params());
        let mut components = vec![self.inner.tag.clone(), params_hash];
        for parent in self.inner.upstream.read().iter() {
            components.push(parent.identity_component());
        }
        let refs: Vec<&str> = components.iter().map(String::as_str).collect();
        fingerprint(&refs)
    }

    /// Identity contributed to downstream fingerprints: this node's own last
    /// fingerprint when it has one, else its tag.
    fn identity_component(&self) -> String {
        self.inner
            .last_fingerprint
            .read()
            .clone()
            .unwrap_or_else(|| self.inner.tag.clone())
    }

    fn compute(
        &self,
        operator: &dyn Operator,
        inputs: Vec<NodeOutput>,
    ) -> Result<Payload, NodeExecutionError> {
        let mut stream_source: Option<(usize, Arc<dyn DataLoader>)> = None;
        let mut values: Vec<Option<Payload>> = Vec::with_capacity(inputs.len());

        for input in inputs {
            match input {
                NodeOutput::Value(payload) => values.push(Some(payload)),
                NodeOutput::Stream(source) => {
                    if stream_source.is_some() {
                        return Err(NodeExecutionError::new(
                            self.tag(),
                            "multiple lazily chunked inputs are not supported",
                        ));
                    }
                    stream_source = Some((values.len(), source));
                    values.push(None);
                }
                NodeOutput::Planned => {
                    return Err(NodeExecutionError::new(
                        self.tag(),
                        "upstream output is a dry-run placeholder",
                    ));
                }
            }
        }

        let Some((pos, source)) = stream_source else {
            return operator.process(values.into_iter().flatten().collect());
        };

        match operator.stream_mode() {
            StreamMode::MapCollapse => {
                let mut parts = Vec::new();
                for chunk in source.load()? {
                    let chunk = chunk?;
                    let call_inputs: Vec<Payload> = values
                        .iter()
                        .enumerate()
                        .map(|(i, slot)| match slot {
                            Some(value) => value.clone(),
                            None if i == pos => Payload::Signal(chunk.clone()),
                            None => Payload::Empty,
                        })
                        .collect();
                    parts.push(operator.process(call_inputs)?);
                }
                Payload::collapse(parts).ok_or_else(|| {
                    NodeExecutionError::new(
                        self.tag(),
                        "chunked input produced nothing to collapse",
                    )
                })
            }
            StreamMode::Materialize => {
                let mut chunks = Vec::new();
                for chunk in source.load()? {
                    chunks.push(chunk?);
                }
                let merged = Signal::concat(chunks).ok_or_else(|| {
                    NodeExecutionError::new(self.tag(), "cannot concatenate signal chunks")
                })?;
                values[pos] = Some(Payload::Signal(merged));
                operator.process(values.into_iter().flatten().collect())
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.tag)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryLoader;
    use crate::operator::FnOperator;
    use ndarray::{Array1, Array2};

    fn op(tag: &str) -> Node {
        Node::operator(Arc::new(FnOperator::new(tag, |_| Ok(Payload::Empty))))
    }

    fn chunk(values: &[f64]) -> Signal {
        let n = values.len();
        Signal::new(
            Array2::from_shape_vec((n, 1), values.to_vec()).unwrap(),
            Array1::from_iter((0..n).map(|i| i as f64)),
            1.0,
        )
    }

    #[test]
    fn test_chain_returns_downstream_handle() {
        let a = op("a");
        let b = op("b");
        let returned = a.chain(&b).unwrap();

        assert_eq!(returned, b);
        assert_eq!(b.upstream(), vec![a.clone()]);
        assert_eq!(a.downstream(), vec![b]);
    }

    #[test]
    fn test_chain_rejects_self_loop() {
        let a = op("a");
        let err = a.chain(&a).unwrap_err();

        assert_eq!(err.path, ["a", "a"]);
        assert!(a.upstream().is_empty());
        assert!(a.downstream().is_empty());
    }

    #[test]
    fn test_chain_rejects_transitive_cycle_and_leaves_graph_unmodified() {
        let a = op("a");
        let b = op("b");
        let c = op("c");
        a.chain(&b).unwrap().chain(&c).unwrap();

        let err = c.chain(&a).unwrap_err();
        assert_eq!(err.path, ["a", "b", "c", "a"]);

        assert!(a.upstream().is_empty());
        assert_eq!(c.downstream().len(), 0);
        assert_eq!(b.upstream(), vec![a]);
    }

    #[test]
    fn test_topological_sort_linear_chain() {
        let a = op("a");
        let b = op("b");
        let c = op("c");
        a.chain(&b).unwrap().chain(&c).unwrap();

        let order = c.topological_sort();
        let tags: Vec<_> = order.iter().map(|n| n.tag().to_string()).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_topological_sort_diamond_visits_once() {
        let a = op("a");
        let b = op("b");
        let c = op("c");
        let d = op("d");
        a.chain(&b).unwrap();
        a.chain(&c).unwrap();
        b.chain(&d).unwrap();
        c.chain(&d).unwrap();

        let order = d.topological_sort();
        let tags: Vec<_> = order.iter().map(|n| n.tag().to_string()).collect();
        assert_eq!(tags, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_topological_sort_is_deterministic() {
        let a = op("a");
        let b = op("b");
        let c = op("c");
        a.chain(&c).unwrap();
        b.chain(&c).unwrap();

        let first = c.topological_sort();
        let second = c.topological_sort();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_loader_produces_stream() {
        let node = Node::loader(Arc::new(MemoryLoader::new("import", vec![chunk(&[1.0])])));
        let dir = tempfile::tempdir().unwrap();

        node.run(false, dir.path()).unwrap();
        assert!(matches!(node.output(), Some(NodeOutput::Stream(_))));
        assert!(node.cacher().is_none());
    }

    #[test]
    fn test_run_fails_without_upstream_output() {
        let a = op("a");
        let b = op("b");
        a.chain(&b).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = b.run(false, dir.path()).unwrap_err();
        assert!(matches!(err, SpikeflowError::NodeExecution(_)));
    }

    #[test]
    fn test_dry_run_records_placeholder_and_writes_nothing() {
        let loader = Node::loader(Arc::new(MemoryLoader::new("import", vec![chunk(&[1.0])])));
        let sink = op("sink");
        loader.chain(&sink).unwrap();
        let dir = tempfile::tempdir().unwrap();

        loader.run(true, dir.path()).unwrap();
        sink.run(true, dir.path()).unwrap();

        assert!(matches!(loader.output(), Some(NodeOutput::Planned)));
        assert!(matches!(sink.output(), Some(NodeOutput::Planned)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_map_collapse_over_chunks() {
        let loader = Node::loader(Arc::new(MemoryLoader::new(
            "import",
            vec![chunk(&[1.0, 2.0]), chunk(&[3.0])],
        )));
        let count = Node::operator(Arc::new(FnOperator::new("count", |inputs: Vec<Payload>| {
            match inputs.as_slice() {
                [Payload::Signal(signal)] => Ok(Payload::Spikestamps(
                    crate::core::Spikestamps::new(vec![vec![signal.num_samples() as f64]]),
                )),
                _ => Err(NodeExecutionError::new("count", "expected a signal")),
            }
        })));
        loader.chain(&count).unwrap();
        let dir = tempfile::tempdir().unwrap();

        loader.run(false, dir.path()).unwrap();
        count.run(false, dir.path()).unwrap();

        let Some(NodeOutput::Value(Payload::Spikestamps(stamps))) = count.output() else {
            panic!("expected spikestamps output");
        };
        assert_eq!(stamps.channel(0), Some(&[2.0, 1.0][..]));
    }

    #[test]
    fn test_materialize_concatenates_chunks() {
        let loader = Node::loader(Arc::new(MemoryLoader::new(
            "import",
            vec![chunk(&[1.0]), chunk(&[2.0]), chunk(&[3.0])],
        )));
        let total = Node::operator(Arc::new(
            FnOperator::new("total", |inputs: Vec<Payload>| match inputs.as_slice() {
                [Payload::Signal(signal)] => Ok(Payload::Spikestamps(
                    crate::core::Spikestamps::new(vec![vec![signal.num_samples() as f64]]),
                )),
                _ => Err(NodeExecutionError::new("total", "expected a signal")),
            })
            .with_stream_mode(StreamMode::Materialize),
        ));
        loader.chain(&total).unwrap();
        let dir = tempfile::tempdir().unwrap();

        loader.run(false, dir.path()).unwrap();
        total.run(false, dir.path()).unwrap();

        let Some(NodeOutput::Value(Payload::Spikestamps(stamps))) = total.output() else {
            panic!("expected spikestamps output");
        };
        assert_eq!(stamps.channel(0), Some(&[3.0][..]));
    }

    #[test]
    fn test_second_run_serves_cached_artifact() {
        let loader = Node::loader(Arc::new(MemoryLoader::new("import", vec![chunk(&[1.0])])));
        let pass = Node::operator(Arc::new(FnOperator::new("pass", |_| Ok(Payload::Empty))));
        loader.chain(&pass).unwrap();
        let dir = tempfile::tempdir().unwrap();

        for _ in 0..2 {
            loader.run(false, dir.path()).unwrap();
            pass.run(false, dir.path()).unwrap();
        }

        assert_eq!(pass.recompute_count(), 1);
    }
}
