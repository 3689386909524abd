//! Pipeline construction and sequential execution.


use crate::cache::CachePolicy;
use crate::errors::SpikeflowError;
use crate::graph::Node;
use crate::report::{ReportSink, StdoutReportSink};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-run execution options.
#[derive(Clone)]
pub struct RunOptions {
    /// Root directory for cache artifacts. Defaults to `./results`.
    pub save_path: PathBuf,
    /// Forces the `Off` cache policy on every cache-bearing node for this
    /// run only; existing artifacts are overwritten, never deleted.
    pub no_cache: bool,
    /// Validates structure and input resolution without computing or
    /// persisting anything.
    pub dry_run: bool,
    /// Emits per-node progress and a final summary through the report sink.
    pub verbose: bool,
    /// Destination for verbose output.
    pub sink: Arc<dyn ReportSink>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("./results"),
            no_cache: false,
            dry_run: false,
            verbose: false,
            sink: Arc::new(StdoutReportSink),
        }
    }
}

impl RunOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the save path.
    #[must_use]
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    /// Sets the cache-bypass flag.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the verbose flag.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the report sink used for verbose output.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("save_path", &self.save_path)
            .field("no_cache", &self.no_cache)
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Sequential executor over a frozen execution order.
///
/// The order is computed once, at construction, by a topological sort rooted
/// at the terminal node; re-running the pipeline reuses it.
#[derive(Debug)]
pub struct Pipeline {
    execution_order: Vec<Node>,
}

impl Pipeline {
    /// Builds a pipeline rooted at `terminal`, freezing the execution order.
    #[must_use]
    pub fn new(terminal: &Node) -> Self {
        Self {
            execution_order: terminal.topological_sort(),
        }
    }

    /// Returns the frozen execution order.
    #[must_use]
    pub fn execution_order(&self) -> &[Node] {
        &self.execution_order
    }

    /// Runs every node in dependency order.
    ///
    /// A node failure propagates unmodified and aborts the remaining loop;
    /// artifacts already written stay on disk.
    pub fn run(&self, options: &RunOptions) -> Result<(), SpikeflowError> {
        for node in &self.execution_order {
            if let Some(cacher) = node.cacher() {
                cacher.set_policy(if options.no_cache {
                    CachePolicy::Off
                } else {
                    CachePolicy::Auto
                });
            }
            if options.verbose {
                options.sink.emit_line(&format!("Running: {node}"));
            }
            tracing::debug!(node = %node.tag(), dry_run = options.dry_run, "running node");
            node.run(options.dry_run, &options.save_path)?;
        }
        if options.verbose {
            for line in self.summarize().lines() {
                options.sink.emit_line(line);
            }
        }
        Ok(())
    }

    /// Renders the execution order as an enumerated list, one node per line.
    #[must_use]
    pub fn summarize(&self) -> String {
        let mut lines = vec!["Execution order:".to_string()];
        for (index, node) in self.execution_order.iter().enumerate() {
            lines.push(format!("{index}: {node}"));
        }
        lines.join("\n")
    }
}
