//! Report sink trait and implementations.
//!
//! The executor only needs "emit a line"; where the line goes is the
//! sink's concern.

/// Trait for sinks receiving progress and summary lines from the executor.
pub trait ReportSink: Send + Sync {
    /// Emits one line of progress or summary text.
    ///
    /// Must never fail; sinks are expected to swallow their own errors.
    fn emit_line(&self, line: &str);
}

/// A sink that discards all lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReportSink;

impl ReportSink for NoOpReportSink {
    fn emit_line(&self, _line: &str) {
        // Intentionally empty - discards all lines
    }
}

/// A sink that prints lines to stdout.
///
/// The default for verbose pipeline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReportSink;

impl ReportSink for StdoutReportSink {
    fn emit_line(&self, line: &str) {
        println!("{line}");
    }
}

/// A sink that routes lines through the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn emit_line(&self, line: &str) {
        tracing::info!("{line}");
    }
}
