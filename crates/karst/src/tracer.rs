//! Observation hooks for session activity.
//!
//! A [`Tracer`] receives one event per pipeline stage of a `run` call: the
//! source about to execute, the collection that precedes it, and the printed
//! result. All hooks default to no-ops so implementors only override what
//! they care about.

use crate::heap::GcReport;

/// Callbacks fired by [`crate::Session::run_traced`].
pub trait Tracer {
    /// A top-level call is starting with this source text.
    fn run_start(&mut self, source: &str) {
        let _ = source;
    }

    /// The pre-evaluation sweep finished.
    fn gc_complete(&mut self, report: &GcReport) {
        let _ = report;
    }

    /// The call completed successfully with this printed result.
    fn run_complete(&mut self, printed: &str) {
        let _ = printed;
    }
}

/// Ignores every event. The default for `Session::run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// One recorded session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    RunStart {
        source: String,
    },
    GcComplete {
        swept_values: usize,
        swept_scopes: usize,
        live_values: usize,
        live_scopes: usize,
    },
    RunComplete {
        printed: String,
    },
}

/// Collects events into a vector, mainly for tests.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl Tracer for RecordingTracer {
    fn run_start(&mut self, source: &str) {
        self.events.push(TraceEvent::RunStart {
            source: source.to_owned(),
        });
    }

    fn gc_complete(&mut self, report: &GcReport) {
        self.events.push(TraceEvent::GcComplete {
            swept_values: report.swept_values,
            swept_scopes: report.swept_scopes,
            live_values: report.live_values,
            live_scopes: report.live_scopes,
        });
    }

    fn run_complete(&mut self, printed: &str) {
        self.events.push(TraceEvent::RunComplete {
            printed: printed.to_owned(),
        });
    }
}

/// Logs every event to stderr. Handy for ad-hoc debugging of embedded
/// sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn run_start(&mut self, source: &str) {
        eprintln!("run: {source}");
    }

    fn gc_complete(&mut self, report: &GcReport) {
        eprintln!(
            "gc: swept {} values, {} scopes; {} values, {} scopes live",
            report.swept_values, report.swept_scopes, report.live_values, report.live_scopes
        );
    }

    fn run_complete(&mut self, printed: &str) {
        eprintln!("=> {printed}");
    }
}
