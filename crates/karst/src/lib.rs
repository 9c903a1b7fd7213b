#![doc = include_str!("../../../README.md")]

mod builtins;
mod eval;
mod exception;
mod heap;
mod intern;
mod lexer;
mod parse;
mod repl;
mod resource;
mod scope;
mod tracer;
mod value;

pub use crate::{
    exception::{ExcKind, Exception, RunResult},
    heap::{GcReport, HeapStats},
    repl::Session,
    resource::ResourceLimits,
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, Tracer},
};
