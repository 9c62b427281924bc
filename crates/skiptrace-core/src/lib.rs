pub mod analyzer;
pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod input;
pub mod pipeline;
pub mod provider;
pub mod resolver;
pub mod sink;
pub mod snapshot;
pub mod telemetry;
pub mod types;

pub use analyzer::TestFileAnalyzer;
pub use compare::{compare_pair, delta, AnalysisRow};
pub use config::Config;
pub use error::{ModelError, ProviderError, RunError};
pub use extract::ExtractionEngine;
pub use pipeline::{ComparisonPipeline, RunTotals};
pub use provider::{GitSnapshotProvider, SnapshotProvider, WorkingTree};
pub use sink::ResultSink;
pub use snapshot::{BuildSnapshot, ExtractionOutcome};
pub use telemetry::init_tracing;
pub use types::*;
