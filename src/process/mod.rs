//! Process Pipeline Manager: engine processes wired to one directional byte pipe each.

pub mod cancel;
pub mod pipeline;
pub mod table;

pub use cancel::CancelToken;
pub use pipeline::{DecodePipeline, EncodePipeline, FillOutcome, PipelineState};
pub use table::{disable_signal_teardown, live_processes, teardown_all};
