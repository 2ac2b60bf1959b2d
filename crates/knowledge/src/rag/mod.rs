//! Query pipeline: decomposition, dual-source retrieval, answering and collation.

pub mod agents;
pub mod decompose;
pub mod pipeline;
pub mod types;

pub use agents::AgentTeam;
pub use decompose::{decompose, parse_decomposition};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use types::{
    Decomposition, EvidenceSummary, PipelineOutcome, PipelineResult, SubqueryPair,
};
