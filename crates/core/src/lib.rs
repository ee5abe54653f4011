pub mod agent;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod oracle;
pub mod perception;
pub mod protocol;
pub mod session;
pub mod transcript;
pub mod types;
pub mod world;

pub use agent::{Controller, RunReport};
pub use config::{AgentConfig, ShieldPolicy, Strategy};
pub use error::{AgentError, Result, SearchFailure};
pub use knowledge::KnowledgeStore;
pub use oracle::Oracle;
pub use perception::{PerceptionVariant, ZoneShape, ZoneTable};
pub use protocol::{LineOracle, Setup};
pub use session::Session;
pub use transcript::{RecordingOracle, ReplayOracle, Transcript};
pub use types::*;
pub use world::{World, WorldOracle};
