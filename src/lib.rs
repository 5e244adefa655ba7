pub mod error;
pub mod config;
pub mod logging;
pub mod prompt;
pub mod schema;
pub mod content;
pub mod request;
pub mod stream;
pub mod providers;
pub mod client;
pub mod orchestrator;
pub mod backend;

/*

infuse: the orchestration core behind a compare view that shows a plain
LLM answer next to an "ad-infused" one, plus optional sponsored cards.

infuse/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and the backend channel API
│   ├── error.rs        # Error type and its taxonomy
│   ├── config.rs       # Backend, pipeline, template config
│   ├── logging.rs      # env_logger wiring
│   ├── prompt.rs       # Prompt text and templates
│   ├── schema.rs       # Structured output shapes and validation
│   ├── content.rs      # Typed structured payloads
│   ├── request.rs      # Per-call request types
│   ├── stream.rs       # Fragment streams and SSE framing
│   ├── client.rs       # Generation Client over an injected backend
│   ├── providers/      # Gemini HTTP backend and a scripted mock
│   ├── orchestrator/   # Run state, hub, call choreographies
│   └── backend.rs      # Command loop for the presentation layer
└── tests/

*/

pub use backend::InfuseBackend;
pub use client::GenerationClient;
pub use config::{InfuseConfig, OrchestratorConfig, PipelinePolicy};
pub use error::{Error, ErrorKind};
pub use orchestrator::{Orchestrator, RunOutcome, RunPhase, RunSnapshot};
pub use prompt::Prompt;

/// INFUSE API INTERFACE:

// ===== Submit =====

pub type SubmitReply = Result<RunSnapshot, crate::error::Error>;
pub type SubmitReplySender
  = tokio::sync::mpsc::UnboundedSender<SubmitReply>;

pub struct SubmitArgs
{   pub prompt: String
  , pub reply: SubmitReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== InfuseHand (sender side) =====

pub struct InfuseHand
{   pub submit_tx
      : tokio::sync::mpsc::UnboundedSender<SubmitArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== InfuseFoot (receiver side) =====

pub struct InfuseFoot
{   pub submit_rx
      : tokio::sync::mpsc::UnboundedReceiver<SubmitArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
