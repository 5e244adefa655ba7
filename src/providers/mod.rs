//! Generation capability backends

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use crate::error::Error;
use crate::request::GenerationRequest;
use crate::stream::FragmentStream;

// Re-export for convenience
pub use gemini::GeminiClient;
pub use mock::{MockGenerator, MockReply};

/// One outbound call per method invocation, no retries
#[async_trait]
pub trait Generator: Send + Sync
{   /// Full reply text for a complete or structured request
    async fn generate(&self, request: &GenerationRequest)
      -> Result<String, Error>;

    /// Start a streamed request
    async fn generate_stream(&self, request: &GenerationRequest)
      -> Result<FragmentStream, Error>;
}
