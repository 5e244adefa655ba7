//! Per-call request types

use serde::{Deserialize, Serialize};
use crate::prompt::Prompt;
use crate::schema::SchemaDescriptor;

/// How the reply is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode
{   /// One full text reply
    Complete
  , /// Text deltas in arrival order
    Streamed
  , /// JSON text constrained by a schema
    Structured
}

/// One outbound call, discarded after dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// The prompt text
    pub prompt: Prompt
  , /// Delivery mode
    pub mode: GenerationMode
  , /// Output shape, set only for structured calls
    pub schema: Option<SchemaDescriptor>
  , /// Optional system message
    pub system_instruction: Option<String>
}

impl GenerationRequest
{   pub fn complete(prompt: Prompt) -> Self
    {   GenerationRequest
        {   prompt
          , mode: GenerationMode::Complete
          , schema: None
          , system_instruction: None
        }
    }

    pub fn streamed(prompt: Prompt) -> Self
    {   GenerationRequest
        {   prompt
          , mode: GenerationMode::Streamed
          , schema: None
          , system_instruction: None
        }
    }

    pub fn structured(prompt: Prompt, schema: SchemaDescriptor) -> Self
    {   GenerationRequest
        {   prompt
          , mode: GenerationMode::Structured
          , schema: Some(schema)
          , system_instruction: None
        }
    }

    pub fn with_system_instruction(
      mut self
    , instruction: Option<String>
    ) -> Self
    {   self.system_instruction = instruction;
        self
    }
}
