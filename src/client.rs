//! Generation Client: the three request shapes over an injected backend

use std::sync::Arc;
use futures_util::future;
use futures_util::stream::TryStreamExt;
use serde_json::Value;
use log::{debug, warn};
use crate::error::Error;
use crate::prompt::Prompt;
use crate::providers::Generator;
use crate::request::GenerationRequest;
use crate::schema::{SchemaDescriptor, Structured};
use crate::stream::FragmentStream;

/// Cheap to clone; clones share the backend
#[derive(Clone)]
pub struct GenerationClient
{   backend: Arc<dyn Generator>
  , system_instruction: Option<String>
}

impl GenerationClient
{   pub fn new(backend: Arc<dyn Generator>) -> Self
    {   GenerationClient
        {   backend
          , system_instruction: None
        }
    }

    /// System message sent with every call
    pub fn with_system_instruction(
      mut self
    , instruction: Option<String>
    ) -> Self
    {   self.system_instruction = instruction;
        self
    }

    /// One full answer. Blank text counts as no text.
    pub async fn complete_text(&self, prompt: &Prompt)
      -> Result<String, Error>
    {   let request = GenerationRequest::complete(prompt.clone())
          .with_system_instruction(self.system_instruction.clone());
        let text = self.backend.generate(&request).await?;
        if text.trim().is_empty()
        {   warn!("Complete call returned blank text");
            return Err(Error::EmptyResponse);
        }
        Ok(text)
    }

    /// Non-empty text deltas in arrival order
    pub async fn stream_text(&self, prompt: &Prompt)
      -> Result<FragmentStream, Error>
    {   let request = GenerationRequest::streamed(prompt.clone())
          .with_system_instruction(self.system_instruction.clone());
        let fragments = self.backend.generate_stream(&request).await?;
        debug!("Stream started");
        Ok(Box::pin(
          fragments
            .try_filter(|fragment| future::ready(!fragment.is_empty()))
        ))
    }

    /// Reply parsed and validated against `schema`
    pub async fn structured_request(
      &self
    , prompt: &Prompt
    , schema: &SchemaDescriptor
    ) -> Result<Value, Error>
    {   let request = GenerationRequest::structured(
            prompt.clone(),
            schema.clone()
          )
          .with_system_instruction(self.system_instruction.clone());
        let text = self.backend.generate(&request).await?;
        schema.parse_text(&text).map_err(|e| {
          warn!("Structured reply rejected: {}", e);
          e
        })
    }

    /// Typed structured call; nothing is built unless validation passed
    pub async fn structured<T: Structured>(&self, prompt: &Prompt)
      -> Result<T, Error>
    {   let value = self.structured_request(prompt, &T::schema()).await?;
        T::from_validated(value)
    }
}
