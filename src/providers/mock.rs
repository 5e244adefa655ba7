//! Scripted generation backend (no network)
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt
//! text, falling back to a default reply. Every dispatched request is
//! recorded.

use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use futures_util::stream;
use log::debug;
use crate::error::Error;
use crate::request::GenerationRequest;
use crate::stream::FragmentStream;

/// What a scripted call answers with
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply
{   /// Whole text; streamed calls deliver it as a single fragment
    Text(String)
  , /// Streamed calls deliver each piece; complete calls get them joined
    Fragments(Vec<String>)
  , /// Deliver the pieces, then fail mid-stream
    FragmentsThenFail(Vec<String>, String)
  , /// The call itself fails
    Fail(String)
}

impl MockReply
{   pub fn text(text: &str) -> Self
    {   MockReply::Text(text.to_string())
    }

    pub fn fragments(pieces: &[&str]) -> Self
    {   MockReply::Fragments(pieces.iter().map(|p| p.to_string()).collect())
    }

    pub fn fail(message: &str) -> Self
    {   MockReply::Fail(message.to_string())
    }
}

#[derive(Debug, Clone)]
struct MockRule
{   needle: String
  , reply: MockReply
  , delay: Duration
}

/// Scripted `Generator`
#[derive(Debug)]
pub struct MockGenerator
{   rules: Vec<MockRule>
  , fallback: MockReply
  , calls: Mutex<Vec<GenerationRequest>>
}

impl Default for MockGenerator
{   fn default() -> Self
    {   MockGenerator::new()
    }
}

impl MockGenerator
{   pub fn new() -> Self
    {   MockGenerator
        {   rules: Vec::new()
          , fallback: MockReply::fail("no scripted reply")
          , calls: Mutex::new(Vec::new())
        }
    }

    /// Answer prompts containing `needle` with `reply`
    pub fn on(self, needle: &str, reply: MockReply) -> Self
    {   self.on_delayed(needle, reply, Duration::ZERO)
    }

    /// Like `on`, resolving only after `delay`
    pub fn on_delayed(
      mut self
    , needle: &str
    , reply: MockReply
    , delay: Duration
    ) -> Self
    {   self.rules.push(MockRule
        {   needle: needle.to_string()
          , reply
          , delay
        });
        self
    }

    /// Reply for prompts no rule matches
    pub fn otherwise(mut self, reply: MockReply) -> Self
    {   self.fallback = reply;
        self
    }

    /// Requests dispatched so far, in dispatch order
    pub fn calls(&self) -> Vec<GenerationRequest>
    {   self.calls.lock()
          .map(|calls| calls.clone())
          .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize
    {   self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    async fn dispatch(&self, request: &GenerationRequest) -> MockReply
    {   if let Ok(mut calls) = self.calls.lock()
        {   calls.push(request.clone());
        }
        let rule = self.rules.iter()
          .find(|rule| request.prompt.as_str().contains(&rule.needle));
        let (reply, delay) = match rule
        {   Some(rule) => (rule.reply.clone(), rule.delay)
          , None => (self.fallback.clone(), Duration::ZERO)
        };
        debug!("Mock {:?} call answered with {:?}", request.mode, reply);
        if !delay.is_zero()
        {   tokio::time::sleep(delay).await;
        }
        reply
    }
}

#[async_trait]
impl super::Generator for MockGenerator
{   async fn generate(&self, request: &GenerationRequest)
      -> Result<String, Error>
    {   match self.dispatch(request).await
        {   MockReply::Text(text) => Ok(text)
          , MockReply::Fragments(pieces) => Ok(pieces.concat())
          , MockReply::FragmentsThenFail(_, message)
          | MockReply::Fail(message) => Err(Error::ApiError(message))
        }
    }

    async fn generate_stream(&self, request: &GenerationRequest)
      -> Result<FragmentStream, Error>
    {   let items: Vec<Result<String, Error>> =
          match self.dispatch(request).await
          {   MockReply::Text(text) => vec![Ok(text)]
            , MockReply::Fragments(pieces) => {
                pieces.into_iter().map(Ok).collect()
              }
            , MockReply::FragmentsThenFail(pieces, message) => {
                pieces.into_iter()
                  .map(Ok)
                  .chain(std::iter::once(
                    Err(Error::StreamInterrupted(message))
                  ))
                  .collect()
              }
            , MockReply::Fail(message) => {
                return Err(Error::ApiError(message));
              }
          };
        Ok(Box::pin(stream::iter(items)))
    }
}
