//! Incremental text delivery
//!
//! A streamed call is a finite, non-restartable producer of text deltas.
//! The producer side is built from a server-sent-events byte stream; the
//! consumer concatenates fragments in arrival order.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use futures_util::stream::{self, Stream, StreamExt};
use log::{debug, trace};
use crate::error::Error;

/// Text deltas of one streamed call. Ends after the first error.
pub type FragmentStream
  = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// Converts one event payload into a text delta, if it carries one
pub type PayloadParser = fn(&str) -> Result<Option<String>, Error>;

/// Order-preserving fragment concatenation
#[derive(Debug, Clone, Default)]
pub struct TextAccumulator
{   text: String
  , fragments: usize
}

impl TextAccumulator
{   pub fn new() -> Self
    {   TextAccumulator::default()
    }

    pub fn push(&mut self, fragment: &str)
    {   self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn as_str(&self) -> &str
    {   &self.text
    }

    pub fn fragment_count(&self) -> usize
    {   self.fragments
    }

    /// Full text; a stream that produced no text is an error
    pub fn finish(self) -> Result<String, Error>
    {   if self.text.trim().is_empty()
        {   return Err(Error::EmptyResponse);
        }
        Ok(self.text)
    }
}

/// Drain a fragment stream into one string
pub async fn collect_text(mut fragments: FragmentStream)
  -> Result<String, Error>
{   let mut acc = TextAccumulator::new();
    while let Some(fragment) = fragments.next().await
    {   acc.push(&fragment?);
    }
    acc.finish()
}

/// Incremental server-sent-events framing.
///
/// Bytes may be split anywhere; an event is emitted once its terminating
/// blank line arrives. Only `data` fields are kept, multi-line data is
/// joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder
{   buffer: Vec<u8>
  , data: Vec<String>
}

impl SseDecoder
{   pub fn new() -> Self
    {   SseDecoder::default()
    }

    /// Feed a chunk, returning the payloads of every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String>
    {   self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n')
        {   let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.line(
              line.trim_end_matches(|c: char| c == '\r' || c == '\n'),
              &mut events
            );
        }
        events
    }

    /// Flush an event left unterminated when the byte stream ends
    pub fn finish(&mut self) -> Vec<String>
    {   let mut events = Vec::new();
        if !self.buffer.is_empty()
        {   let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            self.line(line.trim_end_matches('\r'), &mut events);
        }
        self.line("", &mut events);
        events
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>)
    {   if line.is_empty()
        {   if !self.data.is_empty()
            {   events.push(self.data.join("\n"));
                self.data.clear();
            }
            return;
        }
        if line.starts_with(':')
        {   return;
        }
        let (field, value) = match line.split_once(':')
        {   Some((field, value)) => {
              (field, value.strip_prefix(' ').unwrap_or(value))
            }
          , None => (line, "")
        };
        if field == "data"
        {   self.data.push(value.to_string());
        } else
        {   trace!("Ignoring SSE field: {}", field);
        }
    }
}

struct SseState<S>
{   bytes: Pin<Box<S>>
  , decoder: SseDecoder
  , pending: VecDeque<Result<String, Error>>
  , done: bool
  , parse: PayloadParser
}

impl<S> SseState<S>
{   fn absorb(&mut self, payloads: Vec<String>)
    {   for payload in payloads
        {   match (self.parse)(&payload)
            {   Ok(Some(text)) if !text.is_empty() => {
                  self.pending.push_back(Ok(text));
                }
              , Ok(_) => {}
              , Err(e) => {
                  debug!("Stream payload rejected: {}", e);
                  self.pending.push_back(Err(e));
                  self.done = true;
                  return;
                }
            }
        }
    }
}

/// Adapt a byte stream carrying SSE events into text fragments.
///
/// Empty deltas are dropped. A transport error or a rejected payload is
/// yielded once, after every fragment that preceded it, and ends the
/// stream.
pub fn sse_fragments<S, B, E>(bytes: S, parse: PayloadParser)
  -> FragmentStream
where
  S: Stream<Item = Result<B, E>> + Send + 'static
, B: AsRef<[u8]> + Send + 'static
, E: fmt::Display + Send + 'static
{   let state = SseState
    {   bytes: Box::pin(bytes)
      , decoder: SseDecoder::new()
      , pending: VecDeque::new()
      , done: false
      , parse
    };
    Box::pin(stream::unfold(state, |mut state| async move {
      loop
      {   if let Some(item) = state.pending.pop_front()
          {   return Some((item, state));
          }
          if state.done
          {   return None;
          }
          match state.bytes.next().await
          {   Some(Ok(chunk)) => {
                let payloads = state.decoder.push(chunk.as_ref());
                state.absorb(payloads);
              }
            , Some(Err(e)) => {
                debug!("Stream transport error: {}", e);
                state.pending.push_back(Err(
                  Error::StreamInterrupted(e.to_string())
                ));
                state.done = true;
              }
            , None => {
                let payloads = state.decoder.finish();
                state.absorb(payloads);
                state.done = true;
              }
          }
      }
    }))
}
