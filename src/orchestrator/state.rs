//! Per-run result slots and the push-update hub the presentation layer
//! observes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use serde::Serialize;
use tokio::sync::watch;
use log::{debug, info, trace, warn};
use crate::content::{SponsorBanner, SponsoredSuggestion};
use crate::error::Error;

pub type RunId = u64;

/// Progress of one result slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotStatus
{   Idle
  , Pending
  , Streaming
  , Complete
  , Failed
}

/// One result slot: value, status, error message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot<T>
{   pub value: Option<T>
  , pub status: SlotStatus
  , pub error: Option<String>
}

impl<T> Default for Slot<T>
{   fn default() -> Self
    {   Slot
        {   value: None
          , status: SlotStatus::Idle
          , error: None
        }
    }
}

impl<T> Slot<T>
{   pub fn is_loading(&self) -> bool
    {   matches!(self.status, SlotStatus::Pending | SlotStatus::Streaming)
    }

    pub fn is_failed(&self) -> bool
    {   self.status == SlotStatus::Failed
    }

    /// (value, loading, error) as rendered by the presentation layer
    pub fn view(&self) -> (Option<&T>, bool, Option<&str>)
    {   (self.value.as_ref(), self.is_loading(), self.error.as_deref())
    }

    pub fn start(&mut self)
    {   self.value = None;
        self.status = SlotStatus::Pending;
        self.error = None;
    }

    pub fn complete(&mut self, value: T)
    {   self.value = Some(value);
        self.status = SlotStatus::Complete;
        self.error = None;
    }

    /// Mark failed, showing `fallback` in place of a value
    pub fn fail(&mut self, error: &Error, fallback: Option<T>)
    {   self.value = fallback;
        self.status = SlotStatus::Failed;
        self.error = Some(error.to_string());
    }

    pub fn clear(&mut self)
    {   *self = Slot::default();
    }
}

impl Slot<String>
{   /// Append a streamed fragment
    pub fn append(&mut self, fragment: &str)
    {   self.value.get_or_insert_with(String::new).push_str(fragment);
        self.status = SlotStatus::Streaming;
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome
{   Success
  , /// Primary path succeeded, a side channel degraded
    PartialFailure
  , Failure
}

/// Run state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase
{   Idle
  , Submitted
  , Awaiting
  , Streaming
  , Composing
  , Settled(RunOutcome)
}

impl RunPhase
{   pub fn is_settled(&self) -> bool
    {   matches!(self, RunPhase::Settled(_))
    }
}

/// Text-valued slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSlot
{   Brief
  , Original
  , Infused
  , Connective
}

/// Everything the presentation layer renders for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot
{   pub run_id: RunId
  , pub prompt: String
  , pub phase: RunPhase
  , /// Message of the failure that settled the run
    pub error: Option<String>
  , pub brief: Slot<String>
  , pub original_answer: Slot<String>
  , pub infused_answer: Slot<String>
  , pub suggestions: Slot<Vec<SponsoredSuggestion>>
  , pub thinking_steps: Slot<Vec<String>>
  , pub banner: Slot<SponsorBanner>
  , pub connective: Slot<String>
}

impl Default for RunSnapshot
{   fn default() -> Self
    {   RunSnapshot::new(0, String::new())
    }
}

impl RunSnapshot
{   pub fn new(run_id: RunId, prompt: String) -> Self
    {   RunSnapshot
        {   run_id
          , prompt
          , phase: RunPhase::Idle
          , error: None
          , brief: Slot::default()
          , original_answer: Slot::default()
          , infused_answer: Slot::default()
          , suggestions: Slot::default()
          , thinking_steps: Slot::default()
          , banner: Slot::default()
          , connective: Slot::default()
        }
    }

    pub fn outcome(&self) -> Option<RunOutcome>
    {   match self.phase
        {   RunPhase::Settled(outcome) => Some(outcome)
          , _ => None
        }
    }

    pub fn is_loading(&self) -> bool
    {   !matches!(self.phase, RunPhase::Idle | RunPhase::Settled(_))
    }

    pub fn text_slot_mut(&mut self, which: TextSlot) -> &mut Slot<String>
    {   match which
        {   TextSlot::Brief => &mut self.brief
          , TextSlot::Original => &mut self.original_answer
          , TextSlot::Infused => &mut self.infused_answer
          , TextSlot::Connective => &mut self.connective
        }
    }

    /// True when a best-effort slot fell back
    pub fn is_degraded(&self) -> bool
    {   self.suggestions.is_failed()
          || self.thinking_steps.is_failed()
          || self.banner.is_failed()
          || self.connective.is_failed()
    }

    fn clear_slots(&mut self)
    {   self.brief.clear();
        self.original_answer.clear();
        self.infused_answer.clear();
        self.suggestions.clear();
        self.thinking_steps.clear();
        self.banner.clear();
        self.connective.clear();
    }
}

/// Publishes the current run's snapshot to subscribers
#[derive(Debug)]
pub struct StateHub
{   tx: watch::Sender<RunSnapshot>
  , next_id: AtomicU64
}

impl Default for StateHub
{   fn default() -> Self
    {   StateHub::new()
    }
}

impl StateHub
{   pub fn new() -> Self
    {   let (tx, _rx) = watch::channel(RunSnapshot::default());
        StateHub
        {   tx
          , next_id: AtomicU64::new(1)
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot>
    {   self.tx.subscribe()
    }

    pub fn current(&self) -> RunSnapshot
    {   self.tx.borrow().clone()
    }

    /// Start a new run, replacing whatever the previous run published.
    /// The previous run keeps executing but can no longer publish.
    pub fn begin(self: &Arc<Self>, prompt: &str) -> RunHandle
    {   let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut snapshot = RunSnapshot::new(id, prompt.to_string());
        snapshot.phase = RunPhase::Submitted;
        let previous = self.tx.send_replace(snapshot.clone());
        if previous.is_loading()
        {   info!(
              "Run {} superseded by run {} while in flight",
              previous.run_id, id
            );
        }
        debug!("Run {} submitted", id);
        RunHandle
        {   id
          , state: Mutex::new(snapshot)
          , hub: Arc::clone(self)
        }
    }

    fn publish(&self, snapshot: &RunSnapshot) -> bool
    {   self.tx.send_if_modified(|current| {
          if current.run_id != snapshot.run_id
          {   return false;
          }
          *current = snapshot.clone();
          true
        })
    }
}

/// Owned, mutable state of one run.
///
/// Updates after the run settled are ignored. Updates are mirrored to the
/// hub only while this run is the current one.
#[derive(Debug)]
pub struct RunHandle
{   id: RunId
  , state: Mutex<RunSnapshot>
  , hub: Arc<StateHub>
}

impl RunHandle
{   pub fn id(&self) -> RunId
    {   self.id
    }

    fn lock(&self) -> MutexGuard<'_, RunSnapshot>
    {   self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> RunSnapshot
    {   self.lock().clone()
    }

    /// Apply `f` unless the run already settled; returns whether it ran
    pub fn update<F>(&self, f: F) -> bool
    where
      F: FnOnce(&mut RunSnapshot)
    {   let mut state = self.lock();
        if state.phase.is_settled()
        {   trace!("Run {} settled, dropping update", self.id);
            return false;
        }
        f(&mut *state);
        if !self.hub.publish(&*state)
        {   trace!("Run {} no longer current", self.id);
        }
        true
    }

    pub fn set_phase(&self, phase: RunPhase)
    {   self.update(|s| {
          if s.phase != phase
          {   debug!("Run {} phase {:?} -> {:?}", s.run_id, s.phase, phase);
              s.phase = phase;
          }
        });
    }

    /// Primary-path failure: settle as Failure with every slot cleared
    pub fn fail(&self, error: &Error)
    {   let applied = self.update(|s| {
          s.clear_slots();
          s.error = Some(error.to_string());
          s.phase = RunPhase::Settled(RunOutcome::Failure);
        });
        if applied
        {   warn!("Run {} failed: {}", self.id, error);
        }
    }

    /// Settle after the primary path succeeded
    pub fn settle(&self) -> RunOutcome
    {   let mut outcome = RunOutcome::Failure;
        self.update(|s| {
          outcome = if s.is_degraded()
          {   RunOutcome::PartialFailure
          } else
          {   RunOutcome::Success
          };
          s.phase = RunPhase::Settled(outcome);
        });
        let settled = self.lock().outcome().unwrap_or(outcome);
        info!("Run {} settled: {:?}", self.id, settled);
        settled
    }
}
