//! Orchestrator: runs one choreography per submitted prompt and pushes
//! progress to subscribers

mod pipeline;
pub mod state;

use std::sync::Arc;
use tokio::sync::watch;
use log::{debug, warn};
use crate::client::GenerationClient;
use crate::config::OrchestratorConfig;
use crate::error::Error;
use crate::prompt::Prompt;
use pipeline::Pipeline;

pub use state::{
  RunHandle, RunId, RunOutcome, RunPhase, RunSnapshot, Slot, SlotStatus,
  StateHub, TextSlot,
};

/// Reject empty or whitespace-only prompts before any call is issued
pub fn validate_prompt(text: &str) -> Result<Prompt, Error>
{   let prompt = Prompt::new(text);
    if prompt.is_blank()
    {   warn!("Rejected blank prompt");
        return Err(Error::InputValidation(
          "Please enter a prompt.".to_string()
        ));
    }
    Ok(prompt)
}

/// Owns the injected client and the run state; clones share both
#[derive(Clone)]
pub struct Orchestrator
{   client: GenerationClient
  , config: Arc<OrchestratorConfig>
  , hub: Arc<StateHub>
}

impl Orchestrator
{   pub fn new(
      client: GenerationClient
    , config: OrchestratorConfig
    ) -> Result<Self, Error>
    {   config.validate()?;
        debug!("Creating Orchestrator with {:?}", config.policy);
        let client = client
          .with_system_instruction(config.system_instruction.clone());
        Ok(Orchestrator
        {   client
          , config: Arc::new(config)
          , hub: Arc::new(StateHub::new())
        })
    }

    pub fn config(&self) -> &OrchestratorConfig
    {   &self.config
    }

    /// Receive every published snapshot of the current run
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot>
    {   self.hub.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot
    {   self.hub.current()
    }

    /// Validate the prompt and make a new run current.
    /// A rejected prompt leaves the current run untouched.
    pub fn begin(&self, prompt: &str) -> Result<RunHandle, Error>
    {   validate_prompt(prompt)?;
        Ok(self.hub.begin(prompt))
    }

    /// Drive `run` to a settled state and return its final snapshot
    pub async fn execute(&self, run: RunHandle) -> RunSnapshot
    {   let prompt = Prompt::new(run.snapshot().prompt);
        run.set_phase(RunPhase::Awaiting);
        let pipeline = Pipeline
        {   client: &self.client
          , config: &self.config
          , run: &run
          , prompt
        };
        match pipeline.execute().await
        {   Ok(()) => {
              run.settle();
            }
          , Err(e) => run.fail(&e)
        }
        run.snapshot()
    }

    /// Begin and execute in one step
    pub async fn submit(&self, prompt: &str) -> Result<RunSnapshot, Error>
    {   let run = self.begin(prompt)?;
        Ok(self.execute(run).await)
    }
}
