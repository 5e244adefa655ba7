//! Configuration for the generation backend and orchestration pipeline

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use log::debug;
use crate::error::Error;
use crate::prompt::PromptTemplates;

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_CONNECTIVE_FALLBACK: &str
  = "You might also find these recommendations helpful:";

/// Generation backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig
{   /// API base URL
    pub api_base: String
  , /// Model identifier
    pub model: String
  , /// Environment variable holding the credential
    pub api_key_env: String
}

impl Default for GeminiConfig
{   fn default() -> Self
    {   GeminiConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , model: DEFAULT_MODEL.to_string()
          , api_key_env: DEFAULT_API_KEY_ENV.to_string()
        }
    }
}

/// Which choreography a run follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePolicy
{   /// Brief first, then the infused answer streamed with the brief
    /// spliced into its prompt
    SequentialDependent
  , /// Brief and plain answer concurrently, then the infused answer
    FanOutMerge
  , /// Streamed plain answer with best-effort side channels
    SideChannel
  , /// SideChannel plus a connective text once the answer completes
    Enriched
}

/// How the sequential pipeline derives its brief
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefMode
{   Complete
  , Structured
}

/// Best-effort calls issued next to the main answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideChannels
{   pub suggestions: bool
  , pub thinking_steps: bool
  , /// Single sponsor banner; off unless enabled
    pub banner: bool
}

impl Default for SideChannels
{   fn default() -> Self
    {   SideChannels
        {   suggestions: true
          , thinking_steps: true
          , banner: false
        }
    }
}

/// Orchestration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig
{   pub policy: PipelinePolicy
  , pub brief_mode: BriefMode
  , pub side_channels: SideChannels
  , /// System message sent with every call
    pub system_instruction: Option<String>
  , /// Connective text used when enrichment fails
    pub connective_fallback: String
  , pub templates: PromptTemplates
}

impl Default for OrchestratorConfig
{   fn default() -> Self
    {   OrchestratorConfig
        {   policy: PipelinePolicy::FanOutMerge
          , brief_mode: BriefMode::Complete
          , side_channels: SideChannels::default()
          , system_instruction: None
          , connective_fallback: DEFAULT_CONNECTIVE_FALLBACK.to_string()
          , templates: PromptTemplates::default()
        }
    }
}

impl OrchestratorConfig
{   pub fn with_policy(mut self, policy: PipelinePolicy) -> Self
    {   self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), Error>
    {   self.templates.validate()?;
        if self.connective_fallback.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "connective_fallback must not be blank".to_string()
            ));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfuseConfig
{   pub generation: GeminiConfig
  , pub orchestrator: OrchestratorConfig
  , /// env_logger filter used when `INFUSE_LOG` is unset
    pub log_filter: Option<String>
}

impl InfuseConfig
{   pub fn from_json_str(text: &str) -> Result<Self, Error>
    {   let config: InfuseConfig = serde_json::from_str(text)
          .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        Self::from_json_str(&text)
    }

    /// Install the global logger with `log_filter` as the default filter.
    /// Returns false if a logger was already installed.
    pub fn init_logging(&self) -> bool
    {   crate::logging::init_logging(self.log_filter.as_deref())
    }
}
