//! The four call choreographies and the steps they share

use futures_util::stream::StreamExt;
use log::{debug, warn};
use crate::client::GenerationClient;
use crate::config::{BriefMode, OrchestratorConfig, PipelinePolicy};
use crate::content::{AdBrief, SponsorBanner, SponsoredSuggestion};
use crate::error::Error;
use crate::prompt::Prompt;
use crate::stream::TextAccumulator;
use super::state::{RunHandle, RunPhase, TextSlot};

/// One run's view of the client, configuration and state
pub(crate) struct Pipeline<'a>
{   pub client: &'a GenerationClient
  , pub config: &'a OrchestratorConfig
  , pub run: &'a RunHandle
  , pub prompt: Prompt
}

impl<'a> Pipeline<'a>
{   /// Execute the configured policy. An `Err` is a primary-path failure.
    pub async fn execute(&self) -> Result<(), Error>
    {   debug!("Run {} using {:?}", self.run.id(), self.config.policy);
        match self.config.policy
        {   PipelinePolicy::SequentialDependent => {
              self.sequential_dependent().await
            }
          , PipelinePolicy::FanOutMerge => self.fan_out_merge().await
          , PipelinePolicy::SideChannel => {
              self.with_side_channels(false).await
            }
          , PipelinePolicy::Enriched => {
              self.with_side_channels(true).await
            }
        }
    }

    // ===== Policies =====

    /// Brief, then the infused answer streamed from the spliced prompt
    async fn sequential_dependent(&self) -> Result<(), Error>
    {   self.run.update(|s| s.brief.start());
        let brief = self.derive_brief().await?;
        self.run.update(|s| s.brief.complete(brief.clone()));

        self.run.set_phase(RunPhase::Composing);
        let infused = self.config.templates.splice(&self.prompt, &brief)?;
        self.run.set_phase(RunPhase::Awaiting);
        self.stream_into(TextSlot::Infused, &infused).await?;
        Ok(())
    }

    /// Brief and plain answer concurrently, merged once both resolve,
    /// then the infused answer. Both calls run to completion even when
    /// one of them fails.
    async fn fan_out_merge(&self) -> Result<(), Error>
    {   self.run.update(|s| {
          s.brief.start();
          s.original_answer.start();
        });
        let (brief, original) = tokio::join!(
          self.derive_brief(),
          self.client.complete_text(&self.prompt)
        );
        let brief = brief?;
        let original = original?;

        self.run.set_phase(RunPhase::Composing);
        self.run.update(|s| {
          s.brief.complete(brief.clone());
          s.original_answer.complete(original);
        });
        let infused = self.config.templates.splice(&self.prompt, &brief)?;
        self.run.set_phase(RunPhase::Awaiting);
        self.complete_into(TextSlot::Infused, &infused).await?;
        Ok(())
    }

    /// Streamed plain answer with best-effort calls running beside it.
    /// A main-path failure settles the run at once; side results that
    /// arrive afterwards are dropped.
    async fn with_side_channels(&self, enrich: bool) -> Result<(), Error>
    {   let main = async {
          let result = self.main_answer(enrich).await;
          if let Err(e) = &result
          {   self.run.fail(e);
          }
          result
        };
        let sides = async {
          tokio::join!(
            self.suggestions(),
            self.thinking_steps(),
            self.sponsor_banner()
          );
        };
        let (result, ()) = tokio::join!(main, sides);
        result
    }

    async fn main_answer(&self, enrich: bool) -> Result<(), Error>
    {   let answer = self
          .stream_into(TextSlot::Original, &self.prompt)
          .await?;
        if enrich
        {   self.run.set_phase(RunPhase::Composing);
            self.connective(&answer).await;
        }
        // side calls may still be pending
        self.run.set_phase(RunPhase::Awaiting);
        Ok(())
    }

    // ===== Primary steps =====

    async fn derive_brief(&self) -> Result<String, Error>
    {   match self.config.brief_mode
        {   BriefMode::Complete => {
              let prompt = self.config.templates.ad_brief(&self.prompt)?;
              self.client.complete_text(&prompt).await
            }
          , BriefMode::Structured => {
              let prompt = self.config.templates
                .ad_brief_structured(&self.prompt)?;
              let brief: AdBrief = self.client.structured(&prompt).await?;
              Ok(brief.instruction())
            }
        }
    }

    async fn complete_into(&self, slot: TextSlot, prompt: &Prompt)
      -> Result<String, Error>
    {   self.run.update(|s| s.text_slot_mut(slot).start());
        let text = self.client.complete_text(prompt).await?;
        self.run.update(|s| s.text_slot_mut(slot).complete(text.clone()));
        Ok(text)
    }

    /// Accumulate fragments into `slot`, publishing after each one
    async fn stream_into(&self, slot: TextSlot, prompt: &Prompt)
      -> Result<String, Error>
    {   self.run.update(|s| s.text_slot_mut(slot).start());
        let mut fragments = self.client.stream_text(prompt).await?;
        let mut acc = TextAccumulator::new();
        while let Some(fragment) = fragments.next().await
        {   let fragment = fragment?;
            acc.push(&fragment);
            self.run.update(|s| {
              s.phase = RunPhase::Streaming;
              s.text_slot_mut(slot).append(&fragment);
            });
        }
        debug!(
          "Run {} {:?} stream finished after {} fragments",
          self.run.id(), slot, acc.fragment_count()
        );
        let text = acc.finish()?;
        self.run.update(|s| s.text_slot_mut(slot).complete(text.clone()));
        Ok(text)
    }

    // ===== Best-effort steps =====

    async fn suggestions(&self)
    {   if !self.config.side_channels.suggestions
        {   return;
        }
        self.run.update(|s| s.suggestions.start());
        let result = match self.config.templates.suggestions(&self.prompt)
        {   Ok(prompt) => {
              self.client
                .structured::<Vec<SponsoredSuggestion>>(&prompt)
                .await
            }
          , Err(e) => Err(e)
        };
        match result
        {   Ok(items) => {
              debug!(
                "Run {} got {} suggestions",
                self.run.id(), items.len()
              );
              self.run.update(|s| s.suggestions.complete(items));
            }
          , Err(e) => {
              let error = Error::side_channel("suggestions", &e);
              warn!("Run {}: {}", self.run.id(), error);
              self.run.update(|s| s.suggestions.fail(&error, None));
            }
        }
    }

    async fn thinking_steps(&self)
    {   if !self.config.side_channels.thinking_steps
        {   return;
        }
        self.run.update(|s| s.thinking_steps.start());
        let templates = &self.config.templates;
        let result = match templates.thinking_steps(&self.prompt)
        {   Ok(prompt) => {
              self.client.structured::<Vec<String>>(&prompt).await
            }
          , Err(e) => Err(e)
        };
        match result
        {   Ok(steps) => {
              self.run.update(|s| s.thinking_steps.complete(steps));
            }
          , Err(e) => {
              let error = Error::side_channel("thinking steps", &e);
              warn!("Run {}: {}", self.run.id(), error);
              self.run.update(|s| s.thinking_steps.fail(&error, None));
            }
        }
    }

    async fn sponsor_banner(&self)
    {   if !self.config.side_channels.banner
        {   return;
        }
        self.run.update(|s| s.banner.start());
        let result = self.fetch_banner().await;
        match result
        {   Ok(banner) => {
              self.run.update(|s| s.banner.complete(banner));
            }
          , Err(e) => {
              let error = Error::side_channel("banner", &e);
              warn!("Run {}: {}", self.run.id(), error);
              self.run.update(|s| s.banner.fail(&error, None));
            }
        }
    }

    async fn fetch_banner(&self) -> Result<SponsorBanner, Error>
    {   let prompt = self.config.templates.banner(&self.prompt)?;
        let banner: SponsorBanner = self.client.structured(&prompt).await?;
        if !banner.is_renderable()
        {   return Err(Error::SchemaValidation(
              "banner has a blank field".to_string()
            ));
        }
        Ok(banner)
    }

    /// Connective text from the prompt and the finished answer; falls
    /// back to the configured sentence
    async fn connective(&self, answer: &str)
    {   self.run.update(|s| s.connective.start());
        let templates = &self.config.templates;
        let result = match templates.connective(&self.prompt, answer)
        {   Ok(prompt) => self.client.complete_text(&prompt).await
          , Err(e) => Err(e)
        };
        match result
        {   Ok(text) => {
              let text = text.trim().to_string();
              self.run.update(|s| s.connective.complete(text));
            }
          , Err(e) => {
              let error = Error::side_channel("connective", &e);
              warn!("Run {}: {}", self.run.id(), error);
              let fallback = self.config.connective_fallback.clone();
              self.run.update(|s| {
                s.connective.fail(&error, Some(fallback))
              });
            }
        }
    }
}
