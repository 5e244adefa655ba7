use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error};
use crate::config::GeminiConfig;
use crate::error::Error;
use crate::request::{GenerationMode, GenerationRequest};
use crate::stream::{sse_fragments, FragmentStream};

// ===== Wire Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
  , /// Set on reasoning parts, which are never shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

impl Content
{   fn text(role: Option<&str>, text: &str) -> Self
    {   Content
        {   role: role.map(str::to_string)
          , parts: vec![
              Part
              {   text: Some(text.to_string())
                , thought: None
              }
            ]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfigBody
{   pub response_mime_type: String
  , pub response_schema: serde_json::Value
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfigBody>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback
{   #[serde(default)]
    pub block_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope
{   error: ApiErrorBody
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody
{   #[serde(default)]
    code: Option<u16>
  , #[serde(default)]
    message: String
  , #[serde(default)]
    status: Option<String>
}

impl GenerateContentRequest
{   /// Request body for any generation mode
    pub fn from_request(request: &GenerationRequest) -> Self
    {   let generation_config = match (&request.mode, &request.schema)
        {   (GenerationMode::Structured, Some(schema)) => {
              Some(GenerationConfigBody
              {   response_mime_type: "application/json".to_string()
                , response_schema: schema.to_wire()
              })
            }
          , _ => None
        };
        GenerateContentRequest
        {   contents: vec![
              Content::text(Some("user"), request.prompt.as_str())
            ]
          , system_instruction: request.system_instruction
              .as_deref()
              .map(|text| Content::text(None, text))
          , generation_config
        }
    }
}

impl GenerateContentResponse
{   /// Visible text of the first candidate, if any
    pub fn text(&self) -> Result<Option<String>, Error>
    {   let Some(candidate) = self.candidates.first() else
        {   if let Some(reason) = self.prompt_feedback
              .as_ref()
              .and_then(|f| f.block_reason.clone())
            {   return Err(Error::Blocked(reason));
            }
            return Ok(None);
        };
        let text: String = candidate.content
          .iter()
          .flat_map(|c| c.parts.iter())
          .filter(|p| p.thought != Some(true))
          .filter_map(|p| p.text.as_deref())
          .collect();
        if text.is_empty()
        {   if let Some(reason) = candidate.finish_reason.as_deref()
            {   if matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST"
                  | "PROHIBITED_CONTENT")
                {   return Err(Error::Blocked(reason.to_string()));
                }
            }
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// Map one SSE payload of a streamed call to its text delta
pub fn parse_stream_payload(payload: &str)
  -> Result<Option<String>, Error>
{   trace!("Gemini stream payload: {}", payload);
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(payload)
    {   error!("Gemini stream error: {}", envelope.error.message);
        return Err(api_error(envelope.error));
    }
    let chunk: GenerateContentResponse = serde_json::from_str(payload)
      .map_err(|e| Error::ParseError(e.to_string()))?;
    chunk.text()
}

fn api_error(body: ApiErrorBody) -> Error
{   if body.code == Some(429)
      || body.status.as_deref() == Some("RESOURCE_EXHAUSTED")
    {   return Error::RateLimitExceeded;
    }
    Error::ApiError(body.message)
}

// ===== Gemini Client =====

/// HTTP backend for the Gemini generateContent API
pub struct GeminiClient
{   api_key: String
  , config: GeminiConfig
  , http_client: reqwest::Client
}

impl GeminiClient
{   pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Self
    {   debug!("Creating GeminiClient for model: {}", config.model);
        GeminiClient
        {   api_key: api_key.into()
          , config
          , http_client: reqwest::Client::new()
        }
    }

    /// Read the credential from the configured environment variable.
    /// A missing credential is a startup failure.
    pub fn from_env(config: GeminiConfig) -> Result<Self, Error>
    {   let api_key = std::env::var(&config.api_key_env)
          .ok()
          .filter(|key| !key.trim().is_empty())
          .ok_or_else(|| {
            error!("{} is not set", config.api_key_env);
            Error::MissingApiKey(config.api_key_env.clone())
          })?;
        Ok(Self::new(api_key, config))
    }

    pub fn model(&self) -> &str
    {   &self.config.model
    }

    pub fn endpoint(&self, method: &str) -> String
    {   format!(
          "{}/models/{}:{}",
          self.config.api_base.trim_end_matches('/'),
          self.config.model,
          method
        )
    }

    async fn post(
      &self
    , url: String
    , request: &GenerationRequest
    ) -> Result<reqwest::Response, Error>
    {   let body = GenerateContentRequest::from_request(request);
        trace!("Gemini request to {}: {:?}", url, body);

        let response = self.http_client
          .post(url)
          .header("x-goog-api-key", &self.api_key)
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gemini API error {}: {}", status, error_text);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            {   return Err(Error::RateLimitExceeded);
            }
            return Err(
              match serde_json::from_str::<ApiErrorEnvelope>(&error_text)
              {   Ok(envelope) => api_error(envelope.error)
                , Err(_) => Error::ApiError(
                    format!("{}: {}", status, error_text)
                  )
              }
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl super::Generator for GeminiClient
{   async fn generate(&self, request: &GenerationRequest)
      -> Result<String, Error>
    {   debug!("Gemini {:?} call on {}", request.mode, self.config.model);
        let response = self
          .post(self.endpoint("generateContent"), request)
          .await?;

        let reply: GenerateContentResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        reply.text()?.ok_or_else(|| {
          error!("No text in Gemini response");
          Error::EmptyResponse
        })
    }

    async fn generate_stream(&self, request: &GenerationRequest)
      -> Result<FragmentStream, Error>
    {   debug!("Gemini streamed call on {}", self.config.model);
        let response = self
          .post(self.endpoint("streamGenerateContent?alt=sse"), request)
          .await?;
        Ok(sse_fragments(response.bytes_stream(), parse_stream_payload))
    }
}
