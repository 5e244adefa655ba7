use std::fmt;

/// Custom error type for infuse operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Prompt was empty or whitespace only
    InputValidation(String)
  , /// Credential for the generation capability is missing
    MissingApiKey(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Rate limit or quota exceeded
    RateLimitExceeded
  , /// Failed to parse API response
    ParseError(String)
  , /// Upstream answered without any text
    EmptyResponse
  , /// Upstream refused the prompt
    Blocked(String)
  , /// Stream failed after it started
    StreamInterrupted(String)
  , /// Structured reply did not match the declared shape
    SchemaValidation(String)
  , /// Best-effort call failed
    SideChannel(String)
  , /// Generic error
    Other(String)
}

/// Coarse error classes surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{   InputValidation
  , Generation
  , SchemaValidation
  , SideChannel
  , Configuration
}

impl Error
{   pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::InputValidation(_) => ErrorKind::InputValidation
          , Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => ErrorKind::Configuration
          , Error::SchemaValidation(_) => ErrorKind::SchemaValidation
          , Error::SideChannel(_) => ErrorKind::SideChannel
          , Error::HttpError(_)
          | Error::ApiError(_)
          | Error::RateLimitExceeded
          | Error::ParseError(_)
          | Error::EmptyResponse
          | Error::Blocked(_)
          | Error::StreamInterrupted(_)
          | Error::Other(_) => ErrorKind::Generation
        }
    }

    /// Wrap a failure from a best-effort call
    pub fn side_channel(slot: &str, cause: &Error) -> Self
    {   Error::SideChannel(format!("{}: {}", slot, cause))
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::InputValidation(msg) => {
              write!(f, "Invalid input: {}", msg)
            }
          , Error::MissingApiKey(var) => {
              write!(f, "Missing API key: set {}", var)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "Gemini API call failed: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "Gemini API error: {}", msg)
            }
          , Error::RateLimitExceeded => {
              write!(f, "Gemini API rate limit exceeded")
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::EmptyResponse => {
              write!(f, "Gemini API returned no text")
            }
          , Error::Blocked(reason) => {
              write!(f, "Prompt was blocked: {}", reason)
            }
          , Error::StreamInterrupted(msg) => {
              write!(f, "Stream interrupted: {}", msg)
            }
          , Error::SchemaValidation(msg) => {
              write!(f, "Structured reply rejected: {}", msg)
            }
          , Error::SideChannel(msg) => {
              write!(f, "Side channel failed: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
