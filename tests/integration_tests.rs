use std::sync::Arc;
use std::time::Duration;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use infuse::config::{
  GeminiConfig, OrchestratorConfig, PipelinePolicy, SideChannels,
};
use infuse::providers::gemini::{
  parse_stream_payload, GenerateContentRequest, GenerateContentResponse,
};
use infuse::providers::{GeminiClient, Generator, MockGenerator, MockReply};
use infuse::request::GenerationRequest;
use infuse::schema::Structured;
use infuse::content::SponsoredSuggestion;
use infuse::stream::collect_text;
use infuse::{
  Error, ErrorKind, GenerationClient, InfuseBackend, Orchestrator, Prompt,
  RunOutcome,
};

/// Get API key from environment
fn get_api_key(env_var: &str)
  -> Result<String, Box<dyn std::error::Error>>
{   std::env::var(env_var)
      .map_err(|_| {
        format!("Environment variable {} not set", env_var)
          .into()
      })
}

fn backend_with(mock: MockGenerator, config: OrchestratorConfig)
  -> InfuseBackend
{   infuse::logging::init_test_logging();
    let generator: Arc<dyn Generator> = Arc::new(mock);
    let orchestrator = Orchestrator::new(
      GenerationClient::new(generator),
      config
    ).expect("valid config");
    InfuseBackend::new(orchestrator)
}

fn answer_only() -> OrchestratorConfig
{   let mut config = OrchestratorConfig::default()
      .with_policy(PipelinePolicy::SideChannel);
    config.side_channels = SideChannels
    {   suggestions: false
      , thinking_steps: false
      , banner: false
    };
    config
}

// ===== Gemini client (offline) =====

#[test]
fn test_gemini_missing_key_is_fatal()
{   let config = GeminiConfig
    {   api_key_env: "INFUSE_TEST_KEY_THAT_IS_NEVER_SET".to_string()
      , ..GeminiConfig::default()
    };
    let err = match GeminiClient::from_env(config)
    {   Ok(_) => panic!("client built without a key")
      , Err(e) => e
    };
    assert_eq!(
      err,
      Error::MissingApiKey("INFUSE_TEST_KEY_THAT_IS_NEVER_SET".to_string())
    );
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_gemini_endpoint()
{   let client = GeminiClient::new("test-key", GeminiConfig::default());
    assert_eq!(client.model(), "gemini-2.5-flash");
    assert_eq!(
      client.endpoint("generateContent"),
      concat!(
        "https://generativelanguage.googleapis.com/v1beta",
        "/models/gemini-2.5-flash:generateContent"
      )
    );
}

#[test]
fn test_gemini_request_body_for_structured_call()
{   let request = GenerationRequest::structured(
        Prompt::new("Suggest things"),
        Vec::<SponsoredSuggestion>::schema()
      )
      .with_system_instruction(Some("Be brief.".to_string()));
    let body = serde_json::to_value(
      GenerateContentRequest::from_request(&request)
    ).unwrap();

    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Suggest things");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    assert_eq!(
      body["generationConfig"]["responseMimeType"],
      "application/json"
    );
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    assert_eq!(
      body["generationConfig"]["responseSchema"]["items"]["required"],
      json!(["suggestionText", "headline", "brandName", "url", "imageUrl"])
    );
}

#[test]
fn test_gemini_request_body_for_plain_call()
{   let request = GenerationRequest::complete(Prompt::new("Hi"));
    let body = serde_json::to_value(
      GenerateContentRequest::from_request(&request)
    ).unwrap();
    assert!(body.get("generationConfig").is_none());
    assert!(body.get("systemInstruction").is_none());
}

#[test]
fn test_gemini_response_text_skips_thoughts()
{   let reply: GenerateContentResponse = serde_json::from_value(json!({
      "candidates": [{
        "content": {
          "role": "model",
          "parts": [
            { "text": "planning...", "thought": true },
            { "text": "Coffee " },
            { "text": "helps." }
          ]
        },
        "finishReason": "STOP"
      }]
    })).unwrap();
    assert_eq!(reply.text(), Ok(Some("Coffee helps.".to_string())));
}

#[test]
fn test_gemini_blocked_prompt()
{   let reply: GenerateContentResponse = serde_json::from_value(json!({
      "promptFeedback": { "blockReason": "SAFETY" }
    })).unwrap();
    assert_eq!(reply.text(), Err(Error::Blocked("SAFETY".to_string())));
}

#[test]
fn test_gemini_stream_error_payload()
{   let quota = r#"{"error": {"code": 429,
      "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(parse_stream_payload(quota), Err(Error::RateLimitExceeded));

    let bad = r#"{"error": {"code": 400,
      "message": "Bad model", "status": "INVALID_ARGUMENT"}}"#;
    assert_eq!(
      parse_stream_payload(bad),
      Err(Error::ApiError("Bad model".to_string()))
    );
}

// ===== Gemini client (live) =====

#[tokio::test]
#[ignore]
async fn test_gemini_complete_text()
{   let Ok(api_key) = get_api_key("API_KEY") else
    {   println!("Skipping test: API_KEY not set");
        return;
    };
    let generator: Arc<dyn Generator>
      = Arc::new(GeminiClient::new(api_key, GeminiConfig::default()));
    let client = GenerationClient::new(generator);

    match client.complete_text(&Prompt::new("Say hello")).await
    {   Ok(response) => {
          println!("Response: {}", response);
          assert!(!response.is_empty());
        }
      , Err(e) => println!("API Error: {}", e)
    }
}

#[tokio::test]
#[ignore]
async fn test_gemini_stream_text()
{   let Ok(api_key) = get_api_key("API_KEY") else
    {   println!("Skipping test: API_KEY not set");
        return;
    };
    let generator: Arc<dyn Generator>
      = Arc::new(GeminiClient::new(api_key, GeminiConfig::default()));
    let client = GenerationClient::new(generator);

    let fragments = assert_ok!(
      client.stream_text(&Prompt::new("Count from one to five.")).await
    );
    let text = assert_ok!(collect_text(fragments).await);
    println!("Streamed: {}", text);
    assert!(!text.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_gemini_structured_suggestions()
{   let Ok(api_key) = get_api_key("API_KEY") else
    {   println!("Skipping test: API_KEY not set");
        return;
    };
    let generator: Arc<dyn Generator>
      = Arc::new(GeminiClient::new(api_key, GeminiConfig::default()));
    let client = GenerationClient::new(generator);

    let prompt = Prompt::new(
      "Suggest three sponsored products for someone learning to brew \
       coffee."
    );
    match client.structured::<Vec<SponsoredSuggestion>>(&prompt).await
    {   Ok(items) => {
          for item in &items
          {   println!("  - {} ({})", item.headline, item.url);
          }
          assert!(!items.is_empty());
        }
      , Err(e) => println!("API Error: {}", e)
    }
}

// ===== Backend =====

#[tokio::test]
async fn test_backend_initialization()
{   let backend = backend_with(MockGenerator::new(), answer_only());
    assert_eq!(backend.snapshot().run_id, 0);
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_rejects_blank_prompt()
{   let mock = Arc::new(MockGenerator::new());
    let generator: Arc<dyn Generator> = mock.clone();
    let orchestrator = Orchestrator::new(
      GenerationClient::new(generator),
      answer_only()
    ).unwrap();
    let backend = InfuseBackend::new(orchestrator);

    let mut rx = assert_ok!(backend.submit("  \n\t ".to_string()).await);
    let reply = rx.recv().await.expect("reply");
    let err = assert_err!(reply);
    assert_eq!(err.kind(), ErrorKind::InputValidation);
    assert_eq!(mock.call_count(), 0);
    assert_eq!(backend.snapshot().run_id, 0);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_submit_settles()
{   let backend = backend_with(
      MockGenerator::new().otherwise(MockReply::text("Four.")),
      answer_only()
    );

    let mut rx =
      assert_ok!(backend.submit("What is 2+2?".to_string()).await);
    let reply = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .expect("timed out waiting for reply")
      .expect("reply channel closed");
    let snapshot = assert_ok!(reply);

    assert_eq!(snapshot.outcome(), Some(RunOutcome::Success));
    assert_eq!(snapshot.original_answer.value.as_deref(), Some("Four."));
    assert_eq!(backend.snapshot(), snapshot);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_new_run_supersedes_old()
{   let backend = backend_with(
      MockGenerator::new()
        .on_delayed(
          "alpha",
          MockReply::text("Alpha answer"),
          Duration::from_millis(150)
        )
        .on("beta", MockReply::text("Beta answer")),
      answer_only()
    );
    let mut updates = backend.subscribe();

    let mut alpha_rx = assert_ok!(
      backend.submit("alpha question".to_string()).await
    );
    let mut beta_rx = assert_ok!(
      backend.submit("beta question".to_string()).await
    );

    let beta = assert_ok!(beta_rx.recv().await.expect("beta reply"));
    assert_eq!(beta.original_answer.value.as_deref(), Some("Beta answer"));

    // the old run still completes, but only for its own caller
    let alpha = assert_ok!(alpha_rx.recv().await.expect("alpha reply"));
    assert_eq!(alpha.outcome(), Some(RunOutcome::Success));
    assert_eq!(
      alpha.original_answer.value.as_deref(),
      Some("Alpha answer")
    );
    assert!(alpha.run_id < beta.run_id);

    let current = updates.borrow_and_update().clone();
    assert_eq!(current.run_id, beta.run_id);
    assert_eq!(
      current.original_answer.value.as_deref(),
      Some("Beta answer")
    );

    let _ = backend.shutdown().await;
}
