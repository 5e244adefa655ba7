use tokio_test::{assert_err, assert_ok};

use infuse::config::{
  BriefMode, InfuseConfig, OrchestratorConfig, PipelinePolicy,
};
use infuse::orchestrator::validate_prompt;
use infuse::prompt::{PromptTemplates, Template};
use infuse::{ErrorKind, Prompt};

// ===== Prompts and templates =====

#[test]
fn test_validate_prompt()
{   let err = assert_err!(validate_prompt(" \t\n"));
    assert_eq!(err.kind(), ErrorKind::InputValidation);
    assert_eq!(err.to_string(), "Invalid input: Please enter a prompt.");

    let prompt = assert_ok!(validate_prompt("  Why coffee?  "));
    // kept verbatim, surrounding whitespace included
    assert_eq!(prompt.as_str(), "  Why coffee?  ");
}

#[test]
fn test_render_is_single_pass()
{   let template = Template::new("Q: {{prompt}} / A: {{answer}}");
    let rendered = assert_ok!(template.render(&[
      ("prompt", "what is {{answer}}?")
    , ("answer", "42")
    ]));
    assert_eq!(rendered.as_str(), "Q: what is {{answer}}? / A: 42");
    assert_eq!(template.placeholders(), vec!["prompt", "answer"]);
}

#[test]
fn test_render_missing_variable()
{   let template = Template::new("Hello {{ name }}");
    let err = assert_err!(template.render(&[("prompt", "x")]));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("{{name}}"));
}

#[test]
fn test_splice_contains_prompt_and_brief()
{   let templates = PromptTemplates::default();
    let prompt = Prompt::new("Explain the importance of teamwork.");
    let brief = "Tandem: \"two minds, one rhythm\" {{prompt}}";

    let spliced = assert_ok!(templates.splice(&prompt, brief));
    let text = spliced.as_str();
    assert!(text.starts_with("Explain the importance of teamwork."));
    assert!(text.contains("\n\n---\n\n"));
    assert!(text.contains(brief));
}

#[test]
fn test_templates_require_placeholders()
{   let mut templates = PromptTemplates::default();
    assert_ok!(templates.validate());

    templates.splice = Template::new("{{prompt}} and nothing else");
    let err = assert_err!(templates.validate());
    assert!(err.to_string().contains("splice"));
    assert!(err.to_string().contains("{{upstream}}"));
}

#[test]
fn test_templates_reject_unknown_placeholders()
{   let mut templates = PromptTemplates::default();
    templates.suggestions = Template::new("{{prompt}} for {{audience}}");
    let err = assert_err!(templates.validate());
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("suggestions"));
    assert!(err.to_string().contains("unknown placeholder {{audience}}"));

    let mut config = OrchestratorConfig::default();
    config.templates = templates;
    let err = assert_err!(config.validate());
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ===== Configuration =====

#[test]
fn test_config_defaults_from_json()
{   let config = assert_ok!(InfuseConfig::from_json_str("{}"));
    assert_eq!(config, InfuseConfig::default());
    assert_eq!(config.generation.model, "gemini-2.5-flash");
    assert_eq!(config.generation.api_key_env, "API_KEY");
    assert_eq!(config.orchestrator.policy, PipelinePolicy::FanOutMerge);
    assert!(config.orchestrator.side_channels.suggestions);
}

#[test]
fn test_config_overrides()
{   let config = assert_ok!(InfuseConfig::from_json_str(r#"{
      "generation": { "model": "gemini-2.5-pro" },
      "orchestrator": {
        "policy": "sequential_dependent",
        "brief_mode": "structured",
        "side_channels": { "thinking_steps": false },
        "templates": { "thinking_steps": "Steps for {{prompt}}" }
      },
      "log_filter": "infuse=trace"
    }"#));

    assert_eq!(config.generation.model, "gemini-2.5-pro");
    assert_eq!(
      config.generation.api_base,
      "https://generativelanguage.googleapis.com/v1beta"
    );
    assert_eq!(
      config.orchestrator.policy,
      PipelinePolicy::SequentialDependent
    );
    assert_eq!(config.orchestrator.brief_mode, BriefMode::Structured);
    assert!(config.orchestrator.side_channels.suggestions);
    assert!(!config.orchestrator.side_channels.thinking_steps);
    assert_eq!(
      config.orchestrator.templates.thinking_steps.as_str(),
      "Steps for {{prompt}}"
    );
    assert_eq!(config.log_filter.as_deref(), Some("infuse=trace"));
}

#[test]
fn test_invalid_config_rejected()
{   let err = assert_err!(InfuseConfig::from_json_str(
      r#"{ "orchestrator": { "policy": "round_robin" } }"#
    ));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = assert_err!(InfuseConfig::from_json_str(r#"{
      "orchestrator": {
        "templates": { "connective": "no placeholders" }
      }
    }"#));
    assert!(err.to_string().contains("connective"));

    let mut config = OrchestratorConfig::default();
    config.connective_fallback = "   ".to_string();
    assert_err!(config.validate());
}

#[test]
fn test_missing_config_file()
{   let err = assert_err!(
      InfuseConfig::from_json_file("/nonexistent/infuse.json")
    );
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("/nonexistent/infuse.json"));
}

#[test]
fn test_config_installs_logger_once()
{   let config = assert_ok!(
      InfuseConfig::from_json_str(r#"{ "log_filter": "infuse=debug" }"#)
    );
    // another test may already have installed one
    let _ = config.init_logging();
    assert!(!config.init_logging());
}
