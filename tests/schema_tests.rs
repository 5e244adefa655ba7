use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use infuse::content::{AdBrief, SponsorBanner, SponsoredSuggestion};
use infuse::schema::{FieldSpec, SchemaDescriptor, Structured};
use infuse::{Error, ErrorKind};

fn suggestion(url: Option<&str>) -> serde_json::Value
{   let mut item = json!({
      "suggestionText": "Brew better at home.",
      "headline": "Morning ritual",
      "brandName": "Kettle & Co",
      "imageUrl": "https://kettle.example.com/pour.png"
    });
    if let Some(url) = url
    {   item["url"] = json!(url);
    }
    item
}

#[test]
fn test_missing_required_field_rejected()
{   let schema = Vec::<SponsoredSuggestion>::schema();
    let text = json!([
      suggestion(Some("https://kettle.example.com")),
      suggestion(None)
    ]).to_string();

    let err = assert_err!(schema.parse_text(&text));
    assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    assert_eq!(
      err,
      Error::SchemaValidation(
        "$[1].url: missing required field".to_string()
      )
    );
}

#[test]
fn test_null_counts_as_missing()
{   let schema = AdBrief::schema();
    let err = assert_err!(
      schema.validate(&json!({ "brandName": "Aurora", "brief": null }))
    );
    assert_eq!(
      err,
      Error::SchemaValidation("$.brief: missing required field".to_string())
    );
}

#[test]
fn test_wrong_type_reports_path()
{   let schema = Vec::<SponsoredSuggestion>::schema();
    let mut item = suggestion(Some("https://kettle.example.com"));
    item["headline"] = json!(42);

    let err = assert_err!(schema.validate(&json!([item])));
    assert_eq!(
      err.to_string(),
      "Structured reply rejected: \
       $[0].headline: expected string, found number"
    );

    let err = assert_err!(schema.validate(&json!({ "not": "a list" })));
    assert!(err.to_string().contains("$: expected array, found object"));
}

#[test]
fn test_optional_field_may_be_absent()
{   let schema = SchemaDescriptor::object(vec![
      FieldSpec::required("title", SchemaDescriptor::string())
    , FieldSpec::optional("rating", SchemaDescriptor::integer())
    ]);
    assert_ok!(schema.validate(&json!({ "title": "Espresso" })));
    assert_ok!(
      schema.validate(&json!({ "title": "Espresso", "rating": null }))
    );

    let err = assert_err!(
      schema.validate(&json!({ "title": "Espresso", "rating": 4.5 }))
    );
    assert!(err.to_string().contains("$.rating: expected integer"));
}

#[test]
fn test_fenced_json_accepted()
{   let schema = Vec::<String>::schema();
    let text = "```json\n[\"Read the question\", \"Answer it\"]\n```";
    let value = assert_ok!(schema.parse_text(text));
    let steps: Vec<String> =
      assert_ok!(Vec::<String>::from_validated(value));
    assert_eq!(steps, vec!["Read the question", "Answer it"]);
}

#[test]
fn test_malformed_json_rejected()
{   let schema = AdBrief::schema();
    let err = assert_err!(
      schema.parse_text("Sure! Here is your brief: Aurora")
    );
    assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    assert!(err.to_string().contains("malformed JSON"));
}

#[test]
fn test_valid_reply_builds_typed_value()
{   let schema = AdBrief::schema();
    let value = assert_ok!(schema.parse_text(
      r#"{"brandName": "Aurora", "brief": "Quiet confidence at dawn."}"#
    ));
    let brief = assert_ok!(AdBrief::from_validated(value));
    assert_eq!(brief.instruction(), "Aurora: Quiet confidence at dawn.");
}

#[test]
fn test_wire_schema_shape()
{   let wire = Vec::<SponsoredSuggestion>::schema().to_wire();
    assert_eq!(wire["type"], "ARRAY");

    let items = &wire["items"];
    assert_eq!(items["type"], "OBJECT");
    assert_eq!(items["properties"]["url"]["type"], "STRING");
    assert_eq!(
      items["propertyOrdering"],
      json!(["suggestionText", "headline", "brandName", "url", "imageUrl"])
    );

    let wire = SchemaDescriptor::object(vec![
      FieldSpec::optional("note", SchemaDescriptor::string())
    ]).to_wire();
    assert!(wire.get("required").is_none());
    assert_eq!(wire["propertyOrdering"], json!(["note"]));
}

#[test]
fn test_banner_requires_every_field()
{   let schema = SponsorBanner::schema();
    let err = assert_err!(schema.validate(&json!({
      "headline": "Brew bolder", "cta": "Shop now"
    })));
    assert_eq!(
      err,
      Error::SchemaValidation("$.url: missing required field".to_string())
    );

    let value = json!({
      "headline": "Brew bolder", "cta": "", "url": "https://k.io"
    });
    assert_ok!(schema.validate(&value));
    let banner = assert_ok!(SponsorBanner::from_validated(value));
    assert!(!banner.is_renderable());
}
