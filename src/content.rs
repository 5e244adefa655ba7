//! Typed payloads produced by structured calls

use serde::{Deserialize, Serialize};
use crate::schema::{FieldSpec, SchemaDescriptor, Structured};

/// One sponsored card shown next to the answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredSuggestion
{   pub suggestion_text: String
  , pub headline: String
  , pub brand_name: String
  , pub url: String
  , pub image_url: String
}

impl Structured for SponsoredSuggestion
{   fn schema() -> SchemaDescriptor
    {   SchemaDescriptor::object(vec![
          FieldSpec::required(
            "suggestionText",
            SchemaDescriptor::string()
              .described("One sentence tying the product to the question")
          )
        , FieldSpec::required(
            "headline",
            SchemaDescriptor::string().described("Short catchy headline")
          )
        , FieldSpec::required(
            "brandName",
            SchemaDescriptor::string().described("Fictional brand name")
          )
        , FieldSpec::required(
            "url",
            SchemaDescriptor::string().described("Landing page url")
          )
        , FieldSpec::required(
            "imageUrl",
            SchemaDescriptor::string().described("Product image url")
          )
        ])
    }
}

/// Creative brief derived from the user's prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdBrief
{   pub brand_name: String
  , pub brief: String
}

impl AdBrief
{   /// Text spliced into the downstream prompt
    pub fn instruction(&self) -> String
    {   format!("{}: {}", self.brand_name, self.brief)
    }
}

impl Structured for AdBrief
{   fn schema() -> SchemaDescriptor
    {   SchemaDescriptor::object(vec![
          FieldSpec::required(
            "brandName",
            SchemaDescriptor::string().described("Fictional brand name")
          )
        , FieldSpec::required(
            "brief",
            SchemaDescriptor::string()
              .described("2-3 sentence advertising creative brief")
          )
        ])
        .described("Advertising concept for the prompt")
    }
}

/// Single sponsor banner: headline, call to action and landing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorBanner
{   pub headline: String
  , pub cta: String
  , pub url: String
}

impl SponsorBanner
{   /// A banner with any blank field is not shown
    pub fn is_renderable(&self) -> bool
    {   [&self.headline, &self.cta, &self.url]
          .iter()
          .all(|field| !field.trim().is_empty())
    }
}

impl Structured for SponsorBanner
{   fn schema() -> SchemaDescriptor
    {   SchemaDescriptor::object(vec![
          FieldSpec::required(
            "headline",
            SchemaDescriptor::string().described("Short banner headline")
          )
        , FieldSpec::required(
            "cta",
            SchemaDescriptor::string()
              .described("Call-to-action button text")
          )
        , FieldSpec::required(
            "url",
            SchemaDescriptor::string().described("Landing page url")
          )
        ])
    }
}
