//! Structured output schemas and their validators
//!
//! A schema is a Rust type that can be described as JSON Schema (sent to the
//! model as the response format) and checked against a raw response.
//! Presence, types and enum membership are enforced by deserialization;
//! numeric ranges by [`StructuredOutput::violations`]. Advisory checks
//! ([`StructuredOutput::warnings`]) are logged and never reject a response.

use std::collections::HashMap;

use campaign_agent::agent::parser::strip_code_fence;
use schemars::JsonSchema;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors from validating a model response against a schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("response does not match {schema}: {message}")]
    Malformed { schema: String, message: String },

    #[error("response violates {schema}: {}", violations.join("; "))]
    Violations {
        schema: String,
        violations: Vec<String>,
    },

    #[error("Unknown output schema: {0}")]
    Unknown(String),
}

/// A typed record a model response must conform to
pub trait StructuredOutput: DeserializeOwned + Serialize + JsonSchema {
    /// Catalog name of the schema
    const NAME: &'static str;

    /// Rule violations the type system cannot express
    fn violations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Advisory findings that are logged but do not fail validation
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Accept integers, and floats with no fractional part (`88.0`)
fn lax_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(D::Error::custom(format!(
            "invalid value: {}, expected an integer",
            number
        ))),
    }
}

fn check_range(violations: &mut Vec<String>, field: &str, value: i64, min: i64, max: i64) {
    if !(min..=max).contains(&value) {
        violations.push(format!("{} must be between {} and {}, got {}", field, min, max, value));
    }
}

/// Parse and validate `raw` as `T`, returning the normalized record
pub fn validate_as<T: StructuredOutput>(raw: &str) -> Result<serde_json::Value, SchemaError> {
    let record: T =
        serde_json::from_str(strip_code_fence(raw)).map_err(|e| SchemaError::Malformed {
            schema: T::NAME.to_string(),
            message: e.to_string(),
        })?;

    let violations = record.violations();
    if !violations.is_empty() {
        return Err(SchemaError::Violations {
            schema: T::NAME.to_string(),
            violations,
        });
    }

    for warning in record.warnings() {
        warn!(schema = T::NAME, "{}", warning);
    }

    serde_json::to_value(&record).map_err(|e| SchemaError::Malformed {
        schema: T::NAME.to_string(),
        message: e.to_string(),
    })
}

/// A type-erased schema: JSON Schema for the model plus a validator
#[derive(Debug, Clone)]
pub struct OutputSchema {
    name: String,
    json_schema: serde_json::Value,
    validator: fn(&str) -> Result<serde_json::Value, SchemaError>,
}

impl OutputSchema {
    /// Build the schema entry for `T`
    pub fn of<T: StructuredOutput>() -> Self {
        let json_schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        Self {
            name: T::NAME.to_string(),
            json_schema,
            validator: validate_as::<T>,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// JSON Schema sent as the model's response format
    pub fn json_schema(&self) -> &serde_json::Value {
        &self.json_schema
    }

    /// Validate a raw model response
    pub fn validate(&self, raw: &str) -> Result<serde_json::Value, SchemaError> {
        (self.validator)(raw)
    }
}

/// Named output schemas agents can refer to
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, OutputSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in campaign schemas
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(OutputSchema::of::<BrandValidation>());
        catalog.register(OutputSchema::of::<CampaignPriority>());
        catalog
    }

    pub fn register(&mut self, schema: OutputSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&OutputSchema> {
        self.schemas.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&OutputSchema, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Schema names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Built-in schemas
// ============================================================================

/// A specific issue found during brand validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    #[schemars(description = "Area with the issue, e.g. 'Brand Voice' or 'Narrative Alignment'")]
    pub field: String,
    #[schemars(description = "Detailed description of the issue")]
    pub description: String,
}

/// Result of the brand assurance quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BrandValidation {
    #[schemars(description = "Whether the campaign brief is approved to proceed")]
    pub approved: bool,
    #[schemars(description = "Overall brand alignment score", range(min = 0, max = 100))]
    #[serde(deserialize_with = "lax_int")]
    pub brand_score: i64,
    #[schemars(description = "Overall consistency score", range(min = 0, max = 100))]
    #[serde(deserialize_with = "lax_int")]
    pub consistency_score: i64,
    #[schemars(description = "Specific compliance or brand issues found")]
    pub compliance_issues: Vec<Issue>,
    #[schemars(description = "Actionable recommendations for improvement")]
    pub recommendations: Vec<String>,
}

impl StructuredOutput for BrandValidation {
    const NAME: &'static str = "BrandValidation";

    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        check_range(&mut violations, "brand_score", self.brand_score, 0, 100);
        check_range(&mut violations, "consistency_score", self.consistency_score, 0, 100);
        violations
    }
}

/// Campaign classification used by the distribution queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CampaignType {
    #[serde(rename = "Business Campaign")]
    BusinessCampaign,
    #[serde(rename = "Official Announcement")]
    OfficialAnnouncement,
    #[serde(rename = "Educational")]
    Educational,
    #[serde(rename = "Community")]
    Community,
    #[serde(rename = "Automated Content")]
    AutomatedContent,
}

impl CampaignType {
    /// Priority tier from the queue matrix (1 = highest)
    pub fn priority(&self) -> i64 {
        match self {
            CampaignType::BusinessCampaign | CampaignType::OfficialAnnouncement => 1,
            CampaignType::Educational => 2,
            CampaignType::Community => 3,
            CampaignType::AutomatedContent => 4,
        }
    }
}

/// Priority assigned to a campaign for distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CampaignPriority {
    #[schemars(description = "The classified type of the campaign")]
    pub campaign_type: CampaignType,
    #[schemars(description = "Priority level where 1 is the highest", range(min = 1, max = 4))]
    #[serde(deserialize_with = "lax_int")]
    pub priority: i64,
    #[schemars(description = "Brief justification for the assigned priority")]
    pub reasoning: String,
}

impl StructuredOutput for CampaignPriority {
    const NAME: &'static str = "CampaignPriority";

    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        check_range(&mut violations, "priority", self.priority, 1, 4);
        violations
    }

    fn warnings(&self) -> Vec<String> {
        let expected = self.campaign_type.priority();
        if self.priority == expected {
            return Vec::new();
        }
        vec![format!(
            "priority {} differs from the {:?} tier (expected {})",
            self.priority, self.campaign_type, expected
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand_validation_json(brand_score: i64) -> String {
        serde_json::json!({
            "approved": false,
            "brand_score": brand_score,
            "consistency_score": 80,
            "compliance_issues": [
                {"field": "Content Balance", "description": "Too promotional"}
            ],
            "recommendations": ["Add a how-to guide"]
        })
        .to_string()
    }

    #[test]
    fn test_valid_brand_validation() {
        let value = validate_as::<BrandValidation>(&brand_validation_json(72)).unwrap();
        assert_eq!(value["brand_score"], 72);
        assert_eq!(value["compliance_issues"][0]["field"], "Content Balance");
    }

    #[test]
    fn test_fenced_response_is_accepted() {
        let raw = format!("```json\n{}\n```", brand_validation_json(10));
        assert!(validate_as::<BrandValidation>(&raw).is_ok());
    }

    #[test]
    fn test_score_out_of_range() {
        let err = validate_as::<BrandValidation>(&brand_validation_json(101)).unwrap_err();
        match err {
            SchemaError::Violations { schema, violations } => {
                assert_eq!(schema, "BrandValidation");
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("brand_score"));
            }
            other => panic!("Expected Violations, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field() {
        let raw = r#"{"approved": true, "brand_score": 90, "consistency_score": 90, "recommendations": []}"#;
        let err = validate_as::<BrandValidation>(raw).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
        assert!(err.to_string().contains("compliance_issues"));
    }

    #[test]
    fn test_wrong_type() {
        let raw = r#"{"approved": "yes", "brand_score": 90, "consistency_score": 90, "compliance_issues": [], "recommendations": []}"#;
        assert!(matches!(
            validate_as::<BrandValidation>(raw),
            Err(SchemaError::Malformed { .. })
        ));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            validate_as::<BrandValidation>("The brief looks great!"),
            Err(SchemaError::Malformed { .. })
        ));
    }

    #[test]
    fn test_campaign_priority_valid() {
        let raw = r#"{"campaign_type": "Business Campaign", "priority": 1, "reasoning": "Product launch"}"#;
        let value = validate_as::<CampaignPriority>(raw).unwrap();
        assert_eq!(value["campaign_type"], "Business Campaign");
    }

    #[test]
    fn test_campaign_type_enum_membership() {
        let raw = r#"{"campaign_type": "Viral Stunt", "priority": 1, "reasoning": "x"}"#;
        let err = validate_as::<CampaignPriority>(raw).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
    }

    #[test]
    fn test_priority_range() {
        let raw = r#"{"campaign_type": "Community", "priority": 5, "reasoning": "x"}"#;
        let err = validate_as::<CampaignPriority>(raw).unwrap_err();
        assert!(err.to_string().contains("priority must be between 1 and 4"));
    }

    #[test]
    fn test_priority_off_tier_is_accepted() {
        let raw = r#"{"campaign_type": "Community", "priority": 1, "reasoning": "hot topic"}"#;
        let value = validate_as::<CampaignPriority>(raw).unwrap();
        assert_eq!(value["priority"], 1);
        assert_eq!(value["campaign_type"], "Community");

        let record: CampaignPriority = serde_json::from_str(raw).unwrap();
        assert!(record.violations().is_empty());
        let warnings = record.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("expected 3"));
    }

    #[test]
    fn test_on_tier_priority_has_no_warnings() {
        let raw = r#"{"campaign_type": "Educational", "priority": 2, "reasoning": "how-to"}"#;
        let record: CampaignPriority = serde_json::from_str(raw).unwrap();
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_integral_float_scores_are_accepted() {
        let raw = r#"{"approved": true, "brand_score": 88.0, "consistency_score": 91, "compliance_issues": [], "recommendations": []}"#;
        let value = validate_as::<BrandValidation>(raw).unwrap();
        assert_eq!(value["brand_score"], 88);

        let raw = r#"{"campaign_type": "Educational", "priority": 2.0, "reasoning": "x"}"#;
        let value = validate_as::<CampaignPriority>(raw).unwrap();
        assert_eq!(value["priority"], 2);
    }

    #[test]
    fn test_fractional_score_is_malformed() {
        let raw = r#"{"approved": true, "brand_score": 88.5, "consistency_score": 91, "compliance_issues": [], "recommendations": []}"#;
        let err = validate_as::<BrandValidation>(raw).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
        assert!(err.to_string().contains("expected an integer"));
    }

    #[test]
    fn test_json_schema_keeps_integer_types() {
        let schema = OutputSchema::of::<BrandValidation>();
        assert_eq!(
            schema.json_schema()["properties"]["brand_score"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = SchemaCatalog::with_defaults();
        assert_eq!(catalog.names(), vec!["BrandValidation", "CampaignPriority"]);

        let schema = catalog.resolve("CampaignPriority").unwrap();
        assert_eq!(schema.json_schema()["type"], "object");
        assert!(schema.json_schema()["properties"].get("priority").is_some());
        assert!(matches!(
            catalog.resolve("Missing"),
            Err(SchemaError::Unknown(_))
        ));
    }
}
