//! Workflow handle and input schema types.
//!
//! A workflow is an opaque, versioned unit of business logic. The handle
//! carries everything the gateway needs (identity, version, declared
//! inputs, required permission) while the executable body belongs to the
//! external runtime.

use super::{TenantId, WorkflowId};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handle for a registered workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowHandle {
    /// Workflow identifier.
    pub id: WorkflowId,

    /// Semantic version of this registration.
    pub version: Version,

    /// Human-readable description, surfaced by tool discovery.
    #[serde(default)]
    pub description: String,

    /// Declared input schema, validated before execution.
    pub input_schema: InputSchema,

    /// Permission required to execute, e.g. `workflow:execute`.
    pub required_permission: String,

    /// Owning tenant. `None` means the workflow is visible to all tenants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl WorkflowHandle {
    /// Create a new handle.
    pub fn new(
        id: impl Into<WorkflowId>,
        version: Version,
        input_schema: InputSchema,
        required_permission: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version,
            description: String::new(),
            input_schema,
            required_permission: required_permission.into(),
            tenant_id: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Scope the workflow to a tenant.
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Resource name used in authorization checks and audit records.
    pub fn resource(&self) -> String {
        format!("workflow:{}", self.id)
    }
}

/// Declared input schema: a flat map of named, typed fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSchema {
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// Create an empty schema (no declared inputs).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Validate an inputs map against the schema.
    ///
    /// Returns the validated map on success, or the full list of problems
    /// so the caller sees every mismatch at once.
    pub fn validate(&self, inputs: &Value) -> Result<Map<String, Value>, Vec<String>> {
        let mut errors = Vec::new();

        let map = match inputs {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(vec![format!(
                    "inputs must be an object, got {}",
                    json_type_name(other)
                )])
            }
        };

        for field in &self.fields {
            match map.get(&field.name) {
                None => {
                    if field.required {
                        errors.push(format!("missing required input '{}'", field.name));
                    }
                }
                Some(value) => {
                    if !field.field_type.accepts(value) {
                        errors.push(format!(
                            "input '{}' expects {}, got {}",
                            field.name,
                            field.field_type.as_str(),
                            json_type_name(value)
                        ));
                    }
                }
            }
        }

        for key in map.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                errors.push(format!("unknown input '{key}'"));
            }
        }

        if errors.is_empty() {
            Ok(map)
        } else {
            Err(errors)
        }
    }

    /// Render as a JSON-schema-shaped value for tool discovery.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(field.field_type.as_str().into()));
            if let Some(desc) = &field.description {
                prop.insert("description".into(), Value::String(desc.clone()));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A single declared input field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,

    /// Expected JSON type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field must be present.
    #[serde(default)]
    pub required: bool,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Create a required field.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            description: None,
        }
    }

    /// Create an optional field.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// JSON type expected by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// Any JSON value.
    Any,
}

impl FieldType {
    /// Stable string form matching JSON schema type names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }

    /// Whether a JSON value satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_schema() -> InputSchema {
        InputSchema::empty()
            .field(FieldSpec::required("message", FieldType::String).describe("Text to echo"))
            .field(FieldSpec::optional("uppercase", FieldType::Boolean))
    }

    #[test]
    fn test_validate_accepts_valid_inputs() {
        let schema = echo_schema();
        let inputs = serde_json::json!({"message": "hi"});
        let validated = schema.validate(&inputs).unwrap();
        assert_eq!(validated.get("message"), Some(&serde_json::json!("hi")));
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let schema = echo_schema();
        let errors = schema.validate(&serde_json::json!({})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("message"));
    }

    #[test]
    fn test_validate_rejects_wrong_type_and_unknown_key() {
        let schema = echo_schema();
        let inputs = serde_json::json!({"message": 42, "extra": true});
        let errors = schema.validate(&inputs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("expects string")));
        assert!(errors.iter().any(|e| e.contains("unknown input 'extra'")));
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let schema = echo_schema();
        let errors = schema.validate(&serde_json::json!([1, 2])).unwrap_err();
        assert!(errors[0].contains("must be an object"));
    }

    #[test]
    fn test_empty_schema_accepts_null_inputs() {
        let schema = InputSchema::empty();
        let validated = schema.validate(&Value::Null).unwrap();
        assert!(validated.is_empty());
    }

    #[test]
    fn test_to_json_schema() {
        let schema = echo_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["message"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["message"]));
    }

    #[test]
    fn test_handle_resource_name() {
        let handle = WorkflowHandle::new(
            "w1",
            Version::new(1, 0, 0),
            InputSchema::empty(),
            "workflow:execute",
        );
        assert_eq!(handle.resource(), "workflow:w1");
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Integer.accepts(&serde_json::json!(3)));
        assert!(!FieldType::Integer.accepts(&serde_json::json!(3.5)));
        assert!(FieldType::Number.accepts(&serde_json::json!(3.5)));
        assert!(FieldType::Any.accepts(&Value::Null));
    }
}
