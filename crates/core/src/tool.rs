//! Tool trait: the abstraction over agent capabilities.
//!
//! The tool set is fixed and closed: filesystem access, shell execution and
//! web lookups. Each tool declares an [`ArgSchema`] that is checked before the
//! handler runs, and a [`RiskClass`] that drives the permission gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool, with arguments already parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution. Always plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content fed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Static classification of a tool's potential for harm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// Never prompts.
    ReadOnly,
    /// Prompts unless the operator said "always" for this tool.
    Mutating,
    /// Arbitrary execution; prompts unless allowed for this exact command.
    Execute,
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read_only"),
            Self::Mutating => write!(f, "mutating"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// What a gated tool call is about to do, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Tool requesting the action
    pub tool: String,

    /// Risk class of the tool
    pub risk: RiskClass,

    /// Cache key for "always"/"never" decisions: tool name or command name
    pub scope: String,

    /// What the action touches, as the model named it (path or command name)
    pub target: String,

    /// Human-readable effect, e.g. the literal command line or target path
    pub description: String,

    /// Irreversible actions are confirmed every time, regardless of cached decisions
    pub irreversible: bool,
}

/// Primitive type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Boolean,
    StringList,
}

impl ArgKind {
    fn json_schema(self) -> serde_json::Value {
        match self {
            Self::String => serde_json::json!({ "type": "string" }),
            Self::Integer => serde_json::json!({ "type": "integer" }),
            Self::Boolean => serde_json::json!({ "type": "boolean" }),
            Self::StringList => serde_json::json!({ "type": "array", "items": { "type": "string" } }),
        }
    }

    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| v.is_string())),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Boolean => "a boolean",
            Self::StringList => "a list of strings",
        }
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgField {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
}

/// The explicit contract between the model's argument payload and a handler.
///
/// Unknown fields, missing required fields and type mismatches are rejected.
/// `null` for an optional field counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSchema {
    fields: Vec<ArgField>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        self.fields.push(ArgField { name, kind, required: true, description });
        self
    }

    pub fn optional(mut self, name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        self.fields.push(ArgField { name, kind, required: false, description });
        self
    }

    pub fn fields(&self) -> &[ArgField] {
        &self.fields
    }

    /// Render as the JSON Schema sent to the model.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            let mut prop = field.kind.json_schema();
            prop["description"] = serde_json::Value::String(field.description.into());
            properties.insert(field.name.into(), prop);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check a payload, naming the first offending field.
    pub fn validate(&self, arguments: &serde_json::Value) -> std::result::Result<(), String> {
        let Some(object) = arguments.as_object() else {
            return Err("arguments must be a JSON object".into());
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.fields.iter().any(|f| f.name == key.as_str()))
        {
            return Err(format!("unknown field '{unknown}'"));
        }

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(serde_json::Value::Null) if field.required => {
                    return Err(format!("missing required field '{}'", field.name));
                }
                None | Some(serde_json::Value::Null) => {}
                Some(value) if !field.kind.accepts(value) => {
                    return Err(format!("field '{}' must be {}", field.name, field.kind.label()));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// The core Tool trait.
///
/// Gated tools override [`Tool::action`] to describe their effect; the
/// dispatcher asks the permission gate about it before calling `execute`.
/// Filesystem tools resolve their target against the sandbox boundary inside
/// `action` too, so a violation is reported before anyone is prompted.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "fs_read", "shell").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// Static risk classification.
    fn risk_class(&self) -> RiskClass;

    /// Declared arguments.
    fn schema(&self) -> ArgSchema;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value {
        self.schema().to_json_schema()
    }

    /// Describe the side effect of a call with validated `arguments`.
    ///
    /// `None` means nothing to confirm.
    fn action(&self, _arguments: &serde_json::Value) -> std::result::Result<Option<ActionRequest>, ToolError> {
        Ok(None)
    }

    /// Execute the tool with validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The catalog of callable tools, immutable once the run starts.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Tool definitions for the model, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// All registered tool names, ordered.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn risk_class(&self) -> RiskClass { RiskClass::ReadOnly }
        fn schema(&self) -> ArgSchema {
            ArgSchema::new()
                .required("text", ArgKind::String, "text to echo")
                .optional("times", ArgKind::Integer, "repeat count")
        }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("");
            let times = arguments["times"].as_u64().unwrap_or(1) as usize;
            Ok(ToolResult::ok(text.repeat(times)))
        }
    }

    fn fs_write_schema() -> ArgSchema {
        ArgSchema::new()
            .required("path", ArgKind::String, "target")
            .required("content", ArgKind::String, "data")
            .optional("mode", ArgKind::String, "w or a")
            .optional("flags", ArgKind::StringList, "extra")
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"], json!(["text"]));
        assert_eq!(defs[0].parameters["properties"]["times"]["type"], "integer");
    }

    #[tokio::test]
    async fn read_only_tool_needs_no_action() {
        let tool = EchoTool;
        assert_eq!(tool.action(&json!({"text": "hi"})).unwrap(), None);
        let result = tool.execute(json!({"text": "ab", "times": 2})).await.unwrap();
        assert_eq!(result, ToolResult::ok("abab"));
    }

    #[test]
    fn schema_accepts_valid_payload() {
        let schema = fs_write_schema();
        assert!(schema.validate(&json!({"path": "a.txt", "content": ""})).is_ok());
        assert!(schema.validate(&json!({"path": "a.txt", "content": "x", "mode": null})).is_ok());
        assert!(schema.validate(&json!({"path": "a", "content": "x", "flags": ["-v"]})).is_ok());
    }

    #[test]
    fn schema_names_missing_field() {
        let err = fs_write_schema().validate(&json!({"path": "a.txt"})).unwrap_err();
        assert_eq!(err, "missing required field 'content'");
    }

    #[test]
    fn schema_rejects_unknown_field() {
        let err = fs_write_schema()
            .validate(&json!({"path": "a", "content": "b", "force": true}))
            .unwrap_err();
        assert_eq!(err, "unknown field 'force'");
    }

    #[test]
    fn schema_rejects_type_mismatch() {
        let err = fs_write_schema()
            .validate(&json!({"path": 7, "content": "b"}))
            .unwrap_err();
        assert_eq!(err, "field 'path' must be a string");

        let err = fs_write_schema()
            .validate(&json!({"path": "a", "content": "b", "flags": ["ok", 1]}))
            .unwrap_err();
        assert_eq!(err, "field 'flags' must be a list of strings");
    }

    #[test]
    fn schema_rejects_non_object() {
        assert!(fs_write_schema().validate(&json!(["a.txt"])).is_err());
    }

    #[test]
    fn integer_kind_rejects_floats() {
        let schema = ArgSchema::new().optional("start", ArgKind::Integer, "line");
        assert!(schema.validate(&json!({"start": -2})).is_ok());
        assert!(schema.validate(&json!({"start": 1.5})).is_err());
    }
}
