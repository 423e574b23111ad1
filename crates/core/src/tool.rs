//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: evaluate an
//! expression, read a file, query a service. Each tool declares a typed
//! [`ParameterSchema`]; the [`ToolRegistry`] validates parsed arguments
//! against it before the tool ever runs, and converts every failure mode
//! (unknown name, bad arguments, error return, panic) into a [`ToolError`].

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ToolError;

/// Named arguments passed to a tool.
pub type ToolArguments = Map<String, Value>;

/// The JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
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

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// The typed parameter list of a tool, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    params: BTreeMap<String, ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter.
    pub fn required(mut self, name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind,
                required: true,
                description: description.into(),
            },
        );
        self
    }

    /// Declare an optional parameter.
    pub fn optional(mut self, name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind,
                required: false,
                description: description.into(),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// Missing required parameters and type mismatches are rejected.
    /// Undeclared extra arguments are passed through untouched.
    pub fn validate(&self, arguments: &ToolArguments) -> std::result::Result<(), ToolError> {
        for (name, spec) in &self.params {
            match arguments.get(name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required parameter '{name}'"
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "parameter '{name}' expected {}, got {}",
                        spec.kind.as_str(),
                        json_type_name(value)
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    json!({ "type": spec.kind.as_str(), "description": spec.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Name, description and parameters of a tool, as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// A request to execute a tool, parsed from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: ToolArguments,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Structured output on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The JSON form folded into the conversation as an observation.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("success".into(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            object.insert("data".into(), data.clone());
        }
        if let Some(error) = &self.error {
            object.insert("error".into(), Value::String(error.clone()));
        }
        Value::Object(object)
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::failure(err.to_string())
    }
}

/// The core Tool trait.
///
/// Each tool implements this trait and is registered in a [`ToolRegistry`].
/// `execute` only ever sees arguments that passed `parameters().validate`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (shown to the model).
    fn description(&self) -> &str;

    /// The typed parameters this tool accepts.
    fn parameters(&self) -> ParameterSchema;

    /// Execute the tool with validated arguments.
    async fn execute(&self, arguments: ToolArguments) -> std::result::Result<ToolResult, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// A registry of available tools, ordered by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register a tool, replacing any existing tool with the same name.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().to_string(), tool)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// Get a tool by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }

    /// Look up, validate and run a tool call.
    ///
    /// A panic inside the tool is caught here and reported as
    /// [`ToolError::Panicked`]; it never unwinds into the caller.
    pub async fn invoke(&self, invocation: &ToolInvocation) -> std::result::Result<ToolResult, ToolError> {
        let name = invocation.tool_name.as_str();
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tool.parameters().validate(&invocation.arguments)?;

        debug!(tool = %name, "Executing tool");
        match AssertUnwindSafe(tool.execute(invocation.arguments.clone()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => Err(ToolError::Panicked {
                tool_name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::new()
                .required("text", ParamType::String, "Text to echo")
                .optional("times", ParamType::Integer, "Repeat count")
        }
        async fn execute(&self, arguments: ToolArguments) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            let times = arguments.get("times").and_then(Value::as_u64).unwrap_or(1) as usize;
            Ok(ToolResult::success(json!(text.repeat(times))))
        }
    }

    struct PanickyTool;

    #[async_trait]
    impl Tool for PanickyTool {
        fn name(&self) -> &str {
            "panicky"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::new()
        }
        async fn execute(&self, _arguments: ToolArguments) -> std::result::Result<ToolResult, ToolError> {
            panic!("boom");
        }
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("Echo").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_rejects_duplicate_register_but_insert_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::AlreadyRegistered(ref n) if n == "echo"));

        assert!(registry.insert(Arc::new(EchoTool)).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("echo").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn schema_validation() {
        let schema = EchoTool.parameters();
        assert!(schema.validate(&args(json!({"text": "hi"}))).is_ok());
        assert!(schema.validate(&args(json!({"text": "hi", "extra": true}))).is_ok());

        let err = schema.validate(&args(json!({}))).unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'text'"));

        let err = schema.validate(&args(json!({"text": 5}))).unwrap_err();
        assert!(err.to_string().contains("expected string, got number"));

        let err = schema.validate(&args(json!({"text": "a", "times": 1.5}))).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn schema_renders_json_schema() {
        let schema = EchoTool.parameters().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], json!(["text"]));
    }

    #[test]
    fn tool_result_json_shape() {
        let ok = ToolResult::success(json!({"result": 4}));
        assert_eq!(ok.to_json(), json!({"success": true, "data": {"result": 4}}));
        assert_eq!(serde_json::to_value(&ok).unwrap(), ok.to_json());

        let failed = ToolResult::failure("nope");
        assert_eq!(failed.to_json(), json!({"success": false, "error": "nope"}));
    }

    #[tokio::test]
    async fn registry_invoke_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let call = ToolInvocation::new("echo", args(json!({"text": "ab", "times": 2})));
        let result = registry.invoke(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data, Some(json!("abab")));
    }

    #[tokio::test]
    async fn registry_invoke_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolInvocation::new("nonexistent", ToolArguments::new());
        let err = registry.invoke(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn registry_invoke_rejects_bad_arguments_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let call = ToolInvocation::new("echo", args(json!({"text": []})));
        let err = registry.invoke(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn registry_invoke_contains_panics() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(PanickyTool)).unwrap();
        let call = ToolInvocation::new("panicky", ToolArguments::new());
        let err = registry.invoke(&call).await.unwrap_err();
        match err {
            ToolError::Panicked { tool_name, message } => {
                assert_eq!(tool_name, "panicky");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
