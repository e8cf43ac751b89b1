use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use adkit_core::{
    AdkError, Content, FunctionResponse, LlmProvider, LlmRequest, LlmResponse, Part, Role,
    ToolCall, ToolDeclaration,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER_NAME: &str = "gemini";

/// Google Gemini `generateContent` REST provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn to_wire_part(part: &Part) -> WirePart {
    match part {
        Part::Text(text) => WirePart {
            text: Some(text.clone()),
            ..Default::default()
        },
        Part::FunctionCall(call) => WirePart {
            function_call: Some(WireFunctionCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.arguments.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionResponse(resp) => {
            // The API only accepts a JSON object here.
            let response = match &resp.response {
                Value::Object(_) => resp.response.clone(),
                other => serde_json::json!({ "result": other }),
            };
            WirePart {
                function_response: Some(WireFunctionResponse {
                    id: resp.id.clone(),
                    name: resp.name.clone(),
                    response,
                }),
                ..Default::default()
            }
        }
    }
}

fn to_wire_content(content: &Content) -> WireContent {
    WireContent {
        role: Some(wire_role(content.role).to_string()),
        parts: content.parts.iter().map(to_wire_part).collect(),
    }
}

fn to_wire_declaration(decl: &ToolDeclaration) -> WireFunctionDeclaration {
    // An object schema without properties is rejected, so omit it entirely.
    let has_properties = decl
        .parameters
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty());
    WireFunctionDeclaration {
        name: decl.name.clone(),
        description: decl.description.clone(),
        parameters: has_properties.then(|| decl.parameters.clone()),
    }
}

fn to_wire_request(request: &LlmRequest) -> GenerateContentRequest {
    let system_instruction = request
        .system_instruction
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .map(|text| WireContent {
            role: None,
            parts: vec![WirePart {
                text: Some(text.clone()),
                ..Default::default()
            }],
        });

    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![WireTool {
            function_declarations: request.tools.iter().map(to_wire_declaration).collect(),
        }]
    };

    let generation_config =
        (request.temperature.is_some() || request.max_output_tokens.is_some()).then(|| {
            GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            }
        });

    GenerateContentRequest {
        contents: request.contents.iter().map(to_wire_content).collect(),
        system_instruction,
        tools,
        generation_config,
    }
}

fn from_wire_content(content: WireContent) -> Content {
    let role = match content.role.as_deref() {
        Some("user") => Role::User,
        _ => Role::Model,
    };
    let parts = content
        .parts
        .into_iter()
        .filter_map(|part| {
            if let Some(call) = part.function_call {
                Some(Part::FunctionCall(ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments: call.args,
                }))
            } else if let Some(resp) = part.function_response {
                Some(Part::FunctionResponse(FunctionResponse {
                    id: resp.id,
                    name: resp.name,
                    response: resp.response,
                }))
            } else {
                part.text.map(Part::Text)
            }
        })
        .collect();
    Content { role, parts }
}

fn llm_error(message: impl Into<String>) -> AdkError {
    AdkError::LlmError {
        provider: PROVIDER_NAME.to_string(),
        message: message.into(),
    }
}

/// Extract the first candidate's turn, its finish reason and the token count.
fn from_wire_response(
    response: GenerateContentResponse,
) -> Result<(Content, Option<String>, u64), AdkError> {
    let tokens_used = response
        .usage_metadata
        .and_then(|u| u.total_token_count)
        .unwrap_or(0);

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(llm_error(format!("empty response: {reason}")));
    };

    let content = candidate
        .content
        .map(from_wire_content)
        .unwrap_or_else(|| Content::new(Role::Model, Vec::new()));
    Ok((content, candidate.finish_reason, tokens_used))
}

fn describe_error_body(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{status} {code}: {}", envelope.error.message),
            None => format!("{status}: {}", envelope.error.message),
        },
        Err(_) => format!("{status}: {body}"),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AdkError> {
        let start = Instant::now();
        let body = to_wire_request(request);

        debug!(
            model = %request.model,
            contents = body.contents.len(),
            tools = request.tools.len(),
            "Sending request to Gemini"
        );

        let mut builder = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| llm_error(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(llm_error(describe_error_body(status, &error_body)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| llm_error(format!("failed to parse response: {e}")))?;

        let (content, finish_reason, tokens_used) = from_wire_response(parsed)?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!(
            model = %request.model,
            tokens = tokens_used,
            latency_ms,
            finish_reason = ?finish_reason,
            "Gemini responded"
        );

        Ok(LlmResponse {
            content,
            provider: PROVIDER_NAME.to_string(),
            model: request.model.clone(),
            finish_reason,
            tokens_used,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> LlmRequest {
        let mut request = LlmRequest::new(
            "gemini-2.0-flash",
            vec![
                Content::user_text("What time is it?"),
                Content::new(
                    Role::Model,
                    vec![Part::FunctionCall(ToolCall::from_json(
                        "get_current_time",
                        json!({"utc_offset_hours": 2}),
                    ))],
                ),
                Content::new(
                    Role::User,
                    vec![Part::FunctionResponse(FunctionResponse {
                        id: None,
                        name: "get_current_time".into(),
                        response: json!({"status": "success", "time": "12:00"}),
                    })],
                ),
            ],
        );
        request.system_instruction = Some("You tell the time.".into());
        request.tools = vec![
            ToolDeclaration {
                name: "get_current_time".into(),
                description: "Current time".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"utc_offset_hours": {"type": "number"}}
                }),
            },
            ToolDeclaration {
                name: "exit_loop".into(),
                description: "Stop".into(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        ];
        request.temperature = Some(0.5);
        request
    }

    #[test]
    fn test_request_wire_shape() {
        let wire = serde_json::to_value(to_wire_request(&sample_request())).unwrap();

        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "You tell the time.");
        assert!(wire["systemInstruction"].get("role").is_none());
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(
            wire["contents"][1]["parts"][0]["functionCall"],
            json!({"name": "get_current_time", "args": {"utc_offset_hours": 2}})
        );
        assert_eq!(
            wire["contents"][2]["parts"][0]["functionResponse"]["response"]["time"],
            "12:00"
        );
        let decls = &wire["tools"][0]["functionDeclarations"];
        assert_eq!(decls[0]["parameters"]["type"], "object");
        assert!(decls[1].get("parameters").is_none());
        assert_eq!(wire["generationConfig"], json!({"temperature": 0.5}));
    }

    #[test]
    fn test_request_omits_empty_sections() {
        let request = LlmRequest::new("gemini-2.0-flash", vec![Content::user_text("hi")]);
        let wire = serde_json::to_value(to_wire_request(&request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("systemInstruction").is_none());
        assert!(wire.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_with_function_call() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me check."},
                    {"functionCall": {"name": "calculate", "args": {"a": 1, "b": 2, "operation": "add"}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 5, "totalTokenCount": 17}
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let (content, finish, tokens) = from_wire_response(parsed).unwrap();

        assert_eq!(content.role, Role::Model);
        assert_eq!(content.text(), "Let me check.");
        let calls = content.function_calls();
        assert_eq!(calls[0].name, "calculate");
        assert_eq!(calls[0].arguments["b"], json!(2));
        assert_eq!(finish.as_deref(), Some("STOP"));
        assert_eq!(tokens, 17);
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let err = from_wire_response(parsed).err().unwrap();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_error_body_description() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let msg = describe_error_body(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(msg.contains("INVALID_ARGUMENT"));
        assert!(msg.contains("API key not valid"));

        let msg = describe_error_body(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(msg.contains("upstream down"));
    }

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let provider = GeminiProvider::new("k").with_base_url("http://localhost:9/v1beta/");
        assert_eq!(
            provider.endpoint("models/gemini-2.0-flash"),
            "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
