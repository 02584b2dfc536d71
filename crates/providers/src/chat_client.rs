//! HTTP client for OpenAI-style chat-completion endpoints.
//!
//! Two endpoint flavours are supported:
//! - first-party (`api.openai.com`): bearer token, model name required
//! - gateway (Azure-style deployments): `api-key` header, the deployment
//!   picks the model, so `model` may be sent as null
//!
//! One request per call, no streaming, no retries.

use async_trait::async_trait;
use parlance_config::{AppConfig, EndpointKindSetting};
use parlance_core::error::ProviderError;
use parlance_core::function::FunctionDescriptor;
use parlance_core::message::{Message, Role, ToolCall, Usage};
use parlance_core::model::ChatModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const FIRST_PARTY_HOST: &str = "api.openai.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How the client authenticates and whether it must name a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    FirstParty,
    Gateway,
}

impl EndpointKind {
    /// Classify an endpoint URL.
    pub fn detect(endpoint: &str) -> Self {
        if endpoint.contains(FIRST_PARTY_HOST) {
            Self::FirstParty
        } else {
            Self::Gateway
        }
    }

    fn resolve(setting: EndpointKindSetting, endpoint: &str) -> Self {
        match setting {
            EndpointKindSetting::Auto => Self::detect(endpoint),
            EndpointKindSetting::FirstParty => Self::FirstParty,
            EndpointKindSetting::Gateway => Self::Gateway,
        }
    }
}

/// A chat-completion client bound to one endpoint.
pub struct ChatClient {
    endpoint: String,
    api_key: String,
    model: Option<String>,
    kind: EndpointKind,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("kind", &self.kind)
            .finish()
    }
}

impl ChatClient {
    /// Create a client, detecting the endpoint kind from the URL.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let endpoint = endpoint.into();
        let kind = EndpointKind::detect(&endpoint);
        Self::with_kind(endpoint, api_key, model, kind, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit endpoint kind and request timeout.
    pub fn with_kind(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: Option<String>,
        kind: EndpointKind,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let endpoint = endpoint.into();

        if kind == EndpointKind::FirstParty && model.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "a model name is required for {endpoint}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            model,
            kind,
            client,
        })
    }

    /// Build a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key set (config api_key, PARLANCE_API_KEY or OPENAI_API_KEY)".into(),
            )
        })?;

        Self::with_kind(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            EndpointKind::resolve(config.endpoint_kind, &config.endpoint),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
                name: m.name.as_deref(),
                tool_call_id: m.tool_call_id.as_deref(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    fn to_api_tools(functions: &[FunctionDescriptor]) -> Vec<ApiToolDefinition<'_>> {
        functions
            .iter()
            .map(|f| ApiToolDefinition {
                r#type: "function",
                function: f,
            })
            .collect()
    }

    fn decode(body: &str) -> Result<Message, ProviderError> {
        let malformed = |reason: String| ProviderError::MalformedResponse {
            reason,
            body: body.to_string(),
        };

        let api_response: ApiResponse =
            serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| malformed("response contained no choices".into()))?;

        if let Some(role) = choice.message.role.filter(|r| *r != Role::Assistant) {
            return Err(malformed(format!("expected an assistant reply, got role {role}")));
        }

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let mut message = Message::assistant(choice.message.content.unwrap_or_default())
            .with_tool_calls(tool_calls);
        message.usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        Ok(message)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    fn name(&self) -> &str {
        match self.kind {
            EndpointKind::FirstParty => "openai",
            EndpointKind::Gateway => "gateway",
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDescriptor],
    ) -> Result<Message, ProviderError> {
        let body = ApiRequest {
            model: self.model.as_deref(),
            messages: Self::to_api_messages(messages),
            tools: Self::to_api_tools(functions),
        };

        debug!(
            endpoint = %self.endpoint,
            model = self.model.as_deref().unwrap_or("<deployment>"),
            messages = messages.len(),
            tools = functions.len(),
            "Sending completion request"
        );

        let request = self.client.post(&self.endpoint).json(&body);
        let request = match self.kind {
            EndpointKind::FirstParty => request.bearer_auth(&self.api_key),
            EndpointKind::Gateway => request.header("api-key", &self.api_key),
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "Endpoint returned error");
            return Err(ProviderError::Status {
                status_code: status.as_u16(),
                body: text,
            });
        }

        let message = Self::decode(&text)?;
        debug!(
            tool_calls = message.tool_calls.len(),
            usage = ?message.usage,
            "Completion received"
        );
        Ok(message)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

// --- Wire types (internal) ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    /// Serialized as null when unset; gateways pick the model from the URL.
    model: Option<&'a str>,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiToolDefinition<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct ApiToolDefinition<'a> {
    r#type: &'static str,
    function: &'a FunctionDescriptor,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    role: Option<Role>,
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
