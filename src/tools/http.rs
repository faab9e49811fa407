use super::{InvocationError, ToolInvoker, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Request timeout for external API calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Error bodies are truncated to this many bytes before being surfaced.
const MAX_ERROR_BODY_BYTES: usize = 2_048;

/// Invoker that turns a registered tool call into an HTTP request against the
/// external API: the `path` parameter group fills `{placeholder}` segments of
/// the endpoint's path template, the `query` group becomes the query string,
/// and the API key is appended when configured.
pub struct HttpInvoker {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    registry: Arc<ToolRegistry>,
}

impl HttpInvoker {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            registry,
        }
    }
}

#[async_trait]
impl ToolInvoker for HttpInvoker {
    async fn invoke(&self, tool: &str, parameters: Value) -> Result<Value, InvocationError> {
        let spec = self
            .registry
            .get(tool)
            .ok_or_else(|| InvocationError::UnknownTool {
                name: tool.to_string(),
            })?;

        if spec.method != "GET" {
            return Err(InvocationError::Transport(format!(
                "unsupported method {} for tool {tool}",
                spec.method
            )));
        }

        let path = fill_path(&spec.path, parameters.get("path"))?;
        let url = format!("{}{}", self.base_url, path);

        let mut query = collect_query(parameters.get("query"));
        if let Some(ref key) = self.api_key {
            query.push(("api_key".to_string(), key.clone()));
        }

        tracing::debug!(tool, %url, "invoking external api");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| InvocationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_at_boundary(&mut body, MAX_ERROR_BODY_BYTES);
            return Err(InvocationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InvocationError::Transport(format!("invalid JSON response: {e}")))
    }
}

/// Substitute `{name}` segments of a path template from the `path` parameter
/// group. An unfilled placeholder is an invocation failure here rather than an
/// opaque 404 from the server.
fn fill_path(template: &str, path_params: Option<&Value>) -> Result<String, InvocationError> {
    let params = path_params.and_then(Value::as_object);

    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            filled.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = &after[..close];
        let value = params.and_then(|p| p.get(name)).ok_or_else(|| {
            InvocationError::Transport(format!("missing path parameter {name}"))
        })?;
        filled.push_str(&render_scalar(value));
        rest = &after[close + 1..];
    }
    filled.push_str(rest);
    Ok(filled)
}

fn collect_query(query_params: Option<&Value>) -> Vec<(String, String)> {
    query_params
        .and_then(Value::as_object)
        .map(|params| {
            params
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), render_scalar(v)))
                .collect()
        })
        .unwrap_or_default()
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_at_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
