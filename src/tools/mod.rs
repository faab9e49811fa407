mod http;

pub use http::HttpInvoker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Capability catalog shipped with the binary. The registry is built from it
/// once at startup; tool names in plans are resolved against it.
const CATALOG: &str = include_str!("catalog.json");

/// Description of one external API endpoint exposed to the planner as a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    api: String,
    endpoints: Vec<ToolSpec>,
}

/// Registry mapping a stable tool identifier to its parameter schema and
/// invocation shape.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    api: String,
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolRegistry {
    /// Build the registry from the embedded capability catalog.
    pub fn from_catalog() -> anyhow::Result<Self> {
        let catalog: Catalog =
            serde_json::from_str(CATALOG).map_err(|e| anyhow::anyhow!("invalid catalog: {e}"))?;
        Ok(Self::from_specs(catalog.api, catalog.endpoints))
    }

    pub fn from_specs(api: impl Into<String>, specs: Vec<ToolSpec>) -> Self {
        Self {
            api: api.into(),
            tools: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One documentation chunk per endpoint, the text the retrieval index is
    /// built over and the planner prompt quotes from.
    pub fn documentation(&self) -> Vec<String> {
        self.tools.values().map(render_doc).collect()
    }
}

fn render_doc(spec: &ToolSpec) -> String {
    let mut doc = format!(
        "{} — {} {}\n{}\n",
        spec.name, spec.method, spec.path, spec.description
    );

    for group in ["path", "query"] {
        let Some(params) = spec.parameters.get(group).and_then(|v| v.as_object()) else {
            continue;
        };
        if params.is_empty() {
            continue;
        }
        doc.push_str(group);
        doc.push_str(" parameters:\n");
        for (name, schema) in params {
            let required = schema
                .get("required")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let description = schema
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("");
            let marker = if required { " (required)" } else { "" };
            doc.push_str(&format!("  {name}{marker}: {description}\n"));
        }
    }

    doc
}

// ─── Invocation seam ─────────────────────────────────────────────────────────

/// An external tool call's failure, carrying a status-like code where the
/// transport produced one. Wrapped as the cause of an execution error by the
/// plan executor.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("tool {name} not found")]
    UnknownTool { name: String },

    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),
}

/// Tool Invocation collaborator: given a tool name and interpolated
/// parameters, perform the call and return the JSON result.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        tool: &str,
        parameters: serde_json::Value,
    ) -> Result<serde_json::Value, InvocationError>;
}
