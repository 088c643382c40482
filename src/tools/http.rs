// src/tools/http.rs

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::config::model::ToolEndpoint;
use crate::errors::ToolError;
use crate::tools::{ToolCall, ToolInvoker, ToolKind};
use crate::types::BoxFuture;

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    api_key: Option<String>,
}

/// Production [`ToolInvoker`]: POSTs the call's JSON arguments to the
/// endpoint configured for its tool and returns the JSON response body.
///
/// API keys are read once, at construction, from the environment variable
/// named in the tool's `api_key_env`.
#[derive(Debug, Clone)]
pub struct HttpToolInvoker {
    http: reqwest::Client,
    endpoints: HashMap<ToolKind, Endpoint>,
}

impl HttpToolInvoker {
    pub fn new(endpoints: &HashMap<ToolKind, ToolEndpoint>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("building HTTP client for tool invoker")?;

        let endpoints = endpoints
            .iter()
            .map(|(kind, ep)| {
                let api_key = ep
                    .api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty());
                (
                    *kind,
                    Endpoint {
                        url: ep.url.clone(),
                        api_key,
                    },
                )
            })
            .collect();

        Ok(Self { http, endpoints })
    }

    async fn post(&self, endpoint: &Endpoint, call: &ToolCall) -> Result<Value, ToolError> {
        debug!(tool = %call.kind(), url = %endpoint.url, "invoking tool endpoint");

        let mut req = self.http.post(&endpoint.url).json(&call.to_args());
        if let Some(key) = &endpoint.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        resp.json::<Value>().await.map_err(transport_error)
    }
}

impl ToolInvoker for HttpToolInvoker {
    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let endpoint = self
                .endpoints
                .get(&call.kind())
                .ok_or(ToolError::NotConfigured(call.kind()))?;
            self.post(endpoint, call).await
        })
    }
}

fn transport_error(err: reqwest::Error) -> ToolError {
    ToolError::Transport(err.to_string())
}

fn preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
