//! Generic HTTP API request tool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use super::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_TEXT_BODY_CHARS: usize = 2000;

/// Make an HTTP request to an external API.
pub struct ApiRequest;

#[async_trait]
impl Tool for ApiRequest {
    fn name(&self) -> &str {
        "api_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request to an external API (GET, POST, etc.)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The API endpoint URL."
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method: GET, POST, PUT, DELETE.",
                    "default": "GET"
                },
                "headers": {
                    "type": "object",
                    "description": "Optional HTTP headers as key-value pairs."
                },
                "body": {
                    "type": "object",
                    "description": "Optional JSON body for POST/PUT requests."
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 15)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let url = parse_http_url(
            args["url"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'url' argument"))?,
        )?;
        let method = parse_method(args["method"].as_str().unwrap_or("GET"))?;
        let timeout = Duration::from_secs(args["timeout_secs"].as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS));

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let mut request = client.request(method, url);

        if let Some(headers) = args["headers"].as_object() {
            for (name, value) in headers {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                request = request.header(name.as_str(), value);
            }
        }
        if !args["body"].is_null() {
            request = request.json(&args["body"]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("API request failed: {}", e))?;
        let status = response.status();
        let text = response.text().await?;

        Ok(format!("Status: {}\n\n{}", status.as_u16(), render_body(&text)))
    }
}

fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid URL {:?}: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow::anyhow!("Unsupported URL scheme: {}", other)),
    }
}

fn parse_method(raw: &str) -> anyhow::Result<Method> {
    Method::from_bytes(raw.trim().to_uppercase().as_bytes())
        .map_err(|_| anyhow::anyhow!("Invalid HTTP method: {}", raw))
}

/// Pretty-print JSON bodies; cut anything else short.
fn render_body(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(data) => serde_json::to_string_pretty(&data).unwrap_or_else(|_| text.to_string()),
        Err(_) => super::truncate_chars(text, MAX_TEXT_BODY_CHARS, ""),
    }
}
