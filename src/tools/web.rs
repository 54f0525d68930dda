//! Web access tools: search and page fetch.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::Tool;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; b-agent/1.0)";

static NOISE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<nav\b.*?</nav>|<footer\b.*?</footer>|<!--.*?-->")
        .unwrap()
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Search the web via DuckDuckGo's HTML endpoint (no API key needed).
pub struct SearchWeb;

#[async_trait]
impl Tool for SearchWeb {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information on a topic. Use this when the user asks a question that requires up-to-date or external information."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                },
                "num_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let num_results = args["num_results"].as_u64().unwrap_or(3) as usize;

        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );

        let response = http_client(Duration::from_secs(10))?
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;

        let results = extract_ddg_results(&html, num_results);
        if results.is_empty() {
            Ok("No results found.".to_string())
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Pull title, link and snippet out of DuckDuckGo result markup.
fn extract_ddg_results(html: &str, limit: usize) -> Vec<String> {
    html.split("class=\"result__body\"")
        .skip(1)
        .filter_map(|chunk| {
            let title = inner_text_after(chunk, "class=\"result__a\"")?;
            if title.is_empty() {
                return None;
            }
            let snippet = inner_text_after(chunk, "class=\"result__snippet\"").unwrap_or_default();
            let link = inner_text_after(chunk, "class=\"result__url\"").unwrap_or_default();
            Some(format!("- {}\n  URL: {}\n  {}", title, link, snippet))
        })
        .take(limit)
        .collect()
}

/// Text of the element whose opening tag contains `marker`.
fn inner_text_after(chunk: &str, marker: &str) -> Option<String> {
    let rest = chunk.split(marker).nth(1)?;
    let body = &rest[rest.find('>')? + 1..];
    let end = body.find("</a>").or_else(|| body.find("</"))?;
    Some(collapse_whitespace(&html_decode(&TAGS.replace_all(&body[..end], ""))))
}

/// Fetch a page and return its readable text.
pub struct FetchPage;

#[async_trait]
impl Tool for FetchPage {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Fetch and read the text content of a web page given its URL."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL of the web page to read."
                },
                "max_chars": {
                    "type": "integer",
                    "description": "Maximum characters to return (default: 3000)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'url' argument"))?;
        let max_chars = args["max_chars"].as_u64().unwrap_or(3000) as usize;

        let response = http_client(Duration::from_secs(10))?.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("HTTP error: {}", status));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));
        let body = response.text().await?;

        let text = if is_html {
            extract_text_from_html(&body)
        } else {
            body
        };

        Ok(super::truncate_chars(&text, max_chars, "\n... [truncated]"))
    }
}

/// Readable text from HTML, without scripts, styles or page chrome.
fn extract_text_from_html(html: &str) -> String {
    let without_noise = NOISE_BLOCKS.replace_all(html, " ");
    let without_tags = TAGS.replace_all(&without_noise, " ");
    collapse_whitespace(&html_decode(&without_tags))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_text_drops_scripts_and_chrome() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script type="text/javascript">var x = "<p>";</script></head>
            <body><nav><a href="/">Home</a></nav>
            <h1>Title</h1><p>Fish &amp; chips</p>
            <footer>© 2024</footer></body></html>"#;
        assert_eq!(extract_text_from_html(html), "Title Fish & chips");
    }

    #[test]
    fn ddg_results_are_extracted_and_limited() {
        let result = |title: &str, url: &str, snippet: &str| {
            format!(
                r#"<div class="result__body"><h2 class="result__title"><a rel="nofollow" class="result__a" href="//x">{title}</a></h2>
                <a class="result__snippet" href="//x">{snippet}</a>
                <a class="result__url" href="//x"> {url} </a></div>"#
            )
        };
        let html = format!(
            "<html>{}{}{}</html>",
            result("Tokio <b>docs</b>", "tokio.rs", "An async runtime &amp; more"),
            result("Second", "example.com", "two"),
            result("Third", "example.org", "three"),
        );

        let results = extract_ddg_results(&html, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            "- Tokio docs\n  URL: tokio.rs\n  An async runtime & more"
        );
        assert!(results[1].starts_with("- Second"));
    }

    #[test]
    fn ddg_without_results_is_empty() {
        assert!(extract_ddg_results("<html>nothing here</html>", 3).is_empty());
    }
}
