//! Web search tool backed by the DuckDuckGo HTML endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Tool;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

/// Search the web. The input is the query text.
pub struct WebSearch {
    max_results: usize,
}

impl WebSearch {
    pub fn new() -> Self {
        Self { max_results: 5 }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for WebSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. The input is a search query. Returns titles, snippets and URLs."
    }

    async fn call(&self, cancel: &CancellationToken, input: &str) -> anyhow::Result<String> {
        let query = input.trim();
        if query.is_empty() {
            return Err(anyhow::anyhow!("Missing search query"));
        }

        let url = format!("{}?q={}", SEARCH_URL, urlencoding::encode(query));

        let html = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(anyhow::anyhow!("Search cancelled")),
            html = fetch_html(&url) => html?,
        };

        let results = extract_results(&html, self.max_results);
        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

async fn fetch_html(url: &str) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (compatible; ToolLoop/0.1)")
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("HTTP error: {}", status));
    }
    Ok(response.text().await?)
}

/// Pull title, snippet and URL out of each result block.
///
/// Result blocks carry `result__body` as the last of several classes.
fn extract_results(html: &str, max_results: usize) -> Vec<String> {
    html.split("result__body\"")
        .skip(1)
        .filter_map(|chunk| {
            let title = inner_text_after(chunk, "class=\"result__a\"")?;
            if title.is_empty() {
                return None;
            }
            let snippet = inner_text_after(chunk, "class=\"result__snippet\"").unwrap_or("");
            let url = inner_text_after(chunk, "class=\"result__url\"")
                .map(str::trim)
                .unwrap_or("");
            Some(format!(
                "{}\n{}\nURL: {}",
                html_decode(title),
                html_decode(snippet),
                url
            ))
        })
        .take(max_results)
        .collect()
}

/// Text between the `>` that closes the tag carrying `marker` and the next `<`.
fn inner_text_after<'a>(chunk: &'a str, marker: &str) -> Option<&'a str> {
    chunk
        .split(marker)
        .nth(1)
        .and_then(|s| s.split('>').nth(1))
        .and_then(|s| s.split('<').next())
}

fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
