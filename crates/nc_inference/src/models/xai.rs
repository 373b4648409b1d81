//! Chat-completions adapter for the xAI API.
//!
//! One call per batch. The reply must be the bare JSON document described in
//! the prompt; anything else (code fences included) is a parse failure. No
//! retries happen here, the pipeline owns that policy.

use std::fmt;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use indexmap::IndexMap;
use nc_core::{Error, NarrativeMap, Result, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use crate::util::truncate_for_log;
use crate::Config;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// The document the model is told to return. Echoed articles are ignored.
#[derive(Deserialize)]
struct SummaryReply {
    #[serde(rename = "validNarratives")]
    valid_narratives: IndexMap<String, ReplyNarrative>,
}

#[derive(Deserialize)]
struct ReplyNarrative {
    summary: String,
}

pub struct XaiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model_name: String,
    max_output_tokens: u32,
    timeout: Duration,
}

impl XaiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "xAI API key is not set. Set XAI_API_KEY or pass --api-key".to_string(),
                )
            })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        let body = if e.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else {
            e.to_string()
        };
        Error::UpstreamRequest { status: None, body }
    }
}

impl fmt::Debug for XaiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

pub(crate) fn build_prompt(batch: &NarrativeMap) -> Result<String> {
    let narratives = serde_json::to_string_pretty(batch)?;
    Ok(format!(
        r#"I have a JSON collection of "narratives" that have been identified as valid, meaning their articles discuss the same general subject. Each narrative has a key (the category name) and a value holding at least 2 news articles with their titles, URLs, sources and content. Your task is to:

1. For each narrative, write a neutral summary that captures the core topic and key points from all of its articles. Balance the perspectives of every article so the summary stays unbiased even when individual articles are biased.
2. Return the results as pure JSON (no Markdown, no code blocks, do not wrap the JSON in ```json or any other formatting) with exactly this structure, using the same category keys:
   {{
       "validNarratives": {{
           "Category": {{
               "articles": [
                   {{ "title": "...", "url": "...", "source": "...", "content": "..." }}
               ],
               "summary": "Neutral summary..."
           }}
       }}
   }}

Here are the valid narratives:

{}

Return the results with summaries in pure JSON format."#,
        narratives
    ))
}

fn extract_content(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        Error::UpstreamResponseShape(format!("response body is not a chat completion: {}", e))
    })?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            Error::UpstreamResponseShape(format!(
                "no message content in response: {}",
                truncate_for_log(body, 500)
            ))
        })
}

fn parse_reply(content: &str) -> Result<SummaryReply> {
    serde_json::from_str(content).map_err(|e| Error::UpstreamParse {
        message: e.to_string(),
        raw: content.to_string(),
    })
}

/// Pair reply summaries with the batch's own narratives.
fn assign_summaries(batch: &NarrativeMap, reply: SummaryReply) -> NarrativeMap {
    let mut replies = reply.valid_narratives;

    // a lone narrative may come back under a reworded key
    if let (1, Some((category, _))) = (replies.len(), batch.first()) {
        if batch.len() == 1 && !replies.contains_key(category) {
            if let Some((returned, narrative)) = replies.pop() {
                debug!(%category, %returned, "Accepting renamed category for single-entry batch");
                replies.insert(category.clone(), narrative);
            }
        }
    }

    let mut summarized = NarrativeMap::with_capacity(batch.len());
    for (category, narrative) in batch {
        match replies.shift_remove(category) {
            Some(reply) if !reply.summary.trim().is_empty() => {
                let mut narrative = narrative.clone();
                narrative.summary = Some(reply.summary.trim().to_string());
                summarized.insert(category.clone(), narrative);
            }
            Some(_) => warn!(%category, "Model returned a blank summary"),
            None => warn!(%category, "Model reply is missing a category"),
        }
    }
    for extra in replies.keys() {
        warn!(category = %extra, "Ignoring category the batch did not ask for");
    }
    summarized
}

#[async_trait]
impl Summarizer for XaiModel {
    fn name(&self) -> &str {
        "xAI"
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model_name, narratives = batch.len()))]
    async fn summarize_batch(&self, batch: &NarrativeMap) -> Result<NarrativeMap> {
        let request = ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(batch)?,
            }],
            max_tokens: self.max_output_tokens,
            temperature: 0.0,
            stream: false,
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.is_success() {
            error!(status = status.as_u16(), elapsed_ms, body = %truncate_for_log(&body, 500), "Summarization request failed");
            return Err(Error::UpstreamRequest {
                status: Some(status.as_u16()),
                body,
            });
        }
        info!(elapsed_ms, "Summarization response received");

        let content = extract_content(&body)?;
        debug!(content = %truncate_for_log(&content, 1000), "Raw summarization content");
        let reply = parse_reply(&content).map_err(|e| {
            error!(error = %e, content = %truncate_for_log(&content, 500), "Summarization reply is not valid JSON");
            e
        })?;
        Ok(assign_summaries(batch, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_core::{Article, Narrative};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> Config {
        Config {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    fn batch(categories: &[&str]) -> NarrativeMap {
        categories
            .iter()
            .map(|category| {
                let narrative = Narrative::new(vec![
                    Article::new(format!("{} one", category), "https://www.cnn.com/politics/1", "cnn"),
                    Article::new(format!("{} two", category), "https://www.foxnews.com/politics/2", "fox"),
                ]);
                (category.to_string(), narrative)
            })
            .collect()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn test_summaries_are_assigned_to_batch_narratives() {
        let server = MockServer::start().await;
        let reply = json!({
            "validNarratives": {
                "election_senate": {
                    "articles": [{ "title": "rewritten by the model" }],
                    "summary": "  Lawmakers in both chambers advanced election measures.  "
                },
                "unrequested": { "articles": [], "summary": "should be ignored" }
            }
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "grok-2", "max_tokens": 4096, "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let model = XaiModel::new(&config(&server)).unwrap();
        let input = batch(&["election_senate"]);
        let result = model.summarize_batch(&input).await.unwrap();

        assert_eq!(result.len(), 1);
        let narrative = &result["election_senate"];
        assert_eq!(
            narrative.summary.as_deref(),
            Some("Lawmakers in both chambers advanced election measures.")
        );
        assert_eq!(narrative.articles, input["election_senate"].articles);
    }

    #[tokio::test]
    async fn test_error_status_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let model = XaiModel::new(&config(&server)).unwrap();
        match model.summarize_batch(&batch(&["a_b"])).await {
            Err(Error::UpstreamRequest { status, body }) => {
                assert_eq!(status, Some(500));
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected UpstreamRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_shape_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let model = XaiModel::new(&config(&server)).unwrap();
        let result = model.summarize_batch(&batch(&["a_b"])).await;
        assert!(matches!(result, Err(Error::UpstreamResponseShape(_))));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parse_error() {
        let server = MockServer::start().await;
        let fenced = "```json\n{\"validNarratives\": {}}\n```";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(fenced)))
            .mount(&server)
            .await;

        let model = XaiModel::new(&config(&server)).unwrap();
        match model.summarize_batch(&batch(&["a_b"])).await {
            Err(Error::UpstreamParse { raw, .. }) => assert_eq!(raw, fenced),
            other => panic!("expected UpstreamParse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("{}"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let model = XaiModel::new(&Config {
            timeout: Duration::from_millis(50),
            ..config(&server)
        })
        .unwrap();
        let result = model.summarize_batch(&batch(&["a_b"])).await;
        assert!(matches!(result, Err(Error::UpstreamRequest { status: None, .. })));
    }

    #[tokio::test]
    async fn test_renamed_single_category_is_accepted() {
        let server = MockServer::start().await;
        let reply = json!({ "validNarratives": { "Election Senate": { "summary": "Neutral." } } });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
            .mount(&server)
            .await;

        let model = XaiModel::new(&config(&server)).unwrap();
        let result = model.summarize_batch(&batch(&["election_senate"])).await.unwrap();
        assert_eq!(result["election_senate"].summary.as_deref(), Some("Neutral."));
    }

    #[test]
    fn test_missing_categories_stay_unsummarized() {
        let input = batch(&["first_one", "second_one"]);
        let reply: SummaryReply = serde_json::from_value(json!({
            "validNarratives": { "second_one": { "summary": "Covered." }, "first_one": { "summary": " " } }
        }))
        .unwrap();
        let result = assign_summaries(&input, reply);
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["second_one"]);
    }

    #[test]
    fn test_prompt_embeds_batch_and_format_rules() {
        let prompt = build_prompt(&batch(&["election_senate"])).unwrap();
        assert!(prompt.contains("\"election_senate\""));
        assert!(prompt.contains("election_senate one"));
        assert!(prompt.contains("\"validNarratives\""));
        assert!(prompt.contains("no code blocks"));
    }

    #[test]
    fn test_new_requires_api_key() {
        let blank = Config {
            api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(matches!(XaiModel::new(&blank), Err(Error::Configuration(_))));
        assert!(matches!(XaiModel::new(&Config::default()), Err(Error::Configuration(_))));
    }
}
