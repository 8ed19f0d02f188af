use super::{LLMInferenceParams, LLMUserMessage};
use crate::{
    utils::image_bytes_to_data_url, CaptionError, CaptionResult, ImageCaptionInput,
    ImageCaptionModel, ImageCaptionOutput,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    self,
    header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION},
    Url,
};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Deserializer, Value};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthScheme {
    Bearer,
    ApiKeyHeader,
}

/// OpenAI compatible chat completion client used for image captioning.
#[derive(Debug, Clone)]
pub struct OpenAI {
    base_url: String,
    auth: AuthScheme,
    params: LLMInferenceParams,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChoiceDelta {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChoice {
    index: Option<usize>,
    delta: Option<OpenAIResponseChoiceDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChunk {
    id: Option<String>,
    object: Option<String>,
    created: Option<u64>,
    model: Option<String>,
    system_fingerprint: Option<String>,
    choices: Vec<OpenAIResponseChoice>,
}

#[async_trait]
impl ImageCaptionModel for OpenAI {
    #[tracing::instrument(name = "OpenAI::describe", err(Debug), skip_all, fields(model=%model))]
    async fn describe(
        &self,
        input: ImageCaptionInput,
        credential: &str,
        model: &str,
    ) -> CaptionResult<ImageCaptionOutput> {
        let url = self.completion_url()?;
        tracing::debug!("openai url: {:?}", url);

        let content = vec![
            LLMUserMessage::Text(input.prompt().to_string()),
            LLMUserMessage::ImageUrl(image_bytes_to_data_url(&input.image)),
        ];

        let request = self
            .client
            .post(url)
            .headers(self.headers(credential)?)
            .body(request_body(model, &content, &self.params).to_string());

        let mut es = EventSource::new(request)
            .map_err(|e| CaptionError::Transport(format!("failed to create request: {}", e)))?;

        let mut buffer = String::new(); // a buffer to contain possible incomplete message
        let mut caption = String::new();
        let mut received = false;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    tracing::debug!("stream opened");
                }
                Ok(Event::Message(message)) => {
                    if message.data.trim() == "[DONE]" {
                        es.close();
                        break;
                    }

                    // sometimes message.data is not a complete JSON value, especially when using AzureOpenAI API
                    // so here use a buffer to contain them and try to extract json from buffer
                    buffer.push_str(&message.data);
                    if drain_chunks(&mut buffer, &mut caption)? {
                        received = true;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    tracing::debug!("stream ended");
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    es.close();
                    let text = response.text().await.unwrap_or_default();
                    tracing::error!("provider responded with {}: {}", status, &text);
                    return Err(CaptionError::Transport(format!(
                        "provider responded with {}: {}",
                        status, text
                    )));
                }
                Err(reqwest_eventsource::Error::InvalidContentType(content_type, _)) => {
                    es.close();
                    return Err(CaptionError::ResponseParse(format!(
                        "unexpected content type: {:?}",
                        content_type
                    )));
                }
                Err(reqwest_eventsource::Error::Transport(e)) => {
                    es.close();
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::error!("failed to handle event source: {}", e);
                    es.close();
                    return Err(CaptionError::ResponseParse(e.to_string()));
                }
            }
        }

        if !buffer.trim().is_empty() {
            return Err(CaptionError::ResponseParse(format!(
                "incomplete response: {}",
                buffer
            )));
        }

        if !received {
            return Err(CaptionError::ResponseParse(
                "response contains no caption".to_string(),
            ));
        }

        Ok(caption)
    }
}

impl OpenAI {
    /// Create a new OpenAI compatible chat completion client.
    ///
    /// The API key and the model are given on every call.
    pub fn new(base_url: &str) -> CaptionResult<Self> {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Url::parse(&base_url)
            .map_err(|e| CaptionError::Transport(format!("invalid base url: {}", e)))?;

        Ok(Self {
            base_url,
            auth: AuthScheme::Bearer,
            params: LLMInferenceParams::default(),
            client: reqwest::Client::new(),
        })
    }

    pub fn new_azure(
        azure_endpoint: &str,
        deployment_name: &str,
        api_version: &str,
    ) -> CaptionResult<Self> {
        let base_url = Url::from_str(azure_endpoint)
            .and_then(|url| url.join(&format!("openai/deployments/{}/", deployment_name)))
            .map(|mut url| {
                url.set_query(Some(&format!("api-version={}", api_version)));
                url
            })
            .map_err(|e| CaptionError::Transport(format!("invalid azure endpoint: {}", e)))?;

        Ok(Self {
            base_url: base_url.to_string(),
            auth: AuthScheme::ApiKeyHeader,
            params: LLMInferenceParams::default(),
            client: reqwest::Client::new(),
        })
    }

    fn completion_url(&self) -> CaptionResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| CaptionError::Transport(format!("invalid base url: {}", e)))?;
        let query = url.query().map(|v| v.to_string());
        let mut url = url
            .join("chat/completions")
            .map_err(|e| CaptionError::Transport(format!("invalid base url: {}", e)))?;
        url.set_query(query.as_deref());
        Ok(url)
    }

    fn headers(&self, credential: &str) -> CaptionResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let invalid = |_: InvalidHeaderValue| {
            CaptionError::Transport("credential is not a valid header".to_string())
        };
        match self.auth {
            AuthScheme::Bearer => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", credential)).map_err(invalid)?,
                );
            }
            AuthScheme::ApiKeyHeader => {
                headers.insert("api-key", HeaderValue::from_str(credential).map_err(invalid)?);
            }
        }
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }
}

fn user_message_to_json(content: &[LLMUserMessage]) -> Value {
    let content = match content {
        [LLMUserMessage::Text(text)] => json!(text),
        _ => Value::Array(
            content
                .iter()
                .map(|t| match t {
                    LLMUserMessage::ImageUrl(image_url) => {
                        json!({"type": "image_url", "image_url": {"url": image_url}})
                    }
                    LLMUserMessage::Text(text) => json!({"type": "text", "text": text}),
                })
                .collect(),
        ),
    };

    json!({
        "role": "user",
        "content": content
    })
}

fn request_body(model: &str, content: &[LLMUserMessage], params: &LLMInferenceParams) -> Value {
    json!({
        "model": model,
        "messages": [user_message_to_json(content)],
        "stream": true,
        "temperature": params.temperature,
        "seed": params.seed,
        "top_p": params.top_p,
        "max_tokens": params.max_tokens
    })
}

/// Parse every complete chunk in `buffer`, append the delta contents to `output`
/// and remove the parsed part from `buffer`.
///
/// Returns whether at least one chunk was parsed.
fn drain_chunks(buffer: &mut String, output: &mut String) -> CaptionResult<bool> {
    let mut parsed = false;
    let mut deserialize_error = None;
    let byte_offset;
    {
        let mut stream_deserializer =
            Deserializer::from_str(buffer.as_str()).into_iter::<OpenAIResponseChunk>();

        for result in stream_deserializer.by_ref() {
            match result {
                Ok(response) => {
                    parsed = true;
                    for choice in &response.choices {
                        if let Some(OpenAIResponseChoiceDelta {
                            content: Some(content),
                            ..
                        }) = &choice.delta
                        {
                            output.push_str(content);
                        }
                        if let Some(finish_reason) = &choice.finish_reason {
                            tracing::debug!("LLM finish reason: {:?}", finish_reason);
                        }
                    }
                }
                Err(e) => {
                    deserialize_error = Some(e);
                    break;
                }
            }
        }

        byte_offset = stream_deserializer.byte_offset();
    }

    buffer.drain(..byte_offset);

    if let Some(err) = deserialize_error {
        if !err.is_eof() {
            // this is a real error
            tracing::error!("failed to parse response: {}", &buffer);
            return Err(err.into());
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_completion_url() {
        let client = OpenAI::new("https://api.openai.com/v1").expect("valid url");
        assert_eq!(
            client.completion_url().expect("url").as_str(),
            "https://api.openai.com/v1/chat/completions"
        );

        let client = OpenAI::new_azure("https://example.openai.azure.com", "vision", "2024-02-01")
            .expect("valid url");
        assert_eq!(
            client.completion_url().expect("url").as_str(),
            "https://example.openai.azure.com/openai/deployments/vision/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_headers() {
        let client = OpenAI::new("https://api.openai.com/v1").expect("valid url");
        let headers = client.headers("sk-test").expect("headers");
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");

        let client = OpenAI::new_azure("https://example.openai.azure.com", "vision", "2024-02-01")
            .expect("valid url");
        let headers = client.headers("secret").expect("headers");
        assert_eq!(headers["api-key"], "secret");
        assert!(headers.get(AUTHORIZATION).is_none());

        assert!(client.headers("bad\nkey").is_err());
    }

    #[test]
    fn test_request_body() {
        let content = vec![
            LLMUserMessage::Text("describe".into()),
            LLMUserMessage::ImageUrl("data:image/png;base64,AAAA".into()),
        ];
        let body = request_body("gpt-4o", &content, &LLMInferenceParams::default());

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
        assert_eq!(body["messages"][0]["content"][0]["text"], "describe");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );

        let content = vec![LLMUserMessage::Text("hi".into())];
        let body = request_body("gpt-4o", &content, &LLMInferenceParams::default());
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_drain_chunks_with_split_messages() {
        let mut buffer = String::new();
        let mut output = String::new();

        buffer.push_str(r#"{"choices":[{"delta":{"content":"The image "}}]}{"choices":[{"del"#);
        assert!(drain_chunks(&mut buffer, &mut output).expect("parsed"));
        assert_eq!(output, "The image ");
        assert_eq!(buffer, r#"{"choices":[{"del"#);

        buffer.push_str(r#"ta":{"content":"shows a cat."},"finish_reason":"stop"}]}"#);
        assert!(drain_chunks(&mut buffer, &mut output).expect("parsed"));
        assert_eq!(output, "The image shows a cat.");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_chunks_rejects_garbage() {
        let mut buffer = "not json".to_string();
        let mut output = String::new();
        assert!(matches!(
            drain_chunks(&mut buffer, &mut output),
            Err(CaptionError::ResponseParse(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_describe_unreachable_backend() {
        let client = OpenAI::new("http://127.0.0.1:9/v1").expect("valid url");
        let result = client
            .describe(ImageCaptionInput::new(vec![1, 2, 3]), "sk-test", "gpt-4o")
            .await;
        assert!(matches!(result, Err(CaptionError::Transport(_))));
    }
}
