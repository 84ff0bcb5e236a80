//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! One client is built at startup from [`GenAiConfig`] and shared by
//! reference; there is no process-wide singleton. The credential travels in
//! the `x-goog-api-key` header so it never appears in logged URLs.

use std::time::Duration;

use gaia_core::{AppConfig, Citation, GroundedRequest, ToolSelection};
use reqwest::Client;

use crate::error::GenAiError;
use crate::pcm::{self, OUTPUT_SAMPLE_RATE};
use crate::retry::retry_with_backoff;
use crate::types::{
    Content, Enabled, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, LatLng, Part, RetrievalConfig, SpeechConfig, Tool, ToolConfig,
};

/// Settings for [`GenAiClient`].
#[derive(Clone)]
pub struct GenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl GenAiConfig {
    /// Extract client settings from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`GenAiError::MissingApiKey`] if no credential is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GenAiError> {
        let api_key = config.api_key.clone().ok_or(GenAiError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: config.gemini_base_url.clone(),
            text_model: config.text_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            request_timeout_secs: config.request_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
        })
    }
}

impl std::fmt::Debug for GenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}

/// Text reply of a grounded completion plus its sources.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Synthesized speech: the raw base64 payload and its decoded 24 kHz mono samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    pub base64: String,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SpeechAudio {
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        pcm::duration_secs(self.samples.len(), self.sample_rate)
    }
}

pub struct GenAiClient {
    client: Client,
    config: GenAiConfig,
    base_url: String,
}

impl GenAiClient {
    /// Build a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`GenAiError::MissingApiKey`] for a blank credential, or
    /// [`GenAiError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn new(config: GenAiConfig) -> Result<Self, GenAiError> {
        if config.api_key.trim().is_empty() {
            return Err(GenAiError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("gaia/0.1 (e-waste-assistant)")
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Identify e-waste in an image: one image part followed by the text prompt.
    ///
    /// # Errors
    ///
    /// Returns `GenAiError` on transport or API failure, or
    /// [`GenAiError::EmptyResponse`] if the model returned no text.
    pub async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, GenAiError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(mime_type, pcm::to_base64(image)),
                    Part::text(prompt),
                ],
            }],
            ..GenerateContentRequest::default()
        };

        tracing::info!(mime_type, bytes = image.len(), "analyzing image");
        let response = self.generate(&self.config.text_model, &body).await?;
        response
            .text()
            .ok_or_else(|| GenAiError::EmptyResponse("image analysis".to_string()))
    }

    /// Single-turn completion with exactly one retrieval tool attached.
    ///
    /// # Errors
    ///
    /// Returns `GenAiError` on transport or API failure, or
    /// [`GenAiError::EmptyResponse`] if the model returned no text.
    pub async fn generate_grounded(
        &self,
        request: &GroundedRequest,
    ) -> Result<GroundedResponse, GenAiError> {
        let body = build_grounded_body(request);
        tracing::info!(
            logistics = request.logistics,
            tool = ?request.tool,
            "sending grounded chat request"
        );

        let response = self.generate(&self.config.text_model, &body).await?;
        let text = response
            .text()
            .ok_or_else(|| GenAiError::EmptyResponse("grounded chat".to_string()))?;
        let citations = extract_citations(&response);
        tracing::debug!(citations = citations.len(), "grounded reply received");

        Ok(GroundedResponse { text, citations })
    }

    /// Speak `text` with the configured prebuilt voice.
    ///
    /// # Errors
    ///
    /// Returns [`GenAiError::EmptyResponse`] if no audio came back, or
    /// [`GenAiError::Audio`] if the payload is not valid base64 PCM16.
    pub async fn text_to_speech(&self, text: &str) -> Result<SpeechAudio, GenAiError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(format!("Diga: {text}"))],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig::prebuilt(&self.config.tts_voice)),
            }),
            ..GenerateContentRequest::default()
        };

        let response = self.generate(&self.config.tts_model, &body).await?;
        let data = response
            .inline_data()
            .map(|d| d.data.clone())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| GenAiError::EmptyResponse("text-to-speech".to_string()))?;
        let samples = pcm::decode_base64_i16(&data)?;

        Ok(SpeechAudio {
            base64: data,
            samples,
            sample_rate: OUTPUT_SAMPLE_RATE,
        })
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenAiError> {
        retry_with_backoff(
            self.config.max_retries,
            self.config.retry_backoff_base_ms,
            move || self.post_generate(model, body),
        )
        .await
    }

    async fn post_generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenAiError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, model, "Gemini API error");
            return Err(map_api_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| GenAiError::Deserialize {
            context: format!("generateContent(model={model})"),
            source: e,
        })
    }
}

/// Request body for a grounded completion: the prompt plus search or maps tooling.
pub(crate) fn build_grounded_body(request: &GroundedRequest) -> GenerateContentRequest {
    let (tool, tool_config) = match request.tool {
        ToolSelection::WebSearch => (
            Tool {
                google_search: Some(Enabled {}),
                google_maps: None,
            },
            None,
        ),
        ToolSelection::Maps {
            latitude,
            longitude,
        } => (
            Tool {
                google_search: None,
                google_maps: Some(Enabled {}),
            },
            Some(ToolConfig {
                retrieval_config: RetrievalConfig {
                    lat_lng: LatLng {
                        latitude,
                        longitude,
                    },
                },
            }),
        ),
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(&request.prompt)],
        }],
        tools: vec![tool],
        tool_config,
        generation_config: None,
    }
}

fn extract_citations(response: &GenerateContentResponse) -> Vec<Citation> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|meta| {
            meta.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref().or(chunk.maps.as_ref()))
                .filter_map(|source| {
                    source.uri.as_ref().map(|uri| Citation {
                        uri: uri.clone(),
                        title: source.title.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn map_api_error(status: u16, body: &str) -> GenAiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.trim().to_string(), |e| e.error.message);
    GenAiError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> GenAiConfig {
        GenAiConfig {
            api_key: "test-key".to_string(),
            base_url: "https://example.test/v1beta/".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            tts_voice: "Kore".to_string(),
            request_timeout_secs: 5,
            max_retries: 0,
            retry_backoff_base_ms: 0,
        }
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let mut cfg = config();
        cfg.api_key = "  ".to_string();
        assert!(matches!(GenAiClient::new(cfg), Err(GenAiError::MissingApiKey)));
    }

    #[test]
    fn from_app_config_requires_key() {
        let app = gaia_core::AppConfig {
            env: gaia_core::Environment::Test,
            log_level: "info".to_string(),
            api_key: None,
            collectors_path: None,
            gemini_base_url: "https://example.test".to_string(),
            live_url: "wss://example.test".to_string(),
            text_model: "m".to_string(),
            tts_model: "t".to_string(),
            live_model: "l".to_string(),
            tts_voice: "Kore".to_string(),
            live_voice: "Zephyr".to_string(),
            request_timeout_secs: 5,
            max_retries: 0,
            retry_backoff_base_ms: 0,
        };
        assert!(matches!(
            GenAiConfig::from_app_config(&app),
            Err(GenAiError::MissingApiKey)
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GenAiClient::new(config()).unwrap();
        assert_eq!(client.base_url, "https://example.test/v1beta");
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", config());
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn web_search_body_has_no_tool_config() {
        let body = build_grounded_body(&GroundedRequest {
            prompt: "olá".to_string(),
            tool: ToolSelection::WebSearch,
            logistics: false,
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "olá" }] }],
                "tools": [{ "googleSearch": {} }]
            })
        );
    }

    #[test]
    fn maps_body_carries_lat_lng() {
        let body = build_grounded_body(&GroundedRequest {
            prompt: "perto".to_string(),
            tool: ToolSelection::Maps {
                latitude: -23.5,
                longitude: -46.6,
            },
            logistics: false,
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["tools"], json!([{ "googleMaps": {} }]));
        assert_eq!(
            value["toolConfig"],
            json!({ "retrievalConfig": { "latLng": { "latitude": -23.5, "longitude": -46.6 } } })
        );
    }

    #[test]
    fn citations_prefer_web_then_maps_and_skip_missing_uri() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "ok" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "A" } },
                        { "maps": { "uri": "https://maps.example/b" } },
                        { "web": { "title": "no uri" } },
                        {}
                    ]
                }
            }]
        }))
        .unwrap();
        let citations = extract_citations(&response);
        assert_eq!(
            citations,
            vec![
                Citation {
                    uri: "https://a.example".to_string(),
                    title: Some("A".to_string())
                },
                Citation {
                    uri: "https://maps.example/b".to_string(),
                    title: None
                },
            ]
        );
    }

    #[test]
    fn api_error_message_is_extracted_from_envelope() {
        let err = map_api_error(
            429,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(err, GenAiError::Api { status: 429, ref message } if message == "Quota exceeded"));
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = map_api_error(502, "Bad Gateway\n");
        assert!(matches!(err, GenAiError::Api { status: 502, ref message } if message == "Bad Gateway"));
    }
}
