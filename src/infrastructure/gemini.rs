// SPDX-License-Identifier: MPL-2.0
//! Generation backend over the Gemini REST API.
//!
//! Images go through `generateContent` with inline base64 parts, videos
//! through a long-running `predictLongRunning` operation that is polled
//! until done and then downloaded into a temporary file owned by a
//! [`VideoHandle`]. Provider failures are classified into
//! [`BackendError`] here and nowhere else.

use crate::application::cancellation::CancellationToken;
use crate::application::port::{
    BackendError, CredentialStore, GenerationBackend, ImageRequest, VideoRequest,
};
use crate::application::prompt::{self, ENHANCE_INSTRUCTION, TRANSLATE_INSTRUCTION};
use crate::domain::media::{EncodedImage, VideoHandle};
use crate::domain::session::StudioMode;
use crate::media;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

static NEXT_DOWNLOAD: AtomicU64 = AtomicU64::new(0);

/// Model identifiers and endpoint used by [`GeminiBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiModels {
    pub endpoint: String,
    pub image: String,
    pub video: String,
    pub text: String,
}

impl Default for GeminiModels {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
            video: DEFAULT_VIDEO_MODEL.to_string(),
            text: DEFAULT_TEXT_MODEL.to_string(),
        }
    }
}

/// Backend talking to the Gemini HTTP API.
pub struct GeminiBackend {
    client: Client,
    credentials: Arc<dyn CredentialStore>,
    models: GeminiModels,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Creates a backend reading the API key from `credentials` on every
    /// call, so a key entered after a rejection is picked up at once.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, models: GeminiModels) -> Self {
        Self {
            client: Client::new(),
            credentials,
            models,
        }
    }

    fn api_key(&self) -> Result<String, BackendError> {
        match self.credentials.get() {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(BackendError::Auth),
            Err(err) => {
                tracing::warn!(%err, "cannot read the API credential");
                Err(BackendError::Auth)
            }
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{model}:{method}",
            self.models.endpoint.trim_end_matches('/')
        )
    }

    async fn post<B: Serialize + Sync, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, BackendError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        read_json(response).await
    }

    async fn get<R: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<R, BackendError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        read_json(response).await
    }

    async fn generate_text(&self, instruction: &str, text: &str) -> Result<String, BackendError> {
        let body = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(text)])],
            system_instruction: Some(Content::system(instruction)),
            generation_config: None,
        };
        let url = self.model_url(&self.models.text, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &body).await?;
        extract_text(response)
    }

    async fn download(&self, uri: &str, mime_type: &str) -> Result<VideoHandle, BackendError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Network(format!(
                "video download failed with status {}",
                response.status()
            )));
        }

        let path = download_path();
        let handle = VideoHandle::new(&path, mime_type);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|err| BackendError::Generic(err.to_string()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| BackendError::Network(err.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|err| BackendError::Generic(err.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|err| BackendError::Generic(err.to_string()))?;
        tracing::debug!(path = %path.display(), "video downloaded");
        Ok(handle)
    }
}

fn download_path() -> PathBuf {
    let n = NEXT_DOWNLOAD.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("image-studio-{}-{n}.mp4", std::process::id()))
}

async fn read_json<R: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<R, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unreadable error body".to_string());
        let err = classify_http(status, &body);
        tracing::warn!(%status, key = err.message_key(), "backend request failed");
        return Err(err);
    }
    response
        .json()
        .await
        .map_err(|err| BackendError::Generic(format!("unexpected response: {err}")))
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<EncodedImage>, BackendError> {
        let body = image_body(request);
        let url = self.model_url(&self.models.image, "generateContent");
        tracing::debug!(unit = request.unit, mode = request.mode.as_str(), "image request");
        let response: GenerateContentResponse = self.post(&url, &body).await?;
        extract_images(response)
    }

    async fn generate_video(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<VideoHandle>, BackendError> {
        let body = video_body(request);
        let url = self.model_url(&self.models.video, "predictLongRunning");
        let mut operation: Operation = self.post(&url, &body).await?;
        let operation_url = format!(
            "{}/{}",
            self.models.endpoint.trim_end_matches('/'),
            operation.name
        );

        while !operation.done {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            tokio::time::sleep(request.poll_interval).await;
            if cancel.is_cancelled() {
                return Ok(None);
            }
            tracing::debug!(operation = %operation.name, "polling video operation");
            operation = self.get(&operation_url).await?;
        }

        if let Some(error) = operation.error {
            return Err(BackendError::from_message(&error.message.unwrap_or_default()));
        }
        let uri = video_uri(&operation).ok_or(BackendError::NoResult)?;
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let handle = self.download(&uri, "video/mp4").await?;
        if cancel.is_cancelled() {
            handle.release();
            return Ok(None);
        }
        Ok(Some(handle))
    }

    async fn enhance_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate_text(ENHANCE_INSTRUCTION, prompt).await
    }

    async fn translate_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate_text(TRANSLATE_INSTRUCTION, prompt).await
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self { role: "user", parts }
    }

    fn system(text: &str) -> Self {
        Self {
            role: "system",
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn text(text: &str) -> Self {
        Self::Text {
            text: text.to_string(),
        }
    }

    fn image(image: &EncodedImage) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: image.kind().mime_type().to_string(),
                data: BASE64_STANDARD.encode(image.bytes()),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct VideoBody {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VideoImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage {
    bytes_base64_encoded: String,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: &'static str,
    sample_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    generate_audio: bool,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// =============================================================================
// Request building and response parsing
// =============================================================================

/// Builds the body of one image unit. Source images come first, then the
/// mask, then the text.
fn image_body(request: &ImageRequest) -> GenerateContentRequest {
    let mut parts = Vec::new();
    if let Some(image1) = &request.image1 {
        parts.push(Part::image(image1));
    }
    if let Some(image2) = &request.image2 {
        parts.push(Part::image(image2));
    }
    if let Some(mask) = &request.mask {
        parts.push(Part::image(mask));
    }
    parts.push(Part::text(&prompt::user_request(
        &request.prompt,
        &request.negative_prompt,
    )));

    let image_config = (request.mode == StudioMode::Create).then(|| ImageConfig {
        aspect_ratio: request.aspect_ratio.as_str(),
    });

    GenerateContentRequest {
        contents: vec![Content::user(parts)],
        system_instruction: Some(Content::system(&request.instruction)),
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["IMAGE", "TEXT"],
            image_config,
        }),
    }
}

fn video_body(request: &VideoRequest) -> VideoBody {
    let negative = request.negative_prompt.trim();
    VideoBody {
        instances: vec![VideoInstance {
            prompt: request.prompt.trim().to_string(),
            image: request.image.as_ref().map(|image| VideoImage {
                bytes_base64_encoded: BASE64_STANDARD.encode(image.bytes()),
                mime_type: image.kind().mime_type(),
            }),
        }],
        parameters: VideoParameters {
            aspect_ratio: request.aspect_ratio.as_str(),
            sample_count: 1,
            negative_prompt: (!negative.is_empty()).then(|| negative.to_string()),
            generate_audio: request.include_audio,
        },
    }
}

fn extract_images(response: GenerateContentResponse) -> Result<Vec<EncodedImage>, BackendError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        let reason = reason.replace('_', " ").to_lowercase();
        return Err(BackendError::Safety(format!(
            "Your request was blocked due to {reason}"
        )));
    }

    let mut images = Vec::new();
    let mut text = None;
    for candidate in response.candidates {
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(BackendError::Safety("finishReason: SAFETY".to_string()));
        }
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            if let Some(inline) = part.inline_data {
                let bytes = BASE64_STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|err| BackendError::Generic(format!("invalid image payload: {err}")))?;
                let image = media::probe(bytes).map_err(|err| {
                    BackendError::Generic(format!("undecodable image payload: {err}"))
                })?;
                images.push(image);
            } else if let Some(part_text) = part.text {
                text.get_or_insert(part_text);
            }
        }
    }

    if images.is_empty() {
        if let Some(text) = text {
            tracing::debug!(%text, "backend answered with text only");
        }
        return Err(BackendError::NoResult);
    }
    Ok(images)
}

fn extract_text(response: GenerateContentResponse) -> Result<String, BackendError> {
    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(BackendError::NoResult)
}

fn video_uri(operation: &Operation) -> Option<String> {
    operation
        .response
        .as_ref()?
        .pointer("/generateVideoResponse/generatedSamples/0/video/uri")?
        .as_str()
        .map(str::to_string)
}

fn classify_http(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    match BackendError::from_message(&message) {
        BackendError::Generic(_) if status == StatusCode::TOO_MANY_REQUESTS => BackendError::Quota,
        BackendError::Generic(_) if status.is_server_error() => {
            BackendError::Network(format!("{status}: {message}"))
        }
        classified => classified,
    }
}
