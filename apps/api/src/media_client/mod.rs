//! Media Client: speech and image synthesis (OpenAI-compatible endpoints).
//!
//! Both endpoints return bytes; they are written to object storage and the
//! public object URL is what gets stored on the word.

use aws_sdk_s3::primitives::ByteStream;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ids::generate_id;

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const SPEECH_MODEL: &str = "tts-1";
const IMAGE_MODEL: &str = "gpt-image-1";
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "medium";
const DEFAULT_VOICE: &str = "nova";

/// Voice per target language; unlisted languages use `DEFAULT_VOICE`.
const VOICES: &[(&str, &str)] = &[
    ("en", "nova"),
    ("es", "nova"),
    ("fr", "nova"),
    ("de", "nova"),
    ("it", "nova"),
    ("pt", "nova"),
];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("S3 error: {0}")]
    Storage(String),
}

pub fn voice_for_language(language: &str) -> &'static str {
    VOICES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(language))
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}

/// Writes generated media to the bucket and builds its public URL.
#[derive(Clone)]
pub struct AssetStore {
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl AssetStore {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            s3,
            bucket,
            public_base_url,
        }
    }

    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, MediaError> {
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;
        info!("Uploaded asset to s3://{}/{}", self.bucket, key);
        Ok(public_url(&self.public_base_url, &self.bucket, key))
    }
}

fn public_url(base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

/// Lowercased language code reduced to `[a-z0-9-]`, for object keys.
fn key_segment(language: &str) -> String {
    let cleaned: String = language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        "und".to_string()
    } else {
        cleaned
    }
}

pub fn audio_key(language: &str, id: &str) -> String {
    format!("audio/{}/{id}.mp3", key_segment(language))
}

pub fn image_key(id: &str) -> String {
    format!("images/{id}.png")
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Clone)]
pub struct MediaClient {
    client: Client,
    api_key: String,
    assets: AssetStore,
}

impl MediaClient {
    pub fn new(api_key: String, assets: AssetStore) -> Result<Self, MediaError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            assets,
        })
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<reqwest::Response, MediaError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Synthesizes `text` spoken in `language` and returns the audio URL.
    pub async fn synthesize_speech(&self, text: &str, language: &str) -> Result<String, MediaError> {
        let request = SpeechRequest {
            model: SPEECH_MODEL,
            input: text,
            voice: voice_for_language(language),
            response_format: "mp3",
        };
        let audio = self.post(OPENAI_SPEECH_URL, &request).await?.bytes().await?;
        debug!("Synthesized {} bytes of speech", audio.len());
        self.assets
            .put(&audio_key(language, &generate_id()), audio.to_vec(), "audio/mpeg")
            .await
    }

    /// Generates one image for `prompt`. `None` when the service returns no image.
    pub async fn generate_image(&self, prompt: &str) -> Result<Option<String>, MediaError> {
        let request = ImageRequest {
            model: IMAGE_MODEL,
            prompt,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
            n: 1,
        };
        let response: ImageResponse = self.post(OPENAI_IMAGES_URL, &request).await?.json().await?;
        let Some(datum) = response.data.into_iter().next() else {
            return Ok(None);
        };
        if let Some(url) = datum.url {
            return Ok(Some(url));
        }
        match datum.b64_json {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim())?;
                let url = self
                    .assets
                    .put(&image_key(&generate_id()), bytes, "image/png")
                    .await?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_defaults_to_nova() {
        assert_eq!(voice_for_language("FR"), "nova");
        assert_eq!(voice_for_language("ja"), DEFAULT_VOICE);
    }

    #[test]
    fn test_object_keys() {
        assert_eq!(audio_key("pt-BR", "abc"), "audio/pt-br/abc.mp3");
        assert_eq!(audio_key("../", "abc"), "audio/und/abc.mp3");
        assert_eq!(image_key("xyz"), "images/xyz.png");
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://localhost:9000/", "memora", "images/a.png"),
            "http://localhost:9000/memora/images/a.png"
        );
    }

    #[test]
    fn test_image_response_accepts_url_or_base64() {
        let parsed: ImageResponse =
            serde_json::from_str(r#"{"created": 1, "data": [{"b64_json": "aGk="}]}"#).unwrap();
        assert_eq!(parsed.data[0].b64_json.as_deref(), Some("aGk="));
        assert!(parsed.data[0].url.is_none());

        let empty: ImageResponse = serde_json::from_str(r#"{"created": 1}"#).unwrap();
        assert!(empty.data.is_empty());
    }
}
