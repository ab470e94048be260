//! Client for the generative-text correction API
//!
//! Talks to the Gemini `generateContent` endpoint. The remote side returns
//! free text, so the reply is cleaned up heuristically before use.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::CorrectionError;
use crate::types::Language;

/// Corrected text with the reasons for the changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub corrected_text: String,
    pub explanation: String,
}

/// Anything that can correct text
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct(&self, text: &str, language: Language) -> Result<String, CorrectionError>;

    async fn correct_with_explanation(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Correction, CorrectionError>;
}

/// HTTP client for the correction API
pub struct CorrectionClient {
    client: Client,
    config: Config,
}

// Gemini API types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

const CORRECTION_MARKERS: [&str; 3] = ["교정:", "Corrected:", "修正:"];
const EXPLANATION_MARKERS: [&str; 3] = ["설명:", "Explanation:", "説明:"];

impl CorrectionClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if the correction API is configured
    pub fn is_available(&self) -> bool {
        self.config.is_llm_enabled()
    }

    /// Correct `text`, returning it unchanged on any failure
    pub async fn correct_or_original(&self, text: &str, language: Language) -> String {
        match self.correct(text, language).await {
            Ok(corrected) => corrected,
            Err(e) => {
                tracing::warn!("Correction failed, keeping original text: {}", e);
                text.to_string()
            }
        }
    }

    /// Build the prompt for a plain correction
    fn build_prompt(text: &str, language: Language) -> String {
        match language {
            Language::Ko => format!(
                "다음 텍스트의 문법과 맞춤법을 교정해주세요. 틀린 부분만 고치고, 교정된 전체 텍스트만 반환하세요.\n원문: \"{}\"",
                text
            ),
            Language::En => format!(
                "Correct the grammar and spelling of the following text. Change only what needs fixing and return only the full corrected text.\nOriginal: \"{}\"",
                text
            ),
            Language::Ja => format!(
                "次のテキストの文法と綴りを修正してください。必要な箇所だけを直し、修正後のテキスト全体のみを返してください。\n原文: \"{}\"",
                text
            ),
        }
    }

    /// Build the prompt asking for a correction plus explanation
    fn build_explanation_prompt(text: &str, language: Language) -> String {
        match language {
            Language::Ko => format!(
                "다음 텍스트의 문법과 맞춤법을 교정하고, 수정한 이유를 설명해주세요.\n원문: \"{}\"\n다음 형식으로 반환해주세요:\n교정: [교정된 텍스트]\n설명: [교정 이유]",
                text
            ),
            Language::En => format!(
                "Correct the grammar and spelling of the following text and explain the corrections.\nOriginal: \"{}\"\nReply in this format:\nCorrected: [corrected text]\nExplanation: [explanation of the corrections]",
                text
            ),
            Language::Ja => format!(
                "次のテキストの文法と綴りを修正し、修正理由を説明してください。\n原文: \"{}\"\n次の形式で返してください:\n修正: [修正されたテキスト]\n説明: [修正理由]",
                text
            ),
        }
    }

    /// Send one prompt and return the first candidate's text
    async fn generate(&self, prompt: String, temperature: f32) -> Result<String, CorrectionError> {
        let api_key = self.config.get_api_key().ok_or(CorrectionError::NotConfigured)?;

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                top_k: 1,
                top_p: 0.95,
                max_output_tokens: self.config.llm.max_output_tokens,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.get_base_url().trim_end_matches('/'),
            self.config.get_model()
        );
        tracing::debug!("Sending correction request to {}", url);

        let response = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(self.config.llm.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Correction API error: {} - {}", status, body);
            return Err(CorrectionError::from_status(status.as_u16()));
        }

        let generated: GenerateResponse = response.json().await.map_err(map_transport_error)?;
        generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(CorrectionError::EmptyResponse)
    }
}

#[async_trait]
impl Corrector for CorrectionClient {
    async fn correct(&self, text: &str, language: Language) -> Result<String, CorrectionError> {
        let response = self.generate(Self::build_prompt(text, language), 0.1).await?;
        Ok(cleanup_response(&response, language))
    }

    async fn correct_with_explanation(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Correction, CorrectionError> {
        let response = self
            .generate(Self::build_explanation_prompt(text, language), 0.2)
            .await?;

        if let Some(correction) = parse_explanation(&response, language) {
            return Ok(correction);
        }

        tracing::debug!("Reply had no correction/explanation markers, retrying plain correction");
        let corrected_text = self.correct(text, language).await?;
        let translations = self.config.translation_source().load(language).await;
        Ok(Correction {
            corrected_text,
            explanation: translations.resolve("corrector.explanationUnavailable", None),
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> CorrectionError {
    if e.is_timeout() {
        CorrectionError::Timeout
    } else if e.is_decode() {
        CorrectionError::InvalidResponse(e.to_string())
    } else {
        CorrectionError::Network(e.to_string())
    }
}

fn prefixes(language: Language) -> &'static [&'static str] {
    match language {
        Language::Ko => &["교정된 텍스트:", "수정된 텍스트:", "결과:", "교정 결과:"],
        Language::En => &["Corrected text:", "Correction:", "Result:", "Corrected version:"],
        Language::Ja => &["修正されたテキスト:", "修正結果:", "結果:"],
    }
}

/// Strip known answer prefixes and one pair of surrounding quotes
pub fn cleanup_response(response: &str, language: Language) -> String {
    let mut cleaned = response.trim();

    for prefix in prefixes(language) {
        if let Some(rest) = cleaned.strip_prefix(*prefix) {
            cleaned = rest.trim();
        }
    }

    for quote in ['"', '\''] {
        if cleaned.len() >= 2 && cleaned.starts_with(quote) && cleaned.ends_with(quote) {
            cleaned = &cleaned[1..cleaned.len() - 1];
            break;
        }
    }

    cleaned.to_string()
}

/// Find the leftmost marker, ASCII case-insensitively; returns (start, end)
fn find_marker(haystack: &str, markers: &[&str], from: usize) -> Option<(usize, usize)> {
    let lowered = haystack.to_ascii_lowercase();
    markers
        .iter()
        .filter_map(|marker| {
            let needle = marker.to_ascii_lowercase();
            lowered[from..]
                .find(&needle)
                .map(|pos| (from + pos, from + pos + needle.len()))
        })
        .min_by_key(|(start, _)| *start)
}

/// Split a `correction / explanation` reply into its two parts
pub fn parse_explanation(response: &str, language: Language) -> Option<Correction> {
    let (_, correction_start) = find_marker(response, &CORRECTION_MARKERS, 0)?;
    let (explanation_start, explanation_end) =
        find_marker(response, &EXPLANATION_MARKERS, correction_start)?;

    let corrected = response[correction_start..explanation_start].trim();
    let explanation = response[explanation_end..].trim();

    Some(Correction {
        corrected_text: cleanup_response(corrected, language),
        explanation: explanation.to_string(),
    })
}
