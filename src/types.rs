//! Core records persisted and exchanged by GrammaFixer

use std::fmt;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Supported text and UI languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
    Ja,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Ko, Language::En, Language::Ja];

    pub fn code(self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    /// Parse a language code, returning `None` for anything unsupported
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "ko" => Some(Language::Ko),
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            _ => None,
        }
    }

    /// Parse a locale tag such as `en-US` or `ja_JP.UTF-8` by its primary subtag
    pub fn from_locale(locale: &str) -> Option<Self> {
        locale
            .split(['-', '_', '.'])
            .next()
            .and_then(Self::from_code)
    }

    /// Like [`Language::from_code`], collapsing unsupported values to the default
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PremiumStatus {
    #[default]
    Free,
    Premium,
}

/// Quota record of the local user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// Corrections used on `last_used`
    pub correction_count: u32,
    pub premium_status: PremiumStatus,
    /// Calendar day the counter belongs to
    pub last_used: NaiveDate,
}

impl UserStatus {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            correction_count: 0,
            premium_status: PremiumStatus::Free,
            last_used: today,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.premium_status == PremiumStatus::Premium
    }
}

/// One completed correction, keyed by its timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResult {
    pub original_text: String,
    pub corrected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub language: Language,
    pub timestamp: String,
}

impl CorrectionResult {
    /// Build a result stamped with the current time
    pub fn new(
        original_text: impl Into<String>,
        corrected_text: impl Into<String>,
        explanation: Option<String>,
        language: Language,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            corrected_text: corrected_text.into(),
            explanation,
            language,
            timestamp: now_timestamp(),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.original_text != self.corrected_text
    }
}

/// ISO-8601 UTC timestamp with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("en"), Some(Language::En));
        assert_eq!(Language::from_code("JA"), Some(Language::Ja));
        assert_eq!(Language::from_code("zh"), None);
        assert_eq!(Language::from_code_or_default("fr"), Language::Ko);
        assert_eq!(Language::default(), Language::Ko);
    }

    #[test]
    fn test_language_from_locale() {
        assert_eq!(Language::from_locale("en-US"), Some(Language::En));
        assert_eq!(Language::from_locale("ja_JP.UTF-8"), Some(Language::Ja));
        assert_eq!(Language::from_locale("ko"), Some(Language::Ko));
        assert_eq!(Language::from_locale("de-DE"), None);
    }

    #[test]
    fn test_user_status_json_layout() {
        let status = UserStatus {
            correction_count: 3,
            premium_status: PremiumStatus::Premium,
            last_used: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        };
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "correctionCount": 3,
                "premiumStatus": "premium",
                "lastUsed": "2026-10-17"
            })
        );
    }

    #[test]
    fn test_correction_result_omits_missing_explanation() {
        let result = CorrectionResult {
            original_text: "He don't".to_string(),
            corrected_text: "He doesn't".to_string(),
            explanation: None,
            language: Language::En,
            timestamp: "2026-10-17T08:30:00.123Z".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();

        assert!(json.contains("\"originalText\""));
        assert!(json.contains("\"language\":\"en\""));
        assert!(!json.contains("explanation"));

        let back: CorrectionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = now_timestamp();
        // 2026-10-17T08:30:00.123Z
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_is_changed() {
        let same = CorrectionResult::new("abc", "abc", None, Language::En);
        let changed = CorrectionResult::new("abc", "abd", None, Language::En);
        assert!(!same.is_changed());
        assert!(changed.is_changed());
    }
}
