//! The correction flow: quota gate, remote correction, history record

use crate::error::{CorrectionError, SubmitError};
use crate::history::HistoryManager;
use crate::llm::Corrector;
use crate::quota::{QuotaManager, Remaining};
use crate::types::{CorrectionResult, Language, PremiumStatus, UserStatus};

/// Result of one submission
#[derive(Debug)]
pub struct CorrectionOutcome {
    /// The recorded entry; holds the original text when the request failed
    pub result: CorrectionResult,
    /// Why the text came back uncorrected, if it did
    pub failure: Option<CorrectionError>,
}

impl CorrectionOutcome {
    pub fn changed(&self) -> bool {
        self.result.is_changed()
    }
}

pub struct CorrectionService<C> {
    quota: QuotaManager,
    history: HistoryManager,
    corrector: C,
}

impl<C: Corrector> CorrectionService<C> {
    pub fn new(quota: QuotaManager, history: HistoryManager, corrector: C) -> Self {
        Self {
            quota,
            history,
            corrector,
        }
    }

    /// Correct `text`, counting it against today's quota when the request succeeds
    pub async fn submit(&self, text: &str, language: Language) -> Result<CorrectionOutcome, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let status = self.quota.status();
        if self.quota.remaining().is_exhausted() {
            return Err(SubmitError::QuotaExceeded {
                limit: self.quota.daily_limit(),
            });
        }

        let attempt = if status.is_premium() {
            self.corrector
                .correct_with_explanation(text, language)
                .await
                .map(|c| (c.corrected_text, Some(c.explanation)))
        } else {
            self.corrector.correct(text, language).await.map(|c| (c, None))
        };

        let (corrected_text, explanation, failure) = match attempt {
            Ok((corrected, explanation)) => {
                if !self.quota.try_consume() {
                    tracing::warn!("Quota was used up while the request was in flight");
                }
                (corrected, explanation, None)
            }
            Err(e) => {
                tracing::warn!("Correction failed, keeping original text: {}", e);
                (text.to_string(), None, Some(e))
            }
        };

        let result = CorrectionResult::new(text, corrected_text, explanation, language);
        self.history.add(result.clone());

        Ok(CorrectionOutcome { result, failure })
    }

    pub fn status(&self) -> UserStatus {
        self.quota.status()
    }

    pub fn remaining(&self) -> Remaining {
        self.quota.remaining()
    }

    pub fn history(&self) -> Vec<CorrectionResult> {
        self.history.list()
    }

    pub fn remove_history(&self, timestamp: &str) {
        self.history.remove(timestamp);
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    pub fn upgrade(&self) -> UserStatus {
        self.quota.set_premium(PremiumStatus::Premium)
    }
}
