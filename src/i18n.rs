//! Translation tables and the active UI language
//!
//! Tables are nested JSON objects (`section -> key -> string | object`).
//! Lookups never fail: a missing entry resolves to the lookup key itself.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::TranslationError;
use crate::storage::{Repository, LANGUAGE_KEY};
use crate::types::Language;

const KO_TABLE: &str = include_str!("../locales/ko.json");
const EN_TABLE: &str = include_str!("../locales/en.json");
const JA_TABLE: &str = include_str!("../locales/ja.json");

/// One loaded translation table
#[derive(Debug, Clone, Default)]
pub struct Translations {
    table: Option<Value>,
}

impl Translations {
    pub fn new(table: Value) -> Self {
        Self { table: Some(table) }
    }

    /// A store with no table loaded; every lookup returns its key
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table compiled into the binary
    pub fn bundled(language: Language) -> Self {
        let raw = match language {
            Language::Ko => KO_TABLE,
            Language::En => EN_TABLE,
            Language::Ja => JA_TABLE,
        };
        match serde_json::from_str(raw) {
            Ok(table) => Self::new(table),
            Err(e) => {
                tracing::warn!("Bundled {} translations are invalid: {}", language, e);
                Self::empty()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    /// Resolve `key`, optionally inside `section`, falling back to `key`
    pub fn resolve(&self, key: &str, section: Option<&str>) -> String {
        let Some(table) = &self.table else {
            return key.to_string();
        };

        let found = match section {
            Some(section) => {
                let scoped = table.get(section);
                let nested = key.split_once('.').and_then(|(main, rest)| {
                    let sub = rest.split('.').next().unwrap_or(rest);
                    scoped.and_then(|s| s.get(main)).and_then(|m| m.get(sub))
                });
                as_text(nested).or_else(|| as_text(scoped.and_then(|s| s.get(key))))
            }
            None => as_text(
                key.split('.')
                    .try_fold(table, |current, part| current.get(part)),
            ),
        };

        found.map(str::to_string).unwrap_or_else(|| key.to_string())
    }
}

fn as_text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Where translation tables come from
#[derive(Debug, Clone, Default)]
pub enum TranslationSource {
    /// Tables compiled into the binary
    #[default]
    Bundled,
    /// `<dir>/<code>.json` files read at switch time
    Directory(PathBuf),
}

impl TranslationSource {
    /// Load the table for `language`, falling back to the default language's bundled table
    pub async fn load(&self, language: Language) -> Translations {
        match self {
            TranslationSource::Bundled => Translations::bundled(language),
            TranslationSource::Directory(dir) => match Self::read_table(dir, language).await {
                Ok(translations) => translations,
                Err(e) => {
                    tracing::warn!(
                        "Failed to load {} translations from {}: {}",
                        language,
                        dir.display(),
                        e
                    );
                    Translations::bundled(Language::default())
                }
            },
        }
    }

    async fn read_table(dir: &std::path::Path, language: Language) -> Result<Translations, TranslationError> {
        let path = dir.join(format!("{}.json", language.code()));
        let content = tokio::fs::read_to_string(&path).await?;
        let table: Value = serde_json::from_str(&content)?;
        Ok(Translations::new(table))
    }
}

/// Locale reported by the operating system, e.g. `en-US`
pub fn system_locale() -> Option<String> {
    sys_locale::get_locale()
}

/// The active UI language together with its translation table
#[derive(Debug)]
pub struct Localizer {
    language: Language,
    translations: Translations,
    repository: Repository,
    source: TranslationSource,
}

impl Localizer {
    /// Pick the initial language: saved choice, then `locale_hint`, then the default
    pub async fn detect(
        repository: Repository,
        source: TranslationSource,
        locale_hint: Option<&str>,
    ) -> Self {
        let saved: Option<String> = repository.load_or_default(LANGUAGE_KEY, || None);
        let language = match saved {
            Some(code) => Language::from_code_or_default(&code),
            None => locale_hint
                .and_then(Language::from_locale)
                .unwrap_or_default(),
        };

        tracing::debug!("UI language detected: {}", language);
        let translations = source.load(language).await;

        Self {
            language,
            translations,
            repository,
            source,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    /// Translate a dotted key
    pub fn t(&self, key: &str) -> String {
        self.translations.resolve(key, None)
    }

    /// Translate `key` inside `section`
    pub fn t_in(&self, key: &str, section: &str) -> String {
        self.translations.resolve(key, Some(section))
    }

    /// Persist the choice, then swap the table wholesale
    pub async fn set_language(&mut self, language: Language) {
        self.repository.save_or_log(LANGUAGE_KEY, language.code());
        self.translations = self.source.load(language).await;
        self.language = language;
        tracing::info!("UI language set to {}", language);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn table() -> Translations {
        Translations::new(json!({
            "corrector": {
                "correcting": "Correcting...",
                "errors": { "timeout": "Timed out" },
                "flat.key": "Flat"
            },
            "title": "GrammaFixer",
            "blank": ""
        }))
    }

    #[test]
    fn test_resolve_dotted() {
        assert_eq!(table().resolve("corrector.correcting", None), "Correcting...");
        assert_eq!(table().resolve("corrector.errors.timeout", None), "Timed out");
        assert_eq!(table().resolve("title", None), "GrammaFixer");
    }

    #[test]
    fn test_resolve_missing_returns_key() {
        assert_eq!(table().resolve("missing.key", None), "missing.key");
        assert_eq!(table().resolve("corrector.nothing", None), "corrector.nothing");
        // An object is not a display string
        assert_eq!(table().resolve("corrector", None), "corrector");
        assert_eq!(table().resolve("blank", None), "blank");
    }

    #[test]
    fn test_resolve_with_section() {
        let t = table();
        assert_eq!(t.resolve("correcting", Some("corrector")), "Correcting...");
        assert_eq!(t.resolve("errors.timeout", Some("corrector")), "Timed out");
        assert_eq!(t.resolve("flat.key", Some("corrector")), "Flat");
        assert_eq!(t.resolve("correcting", Some("history")), "correcting");
    }

    #[test]
    fn test_resolve_without_table() {
        let t = Translations::empty();
        assert!(!t.is_loaded());
        assert_eq!(t.resolve("corrector.correcting", None), "corrector.correcting");
        assert_eq!(t.resolve("correcting", Some("corrector")), "correcting");
    }

    #[test]
    fn test_bundled_tables_share_keys() {
        for language in Language::ALL {
            let t = Translations::bundled(language);
            assert!(t.is_loaded(), "{} table should load", language);
            for key in [
                "corrector.action",
                "corrector.corrected",
                "corrector.noCorrection",
                "corrector.errors.timeout",
                "premium.limitReached",
                "history.cleared",
                "languages.changed",
            ] {
                assert_ne!(t.resolve(key, None), key, "{} is missing {}", language, key);
            }
        }
    }

    #[tokio::test]
    async fn test_detect_prefers_saved_language() {
        let repo = Repository::in_memory();
        repo.save(LANGUAGE_KEY, "ja").unwrap();

        let localizer = Localizer::detect(repo, TranslationSource::Bundled, Some("en-US")).await;
        assert_eq!(localizer.language(), Language::Ja);
    }

    #[tokio::test]
    async fn test_detect_from_locale_hint() {
        let localizer =
            Localizer::detect(Repository::in_memory(), TranslationSource::Bundled, Some("en-GB")).await;
        assert_eq!(localizer.language(), Language::En);
        assert_eq!(localizer.t("corrector.action"), "Correct grammar");
    }

    #[tokio::test]
    async fn test_detect_unsupported_collapses_to_default() {
        let localizer =
            Localizer::detect(Repository::in_memory(), TranslationSource::Bundled, Some("fr-FR")).await;
        assert_eq!(localizer.language(), Language::Ko);

        let repo = Repository::in_memory();
        repo.save(LANGUAGE_KEY, "zh").unwrap();
        let localizer = Localizer::detect(repo, TranslationSource::Bundled, Some("en-US")).await;
        assert_eq!(localizer.language(), Language::Ko);
    }

    #[tokio::test]
    async fn test_set_language_persists_and_swaps() {
        let repo = Repository::in_memory();
        let mut localizer = Localizer::detect(repo.clone(), TranslationSource::Bundled, None).await;
        assert_eq!(localizer.t_in("action", "corrector"), "문법 교정");

        localizer.set_language(Language::En).await;
        assert_eq!(localizer.language(), Language::En);
        assert_eq!(localizer.t_in("action", "corrector"), "Correct grammar");

        let saved: Option<String> = repo.load(LANGUAGE_KEY).unwrap();
        assert_eq!(saved.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_directory_source() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("en.json"),
            r#"{"corrector": {"action": "Fix it"}}"#,
        )
        .unwrap();
        let source = TranslationSource::Directory(dir.path().to_path_buf());

        let en = source.load(Language::En).await;
        assert_eq!(en.resolve("corrector.action", None), "Fix it");

        // Missing file falls back to the bundled default table
        let ja = source.load(Language::Ja).await;
        assert_eq!(ja.resolve("corrector.action", None), "문법 교정");
    }

    #[tokio::test]
    async fn test_directory_source_invalid_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("en.json"), "{ broken").unwrap();
        let source = TranslationSource::Directory(dir.path().to_path_buf());

        let en = source.load(Language::En).await;
        assert_eq!(en.resolve("corrector.action", None), "문법 교정");
    }
}
