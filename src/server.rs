use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::Config;
use crate::history::HistoryManager;
use crate::i18n::{system_locale, Localizer};
use crate::llm::CorrectionClient;
use crate::quota::{QuotaManager, SystemClock};
use crate::service::{CorrectionOutcome, CorrectionService};
use crate::storage::{FileStore, MemoryStore, Repository};
use crate::types::Language;

pub const CMD_CORRECT: &str = "grammafixer.correct";
pub const CMD_STATUS: &str = "grammafixer.status";
pub const CMD_HISTORY: &str = "grammafixer.history";
pub const CMD_REMOVE_HISTORY: &str = "grammafixer.removeHistory";
pub const CMD_CLEAR_HISTORY: &str = "grammafixer.clearHistory";
pub const CMD_SET_LANGUAGE: &str = "grammafixer.setLanguage";
pub const CMD_UPGRADE: &str = "grammafixer.upgrade";

const COMMANDS: [&str; 7] = [
    CMD_CORRECT,
    CMD_STATUS,
    CMD_HISTORY,
    CMD_REMOVE_HISTORY,
    CMD_CLEAR_HISTORY,
    CMD_SET_LANGUAGE,
    CMD_UPGRADE,
];

/// Document state stored for each open file
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub content: String,
    pub version: i32,
}

/// Everything the server needs besides the LSP client
pub struct AppContext {
    pub service: CorrectionService<CorrectionClient>,
    pub localizer: Localizer,
}

impl AppContext {
    /// Wire storage, quota, history, translations and the API client from `config`
    pub async fn from_config(config: Config) -> Self {
        let repository = match config.data_dir() {
            Some(dir) => {
                tracing::info!("Storing data in {}", dir.display());
                Repository::new(Arc::new(FileStore::new(dir)))
            }
            None => {
                tracing::warn!("No data directory available, history and quota will not persist");
                Repository::new(Arc::new(MemoryStore::new()))
            }
        };

        let source = config.translation_source();
        let locale_hint = config.i18n.language.clone().or_else(system_locale);
        let localizer = Localizer::detect(repository.clone(), source, locale_hint.as_deref()).await;

        let quota = QuotaManager::new(
            repository.clone(),
            Box::new(SystemClock),
            config.quota.daily_limit,
        );
        let history = HistoryManager::new(repository, config.quota.history_limit);

        let client = CorrectionClient::new(config);
        if !client.is_available() {
            tracing::warn!("No API key configured; corrections will return the original text");
        }

        Self {
            service: CorrectionService::new(quota, history, client),
            localizer,
        }
    }
}

/// GrammaFixer Language Server implementation
pub struct GrammaFixerServer {
    client: Client,
    documents: Arc<RwLock<HashMap<Url, DocumentState>>>,
    service: Arc<Mutex<CorrectionService<CorrectionClient>>>,
    localizer: Arc<Mutex<Localizer>>,
}

impl GrammaFixerServer {
    pub fn new(client: Client, context: AppContext) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            service: Arc::new(Mutex::new(context.service)),
            localizer: Arc::new(Mutex::new(context.localizer)),
        }
    }

    async fn t(&self, key: &str) -> String {
        self.localizer.lock().await.t(key)
    }

    /// Correct the text under `range` and replace it in the client
    async fn correct_range(&self, uri: Url, range: Range, language: Option<Language>) -> Result<Option<Value>> {
        let (text, version) = {
            let documents = self.documents.read().await;
            let doc = documents
                .get(&uri)
                .ok_or_else(|| Error::invalid_params(format!("Document not open: {}", uri)))?;
            let text = range_text(&doc.content, range)
                .ok_or_else(|| Error::invalid_params("Range is outside the document"))?
                .to_string();
            (text, doc.version)
        };

        let language = match language {
            Some(language) => language,
            None => self.localizer.lock().await.language(),
        };

        let submitted = {
            let service = self.service.lock().await;
            service.submit(&text, language).await
        };

        let outcome = match submitted {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!("Submission rejected: {}", e);
                let message = self.t(e.message_key()).await;
                self.client.show_message(MessageType::WARNING, message).await;
                return Ok(None);
            }
        };

        self.report(&uri, version, range, &outcome).await;
        Ok(Some(to_json(&outcome.result)?))
    }

    /// Apply a correction made against `version` of the document at `uri`
    async fn report(&self, uri: &Url, version: i32, range: Range, outcome: &CorrectionOutcome) {
        if let Some(failure) = &outcome.failure {
            let message = format!(
                "{}: {}",
                self.t("corrector.error").await,
                self.t(failure.message_key()).await
            );
            self.client.show_message(MessageType::ERROR, message).await;
            return;
        }

        if !outcome.changed() {
            let message = self.t("corrector.noCorrection").await;
            self.client.show_message(MessageType::INFO, message).await;
            return;
        }

        let current = self.documents.read().await.get(uri).map(|doc| doc.version);
        if current != Some(version) {
            tracing::warn!(
                "{} changed during correction (version {} -> {:?}), not applying edit",
                uri,
                version,
                current
            );
            return;
        }

        let edit = correction_edit(uri, version, range, &outcome.result.corrected_text);
        match self.client.apply_edit(edit).await {
            Ok(response) if response.applied => {
                let message = self.t("corrector.corrected").await;
                self.client.show_message(MessageType::INFO, message).await;
            }
            Ok(response) => {
                tracing::warn!("Client rejected correction edit: {:?}", response.failure_reason);
            }
            Err(e) => tracing::warn!("Failed to apply correction edit: {}", e),
        }

        if let Some(explanation) = &outcome.result.explanation {
            self.client.log_message(MessageType::INFO, explanation).await;
        }
    }
}

/// Edit replacing `range` with `new_text`, valid only for `version` of the document
fn correction_edit(uri: &Url, version: i32, range: Range, new_text: &str) -> WorkspaceEdit {
    WorkspaceEdit {
        document_changes: Some(DocumentChanges::Edits(vec![TextDocumentEdit {
            text_document: OptionalVersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: Some(version),
            },
            edits: vec![OneOf::Left(TextEdit {
                range,
                new_text: new_text.to_string(),
            })],
        }])),
        ..Default::default()
    }
}

/// Byte offset of an LSP position (UTF-16 columns), clamped to the line end
fn position_to_offset(text: &str, position: Position) -> Option<usize> {
    let mut line_start = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index == position.line as usize {
            let content = line.trim_end_matches(['\n', '\r']);
            let mut units = 0u32;
            for (byte, ch) in content.char_indices() {
                if units >= position.character {
                    return Some(line_start + byte);
                }
                units += ch.len_utf16() as u32;
            }
            return Some(line_start + content.len());
        }
        line_start += line.len();
    }

    // The position just past a trailing newline
    (position.line as usize == text.split_inclusive('\n').count()).then_some(text.len())
}

fn range_text(text: &str, range: Range) -> Option<&str> {
    let start = position_to_offset(text, range.start)?;
    let end = position_to_offset(text, range.end)?;
    text.get(start..end)
}

fn argument<T: DeserializeOwned>(arguments: &[Value], index: usize) -> Result<T> {
    let value = arguments
        .get(index)
        .cloned()
        .ok_or_else(|| Error::invalid_params(format!("Missing argument {}", index)))?;
    serde_json::from_value(value).map_err(|e| Error::invalid_params(e.to_string()))
}

fn optional_language(arguments: &[Value], index: usize) -> Option<Language> {
    arguments
        .get(index)
        .and_then(Value::as_str)
        .map(Language::from_code_or_default)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        let mut error = Error::internal_error();
        error.message = e.to_string().into();
        error
    })
}

#[tower_lsp::async_trait]
impl LanguageServer for GrammaFixerServer {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("GrammaFixer server initializing...");

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        ..Default::default()
                    },
                )),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "GrammaFixer".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("GrammaFixer server initialized!");
        self.client
            .log_message(MessageType::INFO, "GrammaFixer Language Server started")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("GrammaFixer server shutting down...");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document opened: {}", uri);

        let mut documents = self.documents.write().await;
        documents.insert(
            uri,
            DocumentState {
                content: params.text_document.text,
                version: params.text_document.version,
            },
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        if let Some(change) = params.content_changes.into_iter().last() {
            let mut documents = self.documents.write().await;
            documents.insert(uri, DocumentState { content: change.text, version });
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document closed: {}", uri);

        let mut documents = self.documents.write().await;
        documents.remove(&uri);
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let range = params.range;
        if range.start == range.end {
            return Ok(None);
        }

        let title = self.t("corrector.action").await;
        let command = Command {
            title: title.clone(),
            command: CMD_CORRECT.to_string(),
            arguments: Some(vec![to_json(&params.text_document.uri)?, to_json(&range)?]),
        };

        Ok(Some(vec![CodeActionOrCommand::CodeAction(CodeAction {
            title,
            kind: Some(CodeActionKind::REFACTOR_REWRITE),
            command: Some(command),
            ..Default::default()
        })]))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let args = params.arguments;
        tracing::debug!("Executing command: {}", params.command);

        match params.command.as_str() {
            CMD_CORRECT => {
                let uri: Url = argument(&args, 0)?;
                let range: Range = argument(&args, 1)?;
                self.correct_range(uri, range, optional_language(&args, 2)).await
            }
            CMD_STATUS => {
                let service = self.service.lock().await;
                Ok(Some(json!({
                    "status": to_json(&service.status())?,
                    "remaining": to_json(&service.remaining())?,
                })))
            }
            CMD_HISTORY => {
                let history = self.service.lock().await.history();
                Ok(Some(to_json(&history)?))
            }
            CMD_REMOVE_HISTORY => {
                let timestamp: String = argument(&args, 0)?;
                self.service.lock().await.remove_history(&timestamp);
                let message = self.t("history.removed").await;
                self.client.show_message(MessageType::INFO, message).await;
                Ok(None)
            }
            CMD_CLEAR_HISTORY => {
                self.service.lock().await.clear_history();
                let message = self.t("history.cleared").await;
                self.client.show_message(MessageType::INFO, message).await;
                Ok(None)
            }
            CMD_SET_LANGUAGE => {
                let code: String = argument(&args, 0)?;
                let language = Language::from_code_or_default(&code);
                let message = {
                    let mut localizer = self.localizer.lock().await;
                    localizer.set_language(language).await;
                    localizer.t("languages.changed")
                };
                self.client.show_message(MessageType::INFO, message).await;
                Ok(Some(json!(language.code())))
            }
            CMD_UPGRADE => {
                let status = self.service.lock().await.upgrade();
                let message = self.t("premium.upgraded").await;
                self.client.show_message(MessageType::INFO, message).await;
                Ok(Some(to_json(&status)?))
            }
            other => Err(Error::invalid_params(format!("Unknown command: {}", other))),
        }
    }
}
