//! GrammaFixer - grammar correction Language Server
//!
//! Corrects Korean, English and Japanese text through a generative-text API,
//! with a daily free-tier quota and a local correction history.

pub mod config;
pub mod error;
pub mod history;
pub mod i18n;
pub mod llm;
pub mod quota;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;
