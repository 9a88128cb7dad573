//! Scripted language model for tests and dry runs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Completion, CompletionRequest, LanguageModel, TokenUsage};
use crate::errors::{AppError, Result};

/// Replays queued responses in order and records every request.
///
/// An exhausted script fails with `AppError::Internal`.
#[derive(Default)]
pub struct ScriptedLanguageModel {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion
    pub fn push(&self, content: impl Into<String>) -> &Self {
        self.lock_responses().push_back(Ok(content.into()));
        self
    }

    /// Queue a failure
    pub fn push_error(&self, error: AppError) -> &Self {
        self.lock_responses().push_back(Err(error));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.lock_responses().pop_front();
        match next {
            Some(Ok(content)) => Ok(Completion {
                usage: TokenUsage {
                    completion_tokens: content.chars().count() as u32,
                    ..TokenUsage::default()
                },
                content,
                model: self.model_name().to_string(),
                finish_reason: "stop".to_string(),
            }),
            Some(Err(e)) => Err(e),
            None => Err(AppError::Internal {
                message: "Scripted language model has no responses left".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
