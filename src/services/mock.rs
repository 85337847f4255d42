//! Scripted generation backend for tests. Replies are consumed in order;
//! when the script runs dry an empty candidate list is returned.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::gemini_service::{GenerateOptions, GenerateResponse, GenerationBackend};

#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<GenerateResponse>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(GenerateResponse {
                candidates: vec![text.to_string()],
            }));
    }

    pub fn push_error(&self, err: AppError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, prompt: &str, _opts: GenerateOptions) -> Result<GenerateResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateResponse::default()))
    }
}
