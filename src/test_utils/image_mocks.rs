//! Scripted image API double.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::application::ports::image_editor::{
    ImageAttemptError, ImageEditRequest, ImageEditorPort,
};

/// Replays queued outcomes in order; an empty queue answers 500.
#[derive(Default)]
pub struct ScriptedImageEditor {
    outcomes: Mutex<VecDeque<Result<Value, ImageAttemptError>>>,
    requests: Mutex<Vec<ImageEditRequest>>,
}

impl ScriptedImageEditor {
    pub fn new(outcomes: Vec<Result<Value, ImageAttemptError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ImageEditRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ImageEditorPort for ScriptedImageEditor {
    async fn edit_once(&self, request: &ImageEditRequest) -> Result<Value, ImageAttemptError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ImageAttemptError::Status {
                status: 500,
                body: None,
            }))
    }
}
