//! State of each visit to the story screen.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::StoryError, models::{StoryRequest, StoryResult}};

/// Visits older than this are dropped the next time one is created.
pub const VISIT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    Loading,
    Error(String),
    Success(StoryResult),
}

#[derive(Debug)]
pub struct StoryVisit {
    pub request: StoryRequest,
    state: ScreenState,
    started: bool,
    pub created_at: DateTime<Utc>,
}

impl StoryVisit {
    pub fn new(request: StoryRequest) -> Self {
        Self { request, state: ScreenState::Loading, started: false, created_at: Utc::now() }
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    /// Claims the one generation run this visit gets. Only the first call returns true.
    pub fn begin(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    /// Leaves `Loading` for good. Returns false if the visit had already settled.
    pub fn finish(&mut self, outcome: Result<StoryResult, StoryError>) -> bool {
        if self.state != ScreenState::Loading {
            return false;
        }
        self.state = match outcome {
            Ok(result) => ScreenState::Success(result),
            Err(e) => ScreenState::Error(e.user_message()),
        };
        true
    }

    pub fn result(&self) -> Option<&StoryResult> {
        match self.state() {
            ScreenState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn view(&self) -> StoryView {
        let name = &self.request.child_name;
        let mut view = StoryView {
            title: format!("{name}'s Adventure"),
            child_name: name.clone(),
            status: "loading",
            message: None,
            paragraphs: Vec::new(),
            story_image: None,
            show_placeholder: false,
        };
        match &self.state {
            ScreenState::Loading => {
                view.message = Some(format!("Our AI is crafting a magical adventure for {name}"));
            }
            ScreenState::Error(message) => {
                view.status = "error";
                view.message = Some(message.clone());
            }
            ScreenState::Success(result) => {
                view.status = "success";
                view.paragraphs = result.paragraphs().into_iter().map(str::to_string).collect();
                view.story_image = result.story_image.clone();
                view.show_placeholder = result.story_image.is_none();
            }
        }
        view
    }
}

/// What the story page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub title: String,
    pub child_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub paragraphs: Vec<String>,
    pub story_image: Option<String>,
    pub show_placeholder: bool,
}

/// In-memory visits keyed by id. Nothing here outlives the process.
#[derive(Clone, Default)]
pub struct Visits {
    inner: Arc<RwLock<HashMap<Uuid, StoryVisit>>>,
}

impl Visits {
    pub fn create(&self, request: StoryRequest) -> Uuid {
        let id = Uuid::new_v4();
        let cutoff = Utc::now() - Duration::minutes(VISIT_TTL_MINUTES);
        let mut guard = self.inner.write();
        let before = guard.len();
        guard.retain(|_, visit| visit.created_at > cutoff);
        if guard.len() < before {
            tracing::debug!("Pruned {} stale visits", before - guard.len());
        }
        guard.insert(id, StoryVisit::new(request));
        id
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.read().contains_key(id)
    }

    /// Returns the request to generate for if this caller won the start guard.
    pub fn begin(&self, id: &Uuid) -> Option<StoryRequest> {
        let mut guard = self.inner.write();
        let visit = guard.get_mut(id)?;
        visit.begin().then(|| visit.request.clone())
    }

    pub fn finish(&self, id: &Uuid, outcome: Result<StoryResult, StoryError>) -> bool {
        match self.inner.write().get_mut(id) {
            Some(visit) => visit.finish(outcome),
            // Pruned while generating; the result has nowhere to go.
            None => false,
        }
    }

    pub fn view(&self, id: &Uuid) -> Option<StoryView> {
        self.inner.read().get(id).map(StoryVisit::view)
    }

    /// The child's name and finished result, if the visit reached success.
    pub fn finished(&self, id: &Uuid) -> Option<Option<(String, StoryResult)>> {
        let guard = self.inner.read();
        let visit = guard.get(id)?;
        Some(visit.result().map(|r| (visit.request.child_name.clone(), r.clone())))
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &Uuid, minutes: i64) {
        if let Some(visit) = self.inner.write().get_mut(id) {
            visit.created_at = visit.created_at - Duration::minutes(minutes);
        }
    }
}
