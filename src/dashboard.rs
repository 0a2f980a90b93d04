use std::sync::Arc;

use crate::api::TaskApi;
use crate::credentials::CredentialStore;
use crate::error::ClientError;
use crate::task::{Filter, Task, TaskDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    /// No usable credentials; the user has to sign in again.
    SignedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Adding,
    Editing(Task),
    ConfirmDelete(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftField {
    #[default]
    Title,
    Description,
}

/// In-memory view of the user's tasks. Every successful mutation is followed by
/// a full reload for the current filter; the list is never patched locally.
pub struct Dashboard<A: TaskApi> {
    api: A,
    credentials: Arc<dyn CredentialStore>,
    pub phase: Phase,
    pub filter: Filter,
    pub tasks: Vec<Task>,
    pub mode: Mode,
    pub draft: TaskDraft,
    pub focus: DraftField,
    pub selected: usize,
}

impl<A: TaskApi> Dashboard<A> {
    pub fn new(api: A, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            api,
            credentials,
            phase: Phase::Loading,
            filter: Filter::All,
            tasks: Vec::new(),
            mode: Mode::Idle,
            draft: TaskDraft::default(),
            focus: DraftField::Title,
            selected: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch the list for the current filter.
    pub async fn load(&mut self) {
        self.phase = Phase::Loading;
        match self.api.list_tasks(self.filter).await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.phase = Phase::Ready;
            }
            Err(err) if err.requires_sign_in() => {
                tracing::warn!("Sign in required: {}", err);
                self.tasks.clear();
                self.phase = Phase::SignedOut;
            }
            Err(err) => {
                tracing::error!("Failed to load tasks: {}", err);
                self.tasks.clear();
                self.phase = Phase::Ready;
            }
        }
        self.clamp_selection();
    }

    pub async fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.selected = 0;
        self.load().await;
    }

    pub fn open_add(&mut self) {
        self.draft.clear();
        self.focus = DraftField::Title;
        self.mode = Mode::Adding;
    }

    pub fn open_edit(&mut self, task: Task) {
        self.draft = TaskDraft::from_task(&task);
        self.focus = DraftField::Title;
        self.mode = Mode::Editing(task);
    }

    /// Close whatever modal is open without calling the server.
    pub fn cancel(&mut self) {
        if matches!(self.mode, Mode::Adding | Mode::Editing(_)) {
            self.draft.clear();
        }
        self.mode = Mode::Idle;
    }

    /// Send the open add/edit form. On failure the modal and draft stay as they were.
    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let result = match &self.mode {
            Mode::Adding => self.submit_add().await,
            Mode::Editing(task) => {
                let id = task.id;
                self.submit_edit(id).await
            }
            Mode::Idle | Mode::ConfirmDelete(_) => return Ok(()),
        };
        match result {
            Ok(()) => {
                self.draft.clear();
                self.mode = Mode::Idle;
                self.load().await;
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to save task: {}", err);
                Err(err)
            }
        }
    }

    async fn submit_add(&self) -> Result<(), ClientError> {
        let valid = self.draft.validate()?;
        self.api
            .create_task(&valid.title, valid.description.as_deref())
            .await?;
        Ok(())
    }

    async fn submit_edit(&self, id: i64) -> Result<(), ClientError> {
        let valid = self.draft.validate()?;
        self.api
            .update_task(id, Some(&valid.title), valid.description.as_deref())
            .await?;
        Ok(())
    }

    pub async fn toggle(&mut self, id: i64) -> Result<(), ClientError> {
        match self.api.toggle_complete(id).await {
            Ok(task) => {
                tracing::debug!("Task {} completed={}", task.id, task.completed);
                self.load().await;
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to toggle task {}: {}", id, err);
                Err(err)
            }
        }
    }

    /// First step of a delete; nothing is sent until [`Dashboard::confirm_delete`].
    pub fn request_delete(&mut self, id: i64) {
        self.mode = Mode::ConfirmDelete(id);
    }

    pub async fn confirm_delete(&mut self) -> Result<(), ClientError> {
        let Mode::ConfirmDelete(id) = self.mode else {
            return Ok(());
        };
        self.mode = Mode::Idle;
        match self.api.delete_task(id).await {
            Ok(()) => {
                self.load().await;
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to delete task {}: {}", id, err);
                Err(err)
            }
        }
    }

    pub fn logout(&mut self) {
        self.credentials.clear();
        self.tasks.clear();
        self.mode = Mode::Idle;
        self.phase = Phase::SignedOut;
        tracing::info!("Logged out");
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.tasks.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.tasks.len() {
            self.selected = self.tasks.len().saturating_sub(1);
        }
    }

    pub fn switch_field(&mut self) {
        self.focus = match self.focus {
            DraftField::Title => DraftField::Description,
            DraftField::Description => DraftField::Title,
        };
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            DraftField::Title => self.draft.title.push(c),
            DraftField::Description => self.draft.description.push(c),
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            DraftField::Title => self.draft.title.pop(),
            DraftField::Description => self.draft.description.pop(),
        };
    }
}
