//! In-memory store and relay fakes for driver and load tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use frames::Frame;
use frames::model::{Board, DEFAULT_BOARD_TITLE, SettingsPatch, Stroke, User};
use uuid::Uuid;

use super::{BoardStore, Relay};
use crate::error::SyncError;

#[derive(Default)]
pub struct MemoryStore {
    boards: Mutex<HashMap<String, Board>>,
    collaborators: Mutex<Vec<User>>,
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn with_board(board: Board) -> Self {
        let store = Self::default();
        store.boards.lock().expect("boards lock").insert(board.slug.clone(), board);
        store
    }

    pub fn set_collaborators(&self, users: Vec<User>) {
        *self.collaborators.lock().expect("collaborators lock") = users;
    }

    /// Make every later call fail like a dropped connection.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn board(&self, slug: &str) -> Option<Board> {
        self.boards.lock().expect("boards lock").get(slug).cloned()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), SyncError> {
        self.calls.lock().expect("calls lock").push(call.into());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Status { status: 503, body: "unavailable".into() });
        }
        Ok(())
    }

    fn with_board_mut(&self, slug: &str, f: impl FnOnce(&mut Board)) -> Result<(), SyncError> {
        let mut boards = self.boards.lock().expect("boards lock");
        let board = boards.get_mut(slug).ok_or_else(|| SyncError::NotFound(slug.to_owned()))?;
        f(board);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BoardStore for MemoryStore {
    async fn get_board(&self, slug: &str) -> Result<Board, SyncError> {
        self.record(format!("get_board:{slug}"))?;
        self.board(slug).ok_or_else(|| SyncError::NotFound(slug.to_owned()))
    }

    async fn create_board(&self, slug: &str, title: Option<&str>) -> Result<Board, SyncError> {
        self.record(format!("create_board:{slug}"))?;
        let mut boards = self.boards.lock().expect("boards lock");
        let board = boards.entry(slug.to_owned()).or_insert_with(|| Board {
            slug: slug.to_owned(),
            title: title.unwrap_or(DEFAULT_BOARD_TITLE).to_owned(),
            strokes: Vec::new(),
            is_layer_locked: false,
            collaboration_mode: frames::model::CollaborationMode::default(),
            collaborator_ids: Vec::new(),
        });
        Ok(board.clone())
    }

    async fn append_stroke(&self, slug: &str, stroke: &Stroke) -> Result<(), SyncError> {
        self.record(format!("append_stroke:{}", stroke.id))?;
        self.with_board_mut(slug, |board| board.strokes.push(stroke.clone()))
    }

    async fn clear_strokes(&self, slug: &str) -> Result<(), SyncError> {
        self.record("clear_strokes")?;
        self.with_board_mut(slug, |board| board.strokes.clear())
    }

    async fn update_settings(&self, slug: &str, patch: SettingsPatch) -> Result<(), SyncError> {
        self.record("update_settings")?;
        self.with_board_mut(slug, |board| {
            let settings = patch.apply(board.settings());
            board.is_layer_locked = settings.is_layer_locked;
            board.collaboration_mode = settings.collaboration_mode;
        })
    }

    async fn list_collaborators(&self, slug: &str) -> Result<Vec<User>, SyncError> {
        self.record(format!("list_collaborators:{slug}"))?;
        Ok(self.collaborators.lock().expect("collaborators lock").clone())
    }

    async fn add_collaborator(&self, _slug: &str, user_id: Uuid) -> Result<Vec<User>, SyncError> {
        self.record(format!("add_collaborator:{user_id}"))?;
        Ok(self.collaborators.lock().expect("collaborators lock").clone())
    }
}

#[derive(Default)]
pub struct RecordingRelay {
    sent: Mutex<Vec<Frame>>,
    failing: AtomicBool,
}

impl RecordingRelay {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn syscalls(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").iter().map(|f| f.syscall.clone()).collect()
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait::async_trait]
impl Relay for RecordingRelay {
    async fn send(&self, frame: Frame) -> Result<(), SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Closed);
        }
        self.sent.lock().expect("sent lock").push(frame);
        Ok(())
    }
}
