//! REST adapter for the board store.

use frames::model::{Board, SettingsPatch, Stroke, User};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::BoardStore;
use crate::error::SyncError;

#[derive(Clone, Debug)]
pub struct HttpBoardStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBoardStore {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let response = self.http.get(self.url(path)).send().await?;
        read_json(path, response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, SyncError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        read_json(path, response).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T, SyncError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::NotFound(path.to_owned()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::Status { status: status.as_u16(), body });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait::async_trait]
impl BoardStore for HttpBoardStore {
    async fn get_board(&self, slug: &str) -> Result<Board, SyncError> {
        self.get(&format!("/api/boards/{slug}")).await
    }

    async fn create_board(&self, slug: &str, title: Option<&str>) -> Result<Board, SyncError> {
        self.post("/api/boards", &serde_json::json!({ "slug": slug, "title": title })).await
    }

    async fn append_stroke(&self, slug: &str, stroke: &Stroke) -> Result<(), SyncError> {
        let _: Board = self
            .post(&format!("/api/boards/{slug}/strokes"), &serde_json::json!({ "stroke": stroke }))
            .await?;
        Ok(())
    }

    async fn clear_strokes(&self, slug: &str) -> Result<(), SyncError> {
        let _: Board = self
            .post(&format!("/api/boards/{slug}/clear"), &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn update_settings(&self, slug: &str, patch: SettingsPatch) -> Result<(), SyncError> {
        let _: Board = self.post(&format!("/api/boards/{slug}/settings"), &patch).await?;
        Ok(())
    }

    async fn list_collaborators(&self, slug: &str) -> Result<Vec<User>, SyncError> {
        self.get(&format!("/api/users/boards/{slug}")).await
    }

    async fn add_collaborator(&self, slug: &str, user_id: Uuid) -> Result<Vec<User>, SyncError> {
        self.post(&format!("/api/users/boards/{slug}/add"), &serde_json::json!({ "user_id": user_id }))
            .await
    }
}

impl HttpBoardStore {
    /// Create or update a user by email.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error.
    pub async fn upsert_user(&self, email: &str, name: Option<&str>, color: Option<&str>) -> Result<User, SyncError> {
        self.post("/api/users/upsert", &serde_json::json!({ "email": email, "name": name, "color": color }))
            .await
    }

    /// # Errors
    ///
    /// Returns a transport or status error.
    pub async fn remove_collaborator(&self, slug: &str, user_id: Uuid) -> Result<Vec<User>, SyncError> {
        self.post(&format!("/api/users/boards/{slug}/remove"), &serde_json::json!({ "user_id": user_id }))
            .await
    }

    /// Live roster of the room, straight from the server's hub.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error.
    pub async fn presence(&self, slug: &str) -> Result<Vec<frames::model::Presence>, SyncError> {
        self.get(&format!("/api/boards/{slug}/presence")).await
    }

    /// # Errors
    ///
    /// Returns a transport error or a non-success status.
    pub async fn health(&self) -> Result<(), SyncError> {
        let response = self.http.get(self.url("/healthz")).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Status { status: status.as_u16(), body: String::new() })
        }
    }
}
