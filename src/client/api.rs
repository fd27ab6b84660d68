//! Async HTTP client for the tracker store's JSON API.

use super::error::{ClientError, Result};
use crate::models::{
    AddHabitRequest, DeleteHabitRequest, EditHabitRequest, ErrorResponse, MutationResponse,
    SetStatusRequest, Statistics, StatusSymbol, TableSnapshot,
};
use crate::tracker::View;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// `GET /api/habits` or `GET /api/week/{n}`
    pub async fn snapshot(&self, view: View) -> Result<TableSnapshot> {
        let path = match view {
            View::All => "/habits".to_string(),
            View::Week(week) => format!("/week/{week}"),
        };
        send(self.client.get(self.url(&path))).await
    }

    /// `GET /api/stats`
    pub async fn statistics(&self) -> Result<Statistics> {
        send(self.client.get(self.url("/stats"))).await
    }

    /// `POST /api/habits/status`
    pub async fn set_status(&self, habit: &str, date: &str, status: StatusSymbol) -> Result<()> {
        let body = SetStatusRequest {
            habit_name: habit.to_string(),
            date: date.to_string(),
            status,
        };
        let _: MutationResponse = self.post("/habits/status", &body).await?;
        Ok(())
    }

    /// `POST /api/habits/add`
    pub async fn add_habit(&self, name: &str, emoji: Option<&str>) -> Result<MutationResponse> {
        let body = AddHabitRequest {
            name: name.to_string(),
            emoji: emoji.map(str::to_string),
        };
        self.post("/habits/add", &body).await
    }

    /// `POST /api/habits/edit`
    pub async fn edit_habit(
        &self,
        old_name: &str,
        new_name: &str,
        emoji: Option<&str>,
    ) -> Result<MutationResponse> {
        let body = EditHabitRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            emoji: emoji.map(str::to_string),
        };
        self.post("/habits/edit", &body).await
    }

    /// `POST /api/habits/delete`
    pub async fn delete_habit(&self, name: &str) -> Result<MutationResponse> {
        let body = DeleteHabitRequest {
            habit_name: name.to_string(),
        };
        self.post("/habits/delete", &body).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        send(self.client.post(self.url(path)).json(body)).await
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorResponse>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Rejected { status, message });
    }
    serde_json::from_slice(&bytes).map_err(ClientError::Malformed)
}
