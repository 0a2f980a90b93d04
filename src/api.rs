use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::credentials::{CredentialStore, Credentials};
use crate::error::ClientError;
use crate::task::{Filter, Task};

/// The task operations the dashboard depends on. Each call is one round trip.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, filter: Filter) -> Result<Vec<Task>, ClientError>;

    async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, ClientError>;

    /// Fields passed as `None` are left unchanged by the server.
    async fn update_task(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task, ClientError>;

    async fn delete_task(&self, id: i64) -> Result<(), ClientError>;

    async fn toggle_complete(&self, id: i64) -> Result<Task, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SigninRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    title: &'a str,
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateTaskRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// HTTP client for the to-do API. Reads the credential store before every call.
#[derive(Clone)]
pub struct HttpTaskClient {
    client: reqwest::Client,
    base_url: Arc<str>,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTaskClient {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            credentials,
        }
    }

    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }

    /// Register a new account and remember its credentials.
    #[tracing::instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User, ClientError> {
        let url = format!("{}/auth/signup", self.base_url);
        let req = SignupRequest {
            email,
            password,
            name,
        };
        let response = self.client.post(&url).json(&req).send().await?;
        self.finish_auth(response, "Signup failed").await
    }

    /// Log in and remember the returned credentials.
    #[tracing::instrument(skip(self, password))]
    pub async fn signin(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let url = format!("{}/auth/signin", self.base_url);
        let req = SigninRequest { email, password };
        let response = self.client.post(&url).json(&req).send().await?;
        self.finish_auth(response, "Login failed").await
    }

    pub fn logout(&self) {
        self.credentials.clear();
        tracing::info!("Cleared stored credentials");
    }

    async fn finish_auth(&self, response: Response, fallback: &str) -> Result<User, ClientError> {
        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .and_then(|detail| detail.as_str().map(str::to_string));
            tracing::warn!("Authentication rejected with status {}", status);
            return Err(ClientError::AuthFailed(
                detail.unwrap_or_else(|| fallback.to_string()),
            ));
        }

        let user: User = response.json().await?;
        if let Some(token) = &user.token {
            self.credentials.save(&Credentials::new(token.as_str(), user.id.as_str()));
            tracing::info!("Signed in as {}", user.email);
        }
        Ok(user)
    }

    fn current_credentials(&self) -> Result<Credentials, ClientError> {
        self.credentials.read().ok_or(ClientError::Unauthenticated)
    }

    fn task_request(&self, method: Method, credentials: &Credentials, suffix: &str) -> RequestBuilder {
        let url = format!("{}/api/{}/tasks{}", self.base_url, credentials.user_id, suffix);
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", credentials.token))
    }
}

fn ensure_success(response: Response, operation: &'static str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::FetchFailed { operation, status })
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, filter: Filter) -> Result<Vec<Task>, ClientError> {
        let credentials = self.current_credentials()?;
        let response = self
            .task_request(Method::GET, &credentials, "")
            .query(&[("status", filter.as_str())])
            .send()
            .await?;
        let tasks: Vec<Task> = ensure_success(response, "fetch tasks")?.json().await?;
        tracing::debug!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, description))]
    async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, ClientError> {
        let credentials = self.current_credentials()?;
        let req = CreateTaskRequest { title, description };
        let response = self
            .task_request(Method::POST, &credentials, "")
            .json(&req)
            .send()
            .await?;
        let task: Task = ensure_success(response, "create task")?.json().await?;
        tracing::info!("Created task {}", task.id);
        Ok(task)
    }

    #[tracing::instrument(skip(self, description))]
    async fn update_task(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task, ClientError> {
        let credentials = self.current_credentials()?;
        let req = UpdateTaskRequest { title, description };
        let response = self
            .task_request(Method::PUT, &credentials, &format!("/{}", id))
            .json(&req)
            .send()
            .await?;
        let task: Task = ensure_success(response, "update task")?.json().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: i64) -> Result<(), ClientError> {
        let credentials = self.current_credentials()?;
        let response = self
            .task_request(Method::DELETE, &credentials, &format!("/{}", id))
            .send()
            .await?;
        ensure_success(response, "delete task")?;
        tracing::info!("Deleted task {}", id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn toggle_complete(&self, id: i64) -> Result<Task, ClientError> {
        let credentials = self.current_credentials()?;
        let response = self
            .task_request(Method::PATCH, &credentials, &format!("/{}/complete", id))
            .send()
            .await?;
        let task: Task = ensure_success(response, "toggle task")?.json().await?;
        Ok(task)
    }
}
