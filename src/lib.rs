pub mod api;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod task;
pub mod ui;

pub use api::{HttpTaskClient, TaskApi, User};
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use dashboard::Dashboard;
pub use error::ClientError;
pub use task::{Filter, Task, TaskDraft};
