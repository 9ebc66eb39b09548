//! Data-access layer.
//!
//! [`JobBoardStore`] lists every persistence operation the job board needs.
//! Two adapters implement it: [`SqlStore`] on a relational database through
//! sea-orm, and [`DocumentStore`] on in-process document collections. Both
//! return records with their related entities already attached (company on
//! job, job on application), so callers never issue follow-up lookups.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend};
use crate::models::{
    Application, ApplicationStatus, Company, CompanyDetail, CompanySummary, Job, JobChanges,
    JobFilter, JobPage, NewApplication, NewCompany, NewJob, NewUser, Role, Stats, UserRecord,
};

pub mod document;
pub mod seed;
pub mod sql;

pub use document::DocumentStore;
pub use sql::SqlStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Cannot change application status from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: ApplicationStatus, to: ApplicationStatus },
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait JobBoardStore: Send + Sync {
    /// Inserts a user. Fails with `Conflict` if the e-mail is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    /// Sets role and owning company. `NotFound` if the user or company is missing.
    async fn assign_role(
        &self,
        id: Uuid,
        role: Role,
        company_id: Option<Uuid>,
    ) -> StoreResult<UserRecord>;

    /// All companies, newest first, each with its active job count.
    async fn list_companies(&self) -> StoreResult<Vec<CompanySummary>>;
    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyDetail>>;
    async fn create_company(&self, company: NewCompany) -> StoreResult<Company>;

    /// Active jobs matching the filter, newest first, plus the total match count.
    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<JobPage>;
    /// A job by id regardless of its active flag.
    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>>;
    /// `NotFound` if the owning company does not exist.
    async fn create_job(&self, job: NewJob) -> StoreResult<Job>;
    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job>;

    /// The user's applications, newest first, each with job and company attached.
    async fn list_applications_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Application>>;
    /// Applications for one job, newest first, each with its applicant attached.
    async fn list_applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>>;
    /// An application with job and company attached.
    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>>;
    /// Inserts a PENDING application unless one exists for the same
    /// (user, job) pair, in which case it fails with `Conflict`.
    async fn create_application(&self, application: NewApplication) -> StoreResult<Application>;
    /// Moves the application to `status` if its current status allows it,
    /// checking and writing as one atomic step; `InvalidTransition` otherwise.
    /// Returns the application with job, company and applicant attached.
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application>;

    async fn stats(&self) -> StoreResult<Stats>;
}

/// Opens the store selected by the configuration.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn JobBoardStore>> {
    match config.store_backend {
        StoreBackend::Sql => {
            let mut options = ConnectOptions::new(config.database_url.clone());
            options.sqlx_logging(false);
            let db = Database::connect(options).await?;
            let store = SqlStore::new(db);
            store.migrate().await?;
            tracing::info!("using relational store");
            Ok(Arc::new(store))
        }
        StoreBackend::Document => {
            let store = match &config.document_store_path {
                Some(path) => DocumentStore::open(path).await?,
                None => DocumentStore::in_memory(),
            };
            tracing::info!(path = ?config.document_store_path, "using document store");
            Ok(Arc::new(store))
        }
    }
}
