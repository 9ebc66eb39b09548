//! Records and request bodies shared by the HTTP layer and both store adapters.
//!
//! Everything serialises as camelCase JSON; enum values use the
//! SCREAMING_SNAKE_CASE spellings clients already depend on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Default number of jobs returned by a listing.
pub const DEFAULT_JOB_LIMIT: u64 = 20;
/// Upper bound on a single listing page.
pub const MAX_JOB_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Caller role; gates which operations are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    CompanyAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::CompanyAdmin => "COMPANY_ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "COMPANY_ADMIN" => Ok(Role::CompanyAdmin),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "FULL_TIME",
            JobType::PartTime => "PART_TIME",
            JobType::Contract => "CONTRACT",
            JobType::Internship => "INTERNSHIP",
        }
    }
}

impl FromStr for JobType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_TIME" => Ok(JobType::FullTime),
            "PART_TIME" => Ok(JobType::PartTime),
            "CONTRACT" => Ok(JobType::Contract),
            "INTERNSHIP" => Ok(JobType::Internship),
            other => Err(UnknownVariant { kind: "job type", value: other.to_string() }),
        }
    }
}

/// Review state of an application.
///
/// `Pending` is the initial state. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Reviewed => "REVIEWED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Accepted | ApplicationStatus::Rejected)
    }

    /// Whether a status update from `self` to `next` is allowed.
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Reviewed | Accepted | Rejected),
            Reviewed => matches!(next, Accepted | Rejected),
            Accepted | Rejected => false,
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "REVIEWED" => Ok(ApplicationStatus::Reviewed),
            "ACCEPTED" => Ok(ApplicationStatus::Accepted),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            other => Err(UnknownVariant { kind: "application status", value: other.to_string() }),
        }
    }
}

// --- Stored records ---

/// A user as the stores hold it, password hash included. Never serialised
/// to clients; convert to [`PublicUser`] first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for PublicUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            company_id: user.company_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Minimal applicant info attached to applications a reviewer sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Applicant {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<&UserRecord> for Applicant {
    fn from(user: &UserRecord) -> Self {
        Self { id: user.id, email: user.email.clone(), name: user.name.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Company listing entry annotated with its active job count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    #[serde(flatten)]
    pub company: Company,
    pub job_count: u64,
}

/// A company with its active jobs, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company_id: Uuid,
    pub location: Option<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning company, attached on every read. `null` if the company could
    /// not be resolved.
    #[serde(default)]
    pub company: Option<Company>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Applicant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Stats {
    pub companies: u64,
    /// Active jobs only.
    pub jobs: u64,
    pub applications: u64,
    pub users: u64,
}

// --- Store inputs ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company_id: Uuid,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: JobType,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
}

/// Partial job update; `None` leaves a field untouched. For the optional
/// text fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Option<String>>,
    pub salary: Option<Option<String>>,
    pub job_type: Option<JobType>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub cover_letter: String,
    pub resume: Option<String>,
}

/// Case folding used for every text search. Unicode-aware, so stores must
/// fold with this rather than a database `lower()`.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Normalised job listing filter handed to the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFilter {
    /// Lower-cased free-text term matched against title, description and company name.
    pub search: Option<String>,
    /// Lower-cased company name substring.
    pub company: Option<String>,
    pub company_id: Option<Uuid>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self { search: None, company: None, company_id: None, limit: DEFAULT_JOB_LIMIT, offset: 0 }
    }
}

impl JobFilter {
    /// Whether a job (with its company attached) satisfies the text filters.
    /// Does not look at the active flag or paging.
    pub fn matches(&self, job: &Job) -> bool {
        let company_name = job.company.as_ref().map(|c| fold_case(&c.name));
        if let Some(id) = self.company_id {
            if job.company_id != id {
                return false;
            }
        }
        if let Some(company) = &self.company {
            match &company_name {
                Some(name) if name.contains(company.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(term) = &self.search {
            let hit = fold_case(&job.title).contains(term.as_str())
                || fold_case(&job.description).contains(term.as_str())
                || company_name.as_deref().is_some_and(|name| name.contains(term.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }
}

// --- Request bodies ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    /// USER (default) or COMPANY_ADMIN. ADMIN cannot be self-assigned.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Query string of `GET /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JobQuery {
    /// Case-insensitive match against title, description and company name
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive company name substring
    #[serde(default)]
    pub company: Option<String>,
    /// Exact owning company id
    #[serde(default)]
    pub company_id: Option<Uuid>,
    /// Page size (default 20, max 100)
    #[serde(default)]
    pub limit: Option<u64>,
    /// Number of matching jobs to skip (default 0)
    #[serde(default)]
    pub offset: Option<u64>,
}

impl JobQuery {
    pub fn into_filter(self) -> JobFilter {
        fn normalise(value: Option<String>) -> Option<String> {
            value.map(|v| fold_case(v.trim())).filter(|v| !v.is_empty())
        }

        JobFilter {
            search: normalise(self.search),
            company: normalise(self.company),
            company_id: self.company_id,
            limit: self.limit.unwrap_or(DEFAULT_JOB_LIMIT).clamp(1, MAX_JOB_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub company_id: Uuid,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// A blank value clears the location
    #[serde(default)]
    pub location: Option<String>,
    /// A blank value clears the salary
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub cover_letter: Option<String>,
    /// URL or storage reference of an uploaded resume
    #[serde(default)]
    pub resume: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<Uuid>,
}
