//! Business rules on top of a [`JobBoardStore`]: input validation, credential
//! handling, company scoping for company admins and the application state machine.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Caller, PasswordHasher, TokenService};
use crate::error::{AppError, AppResult};
use crate::models::{
    Application, AssignRoleRequest, AuthResponse, Company, CompanyDetail, CompanySummary,
    CreateApplicationRequest, CreateCompanyRequest, CreateJobRequest, Job, JobChanges, JobPage,
    JobQuery, LoginRequest, NewApplication, NewCompany, NewJob, NewUser, PublicUser,
    RegisterRequest, Role, Stats, UpdateApplicationStatusRequest, UpdateJobRequest,
};
use crate::store::JobBoardStore;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_RESUME_REF_LEN: usize = 2048;

#[derive(Clone)]
pub struct JobBoard {
    store: Arc<dyn JobBoardStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl JobBoard {
    pub fn new(store: Arc<dyn JobBoardStore>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self { store, hasher, tokens }
    }

    pub fn store(&self) -> &Arc<dyn JobBoardStore> {
        &self.store
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    // --- accounts ---

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = normalise_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let role = request.role.unwrap_or(Role::User);
        if role == Role::Admin {
            return Err(AppError::forbidden("ADMIN accounts cannot be self-registered"));
        }

        let password_hash = self.hasher.hash(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                email,
                password_hash,
                name: optional_text(request.name),
                role,
                company_id: None,
            })
            .await?;
        info!(user_id = %user.id, role = user.role.as_str(), "user registered");

        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse { token, user: user.into() })
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let invalid = || AppError::unauthenticated("Invalid credentials");
        let email = normalise_email(&request.email).map_err(|_| invalid())?;

        let user = self.store.find_user_by_email(&email).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(request.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(invalid());
        }

        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse { token, user: user.into() })
    }

    pub async fn me(&self, caller: &Caller) -> AppResult<PublicUser> {
        self.store
            .find_user(caller.id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn assign_role(&self, user_id: Uuid, request: AssignRoleRequest) -> AppResult<PublicUser> {
        let user = self.store.assign_role(user_id, request.role, request.company_id).await?;
        info!(%user_id, role = user.role.as_str(), company_id = ?user.company_id, "role assigned");
        Ok(user.into())
    }

    // --- companies ---

    pub async fn list_companies(&self) -> AppResult<Vec<CompanySummary>> {
        Ok(self.store.list_companies().await?)
    }

    pub async fn get_company(&self, id: Uuid) -> AppResult<CompanyDetail> {
        self.store
            .find_company(id)
            .await?
            .ok_or_else(|| AppError::not_found("Company not found"))
    }

    pub async fn create_company(&self, request: CreateCompanyRequest) -> AppResult<Company> {
        let name = required_text(request.name, "name")?;
        let company = self
            .store
            .create_company(NewCompany {
                name,
                website: optional_text(request.website),
                description: optional_text(request.description),
                location: optional_text(request.location),
                industry: optional_text(request.industry),
                size: optional_text(request.size),
            })
            .await?;
        info!(company_id = %company.id, "company created");
        Ok(company)
    }

    // --- jobs ---

    pub async fn list_jobs(&self, query: JobQuery) -> AppResult<JobPage> {
        Ok(self.store.list_jobs(&query.into_filter()).await?)
    }

    pub async fn get_job(&self, id: Uuid) -> AppResult<Job> {
        self.store
            .find_job(id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))
    }

    pub async fn create_job(&self, caller: &Caller, request: CreateJobRequest) -> AppResult<Job> {
        let title = required_text(request.title, "title")?;
        let description = required_text(request.description, "description")?;
        self.ensure_company_scope(caller, request.company_id).await?;

        let job = self
            .store
            .create_job(NewJob {
                title,
                description,
                company_id: request.company_id,
                location: optional_text(request.location),
                salary: optional_text(request.salary),
                job_type: request.job_type.unwrap_or_default(),
                requirements: clean_list(request.requirements.unwrap_or_default()),
                benefits: clean_list(request.benefits.unwrap_or_default()),
            })
            .await?;
        info!(job_id = %job.id, company_id = %job.company_id, "job created");
        Ok(job)
    }

    pub async fn update_job(
        &self,
        caller: &Caller,
        id: Uuid,
        request: UpdateJobRequest,
    ) -> AppResult<Job> {
        let existing = self.get_job(id).await?;
        self.ensure_company_scope(caller, existing.company_id).await?;

        let changes = JobChanges {
            title: request.title.map(|t| required_text(t, "title")).transpose()?,
            description: request.description.map(|d| required_text(d, "description")).transpose()?,
            location: request.location.map(|l| optional_text(Some(l))),
            salary: request.salary.map(|s| optional_text(Some(s))),
            job_type: request.job_type,
            requirements: request.requirements.map(clean_list),
            benefits: request.benefits.map(clean_list),
            is_active: request.is_active,
        };
        Ok(self.store.update_job(id, changes).await?)
    }

    /// Soft delete: the job disappears from listings but stays readable.
    pub async fn deactivate_job(&self, caller: &Caller, id: Uuid) -> AppResult<Job> {
        let existing = self.get_job(id).await?;
        self.ensure_company_scope(caller, existing.company_id).await?;

        let job = self
            .store
            .update_job(id, JobChanges { is_active: Some(false), ..Default::default() })
            .await?;
        info!(job_id = %id, "job deactivated");
        Ok(job)
    }

    // --- applications ---

    pub async fn my_applications(&self, caller: &Caller) -> AppResult<Vec<Application>> {
        Ok(self.store.list_applications_for_user(caller.id).await?)
    }

    pub async fn apply(
        &self,
        caller: &Caller,
        request: CreateApplicationRequest,
    ) -> AppResult<Application> {
        let cover_letter = required_text(request.cover_letter.unwrap_or_default(), "coverLetter")?;
        let resume = match optional_text(request.resume) {
            Some(resume) if resume.len() > MAX_RESUME_REF_LEN => {
                return Err(AppError::validation("resume reference is too long"));
            }
            other => other,
        };

        let job = self.get_job(request.job_id).await?;
        if !job.is_active {
            return Err(AppError::validation("Job is no longer accepting applications"));
        }

        let application = self
            .store
            .create_application(NewApplication {
                user_id: caller.id,
                job_id: job.id,
                cover_letter,
                resume,
            })
            .await?;
        info!(application_id = %application.id, job_id = %job.id, user_id = %caller.id, "application submitted");
        Ok(application)
    }

    pub async fn applications_for_job(
        &self,
        caller: &Caller,
        job_id: Uuid,
    ) -> AppResult<Vec<Application>> {
        let job = self.get_job(job_id).await?;
        self.ensure_company_scope(caller, job.company_id).await?;
        Ok(self.store.list_applications_for_job(job_id).await?)
    }

    pub async fn update_application_status(
        &self,
        caller: &Caller,
        id: Uuid,
        request: UpdateApplicationStatusRequest,
    ) -> AppResult<Application> {
        let current = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| AppError::not_found("Application not found"))?;
        if let Some(job) = &current.job {
            self.ensure_company_scope(caller, job.company_id).await?;
        }

        // Transition rules are checked by the store against the row it writes.
        let updated = self.store.update_application_status(id, request.status).await?;
        info!(application_id = %id, status = updated.status.as_str(), "application status changed");
        Ok(updated)
    }

    // --- stats ---

    pub async fn stats(&self) -> AppResult<Stats> {
        Ok(self.store.stats().await?)
    }

    /// A COMPANY_ADMIN bound to a company may only act on that company.
    /// ADMINs and unbound company admins are unrestricted.
    async fn ensure_company_scope(&self, caller: &Caller, company_id: Uuid) -> AppResult<()> {
        if caller.role != Role::CompanyAdmin {
            return Ok(());
        }
        let Some(user) = self.store.find_user(caller.id).await? else {
            return Err(AppError::unauthenticated("Unknown user"));
        };
        match user.company_id {
            Some(own) if own != company_id => {
                Err(AppError::forbidden("Insufficient permissions for this company"))
            }
            _ => Ok(()),
        }
    }
}

fn normalise_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(AppError::validation("A valid email is required"));
    }
    Ok(email)
}

fn required_text(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
