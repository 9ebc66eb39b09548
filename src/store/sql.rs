use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::{Expr, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
};
use serde_json::Value as Json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{JobBoardStore, StoreError, StoreResult};
use crate::entities::{application, company, job, user};
use crate::models::{
    fold_case, Applicant, Application, ApplicationStatus, Company, CompanyDetail, CompanySummary,
    Job, JobChanges, JobFilter, JobPage, NewApplication, NewCompany, NewJob, NewUser, Role, Stats,
    UserRecord,
};

/// Status updates retried after losing a compare-and-swap race.
const STATUS_UPDATE_ATTEMPTS: usize = 3;

/// Relational store backed by sea-orm (PostgreSQL in production, SQLite
/// for local runs and tests).
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        Migrator::up(&self.db, None).await
    }

    async fn companies_by_id(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> StoreResult<HashMap<Uuid, Company>> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = company::Entity::find()
            .filter(company::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| (row.id, company_from_model(row))).collect())
    }

    async fn attach_companies(&self, rows: Vec<job::Model>) -> StoreResult<Vec<Job>> {
        let companies = self.companies_by_id(rows.iter().map(|row| row.company_id)).await?;
        rows.into_iter()
            .map(|row| {
                let company = companies.get(&row.company_id).cloned();
                job_from_model(row, company)
            })
            .collect()
    }

    async fn jobs_by_id(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> StoreResult<HashMap<Uuid, Job>> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = job::Entity::find()
            .filter(job::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        let jobs = self.attach_companies(rows).await?;
        Ok(jobs.into_iter().map(|job| (job.id, job)).collect())
    }

    async fn applicants_by_id(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> StoreResult<HashMap<Uuid, Applicant>> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.id, Applicant { id: row.id, email: row.email, name: row.name }))
            .collect())
    }
}

#[async_trait]
impl JobBoardStore for SqlStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<UserRecord> {
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(new_user.email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let am = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            name: Set(new_user.name),
            role: Set(new_user.role.as_str().to_string()),
            company_id: Set(new_user.company_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match am.insert(&self.db).await {
            Ok(model) => user_from_model(model),
            // Lost a race with a concurrent registration.
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(user_from_model)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(user_from_model)
            .transpose()
    }

    async fn assign_role(
        &self,
        id: Uuid,
        role: Role,
        company_id: Option<Uuid>,
    ) -> StoreResult<UserRecord> {
        let row = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound("User not found".to_string()))?;

        if let Some(company_id) = company_id {
            if company::Entity::find_by_id(company_id).one(&self.db).await?.is_none() {
                return Err(StoreError::NotFound("Company not found".to_string()));
            }
        }

        let mut am: user::ActiveModel = row.into();
        am.role = Set(role.as_str().to_string());
        am.company_id = Set(company_id);
        am.updated_at = Set(Utc::now());
        user_from_model(am.update(&self.db).await?)
    }

    async fn list_companies(&self) -> StoreResult<Vec<CompanySummary>> {
        let rows = company::Entity::find()
            .order_by_desc(company::Column::CreatedAt)
            .all(&self.db)
            .await?;

        // One count query per company.
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let job_count = job::Entity::find()
                .filter(job::Column::CompanyId.eq(row.id))
                .filter(job::Column::IsActive.eq(true))
                .count(&self.db)
                .await?;
            summaries.push(CompanySummary { company: company_from_model(row), job_count });
        }
        Ok(summaries)
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyDetail>> {
        let Some(row) = company::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let company = company_from_model(row);

        let jobs = job::Entity::find()
            .filter(job::Column::CompanyId.eq(id))
            .filter(job::Column::IsActive.eq(true))
            .order_by_desc(job::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| job_from_model(row, Some(company.clone())))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(CompanyDetail { company, jobs }))
    }

    async fn create_company(&self, new_company: NewCompany) -> StoreResult<Company> {
        let now = Utc::now();
        let am = company::ActiveModel {
            id: Set(Uuid::new_v4()),
            name_folded: Set(fold_case(&new_company.name)),
            name: Set(new_company.name),
            website: Set(new_company.website),
            description: Set(new_company.description),
            location: Set(new_company.location),
            industry: Set(new_company.industry),
            size: Set(new_company.size),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(&self.db).await?;
        debug!(company_id = %model.id, "company inserted");
        Ok(company_from_model(model))
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<JobPage> {
        let mut select = job::Entity::find()
            .join(JoinType::InnerJoin, job::Relation::Company.def())
            .filter(job::Column::IsActive.eq(true));

        if let Some(company_id) = filter.company_id {
            select = select.filter(job::Column::CompanyId.eq(company_id));
        }
        if let Some(name) = &filter.company {
            select = select.filter(contains((company::Entity, company::Column::NameFolded), name));
        }
        if let Some(term) = &filter.search {
            select = select.filter(
                Condition::any()
                    .add(contains((job::Entity, job::Column::TitleFolded), term))
                    .add(contains((job::Entity, job::Column::DescriptionFolded), term))
                    .add(contains((company::Entity, company::Column::NameFolded), term)),
            );
        }

        let total = select.clone().count(&self.db).await?;
        let rows = select
            .order_by_desc(job::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?;
        debug!(total, returned = rows.len(), "job listing");

        let jobs = self.attach_companies(rows).await?;
        Ok(JobPage { jobs, total })
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let Some(row) = job::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let company = company::Entity::find_by_id(row.company_id)
            .one(&self.db)
            .await?
            .map(company_from_model);
        job_from_model(row, company).map(Some)
    }

    async fn create_job(&self, new_job: NewJob) -> StoreResult<Job> {
        let company = company::Entity::find_by_id(new_job.company_id)
            .one(&self.db)
            .await?
            .map(company_from_model)
            .ok_or_else(|| StoreError::NotFound("Company not found".to_string()))?;

        let now = Utc::now();
        let am = job::ActiveModel {
            id: Set(Uuid::new_v4()),
            title_folded: Set(fold_case(&new_job.title)),
            description_folded: Set(fold_case(&new_job.description)),
            title: Set(new_job.title),
            description: Set(new_job.description),
            company_id: Set(new_job.company_id),
            location: Set(new_job.location),
            salary: Set(new_job.salary),
            job_type: Set(new_job.job_type.as_str().to_string()),
            requirements: Set(strings_to_json(new_job.requirements)),
            benefits: Set(strings_to_json(new_job.benefits)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(&self.db).await?;
        debug!(job_id = %model.id, "job inserted");
        job_from_model(model, Some(company))
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job> {
        let row = job::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound("Job not found".to_string()))?;

        let mut am: job::ActiveModel = row.into();
        if let Some(title) = changes.title {
            am.title_folded = Set(fold_case(&title));
            am.title = Set(title);
        }
        if let Some(description) = changes.description {
            am.description_folded = Set(fold_case(&description));
            am.description = Set(description);
        }
        if let Some(location) = changes.location {
            am.location = Set(location);
        }
        if let Some(salary) = changes.salary {
            am.salary = Set(salary);
        }
        if let Some(job_type) = changes.job_type {
            am.job_type = Set(job_type.as_str().to_string());
        }
        if let Some(requirements) = changes.requirements {
            am.requirements = Set(strings_to_json(requirements));
        }
        if let Some(benefits) = changes.benefits {
            am.benefits = Set(strings_to_json(benefits));
        }
        if let Some(is_active) = changes.is_active {
            am.is_active = Set(is_active);
        }
        am.updated_at = Set(Utc::now());

        let model = am.update(&self.db).await?;
        let company = company::Entity::find_by_id(model.company_id)
            .one(&self.db)
            .await?
            .map(company_from_model);
        job_from_model(model, company)
    }

    async fn list_applications_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Application>> {
        let rows = application::Entity::find()
            .filter(application::Column::UserId.eq(user_id))
            .order_by_desc(application::Column::AppliedAt)
            .all(&self.db)
            .await?;

        let jobs = self.jobs_by_id(rows.iter().map(|row| row.job_id)).await?;
        rows.into_iter()
            .map(|row| {
                let job = jobs.get(&row.job_id).cloned();
                let mut application = application_from_model(row)?;
                application.job = job;
                Ok(application)
            })
            .collect()
    }

    async fn list_applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        let rows = application::Entity::find()
            .filter(application::Column::JobId.eq(job_id))
            .order_by_desc(application::Column::AppliedAt)
            .all(&self.db)
            .await?;

        let applicants = self.applicants_by_id(rows.iter().map(|row| row.user_id)).await?;
        rows.into_iter()
            .map(|row| {
                let applicant = applicants.get(&row.user_id).cloned();
                let mut application = application_from_model(row)?;
                application.user = applicant;
                Ok(application)
            })
            .collect()
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let Some(row) = application::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let job = self.find_job(row.job_id).await?;
        let mut application = application_from_model(row)?;
        application.job = job;
        Ok(Some(application))
    }

    async fn create_application(&self, new_application: NewApplication) -> StoreResult<Application> {
        let existing = application::Entity::find()
            .filter(application::Column::UserId.eq(new_application.user_id))
            .filter(application::Column::JobId.eq(new_application.job_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            info!(user_id = %new_application.user_id, job_id = %new_application.job_id, "duplicate application rejected");
            return Err(StoreError::Conflict("Already applied to this job".to_string()));
        }

        let now = Utc::now();
        let am = application::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new_application.user_id),
            job_id: Set(new_application.job_id),
            status: Set(ApplicationStatus::Pending.as_str().to_string()),
            cover_letter: Set(Some(new_application.cover_letter)),
            resume: Set(new_application.resume),
            applied_at: Set(now),
            updated_at: Set(now),
        };

        // The unique (user_id, job_id) index settles concurrent submissions
        // that both passed the check above.
        let model = match am.insert(&self.db).await {
            Ok(model) => model,
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Conflict("Already applied to this job".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let job = self.find_job(model.job_id).await?;
        let mut application = application_from_model(model)?;
        application.job = job;
        Ok(application)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        let mut attempt = 1;
        let model = loop {
            let row = application::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .ok_or_else(|| StoreError::NotFound("Application not found".to_string()))?;
            let current: ApplicationStatus = row.status.parse().map_err(corrupt)?;
            if !current.can_transition_to(status) {
                return Err(StoreError::InvalidTransition { from: current, to: status });
            }

            // Only succeeds if nobody changed the status since it was read.
            let now = Utc::now();
            let result = application::Entity::update_many()
                .col_expr(application::Column::Status, Expr::value(status.as_str()))
                .col_expr(application::Column::UpdatedAt, Expr::value(now))
                .filter(application::Column::Id.eq(id))
                .filter(application::Column::Status.eq(current.as_str()))
                .exec(&self.db)
                .await?;
            if result.rows_affected > 0 {
                break application::Model {
                    status: status.as_str().to_string(),
                    updated_at: now,
                    ..row
                };
            }

            if attempt == STATUS_UPDATE_ATTEMPTS {
                warn!(application_id = %id, "status kept changing underneath the update");
                return Err(StoreError::Conflict(
                    "Application was modified concurrently".to_string(),
                ));
            }
            debug!(application_id = %id, attempt, "status changed concurrently; retrying");
            attempt += 1;
        };

        let job = self.find_job(model.job_id).await?;
        let applicant = user::Entity::find_by_id(model.user_id)
            .one(&self.db)
            .await?
            .map(|row| Applicant { id: row.id, email: row.email, name: row.name });

        let mut application = application_from_model(model)?;
        application.job = job;
        application.user = applicant;
        Ok(application)
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let companies = company::Entity::find().count(&self.db).await?;
        let jobs = job::Entity::find()
            .filter(job::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        let applications = application::Entity::find().count(&self.db).await?;
        let users = user::Entity::find().count(&self.db).await?;
        Ok(Stats { companies, jobs, applications, users })
    }
}

/// Substring match against a case-folded column. `needle` must already be
/// folded with [`fold_case`]; `%` and `_` in it match literally.
fn contains<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    let escaped = needle
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_");
    Expr::col(column).like(LikeExpr::new(format!("%{escaped}%")).escape('!'))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn strings_to_json(values: Vec<String>) -> Json {
    Json::from(values)
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn user_from_model(model: user::Model) -> StoreResult<UserRecord> {
    Ok(UserRecord {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        name: model.name,
        role: model.role.parse().map_err(corrupt)?,
        company_id: model.company_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn company_from_model(model: company::Model) -> Company {
    Company {
        id: model.id,
        name: model.name,
        website: model.website,
        description: model.description,
        location: model.location,
        industry: model.industry,
        size: model.size,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn job_from_model(model: job::Model, company: Option<Company>) -> StoreResult<Job> {
    Ok(Job {
        id: model.id,
        title: model.title,
        description: model.description,
        company_id: model.company_id,
        location: model.location,
        salary: model.salary,
        job_type: model.job_type.parse().map_err(corrupt)?,
        requirements: serde_json::from_value(model.requirements)?,
        benefits: serde_json::from_value(model.benefits)?,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
        company,
    })
}

fn application_from_model(model: application::Model) -> StoreResult<Application> {
    Ok(Application {
        id: model.id,
        user_id: model.user_id,
        job_id: model.job_id,
        status: model.status.parse().map_err(corrupt)?,
        cover_letter: model.cover_letter,
        resume: model.resume,
        applied_at: model.applied_at,
        updated_at: model.updated_at,
        job: None,
        user: None,
    })
}
