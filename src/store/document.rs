use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{JobBoardStore, StoreError, StoreResult};
use crate::models::{
    Applicant, Application, ApplicationStatus, Company, CompanyDetail, CompanySummary, Job,
    JobChanges, JobFilter, JobPage, NewApplication, NewCompany, NewJob, NewUser, Role, Stats,
    UserRecord,
};

/// One collection per entity. Jobs and applications are stored without
/// their related documents; those are looked up and attached on read.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Collections {
    users: BTreeMap<Uuid, UserRecord>,
    companies: BTreeMap<Uuid, Company>,
    jobs: BTreeMap<Uuid, Job>,
    applications: BTreeMap<Uuid, Application>,
}

impl Collections {
    fn job_with_company(&self, job: &Job) -> Job {
        let mut job = job.clone();
        job.company = self.companies.get(&job.company_id).cloned();
        job
    }

    fn job_by_id(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|job| self.job_with_company(job))
    }

    fn applicant(&self, user_id: Uuid) -> Option<Applicant> {
        self.users.get(&user_id).map(Applicant::from)
    }

    fn active_job_count(&self, company_id: Uuid) -> u64 {
        self.jobs
            .values()
            .filter(|job| job.company_id == company_id && job.is_active)
            .count() as u64
    }
}

/// Document store kept in process memory, optionally snapshotted to a JSON
/// file after every write.
///
/// All reads share one lock and all writes take it exclusively, so a
/// check-then-write (duplicate e-mail, duplicate application, status
/// transition) runs as a single atomic step. With a snapshot file a write
/// becomes visible only once it is on disk.
#[derive(Clone)]
pub struct DocumentStore {
    collections: Arc<RwLock<Collections>>,
    snapshot_path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self { collections: Arc::new(RwLock::new(Collections::default())), snapshot_path: None }
    }

    /// Opens a store persisted at `path`, loading the existing snapshot if there is one.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let collections = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), "document store opened");
        Ok(Self { collections: Arc::new(RwLock::new(collections)), snapshot_path: Some(path) })
    }

    /// Applies `change` under the write lock. When snapshotting, the change is
    /// made on a copy that replaces the live collections only after the
    /// snapshot is written, so a failed write leaves the store as it was.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut Collections) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut collections = self.collections.write().await;
        if self.snapshot_path.is_none() {
            return change(&mut *collections);
        }

        let mut next = collections.clone();
        let output = change(&mut next)?;
        self.persist(&next).await?;
        *collections = next;
        Ok(output)
    }

    async fn persist(&self, collections: &Collections) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(collections)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl JobBoardStore for DocumentStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<UserRecord> {
        self.commit(|collections| {
            if collections.users.values().any(|u| u.email == new_user.email) {
                return Err(StoreError::Conflict("User already exists".to_string()));
            }

            let now = Utc::now();
            let record = UserRecord {
                id: Uuid::new_v4(),
                email: new_user.email,
                password_hash: new_user.password_hash,
                name: new_user.name,
                role: new_user.role,
                company_id: new_user.company_id,
                created_at: now,
                updated_at: now,
            };
            collections.users.insert(record.id, record.clone());
            Ok(record)
        })
        .await
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.collections.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let collections = self.collections.read().await;
        Ok(collections.users.values().find(|u| u.email == email).cloned())
    }

    async fn assign_role(
        &self,
        id: Uuid,
        role: Role,
        company_id: Option<Uuid>,
    ) -> StoreResult<UserRecord> {
        self.commit(|collections| {
            if let Some(company_id) = company_id {
                if !collections.companies.contains_key(&company_id) {
                    return Err(StoreError::NotFound("Company not found".to_string()));
                }
            }
            let user = collections
                .users
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound("User not found".to_string()))?;
            user.role = role;
            user.company_id = company_id;
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
        .await
    }

    async fn list_companies(&self) -> StoreResult<Vec<CompanySummary>> {
        let collections = self.collections.read().await;
        let mut summaries: Vec<CompanySummary> = collections
            .companies
            .values()
            .map(|company| CompanySummary {
                company: company.clone(),
                job_count: collections.active_job_count(company.id),
            })
            .collect();
        newest_first(&mut summaries, |s| s.company.created_at);
        Ok(summaries)
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyDetail>> {
        let collections = self.collections.read().await;
        let Some(company) = collections.companies.get(&id) else {
            return Ok(None);
        };
        let mut jobs: Vec<Job> = collections
            .jobs
            .values()
            .filter(|job| job.company_id == id && job.is_active)
            .map(|job| collections.job_with_company(job))
            .collect();
        newest_first(&mut jobs, |job| job.created_at);
        Ok(Some(CompanyDetail { company: company.clone(), jobs }))
    }

    async fn create_company(&self, new_company: NewCompany) -> StoreResult<Company> {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: new_company.name,
            website: new_company.website,
            description: new_company.description,
            location: new_company.location,
            industry: new_company.industry,
            size: new_company.size,
            created_at: now,
            updated_at: now,
        };
        self.commit(|collections| {
            collections.companies.insert(company.id, company.clone());
            Ok(company)
        })
        .await
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<JobPage> {
        let collections = self.collections.read().await;
        let mut matching: Vec<Job> = collections
            .jobs
            .values()
            .filter(|job| job.is_active)
            .map(|job| collections.job_with_company(job))
            .filter(|job| filter.matches(job))
            .collect();
        newest_first(&mut matching, |job| job.created_at);

        let total = matching.len() as u64;
        let jobs = matching
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .collect();
        Ok(JobPage { jobs, total })
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.collections.read().await.job_by_id(id))
    }

    async fn create_job(&self, new_job: NewJob) -> StoreResult<Job> {
        self.commit(|collections| {
            let company = collections
                .companies
                .get(&new_job.company_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound("Company not found".to_string()))?;

            let now = Utc::now();
            let job = Job {
                id: Uuid::new_v4(),
                title: new_job.title,
                description: new_job.description,
                company_id: new_job.company_id,
                location: new_job.location,
                salary: new_job.salary,
                job_type: new_job.job_type,
                requirements: new_job.requirements,
                benefits: new_job.benefits,
                is_active: true,
                created_at: now,
                updated_at: now,
                company: None,
            };
            collections.jobs.insert(job.id, job.clone());
            Ok(Job { company: Some(company), ..job })
        })
        .await
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job> {
        self.commit(|collections| {
            let job = collections
                .jobs
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound("Job not found".to_string()))?;

            if let Some(title) = changes.title {
                job.title = title;
            }
            if let Some(description) = changes.description {
                job.description = description;
            }
            if let Some(location) = changes.location {
                job.location = location;
            }
            if let Some(salary) = changes.salary {
                job.salary = salary;
            }
            if let Some(job_type) = changes.job_type {
                job.job_type = job_type;
            }
            if let Some(requirements) = changes.requirements {
                job.requirements = requirements;
            }
            if let Some(benefits) = changes.benefits {
                job.benefits = benefits;
            }
            if let Some(is_active) = changes.is_active {
                job.is_active = is_active;
            }
            job.updated_at = Utc::now();

            collections
                .job_by_id(id)
                .ok_or_else(|| StoreError::NotFound("Job not found".to_string()))
        })
        .await
    }

    async fn list_applications_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Application>> {
        let collections = self.collections.read().await;
        let mut applications: Vec<Application> = collections
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|a| Application { job: collections.job_by_id(a.job_id), ..a.clone() })
            .collect();
        newest_first(&mut applications, |a| a.applied_at);
        Ok(applications)
    }

    async fn list_applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        let collections = self.collections.read().await;
        let mut applications: Vec<Application> = collections
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .map(|a| Application { user: collections.applicant(a.user_id), ..a.clone() })
            .collect();
        newest_first(&mut applications, |a| a.applied_at);
        Ok(applications)
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let collections = self.collections.read().await;
        Ok(collections
            .applications
            .get(&id)
            .map(|a| Application { job: collections.job_by_id(a.job_id), ..a.clone() }))
    }

    async fn create_application(&self, new_application: NewApplication) -> StoreResult<Application> {
        self.commit(|collections| {
            let duplicate = collections.applications.values().any(|a| {
                a.user_id == new_application.user_id && a.job_id == new_application.job_id
            });
            if duplicate {
                info!(user_id = %new_application.user_id, job_id = %new_application.job_id, "duplicate application rejected");
                return Err(StoreError::Conflict("Already applied to this job".to_string()));
            }

            let now = Utc::now();
            let application = Application {
                id: Uuid::new_v4(),
                user_id: new_application.user_id,
                job_id: new_application.job_id,
                status: ApplicationStatus::Pending,
                cover_letter: Some(new_application.cover_letter),
                resume: new_application.resume,
                applied_at: now,
                updated_at: now,
                job: None,
                user: None,
            };
            collections.applications.insert(application.id, application.clone());
            Ok(Application { job: collections.job_by_id(application.job_id), ..application })
        })
        .await
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        self.commit(|collections| {
            let application = collections
                .applications
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound("Application not found".to_string()))?;
            if !application.status.can_transition_to(status) {
                return Err(StoreError::InvalidTransition { from: application.status, to: status });
            }
            application.status = status;
            application.updated_at = Utc::now();
            let updated = application.clone();

            Ok(Application {
                job: collections.job_by_id(updated.job_id),
                user: collections.applicant(updated.user_id),
                ..updated
            })
        })
        .await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let collections = self.collections.read().await;
        Ok(Stats {
            companies: collections.companies.len() as u64,
            jobs: collections.jobs.values().filter(|job| job.is_active).count() as u64,
            applications: collections.applications.len() as u64,
            users: collections.users.len() as u64,
        })
    }
}
