//! Sample companies, accounts and jobs for local development and demos.
//!
//! Every seeded account uses the password `password123`.

use tracing::info;
use uuid::Uuid;

use super::JobBoardStore;
use crate::auth::PasswordHasher;
use crate::models::{JobType, NewCompany, NewJob, NewUser, Role};

pub const SEED_PASSWORD: &str = "password123";
pub const SEED_ADMIN_EMAIL: &str = "admin@jobboard.com";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub companies: usize,
    pub users: usize,
    pub jobs: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.companies == 0 && self.users == 0 && self.jobs == 0
    }
}

struct SeedCompany {
    name: &'static str,
    website: &'static str,
    industry: &'static str,
    location: &'static str,
}

const COMPANIES: [SeedCompany; 4] = [
    SeedCompany { name: "Kakao", website: "https://www.kakaocorp.com", industry: "Internet", location: "Pangyo" },
    SeedCompany { name: "Naver", website: "https://www.navercorp.com", industry: "Internet", location: "Seongnam" },
    SeedCompany { name: "Coupang", website: "https://www.coupang.com", industry: "E-commerce", location: "Seoul" },
    SeedCompany { name: "Samsung Electronics", website: "https://www.samsung.com", industry: "Electronics", location: "Suwon" },
];

/// (company index, title, description, type)
const JOBS: [(usize, &str, &str, JobType); 10] = [
    (0, "Frontend Developer (React/Next.js)", "Build the next generation of Kakao web services with React, Next.js and TypeScript.", JobType::FullTime),
    (0, "Backend Developer (Node.js/Python)", "Design scalable backend systems. Node.js, Python and cloud experience preferred.", JobType::FullTime),
    (1, "Data Engineer", "Build and operate the data pipelines behind Naver search.", JobType::FullTime),
    (1, "DevOps Engineer", "Manage and automate the infrastructure of Naver Cloud Platform.", JobType::Contract),
    (2, "Full-stack Developer", "Develop the Coupang e-commerce platform. Java, React and AWS required.", JobType::FullTime),
    (2, "Mobile App Developer (iOS/Android)", "Ship the Coupang mobile apps. Swift and Kotlin experience preferred.", JobType::FullTime),
    (3, "AI/ML Engineer", "Research and build next-generation AI at the Samsung AI center.", JobType::FullTime),
    (3, "Embedded Software Developer", "Develop system software for Samsung smartphones.", JobType::FullTime),
    (0, "UI/UX Designer", "Craft user-centred designs for the best possible user experience.", JobType::PartTime),
    (1, "Product Manager", "Own planning and strategy for a global product.", JobType::Internship),
];

/// Loads the sample data set. Does nothing if the seed admin already exists,
/// so running it twice is harmless.
pub async fn seed(store: &dyn JobBoardStore, hasher: &PasswordHasher) -> anyhow::Result<SeedReport> {
    if store.find_user_by_email(SEED_ADMIN_EMAIL).await?.is_some() {
        info!("seed data already present; skipping");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    let mut company_ids: Vec<Uuid> = Vec::with_capacity(COMPANIES.len());
    for company in &COMPANIES {
        let created = store
            .create_company(NewCompany {
                name: company.name.to_string(),
                website: Some(company.website.to_string()),
                location: Some(company.location.to_string()),
                industry: Some(company.industry.to_string()),
                ..Default::default()
            })
            .await?;
        company_ids.push(created.id);
        report.companies += 1;
    }

    let password_hash = hasher.hash(SEED_PASSWORD.to_string()).await?;
    let accounts = [
        (SEED_ADMIN_EMAIL, "Administrator", Role::Admin, None),
        ("hr@kakao.com", "Kakao HR", Role::CompanyAdmin, Some(company_ids[0])),
        ("user@example.com", "Kim Developer", Role::User, None),
    ];
    for (email, name, role, company_id) in accounts {
        store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: password_hash.clone(),
                name: Some(name.to_string()),
                role,
                company_id,
            })
            .await?;
        report.users += 1;
    }

    for (company, title, description, job_type) in JOBS {
        store
            .create_job(NewJob {
                title: title.to_string(),
                description: description.to_string(),
                company_id: company_ids[company],
                location: Some(COMPANIES[company].location.to_string()),
                salary: None,
                job_type,
                requirements: Vec::new(),
                benefits: Vec::new(),
            })
            .await?;
        report.jobs += 1;
    }

    info!(companies = report.companies, users = report.users, jobs = report.jobs, "seed data loaded");
    Ok(report)
}
