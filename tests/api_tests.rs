mod common;

use axum::http::{Method, StatusCode};
use jobboard::models::Role;
use serde_json::json;

use common::{backends, PASSWORD};

#[tokio::test]
async fn test_register_login_and_me() {
    for t in backends().await {
        let (status, body) = t
            .post(
                "/api/auth/register",
                None,
                json!({ "email": "Dev@Example.com", "password": PASSWORD, "name": "Dev" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}] {body}", t.name);
        assert_eq!(body["user"]["email"], "dev@example.com");
        assert_eq!(body["user"]["role"], "USER");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("passwordHash").is_none());

        let token = t.login("dev@example.com").await;
        let (status, me) = t.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "[{}]", t.name);
        assert_eq!(me["name"], "Dev");

        let (status, body) = t
            .post("/api/auth/login", None, json!({ "email": "dev@example.com", "password": "wrong-password" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "[{}]", t.name);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, _) = t
            .post("/api/auth/login", None, json!({ "email": "nobody@example.com", "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    for t in backends().await {
        t.register("dup@example.com").await;
        let (status, body) = t
            .post("/api/auth/register", None, json!({ "email": "dup@example.com", "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);
        assert!(body["error"].is_string());

        let (_, stats) = t.get("/api/stats", None).await;
        assert_eq!(stats["users"], 1, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_registration_validation() {
    for t in backends().await {
        let cases = [
            json!({ "email": "not-an-email", "password": PASSWORD }),
            json!({ "email": "short@example.com", "password": "short" }),
            json!({ "password": PASSWORD }),
        ];
        for case in cases {
            let (status, body) = t.post("/api/auth/register", None, case.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "[{}] {case}", t.name);
            assert!(body["error"].is_string(), "[{}] {case}", t.name);
        }

        let (status, _) = t
            .post("/api/auth/register", None, json!({ "email": "root@example.com", "password": PASSWORD, "role": "ADMIN" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let (status, body) = t
            .post(
                "/api/auth/register",
                None,
                json!({ "email": "hr@example.com", "password": PASSWORD, "role": "COMPANY_ADMIN" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}]", t.name);
        assert_eq!(body["user"]["role"], "COMPANY_ADMIN");
    }
}

#[tokio::test]
async fn test_job_creation_requires_staff_role() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let user = t.register("user@example.com").await;
        let body = json!({ "title": "Backend Engineer", "description": "APIs", "companyId": company_id });

        let (status, err) = t.post("/api/jobs", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "[{}]", t.name);
        assert_eq!(err["error"], "No token provided");

        let (status, _) = t.post("/api/jobs", Some("not-a-token"), body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "[{}]", t.name);

        let (status, _) = t.post("/api/jobs", Some(&user), body.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let (_, page) = t.get("/api/jobs", None).await;
        assert_eq!(page["total"], 0, "[{}]", t.name);
        assert_eq!(page["jobs"], json!([]));
    }
}

#[tokio::test]
async fn test_company_creation_is_admin_only() {
    for t in backends().await {
        let hr = t.account("hr@example.com", Role::CompanyAdmin).await;
        let (status, _) = t.post("/api/companies", Some(&hr), json!({ "name": "Acme" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let admin = t.admin().await;
        let (status, _) = t.post("/api/companies", Some(&admin), json!({ "name": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);

        let (status, company) = t
            .post(
                "/api/companies",
                Some(&admin),
                json!({ "name": "Acme", "website": "https://acme.test", "industry": "Tools" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}]", t.name);
        assert_eq!(company["website"], "https://acme.test");
        assert_eq!(company["createdAt"], company["updatedAt"]);
    }
}

#[tokio::test]
async fn test_created_job_is_listed_with_defaults_and_company() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Backend Engineer").await;

        let (status, page) = t.get("/api/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1, "[{}]", t.name);
        let job = &page["jobs"][0];
        assert_eq!(job["id"], job_id.as_str());
        assert_eq!(job["type"], "FULL_TIME");
        assert_eq!(job["requirements"], json!([]));
        assert_eq!(job["benefits"], json!([]));
        assert_eq!(job["isActive"], true);
        assert_eq!(job["company"]["name"], "Acme");

        let (status, single) = t.get(&format!("/api/jobs/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(single["company"]["id"], company_id.as_str());
    }
}

#[tokio::test]
async fn test_job_listing_filters_and_paging() {
    for t in backends().await {
        let admin = t.admin().await;
        let acme = t.company(&admin, "Acme").await;
        let globex = t.company(&admin, "Globex").await;
        t.job(&admin, &acme, "Rust Engineer").await;
        t.job(&admin, &acme, "Designer").await;
        t.job(&admin, &globex, "Data Engineer").await;

        let (_, page) = t.get("/api/jobs?search=ENGINEER", None).await;
        assert_eq!(page["total"], 2, "[{}]", t.name);

        let (_, page) = t.get("/api/jobs?search=globex", None).await;
        assert_eq!(page["total"], 1, "[{}]", t.name);
        assert_eq!(page["jobs"][0]["title"], "Data Engineer");

        let (_, page) = t.get("/api/jobs?company=acm", None).await;
        assert_eq!(page["total"], 2, "[{}]", t.name);

        let (_, page) = t.get(&format!("/api/jobs?companyId={globex}"), None).await;
        assert_eq!(page["total"], 1, "[{}]", t.name);

        let (_, page) = t.get("/api/jobs?limit=2&offset=2", None).await;
        assert_eq!(page["total"], 3, "[{}]", t.name);
        assert_eq!(page["jobs"].as_array().unwrap().len(), 1);

        let (_, page) = t.get("/api/jobs?search=100%25", None).await;
        assert_eq!(page["total"], 0, "[{}]", t.name);

        let (status, _) = t.get("/api/jobs?limit=lots", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_job_search_folds_non_ascii_text() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Über Labs").await;
        t.job(&admin, &company_id, "Ärztin Engineer").await;

        let (_, page) = t.get("/api/jobs?search=%C3%A4rztin", None).await;
        assert_eq!(page["total"], 1, "[{}] search", t.name);
        let (_, page) = t.get("/api/jobs?company=%C3%9CBER", None).await;
        assert_eq!(page["total"], 1, "[{}] company", t.name);
        let (_, page) = t.get("/api/jobs?search=%C3%BCber", None).await;
        assert_eq!(page["total"], 1, "[{}] search by company", t.name);
    }
}

#[tokio::test]
async fn test_deactivated_jobs_leave_listings() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let kept = t.job(&admin, &company_id, "Kept").await;
        let dropped = t.job(&admin, &company_id, "Dropped").await;

        let (status, job) = t
            .send(Method::DELETE, &format!("/api/jobs/{dropped}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK, "[{}]", t.name);
        assert_eq!(job["isActive"], false);

        let (_, page) = t.get("/api/jobs?search=dropped", None).await;
        assert_eq!(page["total"], 0, "[{}]", t.name);
        let (_, page) = t.get("/api/jobs", None).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["jobs"][0]["id"], kept.as_str());

        // Still readable by id.
        let (status, job) = t.get(&format!("/api/jobs/{dropped}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["isActive"], false);

        let (_, companies) = t.get("/api/companies", None).await;
        assert_eq!(companies[0]["jobCount"], 1, "[{}]", t.name);
        let (_, detail) = t.get(&format!("/api/companies/{company_id}"), None).await;
        assert_eq!(detail["jobs"].as_array().unwrap().len(), 1, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_update_job() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;

        let (status, job) = t
            .put(
                &format!("/api/jobs/{job_id}"),
                Some(&admin),
                json!({ "title": "Senior Engineer", "type": "CONTRACT", "requirements": ["Rust", " "] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "[{}] {job}", t.name);
        assert_eq!(job["title"], "Senior Engineer");
        assert_eq!(job["type"], "CONTRACT");
        assert_eq!(job["requirements"], json!(["Rust"]));
        assert_eq!(job["description"], "Build and run services");
        assert_eq!(job["company"]["name"], "Acme");

        let uri = format!("/api/jobs/{job_id}");
        let (_, job) = t
            .put(&uri, Some(&admin), json!({ "location": "  Seoul ", "salary": "100k" }))
            .await;
        assert_eq!(job["location"], "Seoul", "[{}]", t.name);
        assert_eq!(job["salary"], "100k");

        // Blank values clear the field; absent ones leave it alone.
        let (status, job) = t
            .put(&uri, Some(&admin), json!({ "location": "   ", "title": "Staff Engineer" }))
            .await;
        assert_eq!(status, StatusCode::OK, "[{}] {job}", t.name);
        assert!(job["location"].is_null(), "[{}] {job}", t.name);
        assert_eq!(job["salary"], "100k");
        let (_, job) = t.put(&uri, Some(&admin), json!({ "salary": "" })).await;
        assert!(job["salary"].is_null(), "[{}] {job}", t.name);

        let (status, _) = t
            .put(&format!("/api/jobs/{}", uuid::Uuid::new_v4()), Some(&admin), json!({ "title": "x" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_unknown_ids() {
    for t in backends().await {
        let missing = uuid::Uuid::new_v4();
        let (status, body) = t.get(&format!("/api/jobs/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "[{}]", t.name);
        assert_eq!(body["error"], "Job not found");

        let (status, _) = t.get(&format!("/api/companies/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "[{}]", t.name);

        let (status, body) = t.get("/api/jobs/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_application_end_to_end() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;
        let applicant = t.register("a@example.com").await;

        let (status, created) = t
            .post(
                "/api/applications",
                Some(&applicant),
                json!({ "jobId": job_id, "coverLetter": "Hello", "resume": "https://files.test/cv.pdf" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}] {created}", t.name);
        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["job"]["company"]["name"], "Acme");

        let (status, mine) = t.get("/api/applications", Some(&applicant)).await;
        assert_eq!(status, StatusCode::OK);
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 1, "[{}]", t.name);
        assert_eq!(mine[0]["job"]["id"], job_id.as_str());
        assert_eq!(mine[0]["status"], "PENDING");
        assert_eq!(mine[0]["resume"], "https://files.test/cv.pdf");

        let (status, _) = t.get("/api/applications", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_duplicate_application_is_rejected() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;
        let applicant = t.register("a@example.com").await;

        let (status, _) = t.apply(&applicant, &job_id).await;
        assert_eq!(status, StatusCode::CREATED, "[{}]", t.name);
        let (status, body) = t.apply(&applicant, &job_id).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);
        assert_eq!(body["error"], "Already applied to this job");

        let (_, mine) = t.get("/api/applications", Some(&applicant)).await;
        assert_eq!(mine.as_array().unwrap().len(), 1, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_application_input_rules() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;
        let applicant = t.register("a@example.com").await;

        let (status, _) = t
            .post("/api/applications", Some(&applicant), json!({ "jobId": job_id }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}] missing cover letter", t.name);

        let (status, _) = t
            .post(
                "/api/applications",
                Some(&applicant),
                json!({ "jobId": job_id, "coverLetter": "Hi", "resume": "x".repeat(3000) }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}] oversized resume", t.name);

        let (status, _) = t.apply(&applicant, &uuid::Uuid::new_v4().to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "[{}]", t.name);

        t.send(Method::DELETE, &format!("/api/jobs/{job_id}"), Some(&admin), None).await;
        let (status, body) = t.apply(&applicant, &job_id).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);
        assert_eq!(body["error"], "Job is no longer accepting applications");
    }
}

#[tokio::test]
async fn test_reviewing_applications() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;
        let applicant = t.register("a@example.com").await;
        let (_, application) = t.apply(&applicant, &job_id).await;
        let application_id = application["id"].as_str().unwrap().to_string();

        let (status, _) = t.get(&format!("/api/jobs/{job_id}/applications"), Some(&applicant)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let (status, list) = t.get(&format!("/api/jobs/{job_id}/applications"), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK, "[{}]", t.name);
        assert_eq!(list[0]["user"]["email"], "a@example.com");
        assert!(list[0]["user"].get("passwordHash").is_none());

        let uri = format!("/api/applications/{application_id}");
        let (status, _) = t.put(&uri, Some(&applicant), json!({ "status": "ACCEPTED" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let (status, reviewed) = t.put(&uri, Some(&admin), json!({ "status": "REVIEWED" })).await;
        assert_eq!(status, StatusCode::OK, "[{}] {reviewed}", t.name);
        assert_eq!(reviewed["status"], "REVIEWED");
        assert_eq!(reviewed["job"]["id"], job_id.as_str());

        let (status, _) = t.put(&uri, Some(&admin), json!({ "status": "PENDING" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}]", t.name);

        let (status, accepted) = t.put(&uri, Some(&admin), json!({ "status": "ACCEPTED" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "ACCEPTED");

        let (status, _) = t.put(&uri, Some(&admin), json!({ "status": "REJECTED" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}] terminal state", t.name);

        let (status, _) = t.put(&uri, Some(&admin), json!({ "status": "MAYBE" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "[{}] unknown status", t.name);
    }
}

#[tokio::test]
async fn test_concurrent_reviews_reach_one_terminal_state() {
    for t in backends().await {
        let admin = t.admin().await;
        let company_id = t.company(&admin, "Acme").await;
        let job_id = t.job(&admin, &company_id, "Engineer").await;

        for round in 0..10 {
            let applicant = t.register(&format!("r{round}@example.com")).await;
            let (_, application) = t.apply(&applicant, &job_id).await;
            let uri = format!("/api/applications/{}", application["id"].as_str().unwrap());

            let ((accept_status, _), (reject_status, _)) = tokio::join!(
                t.put(&uri, Some(&admin), json!({ "status": "ACCEPTED" })),
                t.put(&uri, Some(&admin), json!({ "status": "REJECTED" })),
            );
            let mut statuses = [accept_status, reject_status];
            statuses.sort();
            assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST], "[{}] round {round}", t.name);

            let winner = if accept_status == StatusCode::OK { "ACCEPTED" } else { "REJECTED" };
            let (_, mine) = t.get("/api/applications", Some(&applicant)).await;
            assert_eq!(mine[0]["status"], winner, "[{}] round {round}", t.name);
        }
    }
}

#[tokio::test]
async fn test_company_admin_scoping() {
    for t in backends().await {
        let admin = t.admin().await;
        let acme = t.company(&admin, "Acme").await;
        let globex = t.company(&admin, "Globex").await;

        t.register("hr@acme.test").await;
        let (_, me) = t.get("/api/auth/me", Some(&t.login("hr@acme.test").await)).await;
        let hr_id = me["id"].as_str().unwrap().to_string();

        let (status, user) = t
            .put(
                &format!("/api/users/{hr_id}/role"),
                Some(&admin),
                json!({ "role": "COMPANY_ADMIN", "companyId": acme }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "[{}] {user}", t.name);
        assert_eq!(user["companyId"], acme.as_str());

        // The old token still says USER; a fresh login carries the new role.
        let hr = t.login("hr@acme.test").await;
        t.job(&hr, &acme, "Acme Engineer").await;
        let (status, _) = t
            .post("/api/jobs", Some(&hr), json!({ "title": "Nope", "description": "x", "companyId": globex }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let globex_job = t.job(&admin, &globex, "Globex Engineer").await;
        let (status, _) = t.get(&format!("/api/jobs/{globex_job}/applications"), Some(&hr)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);

        let (status, _) = t
            .put(&format!("/api/users/{hr_id}/role"), Some(&hr), json!({ "role": "ADMIN" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "[{}]", t.name);
    }
}

#[tokio::test]
async fn test_stats_counts_active_jobs_only() {
    for t in backends().await {
        let admin = t.admin().await;
        let acme = t.company(&admin, "Acme").await;
        let globex = t.company(&admin, "Globex").await;
        let jobs = [
            t.job(&admin, &acme, "One").await,
            t.job(&admin, &acme, "Two").await,
            t.job(&admin, &globex, "Three").await,
        ];
        let inactive = t.job(&admin, &globex, "Four").await;

        let applicants = [t.register("a@example.com").await, t.register("b@example.com").await];
        t.apply(&applicants[0], &jobs[0]).await;
        t.apply(&applicants[0], &jobs[1]).await;
        t.apply(&applicants[1], &jobs[2]).await;
        t.apply(&applicants[1], &inactive).await;
        t.send(Method::DELETE, &format!("/api/jobs/{inactive}"), Some(&admin), None).await;

        let (status, stats) = t.get("/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["jobs"], 3, "[{}]", t.name);
        assert_eq!(stats["companies"], 2, "[{}]", t.name);
        assert_eq!(stats["applications"], 4, "[{}]", t.name);
        assert_eq!(stats["users"], 3, "[{}]", t.name);
    }
}
