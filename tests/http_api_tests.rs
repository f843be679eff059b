mod test_utils;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use test_utils::*;

use alumni_records::{auth::jwt::JwtService, repositories::token::TokenService, settings::AppConfig};

#[actix_rt::test]
async fn health_and_home_are_public() {
    let app = TestApp::new();
    let service = app.service().await;

    let (status, body) = send(&service, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");

    let (status, _) = send(&service, TestRequest::get().uri("/api/v1/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&service, TestRequest::get().uri("/").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api"], "/api/v1");
}

#[actix_rt::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new();
    let service = app.service().await;

    let (status, body) = send(&service, TestRequest::get().uri("/api/v1/students").to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let req = TestRequest::get()
        .uri("/api/v1/students")
        .insert_header(("Authorization", "Basic Zm9vOmJhcg=="))
        .to_request();
    let (status, _) = send(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri("/api/v1/students")
        .insert_header(bearer("not.a.jwt"))
        .to_request();
    let (status, _) = send(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let service = app.service().await;
    let (_, fresh) = app.user_token("lapsed").await;

    let claims = app.state.auth_handler.token_service.validate(&fresh).unwrap();
    let user = app
        .state
        .auth_handler
        .users
        .get_by_id(&claims.sub.parse().unwrap())
        .await
        .unwrap();

    let expired_issuer = JwtService::new(&AppConfig { jwt_expiration_minutes: -5, ..test_config() });
    let expired = expired_issuer.issue(&user).unwrap();

    let req = TestRequest::get()
        .uri("/api/v1/auth/profile")
        .insert_header(bearer(&expired))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");
}

#[actix_rt::test]
async fn register_login_and_profile_over_http() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "username": "citra",
            "email": "Citra@Example.com",
            "password": "rahasia123"
        }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({ "username": "citra", "email": "other@example.com", "password": "rahasia123" }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let req = TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "citra@example.com", "password": "salah" }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Wrong credentials");

    let req = TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "citra@example.com", "password": "rahasia123" }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let req = TestRequest::get()
        .uri("/api/v1/auth/profile/")
        .insert_header(bearer(&token))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "citra");
    assert_eq!(body["email"], "citra@example.com");
}

#[actix_rt::test]
async fn admin_only_routes_refuse_regular_users() {
    let app = TestApp::new();
    let service = app.service().await;
    let (_, token) = app.user_token("biasa").await;

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&token))
        .set_json(json!({
            "nim": "2101001", "nama": "Putri", "jurusan": "Informatika",
            "angkatan": 2021, "email": "putri@example.com"
        }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let req = TestRequest::get().uri("/api/v1/users").insert_header(bearer(&token)).to_request();
    let (status, _) = send(&service, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/api/v1/students").insert_header(bearer(&token)).to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_data"], 0);
}

#[actix_rt::test]
async fn admin_manages_students() {
    let app = TestApp::new();
    let service = app.service().await;
    let admin = app.admin_token().await;

    let student = json!({
        "nim": "2101001", "nama": "Putri Ayu", "jurusan": "Informatika",
        "angkatan": 2021, "email": "putri@example.com"
    });

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&admin))
        .set_json(&student)
        .to_request();
    let (status, created) = send(&service, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].to_string();

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&admin))
        .set_json(&student)
        .to_request();
    let (status, _) = send(&service, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::get()
        .uri("/api/v1/students?search=AYU&limit=5&sort_by=nama&sort_order=desc")
        .insert_header(bearer(&admin))
        .to_request();
    let (status, page) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_data"], 1);
    assert_eq!(page["per_page"], 5);
    assert_eq!(page["data"][0]["nim"], "2101001");

    let req = TestRequest::get().uri("/api/v1/students/count").insert_header(bearer(&admin)).to_request();
    let (_, count) = send(&service, req).await;
    assert_eq!(count["total"], 1);

    let req = TestRequest::delete()
        .uri(&format!("/api/v1/students/{id}"))
        .insert_header(bearer(&admin))
        .to_request();
    let (status, _) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get()
        .uri(&format!("/api/v1/students/{id}"))
        .insert_header(bearer(&admin))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[actix_rt::test]
async fn employment_lifecycle_over_http() {
    let app = TestApp::new();
    let service = app.service().await;
    let admin = app.admin_token().await;
    let (user_id, owner) = app.user_token("lulusan").await;
    let (_, stranger) = app.user_token("asing").await;

    let req = TestRequest::post()
        .uri("/api/v1/alumni")
        .insert_header(bearer(&admin))
        .set_json(json!({
            "user_id": user_id, "nim": "1801", "nama": "Lulusan", "jurusan": "Informatika",
            "angkatan": 2018, "tahun_lulus": 2022, "email": "lulusan@alumni.example.com"
        }))
        .to_request();
    let (status, alumni) = send(&service, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(alumni["user"]["username"], "lulusan");

    let req = TestRequest::post()
        .uri("/api/v1/employment")
        .insert_header(bearer(&admin))
        .set_json(json!({
            "alumni_id": alumni["id"], "nama_perusahaan": "Acme", "posisi_jabatan": "Engineer",
            "bidang_industri": "Technology", "lokasi_kerja": "Jakarta",
            "tanggal_mulai_kerja": "2022-09-01"
        }))
        .to_request();
    let (status, record) = send(&service, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status_pekerjaan"], "aktif");
    assert!(record["deleted_at"].is_null());
    let id = record["id"].to_string();

    let soft = |token: &str| {
        TestRequest::delete()
            .uri(&format!("/api/v1/employment/{id}/soft"))
            .insert_header(bearer(token))
            .to_request()
    };

    let (status, _) = send(&service, soft(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&service, soft(&owner)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&service, soft(&owner)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::get().uri("/api/v1/trash/employment").insert_header(bearer(&owner)).to_request();
    let (_, trash) = send(&service, req).await;
    assert_eq!(trash["total_data"], 1);
    assert!(!trash["data"][0]["deleted_at"].is_null());

    let req = TestRequest::get().uri("/api/v1/trash/employment").insert_header(bearer(&stranger)).to_request();
    let (_, trash) = send(&service, req).await;
    assert_eq!(trash["total_data"], 0);

    let restore = |token: &str| {
        TestRequest::post()
            .uri(&format!("/api/v1/employment/{id}/restore"))
            .insert_header(bearer(token))
            .to_request()
    };
    let (status, _) = send(&service, restore(&owner)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&service, restore(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&service, restore(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let hard = TestRequest::delete()
        .uri(&format!("/api/v1/employment/{id}"))
        .insert_header(bearer(&admin))
        .to_request();
    let (status, body) = send(&service, hard).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"], "precondition_failed");

    let req = TestRequest::get().uri("/api/v1/employment/me").insert_header(bearer(&owner)).to_request();
    let (_, mine) = send(&service, req).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let req = TestRequest::get()
        .uri("/api/v1/employment/companies/Acme/alumni-count")
        .insert_header(bearer(&stranger))
        .to_request();
    let (_, count) = send(&service, req).await;
    assert_eq!(count["total_alumni"], 1);
}

#[actix_rt::test]
async fn deleting_alumni_moves_jobs_to_trash() {
    let app = TestApp::new();
    let service = app.service().await;
    let admin = app.admin_token().await;

    let req = TestRequest::post()
        .uri("/api/v1/alumni")
        .insert_header(bearer(&admin))
        .set_json(json!({
            "nim": "1701", "nama": "Rudi", "jurusan": "Sipil",
            "angkatan": 2017, "tahun_lulus": 2021, "email": "rudi@alumni.example.com"
        }))
        .to_request();
    let (_, alumni) = send(&service, req).await;

    for company in ["Wika", "Adhi"] {
        let req = TestRequest::post()
            .uri("/api/v1/employment")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "alumni_id": alumni["id"], "nama_perusahaan": company, "posisi_jabatan": "Site Engineer",
                "bidang_industri": "Construction", "lokasi_kerja": "Semarang",
                "tanggal_mulai_kerja": "2021-10-01"
            }))
            .to_request();
        let (status, _) = send(&service, req).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let req = TestRequest::delete()
        .uri(&format!("/api/v1/alumni/{}", alumni["id"]))
        .insert_header(bearer(&admin))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["employment_trashed"], 2);

    let req = TestRequest::get().uri("/api/v1/employment/count").insert_header(bearer(&admin)).to_request();
    let (_, count) = send(&service, req).await;
    assert_eq!(count["total"], 0);

    let req = TestRequest::get().uri("/api/v1/trash/employment").insert_header(bearer(&admin)).to_request();
    let (_, trash) = send(&service, req).await;
    assert_eq!(trash["total_data"], 2);
    assert!(trash["data"][0]["alumni"].is_null());
}

#[actix_rt::test]
async fn malformed_requests_get_structured_errors() {
    let app = TestApp::new();
    let service = app.service().await;
    let admin = app.admin_token().await;

    let req = TestRequest::get()
        .uri("/api/v1/students/not%20valid")
        .insert_header(bearer(&admin))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&admin))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"nim\": ")
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&admin))
        .set_json(json!({
            "nim": "", "nama": "X", "jurusan": "Y", "angkatan": 2021, "email": "nope"
        }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));

    let req = TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(bearer(&admin))
        .set_json(json!({
            "nim": "   ", "nama": "X", "jurusan": "\t", "angkatan": 2021, "email": "x@example.com"
        }))
        .to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));

    let req = TestRequest::get().uri("/api/v1/nothing-here").insert_header(bearer(&admin)).to_request();
    let (status, body) = send(&service, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
