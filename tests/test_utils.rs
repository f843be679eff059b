#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    middleware::NormalizePath,
    test, web, App,
};
use actix_http::Request;
use serde_json::Value;
use zeroize::Zeroizing;

use alumni_records::{
    db::{deadline::Deadlines, factory::RepositoryFactory},
    entities::{
        ids::RecordId,
        user::{LoginUser, RegisterUser},
    },
    middlewares::auth::AuthMiddleware,
    routes::configure_routes,
    settings::{AdminSeed, AppConfig, AppEnvironment},
    AppState,
};

pub const ADMIN_EMAIL: &str = "admin@alumni.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const USER_PASSWORD: &str = "rahasia123";

pub fn test_config() -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "Alumni Records Test".to_string(),
        backend: "memory".to_string(),
        jwt_secret: "test_jwt_secret_that_is_long_enough_for_hs512_1234567890".into(),
        jwt_expiration_minutes: 15,
        worker_count: 1,
        cors_allowed_origins: vec!["*".to_string()],
        ..AppConfig::default()
    }
}

/// Application state over a fresh in-memory backend.
pub struct TestApp {
    pub state: web::Data<AppState>,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let repositories = RepositoryFactory::memory(Deadlines::default());
        let state = web::Data::new(AppState::new(&config, repositories));
        TestApp { state, config }
    }

    /// The routed application, wrapped the same way the server wraps it.
    pub async fn service(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
        test::init_service(
            App::new()
                .app_data(self.state.clone())
                .wrap(AuthMiddleware)
                .wrap(NormalizePath::trim())
                .configure(configure_routes),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let seed = AdminSeed {
            email: ADMIN_EMAIL.into(),
            username: "admin".into(),
            password: Zeroizing::new(ADMIN_PASSWORD.into()),
        };
        self.state.auth_handler.bootstrap_admin(&seed).await.unwrap();
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a regular user and returns its id and a token.
    pub async fn user_token(&self, username: &str) -> (RecordId, String) {
        let email = format!("{username}@example.com");
        let user = self
            .state
            .auth_handler
            .register(RegisterUser {
                username: username.into(),
                email: email.clone(),
                password: USER_PASSWORD.into(),
                role: None,
            })
            .await
            .unwrap();
        (user.id, self.login(&email, USER_PASSWORD).await)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        self.state
            .auth_handler
            .login(LoginUser { email: email.into(), password: password.into() })
            .await
            .unwrap()
            .access_token
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Calls the service and decodes the JSON body (`Null` when empty).
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(app, req).await;
    let status = response.status();
    let body = test::read_body(response).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
