mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db};

use auth::jwt::JwtService;
use db::factory::Repositories;
use use_cases::{
    alumni::AlumniHandler, auth::AuthHandler, employment::EmploymentHandler, students::StudentHandler,
};

pub struct AppState {
    pub auth_handler: AppAuthHandler,
    pub student_handler: StudentHandler,
    pub alumni_handler: AlumniHandler,
    pub employment_handler: EmploymentHandler,
    pub repositories: Repositories,
}

pub type AppAuthHandler = AuthHandler<JwtService>;

impl AppState {
    pub fn new(config: &settings::AppConfig, repositories: Repositories) -> Self {
        let jwt_service = JwtService::new(config);
        let auth_handler = AuthHandler::new(repositories.users.clone(), jwt_service);
        let student_handler = StudentHandler::new(repositories.students.clone());
        let alumni_handler = AlumniHandler::new(
            repositories.alumni.clone(),
            repositories.users.clone(),
            repositories.employment.clone(),
        );
        let employment_handler =
            EmploymentHandler::new(repositories.employment.clone(), repositories.alumni.clone());

        AppState {
            auth_handler,
            student_handler,
            alumni_handler,
            employment_handler,
            repositories,
        }
    }
}
