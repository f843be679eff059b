use actix_web::web;

use crate::handlers::{home::home, json_error::route_not_found, system::health_check};

mod alumni;
mod auth;
mod employment;
mod json_error;
mod students;
mod trash;
mod users;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(health_check);

    cfg.service(
        web::scope("/api/v1")
            .service(health_check)
            .configure(auth::config_routes)
            .configure(users::config_routes)
            .configure(students::config_routes)
            .configure(alumni::config_routes)
            .configure(employment::config_routes)
            .configure(trash::config_routes)
    );

    cfg.configure(json_error::config_routes);
    cfg.default_service(web::to(route_not_found));
}
