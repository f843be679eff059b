use actix_web::web;

use crate::handlers::trash;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trash")
            .service(
                web::resource("/employment")
                    .route(web::get().to(trash::employment_trash))
            )
    );
}
