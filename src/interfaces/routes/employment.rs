use actix_web::web;

use crate::handlers::employment;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employment")
            .service(
                web::resource("")
                    .route(web::get().to(employment::list_employment))
                    .route(web::post().to(employment::create_employment))
            )
            .service(
                web::resource("/all")
                    .route(web::get().to(employment::list_all_employment))
            )
            .service(
                web::resource("/count")
                    .route(web::get().to(employment::count_employment))
            )
            .service(
                web::resource("/me")
                    .route(web::get().to(employment::my_jobs))
            )
            .service(
                web::resource("/stats/by-industry")
                    .route(web::get().to(employment::employment_stats_by_industry))
            )
            .service(
                web::resource("/stats/by-location")
                    .route(web::get().to(employment::employment_stats_by_location))
            )
            .service(
                web::resource("/companies/{company}/alumni-count")
                    .route(web::get().to(employment::alumni_count_by_company))
            )
            .service(
                web::resource("/alumni/{alumni_id}")
                    .route(web::get().to(employment::list_employment_by_alumni))
            )
            .service(
                web::resource("/alumni/{alumni_id}/soft")
                    .route(web::delete().to(employment::soft_delete_employment_by_alumni))
            )
            .service(
                web::resource("/{employment_id}/soft")
                    .route(web::delete().to(employment::soft_delete_employment))
            )
            .service(
                web::resource("/{employment_id}/restore")
                    .route(web::post().to(employment::restore_employment))
            )
            .service(
                web::resource("/{employment_id}")
                    .route(web::get().to(employment::get_employment))
                    .route(web::put().to(employment::update_employment))
                    .route(web::delete().to(employment::hard_delete_employment))
            )
    );
}
