use actix_web::web;

use crate::handlers::alumni;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/alumni")
            .service(
                web::resource("")
                    .route(web::get().to(alumni::list_alumni))
                    .route(web::post().to(alumni::create_alumni))
            )
            .service(
                web::resource("/all")
                    .route(web::get().to(alumni::list_all_alumni))
            )
            .service(
                web::resource("/count")
                    .route(web::get().to(alumni::count_alumni))
            )
            .service(
                web::resource("/me")
                    .route(web::get().to(alumni::my_alumni_profile))
            )
            .service(
                web::resource("/stats/by-year")
                    .route(web::get().to(alumni::alumni_stats_by_year))
            )
            .service(
                web::resource("/stats/by-department")
                    .route(web::get().to(alumni::alumni_stats_by_department))
            )
            .service(
                web::resource("/{alumni_id}")
                    .route(web::get().to(alumni::get_alumni))
                    .route(web::put().to(alumni::update_alumni))
                    .route(web::delete().to(alumni::delete_alumni))
            )
    );
}
