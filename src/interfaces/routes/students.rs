use actix_web::web;

use crate::handlers::students;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .service(
                web::resource("")
                    .route(web::get().to(students::list_students))
                    .route(web::post().to(students::create_student))
            )
            .service(
                web::resource("/all")
                    .route(web::get().to(students::list_all_students))
            )
            .service(
                web::resource("/count")
                    .route(web::get().to(students::count_students))
            )
            .service(
                web::resource("/{student_id}")
                    .route(web::get().to(students::get_student))
                    .route(web::put().to(students::update_student))
                    .route(web::delete().to(students::delete_student))
            )
    );
}
