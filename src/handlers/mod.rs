pub mod auth;
pub mod employee;
pub mod file;
mod payload;

use actix_web::web;

use crate::errors::AppError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(payload::MAX_JSON_BYTES)
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api/auth")
            .service(web::resource("/register").route(web::post().to(auth::register)))
            .service(web::resource("/login").route(web::post().to(auth::login)))
            .service(web::resource("/me").route(web::get().to(auth::me))),
    )
    .service(
        web::scope("/api/employees")
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::get_employees)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::put().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            ),
    )
    .service(web::resource("/uploads/{file_name}").route(web::get().to(file::serve_upload)));
}
