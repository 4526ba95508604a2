//! HTTP handlers and route configuration.

mod health;
mod shopping;

use actix_web::web;

use crate::middleware::AdmissionMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, admission: AdmissionMiddleware) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::resource("/api")
                .wrap(admission)
                .route(web::get().to(shopping::shopping_list)),
        );
}
