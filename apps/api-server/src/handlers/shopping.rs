//! The handler behind the admission gate.

use actix_web::HttpResponse;
use quotagate_shared::dto::ShoppingListResponse;

/// GET /api
pub async fn shopping_list() -> HttpResponse {
    HttpResponse::Ok().json(ShoppingListResponse {
        shopping_list: vec!["cheese".to_string(), "milk".to_string()],
    })
}
