use crate::error::SilentGuardError;
use crate::shared::auth::protect_route;
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::get_last_check_in::*;
use silent_guard_infra::SilentGuardContext;

pub async fn get_last_check_in_controller(
    http_req: HttpRequest,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    Ok(HttpResponse::Ok().json(APIResponse {
        last_check_in: user.last_check_in,
    }))
}
