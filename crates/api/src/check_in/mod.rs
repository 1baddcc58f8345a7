mod confirm_check_in;
mod get_last_check_in;
mod request_check_in_link;
pub mod send_check_in_requests;

use actix_web::{rt::time::timeout, web};
use confirm_check_in::check_in_controller;
use get_last_check_in::get_last_check_in_controller;
use request_check_in_link::request_check_in_link_controller;
use silent_guard_domain::{check_in_link, format_duration, CheckInRequest, CheckInToken, User};
use silent_guard_infra::SilentGuardContext;
use tracing::warn;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/me/check-in", web::get().to(get_last_check_in_controller));
    cfg.route(
        "/me/check-in",
        web::post().to(request_check_in_link_controller),
    );
    cfg.route(
        "/confirmation/check-in/{token}",
        web::put().to(check_in_controller),
    );
}

#[derive(Debug, PartialEq)]
pub enum SendCheckInRequestError {
    StorageError,
    DeliveryFailed,
}

/// Issues a fresh confirmation token for the user and emails them the
/// link. `respond_within` is only used for the text of the email.
pub(crate) async fn send_check_in_request(
    user: &User,
    respond_within: i64,
    ctx: &SilentGuardContext,
) -> Result<(), SendCheckInRequestError> {
    let now = ctx.sys.get_timestamp_millis();
    let token = CheckInToken::new(user.id, now, ctx.config.check_in_window);
    ctx.repos
        .check_in_tokens
        .insert(&token)
        .await
        .map_err(|_| SendCheckInRequestError::StorageError)?;

    let request = CheckInRequest {
        to: user.email.clone(),
        link: check_in_link(&ctx.config.check_in_base_url, &token),
        time_to_respond: format_duration(respond_within),
    };
    match timeout(
        ctx.config.delivery_timeout,
        ctx.delivery.send_check_in_request(&request),
    )
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!("Unable to send check in request to user: {}. Error: {}", user.id, e);
            Err(SendCheckInRequestError::DeliveryFailed)
        }
        Err(_) => {
            warn!("Sending check in request to user: {} timed out", user.id);
            Err(SendCheckInRequestError::DeliveryFailed)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use silent_guard_infra::InMemoryDeliveryService;
    use url::Url;

    /// Extracts the confirmation token from the last check in request in the outbox
    pub fn last_confirmation_token(outbox: &InMemoryDeliveryService) -> Option<String> {
        let request = outbox.sent_check_in_requests().pop()?;
        let link = Url::parse(&request.link).ok()?;
        link.query_pairs()
            .find(|(key, _)| key == "confirmation")
            .map(|(_, token)| token.into_owned())
    }
}
