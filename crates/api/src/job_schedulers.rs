use crate::{
    check_in::send_check_in_requests::SendCheckInRequestsUseCase,
    shared::usecase::execute,
    trigger::evaluate_triggers::EvaluateTriggersUseCase,
};
use actix_web::rt::time::{interval, sleep_until, Instant};
use silent_guard_infra::SilentGuardContext;
use std::{future::Future, time::Duration};

pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Runs `job` every `evaluation_interval`. Intervals of a minute or more start
/// on the next minute boundary. Every tick runs in its own task so that a
/// slow tick never delays the next one.
fn start_job<F, Fut>(ctx: SilentGuardContext, job: F)
where
    F: Fn(SilentGuardContext) -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    actix_web::rt::spawn(async move {
        let period = ctx.config.evaluation_interval;
        if period >= Duration::from_secs(60) {
            let now = ctx.sys.get_timestamp_millis();
            let secs_to_next_run = get_start_delay(now as usize, 0);
            sleep_until(Instant::now() + Duration::from_secs(secs_to_next_run as u64)).await;
        }

        let mut ticks = interval(period);
        loop {
            ticks.tick().await;
            actix_web::rt::spawn(job(ctx.clone()));
        }
    });
}

pub fn start_trigger_evaluation_job(ctx: SilentGuardContext) {
    start_job(ctx, |ctx| async move {
        let _ = execute(EvaluateTriggersUseCase {}, &ctx).await;
    });
}

pub fn start_check_in_requests_job(ctx: SilentGuardContext) {
    start_job(ctx, |ctx| async move {
        let _ = execute(SendCheckInRequestsUseCase {}, &ctx).await;
        let now = ctx.sys.get_timestamp_millis();
        if let Err(e) = ctx.repos.check_in_tokens.delete_expired(now).await {
            tracing::error!("Unable to delete expired check in tokens: {:?}", e);
        }
    });
}
