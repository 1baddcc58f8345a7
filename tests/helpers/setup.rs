use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use silent_guard_api::Application;
use silent_guard_domain::{MILLIS_PER_DAY, MILLIS_PER_MINUTE};
use silent_guard_infra::{
    setup_test_context, IdentityProviderKey, InMemoryDeliveryService, ManualSys, SilentGuardContext,
};
use silent_guard_sdk::SilentGuardSDK;
use std::{sync::Arc, time::Duration};
use url::Url;

const IDP_SECRET: &str = "integration-test-secret";
/// 2023-11-14, the clock of the engine only moves when a test moves it
pub const START_TIME: i64 = 1_700_000_000_000;

pub struct TestApp {
    pub address: String,
    pub ctx: SilentGuardContext,
    pub sys: Arc<ManualSys>,
    pub outbox: Arc<InMemoryDeliveryService>,
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    email: Option<String>,
    exp: usize,
}

pub fn mint_token(subject: &str, email: Option<&str>) -> String {
    let claims = Claims {
        sub: subject.into(),
        email: email.map(String::from),
        exp: (Utc::now().timestamp() + 60 * 60) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(IDP_SECRET.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    /// SDK authenticated as the user with the given subject
    pub fn sdk_for(&self, subject: &str) -> SilentGuardSDK {
        let email = format!("{}@silent-guard.test", subject);
        SilentGuardSDK::with_token(self.address.clone(), mint_token(subject, Some(&email)))
    }

    pub fn anonymous_sdk(&self) -> SilentGuardSDK {
        SilentGuardSDK::new(self.address.clone())
    }

    /// Token of the last confirmation link sent to `email`
    pub fn last_confirmation_token(&self, email: &str) -> Option<String> {
        let request = self
            .outbox
            .sent_check_in_requests()
            .into_iter()
            .filter(|r| r.to == email)
            .last()?;
        let link = Url::parse(&request.link).ok()?;
        link.query_pairs()
            .find(|(key, _)| key == "confirmation")
            .map(|(_, token)| token.into_owned())
    }
}

/// Context with its own storage, a manual clock, an in-memory outbox and
/// jobs ticking every few milliseconds
pub async fn test_context() -> (SilentGuardContext, Arc<ManualSys>, Arc<InMemoryDeliveryService>) {
    let mut ctx = setup_test_context().await;
    let sys = Arc::new(ManualSys::new(START_TIME));
    let outbox = Arc::new(InMemoryDeliveryService::new());
    ctx.sys = sys.clone();
    ctx.delivery = outbox.clone();
    ctx.config.port = 0; // Random port
    ctx.config.idp_key = IdentityProviderKey::Secret(IDP_SECRET.into());
    ctx.config.idp_issuer = None;
    ctx.config.check_in_window = MILLIS_PER_DAY;
    ctx.config.evaluation_interval = Duration::from_millis(20);
    ctx.config.delivery_timeout = Duration::from_secs(1);
    ctx.config.claim_timeout = 10 * MILLIS_PER_MINUTE;
    (ctx, sys, outbox)
}

// Launch the application as a background task
pub async fn spawn_app() -> TestApp {
    let (ctx, sys, outbox) = test_context().await;
    spawn_app_with_context(ctx, sys, outbox).await
}

pub async fn spawn_app_with_context(
    ctx: SilentGuardContext,
    sys: Arc<ManualSys>,
    outbox: Arc<InMemoryDeliveryService>,
) -> TestApp {
    let application = Application::new(ctx.clone())
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}/api/v1", application.port());
    actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        address,
        ctx,
        sys,
        outbox,
    }
}

/// Polls `condition` until it holds or a couple of seconds have passed
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Gives the background jobs time for a few ticks
pub async fn let_jobs_run() {
    actix_web::rt::time::sleep(Duration::from_millis(150)).await;
}
