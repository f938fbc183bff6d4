use crate::{
    api::{attendance, notification},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter state, built once at startup and shared by every worker.
pub struct RateLimits {
    protected: LimiterConfig,
    submit: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: build_limiter(config.rate_protected_per_min)?,
            submit: build_limiter(config.rate_submit_per_min)?,
        })
    }
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    if requests_per_min == 0 {
        return Err(anyhow!("rate limit must be at least 1 request per minute"));
    }
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/events
                    .service(
                        web::resource("/events")
                            .route(
                                web::post()
                                    .to(attendance::submit_event)
                                    .wrap(Governor::new(&limits.submit)),
                            )
                            .route(web::get().to(attendance::list_events)),
                    )
                    // /attendance/events/{id}/approve
                    .service(
                        web::resource("/events/{id}/approve")
                            .route(web::put().to(attendance::approve_event)),
                    )
                    // /attendance/events/{id}/reject
                    .service(
                        web::resource("/events/{id}/reject")
                            .route(web::put().to(attendance::reject_event)),
                    )
                    .service(web::resource("/summary").route(web::get().to(attendance::get_summary)))
                    .service(
                        web::resource("/sweeps/absence")
                            .route(web::post().to(attendance::run_absence_sweep)),
                    )
                    .service(
                        web::resource("/sweeps/reminder")
                            .route(web::post().to(attendance::run_reminder_sweep)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    // /notifications
                    .service(
                        web::resource("")
                            .route(web::get().to(notification::list_notifications))
                            .route(web::post().to(notification::send_alert)),
                    )
                    // /notifications/{id}/read
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notification::mark_read)),
                    ),
            ),
    );
}
