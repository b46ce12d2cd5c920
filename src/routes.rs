use crate::{
    api::{attendance, biometric, correction, payroll},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, middleware::from_fn, web};

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request((60_000 / u64::from(requests_per_min)).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    cfg.service(health);

    // Devices authenticate by registration, not by bearer token. Registered
    // ahead of the API scope so the JWT middleware never sees it.
    cfg.service(
        web::scope(&format!("{}/attendance/biometric", config.api_prefix))
            .wrap(build_limiter(config.rate_webhook_per_min))
            .service(
                web::resource("/webhook").route(web::post().to(biometric::biometric_webhook)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(build_limiter(config.rate_protected_per_min))
            .service(
                web::scope("/attendance")
                    .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
                    .service(
                        web::resource("/clock-out").route(web::post().to(attendance::clock_out)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/overview").route(web::get().to(attendance::overview)),
                    )
                    .service(
                        web::resource("/process-daily")
                            .route(web::post().to(attendance::process_daily)),
                    )
                    .service(
                        web::resource(r"/employee/{id:\d+}")
                            .route(web::get().to(attendance::employee_month)),
                    )
                    // /attendance/corrections
                    .service(
                        web::resource("/corrections")
                            .route(web::post().to(correction::submit_correction))
                            .route(web::get().to(correction::list_corrections)),
                    )
                    .service(
                        web::resource(r"/corrections/{id:\d+}/approve")
                            .route(web::patch().to(correction::approve_correction)),
                    )
                    .service(
                        web::resource(r"/corrections/{id:\d+}/reject")
                            .route(web::patch().to(correction::reject_correction)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource(r"/{id:\d+}")
                            .route(web::patch().to(attendance::update_attendance)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(
                        web::resource("")
                            .route(web::post().to(payroll::create_payroll))
                            .route(web::get().to(payroll::list_payrolls)),
                    )
                    .service(
                        web::resource("/employees").route(web::get().to(payroll::payroll_employees)),
                    )
                    //payroll/{id}
                    .service(web::resource(r"/{id:\d+}").route(web::get().to(payroll::get_payroll))),
            ),
    );
}
