// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Finaudy — native bridge for the Finaudy web app
//
// Entry point. Initialises logging and the bridge services, runs the
// launch-time host requests, and reports what the host answered.
//
//   finaudy                       run the launch sequence against the platform host
//   finaudy route <json>          show where a notification click would navigate
//   finaudy sign-in               native Google sign-in
//   finaudy purchase <plan>       open the store sheet for `premium` or `vip`
//   finaudy media <kind> [arg]    camera, gallery, file [accept-type],
//                                 record [seconds] or toast <message>

mod services;
mod state;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::human_errors::humanize_error;
use finaudy_core::notification::NotificationPayload;
use finaudy_core::routing::{RouteTarget, route_notification, web_location};
use finaudy_core::types::{Capability, PermissionName, Plan};

use services::app_services::AppServices;
use services::google_auth::GoogleAuthService;
use services::media::MediaService;
use services::notification_clicks::{Navigator, NotificationClickService};
use services::permissions::PermissionService;
use services::purchases::PurchaseService;
use services::push_tokens::{PushTokenService, TokenStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("route") => match args.get(1) {
            Some(raw) => route(raw),
            None => {
                eprintln!("usage: finaudy route <notification-json>");
                ExitCode::FAILURE
            }
        },
        Some("sign-in") => finish("Google sign-in", sign_in().await),
        Some("purchase") => match args.get(1).map(String::as_str).and_then(parse_plan) {
            Some(plan) => finish("purchase", purchase(plan).await),
            None => {
                eprintln!("usage: finaudy purchase <premium|vip>");
                ExitCode::FAILURE
            }
        },
        Some("media") => match args.get(1) {
            Some(kind) => finish("media", media(kind, args.get(2).map(String::as_str)).await),
            None => {
                eprintln!("usage: finaudy media <camera|gallery|file|record|toast> [arg]");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("unknown command `{other}`");
            ExitCode::FAILURE
        }
        None => match launch().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "launch failed");
                ExitCode::FAILURE
            }
        },
    }
}

fn parse_plan(name: &str) -> Option<Plan> {
    match name.to_ascii_lowercase().as_str() {
        "premium" => Some(Plan::Premium),
        "vip" => Some(Plan::Vip),
        _ => None,
    }
}

/// Exit status for a one-shot command, explaining failures.
fn finish(what: &str, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            explain(what, &e);
            ExitCode::FAILURE
        }
    }
}

fn route(raw: &str) -> ExitCode {
    let payload = match NotificationPayload::try_from_json(raw) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    println!("app: {}", route_notification(&payload));
    match web_location(&payload) {
        Some(location) => println!("web: {location}"),
        None => println!("web: (dismissed)"),
    }
    ExitCode::SUCCESS
}

/// Logs navigation instead of moving a UI.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, target: &RouteTarget) {
        tracing::info!(route = %target, "navigate");
    }
}

/// Logs tokens instead of registering them with the backend.
struct LogTokenStore;

impl TokenStore for LogTokenStore {
    fn save_token(&self, user_id: &str, _token: &str, platform: &str) -> Result<()> {
        tracing::info!(user_id, platform, "would register push token");
        Ok(())
    }
}

async fn launch() -> Result<()> {
    tracing::info!("Finaudy bridge starting");

    let services = AppServices::init()?;
    let config = services.config();

    let _clicks = NotificationClickService::install(&services, Arc::new(LogNavigator))?;
    let permissions = PermissionService::install(&services);
    let tokens = PushTokenService::install(&services, Arc::new(LogTokenStore));

    if config.request_notifications_on_launch {
        report("notification permission", permissions.request(PermissionName::Notifications).await);
    }
    if config.request_token_on_launch {
        report("FCM token", tokens.request_token().await.map(|_| true));
    }

    let state = services.state();
    tracing::info!(
        platform = %state.platform,
        permissions = ?state.permissions,
        has_push_token = state.push_token.is_some(),
        pending = ?services.registry().snapshot(),
        "launch sequence finished"
    );

    services.shutdown();
    Ok(())
}

/// Sign in through the host's account picker. The credential would be
/// exchanged with the auth backend; here only its shape is reported.
async fn sign_in() -> Result<()> {
    let services = AppServices::init()?;
    let auth = GoogleAuthService::install(&services);
    if !auth.is_available() {
        tracing::info!("native sign-in not available, the web OAuth flow applies");
    }
    let result = auth.sign_in().await;
    if let Ok(credential) = &result {
        println!(
            "signed in: id token {} chars, access token {}",
            credential.id_token.len(),
            if credential.access_token.is_some() { "present" } else { "absent" }
        );
    }
    tracing::info!(signed_in = auth.is_signed_in(), "sign-in finished");
    services.shutdown();
    result.map(|_| ())
}

async fn purchase(plan: Plan) -> Result<()> {
    let services = AppServices::init()?;
    let purchases = PurchaseService::install(&services);
    if !purchases.is_available() {
        tracing::info!("store purchases not available on this platform");
    }
    let result = purchases.start_purchase(plan).await;
    if let Ok(receipt) = &result {
        println!("purchased {} (token {} chars)", receipt.product_id, receipt.purchase_token.len());
    }
    services.shutdown();
    result.map(|_| ())
}

async fn media(kind: &str, arg: Option<&str>) -> Result<()> {
    let services = AppServices::init()?;
    let media = MediaService::install(&services);
    let result = match kind {
        "camera" => media.capture_photo().await.map(|image| describe(&image)),
        "gallery" => media.pick_gallery_image().await.map(|image| describe(&image)),
        "file" => media
            .choose_file(arg.unwrap_or("*/*"))
            .await
            .map(|file| format!("{} ({})", file.file_name, describe(&file.data))),
        "record" => {
            let seconds = arg.and_then(|s| s.parse().ok()).unwrap_or(5);
            record(&media, Duration::from_secs(seconds)).await
        }
        "toast" => media
            .show_toast(arg.unwrap_or("Finaudy"))
            .map(|()| "toast shown".to_string()),
        other => Err(FinaudyError::Bridge(format!("unknown media kind `{other}`"))),
    };
    if let Ok(summary) = &result {
        println!("{summary}");
    }
    services.shutdown();
    result.map(|_| ())
}

async fn record(media: &MediaService, length: Duration) -> Result<String> {
    if !media.is_available(Capability::StopAudioRecording) {
        return Err(FinaudyError::CapabilityUnavailable(Capability::StopAudioRecording));
    }
    media.start_recording()?;
    tracing::info!(seconds = length.as_secs(), recording = media.is_recording(), "recording");
    tokio::time::sleep(length).await;
    media.stop_recording().await.map(|audio| describe(&audio))
}

fn describe(media: &finaudy_core::media::MediaData) -> String {
    format!("{}, {} bytes", media.mime_type, media.len())
}

fn report(what: &str, result: Result<bool>) {
    match result {
        Ok(granted) => tracing::info!(what, granted, "host answered"),
        Err(e) => explain(what, &e),
    }
}

fn explain(what: &str, e: &FinaudyError) {
    if let FinaudyError::CapabilityUnavailable(capability) = e {
        tracing::info!(what, %capability, "not supported on this platform");
        return;
    }
    let human = humanize_error(e);
    tracing::warn!(
        what,
        error = %e,
        severity = ?human.severity,
        suggestion = %human.suggestion,
        "{}",
        human.message
    );
}
