//! Console driver: mounts an auth controller against the configured provider
//! and an in-memory router, then reads commands from stdin.
//!
//! Commands: `login <email> <secret>`, `register <email> <secret>`, `logout`,
//! `go <path>`, `state`, `quit`.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use lumigram_auth::AuthSessionController;
use lumigram_auth::config::{AuthConfig, ProviderKind};
use lumigram_auth::provider::IdentityProvider;
use lumigram_auth::provider::firebase::FirebaseProvider;
use lumigram_auth::provider::memory::MemoryProvider;
use lumigram_auth::router::{MemoryRouter, Router};
use lumigram_auth::state::AuthState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AuthConfig::from_env()?;
    let provider: Arc<dyn IdentityProvider> = match (config.provider, config.firebase) {
        (ProviderKind::Firebase, Some(firebase)) => Arc::new(FirebaseProvider::new(firebase)?),
        _ => Arc::new(MemoryProvider::new()),
    };
    tracing::info!(provider = ?config.provider, "auth provider selected");

    let router = Arc::new(MemoryRouter::new(config.routes.landing()));
    let controller = Arc::new(AuthSessionController::new(provider, router.clone(), config.routes));
    controller.mount().await?;

    let watcher = tokio::spawn(print_changes(controller.clone(), router.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["login", email, secret] => report(controller.login(email, secret).await),
            ["register", email, secret] => report(controller.register(email, secret).await),
            ["logout"] => report(controller.logout().await),
            ["go", path] => router.push(path),
            ["state"] => println!("{}", describe(&controller.state(), &router.location())),
            ["quit" | "exit"] => break,
            _ => println!("commands: login <email> <secret> | register <email> <secret> | logout | go <path> | state | quit"),
        }
    }

    watcher.abort();
    controller.unmount();
    Ok(())
}

fn report(result: Result<(), lumigram_auth::AuthError>) {
    match result {
        Ok(()) => println!("ok"),
        Err(e) => println!("error [{}]: {e}", e.error_code()),
    }
}

fn describe(state: &AuthState, location: &str) -> String {
    let who = state
        .session
        .as_ref()
        .map_or_else(|| "-".to_owned(), |s| s.email.clone().unwrap_or_else(|| s.subject_id.clone()));
    let error = state.error.map_or_else(String::new, |e| format!(" error={}", e.error_code()));
    format!("{:?} {who} {:?} at {location}{error}", state.resolution, state.action())
}

/// Echo state transitions, navigations and notices until aborted.
async fn print_changes(controller: Arc<AuthSessionController>, router: Arc<MemoryRouter>) {
    let mut state_rx = controller.watch();
    let mut location_rx = router.current_location();
    let mut notices = controller.notices();
    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let snapshot = state_rx.borrow_and_update().clone();
                println!("state: {}", describe(&snapshot, &router.location()));
            }
            changed = location_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let location = location_rx.borrow_and_update().clone();
                println!("location: {location}");
            }
            notice = notices.recv() => match notice {
                Ok(notice) => println!("notice: {}", notice.message),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "notices lagged"),
                Err(RecvError::Closed) => return,
            },
        }
    }
}
