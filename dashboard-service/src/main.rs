use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rand_core::OsRng;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{info, warn};
use uuid::Uuid;

use common_auth::{key_pair_from_private_pem, Authenticator, ROLE_ADMIN, ROLE_USER};
use common_middleware::Metrics;

use dashboard_service::app::{build_app, AppState};
use dashboard_service::config::{load_config, AppConfig};
use dashboard_service::store::{hash_password, MemoryUserStore, User, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    run().await
}

async fn run() -> Result<()> {
    let config = load_config()?;
    info!(bind_addr = %config.bind_addr, key_id = %config.key_id, "starting dashboard-service");

    let private_pem = load_private_key(&config)?;
    let (encoding_key, decoding_key) = key_pair_from_private_pem(&private_pem)?;
    let authenticator =
        Authenticator::with_single_key(config.key_id.clone(), encoding_key, decoding_key);

    let metrics = Metrics::new()?;

    let store = MemoryUserStore::new();
    seed_admin(&store, &config.seed_admin_email, &config.seed_admin_password)?;

    let state = AppState {
        store: Arc::new(store),
        authenticator,
        metrics,
        token_ttl: chrono::Duration::seconds(config.token_ttl_secs as i64),
    };

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let router = build_app(state, shutdown_tx)?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %listener.local_addr().context("reading bound address")?, "listening");

    let (close_tx, close_rx) = oneshot::channel::<()>();
    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = close_rx.await;
    });
    let mut server = tokio::spawn(async move { serve.await });

    let mut sigterm = signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
    let mut integrity_shutdown = false;

    tokio::select! {
        result = &mut server => {
            result.context("server task")?.context("listening and serving")?;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        received = shutdown_rx.recv() => {
            if received.is_some() {
                warn!("integrity shutdown requested");
                integrity_shutdown = true;
            }
        }
    }

    let _ = close_tx.send(());
    match time::timeout(Duration::from_secs(config.shutdown_timeout_secs), &mut server).await {
        Ok(result) => {
            result.context("server task")?.context("draining connections")?;
        }
        Err(_) => {
            warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "drain deadline exceeded, stopping the server"
            );
            server.abort();
        }
    }

    if integrity_shutdown {
        return Err(anyhow!("integrity error detected, asking for self shutdown"));
    }

    info!("shutdown complete");
    Ok(())
}

fn load_private_key(config: &AppConfig) -> Result<String> {
    if config.dev_generate_keypair {
        warn!("DEV_GENERATE_KEYPAIR set, using an in-process keypair");
        return generate_dev_keypair();
    }

    fs::read_to_string(&config.private_key_file)
        .with_context(|| format!("reading private key file {}", config.private_key_file))
}

fn generate_dev_keypair() -> Result<String> {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).context("generating RSA keypair")?;
    let pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("encoding private key")?;
    Ok(pem.to_string())
}

fn seed_admin(store: &MemoryUserStore, email: &str, password: &str) -> Result<()> {
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        name: "Bootstrap Admin".to_string(),
        email: email.to_string(),
        roles: vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()],
        password_hash: hash_password(password)?,
        created_at: now,
        updated_at: now,
    };
    store
        .insert(admin)
        .map_err(|err| anyhow!("seeding admin user: {err}"))?;
    info!(email, "seeded bootstrap admin");
    Ok(())
}
