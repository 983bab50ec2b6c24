use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_notify::config::{self, Config};
use portal_notify::render;
use portal_notify::store::http::HttpStore;
use portal_notify::store::memory::MemoryStore;
use portal_notify::{NewNotification, NotificationStore, NotificationSync};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export is opt-in; without the endpoint we only log to stdout.
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "portal-notify"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "portal_notify=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let mut cfg = config::load()?;
    let args = cli::Cli::parse();
    if let Some(url) = args.store_url {
        cfg.store_url = url;
    }

    let result = match args.command {
        cli::Commands::Serve { port } => run_server(port.unwrap_or(cfg.port)).await,
        cli::Commands::Watch {
            user,
            interval,
            limit,
            no_color,
        } => {
            let interval = interval.map(Duration::from_secs).unwrap_or(cfg.poll_interval());
            run_watch(&cfg, user, interval, limit, !no_color).await
        }
        cli::Commands::List { user } => list(&cfg, user).await,
        cli::Commands::Unread { user } => unread(&cfg, user).await,
        cli::Commands::Read { id } => read(&cfg, id).await,
        cli::Commands::ReadAll { user } => read_all(&cfg, user).await,
        cli::Commands::Notify {
            user,
            kind,
            title,
            message,
        } => {
            let new = NewNotification {
                user_id: user,
                r#type: kind,
                title,
                message,
            };
            notify(&cfg, new).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn http_store(cfg: &Config) -> anyhow::Result<Arc<dyn NotificationStore>> {
    let store = HttpStore::new(cfg.store_url.clone(), cfg.api_key.clone(), cfg.request_timeout())
        .context("failed to build store client")?;
    Ok(Arc::new(store))
}

async fn run_server(port: u16) -> anyhow::Result<()> {
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryStore::new());
    let app = portal_notify::api::app(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("dev notification store listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn run_watch(
    cfg: &Config,
    user: uuid::Uuid,
    interval: Duration,
    limit: usize,
    color: bool,
) -> anyhow::Result<()> {
    let sync = NotificationSync::new(http_store(cfg)?, interval);
    let mut updates = sync.subscribe();

    sync.start(Some(user)).await;
    print_bell(&sync.snapshot(), limit, color);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.is_loading {
                    print_bell(&snapshot, limit, color);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    sync.stop();
    Ok(())
}

fn print_bell(snapshot: &portal_notify::SyncSnapshot, limit: usize, color: bool) {
    println!("{}", render::render_bell(snapshot));
    println!("{}", render::render_dropdown(snapshot, Utc::now(), limit, color));
}

fn oneshot_sync(cfg: &Config) -> anyhow::Result<NotificationSync> {
    Ok(NotificationSync::new(http_store(cfg)?, cfg.poll_interval()))
}

async fn list(cfg: &Config, user: uuid::Uuid) -> anyhow::Result<()> {
    let sync = oneshot_sync(cfg)?;
    let rows = sync.fetch_all(user).await;
    report_failed_fetch(&sync)?;
    for n in &rows {
        println!(
            "{}  {:<16} {:<5} {}  {}",
            n.id,
            n.r#type,
            if n.is_read { "read" } else { "new" },
            n.created_at.to_rfc3339(),
            n.title
        );
    }
    println!("{} notification(s), {} unread", rows.len(), sync.snapshot().unread_count);
    Ok(())
}

async fn unread(cfg: &Config, user: uuid::Uuid) -> anyhow::Result<()> {
    let sync = oneshot_sync(cfg)?;
    let count = sync.fetch_unread_count(user).await;
    report_failed_fetch(&sync)?;
    println!("{}", count);
    Ok(())
}

async fn read(cfg: &Config, id: uuid::Uuid) -> anyhow::Result<()> {
    let sync = oneshot_sync(cfg)?;
    sync.mark_as_read(id).await;
    report_unconfirmed(&sync)?;
    println!("Marked {} as read", id);
    Ok(())
}

async fn read_all(cfg: &Config, user: uuid::Uuid) -> anyhow::Result<()> {
    let sync = oneshot_sync(cfg)?;
    sync.mark_all_as_read(user).await;
    report_unconfirmed(&sync)?;
    println!("Marked all notifications of {} as read", user);
    Ok(())
}

async fn notify(cfg: &Config, new: NewNotification) -> anyhow::Result<()> {
    let created = http_store(cfg)?
        .create(new)
        .await
        .context("failed to create notification")?;
    println!("Created notification {}", created.id);
    Ok(())
}

fn report_failed_fetch(sync: &NotificationSync) -> anyhow::Result<()> {
    if sync.stats().failed_fetches > 0 {
        anyhow::bail!("could not reach the notification store (see logs)");
    }
    Ok(())
}

/// The sync layer absorbs write failures; a one-shot command should still exit non-zero.
fn report_unconfirmed(sync: &NotificationSync) -> anyhow::Result<()> {
    if sync.stats().unconfirmed_writes > 0 {
        anyhow::bail!("the store did not confirm the update (see logs)");
    }
    Ok(())
}
