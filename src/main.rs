use std::sync::Arc;

use clap::Parser;
use log::{info, warn};

use focus_room::config::Config;
use focus_room::sink::{DiscardSink, RestSink, StudyLogSink};
use focus_room::{routes, scheduler, tls, Server};

fn build_sink(config: &Config) -> Result<Arc<dyn StudyLogSink>, Box<dyn std::error::Error>> {
    match (config.sink(), config.sink_key.as_deref()) {
        (Some(url), Some(key)) => {
            let sink = RestSink::new(url, &config.sink_table, key.to_string())?;
            info!("Recording study logs to {}", sink.endpoint());
            Ok(Arc::new(sink))
        }
        _ => {
            warn!("No study log store configured, completed sessions will not be recorded");
            Ok(Arc::new(DiscardSink))
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;

    let server = Arc::new(Server::new(config.timer_settings(), build_sink(&config)?));
    let ticker = tokio::spawn(scheduler::run(Arc::clone(&server), config.tick_period()));
    let routes = routes::routes(server, config.static_dir.clone());
    let addr = config.addr();

    let identity = config.tls_identity().and_then(|(cert, key)| {
        match tls::check_identity(cert, key) {
            Ok(()) => Some((cert.clone(), key.clone())),
            Err(e) => {
                warn!("Failed to load TLS identity ({}), falling back to HTTP/WS", e);
                None
            }
        }
    });

    match identity {
        Some((cert, key)) => {
            let (bound, serving) = warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .bind_with_graceful_shutdown(addr, shutdown_signal());
            info!("Serving HTTPS/WSS on {}", bound);
            serving.await;
        }
        None => {
            let (bound, serving) =
                warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown_signal())?;
            info!("Serving HTTP/WS on {}", bound);
            serving.await;
        }
    }

    ticker.abort();
    Ok(())
}
