use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use warp::Filter;

use crate::server::Server;

fn with_server(
    server: Arc<Server>,
) -> impl Filter<Extract = (Arc<Server>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&server))
}

/// `/ws` for clients, `/health` for probes, everything else from `static_dir`.
pub fn routes(
    server: Arc<Server>,
    static_dir: PathBuf,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ws_route = warp::path("ws")
        .and(warp::ws())
        .and(with_server(Arc::clone(&server)))
        .map(|ws: warp::ws::Ws, server: Arc<Server>| {
            ws.on_upgrade(move |socket| async move {
                server.handle_connection(socket).await;
            })
        });

    let health = warp::path("health")
        .and(warp::get())
        .and(with_server(server))
        .and_then(|server: Arc<Server>| async move {
            Ok::<_, Infallible>(warp::reply::json(&server.stats().await))
        });

    ws_route
        .or(health)
        .or(warp::fs::dir(static_dir))
        .with(warp::cors().allow_any_origin())
}
