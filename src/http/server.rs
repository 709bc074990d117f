// src/http/server.rs

use crate::error::{Result, TrafficError};
use crate::http::cors;
use crate::http::handlers;
use crate::http::router::Api;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Request;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Error for a body that could not be read: 413 when it outgrew the limit,
/// 400 for anything else (a reset or truncated upload).
fn body_error(error: &(dyn std::error::Error + 'static), max_body_bytes: usize) -> TrafficError {
    if error.is::<LengthLimitError>() {
        TrafficError::PayloadTooLarge(max_body_bytes)
    } else {
        TrafficError::BadRequest(format!("Cannot read request body: {error}"))
    }
}

/// Buffers the body (up to `max_body_bytes`) and dispatches the request.
async fn handle(
    api: Arc<Api>,
    request: Request<Incoming>,
    max_body_bytes: usize,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok()?.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_body_bytes) {
        return Ok(cors::apply(handlers::error_response(
            &TrafficError::PayloadTooLarge(max_body_bytes),
        )));
    }

    let bytes = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let error = body_error(e.as_ref(), max_body_bytes);
            log::warn!("Error reading body of {} {}: {}", parts.method, parts.uri, e);
            return Ok(cors::apply(handlers::error_response(&error)));
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let response = api.dispatch(Request::from_parts(parts, bytes));
    log::debug!("{} {} -> {}", method, path, response.status().as_u16());
    Ok(response)
}

/// Accepts connections on `listener` until `shutdown` resolves, then lets
/// in-flight requests finish.
pub async fn serve<F>(listener: TcpListener, api: Arc<Api>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let max_body_bytes = api.state().config.server.max_body_bytes;
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    log::info!("Listening on http://{}", listener.local_addr()?);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    log::error!("Connection task failed: {}", e);
                }
                continue;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::warn!("Error accepting connection: {}", e);
                    continue;
                }
            },
        };

        let api = Arc::clone(&api);
        let mut stop_rx = stop_rx.clone();
        connections.spawn(async move {
            let service = service_fn(move |request| handle(Arc::clone(&api), request, max_body_bytes));
            let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);
            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = stop_rx.changed() => {
                    connection.as_mut().graceful_shutdown();
                    connection.as_mut().await
                }
            };
            if let Err(e) = result {
                log::debug!("Connection from {} ended with error: {}", peer, e);
            }
        });
    }

    log::info!("Shutting down, waiting for {} connections", connections.len());
    let _ = stop_tx.send(true);
    while connections.join_next().await.is_some() {}
    Ok(())
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(api: Arc<Api>) -> Result<()> {
    let addr: SocketAddr = api.state().config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    serve(listener, api, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
