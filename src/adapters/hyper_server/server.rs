use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ServerBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error};

use super::HyperBridgeAdapter;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever, serving each one on its own task.
pub async fn serve(listener: TcpListener, adapter: Arc<HyperBridgeAdapter>) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let io = TokioIo::new(stream);
                let adapter = adapter.clone();

                tokio::spawn(async move {
                    let service_fn = service_fn(move |req| {
                        let adapter = adapter.clone();
                        async move { Ok::<_, hyper::Error>(adapter.handle(req).await) }
                    });

                    if let Err(err) = ServerBuilder::new(TokioExecutor::new())
                        .http1()
                        .serve_connection_with_upgrades(io, service_fn)
                        .await
                    {
                        debug!("connection from {} ended with error: {}", remote, err);
                    }
                });
            }
            Err(e) => {
                // Usually EMFILE; back off instead of spinning.
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
