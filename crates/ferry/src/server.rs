use crate::app::Ferry;
use crate::error::ServerError;
use crate::router::Router;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

impl Ferry {
    /// Builds the router, binds `address` and serves connections until the task is dropped.
    ///
    /// Installs a `tracing` subscriber at [`Config::log_level`](crate::Config::log_level) unless
    /// the level is `None` or a global subscriber is already set.
    pub async fn listen<A: ToSocketAddrs>(self, address: A) -> Result<(), ServerError> {
        if let Some(level) = self.config().log_level() {
            init_subscriber(level);
        }

        let router = self.build();
        let listener = TcpListener::bind(address).await.map_err(|source| {
            error!(cause = %source, "bind server error");
            ServerError::Bind { source }
        })?;

        router.serve(listener).await;
        Ok(())
    }
}

impl Router {
    /// Serves every connection accepted by `listener`, each on its own task.
    pub async fn serve(self, listener: TcpListener) {
        match listener.local_addr() {
            Ok(address) => info!(%address, "start listening"),
            Err(e) => warn!(cause = %e, "listening on unknown address"),
        }

        let router = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let io = TokioIo::new(tcp_stream);
                let service = service_fn(move |req| {
                    let router = Arc::clone(&router);
                    async move { Ok::<_, Infallible>(router.dispatch(req).await) }
                });

                match http1::Builder::new().serve_connection(io, service).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
                }
            });
        }
    }
}

fn init_subscriber(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        debug!(cause = %e, "global subscriber already set");
    }
}
