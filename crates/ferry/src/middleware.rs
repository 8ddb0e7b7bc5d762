//! Built-in middleware.
//!
//! Both are plain [`Handler`]s registered with [`Routes::use_middleware`](crate::Routes::use_middleware),
//! globally or on a group.

use crate::context::Context;
use crate::encoding::ContentEncoding;
use crate::error::HandlerResult;
use crate::handler::Handler;
use async_trait::async_trait;
use http::header::ACCEPT_ENCODING;
use http::{Method, StatusCode};
use std::time::Instant;
use tracing::{info, warn};

/// Logs one line per request once the rest of the chain has run.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

#[async_trait]
impl Handler for AccessLog {
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        let start = Instant::now();
        let result = ctx.next().await;

        let status = match result {
            Ok(()) => ctx.writer().status(),
            Err(_) if ctx.writer().is_status_written() => ctx.writer().status(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        info!(
            method = %ctx.method(),
            path = ctx.path(),
            route = ctx.route_path().unwrap_or_default(),
            status = status.as_u16(),
            elapsed = ?start.elapsed(),
            "request served"
        );

        result
    }
}

/// Compresses response bodies with the best encoding the client accepts.
///
/// Preference order is zstd, brotli, gzip, deflate. Responses without a body are sent as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compress;

#[async_trait]
impl Handler for Compress {
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        if ctx.method() != Method::HEAD {
            let encoding = ctx
                .header(ACCEPT_ENCODING)
                .and_then(|value| value.to_str().ok())
                .and_then(ContentEncoding::negotiate);

            if let Some(encoding) = encoding {
                match encoding.encoder() {
                    Ok(encoder) => {
                        ctx.writer_mut().set_encoder(encoder);
                    }
                    Err(e) => warn!(cause = %e, encoding = encoding.name(), "failed to create encoder"),
                }
            }
        }

        ctx.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessLog, Compress};
    use crate::error::HandlerResult;
    use crate::{handler_fn, Context, Ferry, Handler, Router, Routes, StatusCode};
    use async_trait::async_trait;
    use bytes::Bytes;
    use flate2::read::GzDecoder;
    use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, VARY};
    use http::{Method, Request, Response};
    use http_body_util::{BodyExt, Full};
    use std::io::Read;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Record {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self { name, log: Arc::clone(log), fail: false }
        }

        fn failing(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self { fail: true, ..Self::new(name, log) }
        }
    }

    #[async_trait]
    impl Handler for Record {
        async fn call(&self, ctx: &mut Context) -> HandlerResult {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(format!("{} refused", self.name).into());
            }
            ctx.next().await
        }
    }

    async fn endpoint(ctx: &mut Context) -> HandlerResult {
        ctx.send(StatusCode::OK, "payload ".repeat(64))?;
        Ok(())
    }

    async fn empty(ctx: &mut Context) -> HandlerResult {
        ctx.writer_mut().write_header(StatusCode::NO_CONTENT);
        Ok(())
    }

    async fn call(router: &Router, request: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        router.dispatch(request).await
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::builder().uri(uri).body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Ferry::new();
        app.use_middleware(Record::new("G1", &log)).use_middleware(Record::new("G2", &log));
        {
            let mut auth = app.group("/auth");
            auth.use_middleware(Record::new("M1", &log));
            auth.get("/login", Record::new("R", &log));
        }
        let router = app.build();

        let response = call(&router, get("/auth/login")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["G1", "G2", "M1", "R"]);
    }

    #[tokio::test]
    async fn test_middleware_error_halts_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Ferry::new();
        app.use_middleware(Record::new("G1", &log)).use_middleware(Record::failing("G2", &log));
        {
            let mut auth = app.group("/auth");
            auth.use_middleware(Record::new("M1", &log));
            auth.get("/login", Record::new("R", &log));
        }
        let router = app.build();

        let response = call(&router, get("/auth/login")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "G2 refused");
        assert_eq!(*log.lock().unwrap(), ["G1", "G2"]);
    }

    #[tokio::test]
    async fn test_group_middleware_stays_in_group() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Ferry::new();
        app.get("/open", Record::new("open", &log));
        {
            let mut auth = app.group("/auth");
            auth.get("/login", Record::new("R", &log));
            // registered after the route, still applies to it
            auth.use_middleware(Record::new("G1", &log));
            let mut admin = auth.group("/admin");
            admin.use_middleware(Record::new("A1", &log));
            admin.get("/panel", Record::new("P", &log));
        }
        let router = app.build();

        call(&router, get("/open")).await;
        call(&router, get("/auth/login")).await;
        call(&router, get("/auth/admin/panel")).await;
        assert_eq!(*log.lock().unwrap(), ["open", "G1", "R", "G1", "A1", "P"]);
    }

    #[tokio::test]
    async fn test_access_log_passes_result_through() {
        let mut app = Ferry::new();
        app.use_middleware(AccessLog).get("/", handler_fn(endpoint));
        let router = app.build();

        let response = call(&router, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_compress_gzip() {
        let mut app = Ferry::new();
        app.use_middleware(Compress).get("/", handler_fn(endpoint)).get("/empty", handler_fn(empty));
        let router = app.build();

        let request =
            Request::builder().uri("/").header(ACCEPT_ENCODING, "gzip").body(Full::new(Bytes::new())).unwrap();
        let response = call(&router, request).await;
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[VARY], "accept-encoding");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let mut decoded = String::new();
        GzDecoder::new(&body[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "payload ".repeat(64));

        let request =
            Request::builder().uri("/empty").header(ACCEPT_ENCODING, "gzip").body(Full::new(Bytes::new())).unwrap();
        let response = call(&router, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_compress_skipped_without_accept_encoding() {
        let mut app = Ferry::new();
        app.use_middleware(Compress).get("/", handler_fn(endpoint));
        let router = app.build();

        let response = call(&router, get("/")).await;
        assert!(response.headers().get(CONTENT_ENCODING).is_none());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(ACCEPT_ENCODING, "identity")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = call(&router, request).await;
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), "payload ".len() * 64);
    }
}
