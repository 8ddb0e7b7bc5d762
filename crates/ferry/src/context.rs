//! The per-request context handed to handlers and middleware.
//!
//! A [`Context`] is created for every matched request and dropped once the response is
//! assembled. It carries:
//! - the request head and its body, which can be read once
//! - the path parameters of the matched route and the decoded query string
//! - the [`ResponseWriter`] the response is written to
//! - the position in the middleware chain, advanced by [`Context::next`]

use crate::body::RequestBody;
use crate::config::Config;
use crate::error::{BindError, BodyError, HandlerResult, QueryError, ResponseError, UploadError};
use crate::fs::content_type_for;
use crate::handler::Handler;
use crate::params::{PathParams, QueryParams};
use crate::response::ResponseWriter;
use crate::router::Route;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use garde::Validate;
use http::header::{AsHeaderName, CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode, Uri, Version};
use http_body_util::Full;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

type Chain = Arc<[Arc<dyn Handler>]>;

pub struct Context {
    head: Parts,
    body: RequestBody,
    writer: ResponseWriter,
    route_path: Option<Arc<str>>,
    path_params: PathParams,
    query: QueryParams,
    config: Arc<Config>,
    cursor: Cursor,
}

/// Position of a request in its middleware chain: global middleware first, then the group
/// middleware of the matched route, then the route handler, each at most once.
#[derive(Default)]
struct Cursor {
    global: Option<Chain>,
    group: Option<Chain>,
    endpoint: Option<Arc<dyn Handler>>,
    global_index: usize,
    group_index: usize,
}

impl Cursor {
    fn advance(&mut self) -> Option<Arc<dyn Handler>> {
        if let Some(handler) = self.global.as_ref().and_then(|chain| chain.get(self.global_index)) {
            self.global_index += 1;
            return Some(Arc::clone(handler));
        }

        if let Some(handler) = self.group.as_ref().and_then(|chain| chain.get(self.group_index)) {
            self.group_index += 1;
            return Some(Arc::clone(handler));
        }

        self.endpoint.take()
    }
}

impl Context {
    pub(crate) fn new(head: Parts, body: RequestBody, config: Arc<Config>) -> Self {
        let query = QueryParams::parse(head.uri.query());
        Self {
            head,
            body,
            writer: ResponseWriter::new(),
            route_path: None,
            path_params: PathParams::empty(),
            query,
            config,
            cursor: Cursor::default(),
        }
    }

    /// Binds the matched route and positions the cursor before the first global middleware.
    pub(crate) fn enter(&mut self, route: &Route, params: PathParams, global: Chain) {
        self.route_path = Some(Arc::clone(route.shared_path()));
        self.path_params = params;
        self.cursor = Cursor {
            global: Some(global),
            group: Some(Arc::clone(route.middleware())),
            endpoint: Some(Arc::clone(route.handler())),
            global_index: 0,
            group_index: 0,
        };
    }

    /// Runs the next link of the middleware chain.
    ///
    /// Global middleware run first, then the middleware of the route's groups, then the route
    /// handler. Once the handler has run, calling `next` again does nothing.
    pub async fn next(&mut self) -> HandlerResult {
        match self.cursor.advance() {
            Some(handler) => handler.call(self).await,
            None => Ok(()),
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.head.headers.get(name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The declared path of the matched route, like `/auth/:name`.
    pub fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    /// The request segment bound to the `:name` wildcard of the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// All wildcard bindings of the matched route.
    pub fn params(&self) -> HashMap<String, String> {
        self.path_params.to_map()
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The first query value bound to `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    /// All query pairs; for repeated keys the first value is kept.
    pub fn query_params(&self) -> HashMap<String, String> {
        self.query.to_map()
    }

    /// Deserializes the query string into `T`.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let query = self.head.uri.query().unwrap_or_default();
        Ok(serde_qs::from_str(query)?)
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Writes `payload` as an `application/json` response.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, payload: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(payload)?;
        let content_type = HeaderValue::from_str(mime::APPLICATION_JSON.as_ref())?;

        self.writer.headers_mut().insert(CONTENT_TYPE, content_type);
        self.writer.write_header(status);
        self.writer.write(&body)?;
        Ok(())
    }

    /// Writes a plain text response.
    pub fn send(&mut self, status: StatusCode, payload: impl AsRef<str>) -> Result<(), ResponseError> {
        if !self.writer.headers().contains_key(CONTENT_TYPE) {
            let content_type = HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref())?;
            self.writer.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        self.writer.write_header(status);
        self.writer.write(payload.as_ref().as_bytes())?;
        Ok(())
    }

    /// Redirects to `url` with a 3xx status between 300 and 308.
    ///
    /// GET and HEAD requests also get a small html body linking to the target.
    pub fn redirect(&mut self, status: StatusCode, url: &str) -> Result<(), ResponseError> {
        if !(300..=308).contains(&status.as_u16()) {
            return Err(ResponseError::InvalidRedirect { status });
        }

        let location = HeaderValue::from_str(url)?;
        self.writer.headers_mut().insert(LOCATION, location);

        let with_body = matches!(self.head.method, Method::GET | Method::HEAD)
            && !self.writer.headers().contains_key(CONTENT_TYPE);
        if !with_body {
            self.writer.write_header(status);
            return Ok(());
        }

        let content_type = HeaderValue::from_str(mime::TEXT_HTML_UTF_8.as_ref())?;
        self.writer.headers_mut().insert(CONTENT_TYPE, content_type);
        self.writer.write_header(status);

        let reason = status.canonical_reason().unwrap_or("Redirect");
        let body = format!("<a href=\"{}\">{reason}</a>.\n", escape_html(url));
        self.writer.write(body.as_bytes())?;
        Ok(())
    }

    /// Sends the file at `file_path` as a download named `file_name`.
    pub fn send_attachment<'a, P>(&'a mut self, file_path: P, file_name: &'a str) -> BoxFuture<'a, Result<(), ResponseError>>
    where
        P: AsRef<Path> + Send + 'a,
    {
        async move {
            let content = tokio::fs::read(file_path.as_ref()).await?;
            let disposition = HeaderValue::from_str(&format!("attachment; filename={file_name}"))?;

            let headers = self.writer.headers_mut();
            headers.insert(CONTENT_DISPOSITION, disposition);
            if !headers.contains_key(CONTENT_TYPE) {
                let content_type = HeaderValue::from_str(content_type_for(Path::new(file_name)).as_ref())?;
                headers.insert(CONTENT_TYPE, content_type);
            }

            self.writer.write(&content)?;
            Ok(())
        }
        .boxed()
    }

    /// Stores the `field_name` file of a `multipart/form-data` body at `file_path`.
    pub fn upload_file<'a, P>(&'a mut self, file_path: P, field_name: &'a str) -> BoxFuture<'a, Result<(), UploadError>>
    where
        P: AsRef<Path> + Send + 'a,
    {
        async move {
            let boundary = self
                .header(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(|content_type| multer::parse_boundary(content_type).ok())
                .ok_or(UploadError::NotMultipart)?;

            let bytes = self.body_bytes().await?;
            let stream = futures::stream::once(async move { Ok::<_, Infallible>(bytes) });
            let mut multipart = multer::Multipart::new(stream, boundary);

            while let Some(field) = multipart.next_field().await? {
                if field.name() != Some(field_name) {
                    continue;
                }

                let data = field.bytes().await?;
                let file_path = file_path.as_ref();
                tokio::fs::write(file_path, &data).await?;
                debug!(field = field_name, size = data.len(), path = %file_path.display(), "stored uploaded file");
                return Ok(());
            }

            Err(UploadError::MissingField { name: field_name.to_owned() })
        }
        .boxed()
    }

    /// Reads the whole request body. The body can be read only once.
    pub fn body_bytes(&mut self) -> BoxFuture<'_, Result<Bytes, BodyError>> {
        let limit = self.config.max_body_size();
        self.body.collect(limit).boxed()
    }

    /// Decodes a JSON body into `T` and validates it when [`Config::validation`] is on.
    ///
    /// ```
    /// use ferry::{handler_fn, Context, HandlerResult, StatusCode};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize, garde::Validate)]
    /// struct Login {
    ///     #[garde(length(min = 1))]
    ///     username: String,
    ///     #[garde(length(min = 1))]
    ///     password: String,
    /// }
    ///
    /// async fn login(ctx: &mut Context) -> HandlerResult {
    ///     let login: Login = ctx.bind().await?;
    ///     ctx.send(StatusCode::OK, format!("Welcome {}", login.username))?;
    ///     Ok(())
    /// }
    ///
    /// let _handler = handler_fn(login);
    /// ```
    pub fn bind<T>(&mut self) -> BoxFuture<'_, Result<T, BindError>>
    where
        T: DeserializeOwned + Validate<Context = ()> + Send + 'static,
    {
        async move {
            let value: T = self.bind_json().await?;
            if self.config.validation() {
                value.validate()?;
            }
            Ok(value)
        }
        .boxed()
    }

    /// Decodes a JSON body into `T`, without validation.
    pub fn bind_json<T>(&mut self) -> BoxFuture<'_, Result<T, BindError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        async move {
            let bytes = self.body_bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        .boxed()
    }

    /// Decodes an `application/x-www-form-urlencoded` body into `T`.
    pub fn bind_form<T>(&mut self) -> BoxFuture<'_, Result<T, BindError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        async move {
            let bytes = self.body_bytes().await?;
            Ok(serde_urlencoded::from_bytes(&bytes)?)
        }
        .boxed()
    }

    pub(crate) fn into_response(self) -> Response<Full<Bytes>> {
        self.writer.into_response()
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("route_path", &self.route_path)
            .field("path_params", &self.path_params)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
