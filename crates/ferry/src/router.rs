//! Route table and request dispatch.
//!
//! Routes are kept per HTTP method in registration order, and the first route whose
//! [`Pattern`] matches the request path serves it. Overlapping routes are not rejected: a
//! route registered after a broader one that also matches is never reached.

use crate::body::RequestBody;
use crate::config::Config;
use crate::context::Context;
use crate::error::BoxError;
use crate::fs::StaticMount;
use crate::handler::Handler;
use crate::params::PathParams;
use crate::pattern::Pattern;
use crate::response::ResponseWriter;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::Full;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

type Chain = Arc<[Arc<dyn Handler>]>;

/// A registered route: the declared path, its compiled pattern and the handler.
pub struct Route {
    path: Arc<str>,
    pattern: Pattern,
    handler: Arc<dyn Handler>,
    scopes: Vec<String>,
    middleware: Chain,
}

impl Route {
    pub(crate) fn new(path: String, handler: Arc<dyn Handler>, scopes: Vec<String>) -> Self {
        let pattern = Pattern::compile(&path);
        Self { path: path.into(), pattern, handler, scopes, middleware: Arc::from(Vec::new()) }
    }

    /// The declared path, including the prefixes of enclosing groups.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Prefixes of the groups the route was registered through, outermost first.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub(crate) fn shared_path(&self) -> &Arc<str> {
        &self.path
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub(crate) fn middleware(&self) -> &Chain {
        &self.middleware
    }

    pub(crate) fn with_middleware(self, middleware: Chain) -> Self {
        Self { middleware, ..self }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("pattern", &self.pattern)
            .field("scopes", &self.scopes)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Routes per method, in registration order.
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    routes: HashMap<Method, Vec<Route>>,
}

impl RouteTable {
    pub(crate) fn push(&mut self, method: Method, route: Route) {
        self.routes.entry(method).or_default().push(route);
    }

    pub(crate) fn into_inner(self) -> HashMap<Method, Vec<Route>> {
        self.routes
    }
}

/// The route matched for a request, with the wildcard bindings taken from its path.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    route: &'router Route,
    params: PathParams,
}

impl<'router> RouteMatch<'router> {
    pub fn route(&self) -> &'router Route {
        self.route
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

/// The immutable routing state a server dispatches requests with.
///
/// Built by [`Ferry::build`](crate::Ferry::build); shared by every connection without locking.
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
    middleware: Chain,
    mounts: Vec<StaticMount>,
    config: Arc<Config>,
}

impl Router {
    pub(crate) fn new(
        routes: HashMap<Method, Vec<Route>>,
        middleware: Chain,
        mounts: Vec<StaticMount>,
        config: Config,
    ) -> Self {
        Self { routes, middleware, mounts, config: Arc::new(config) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Routes registered for `method`, in match order.
    pub fn routes(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Finds the first route registered for `method` whose pattern matches `path`.
    pub fn at<'router>(&'router self, method: &Method, path: &str) -> Option<RouteMatch<'router>> {
        self.routes
            .get(method)?
            .iter()
            .find_map(|route| route.pattern.extract(path).map(|params| RouteMatch { route, params }))
    }

    /// Serves one request.
    ///
    /// The path is percent-decoded once and used for both static mounts and routes. Mounts
    /// answer first; otherwise the first matching route runs behind the global middleware and
    /// the middleware of its groups. A request no route matches gets a 404, an error returned
    /// anywhere in the chain a 500 carrying the error message.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = req.into_parts();
        let body = RequestBody::new(body);
        let path = percent_decode_str(head.uri.path()).decode_utf8_lossy();

        if let Some(response) = self.serve_static(&head.method, &path).await {
            return response;
        }

        let Some(RouteMatch { route, params }) = self.at(&head.method, &path) else {
            debug!(method = %head.method, path = %path, "no route matched");
            return self.not_found();
        };
        debug!(method = %head.method, path = %path, route = route.path(), "route matched");

        let mut ctx = Context::new(head, body, Arc::clone(&self.config));
        ctx.enter(route, params, Arc::clone(&self.middleware));

        if let Err(e) = ctx.next().await {
            error!(cause = %e, route = route.path(), "handler returned error");
            let writer = ctx.writer_mut();
            writer.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            if let Err(write_error) = writer.write(e.to_string().as_bytes()) {
                error!(cause = %write_error, "failed to write error response");
            }
        }

        ctx.into_response()
    }

    /// Answers from the first mount containing `path`; a miss falls through to the routes.
    async fn serve_static(&self, method: &Method, path: &str) -> Option<Response<Full<Bytes>>> {
        if self.mounts.is_empty() || !matches!(*method, Method::GET | Method::HEAD) {
            return None;
        }

        let mount = self.mounts.iter().find(|mount| mount.contains(path))?;
        mount.load(path, *method == Method::HEAD).await
    }

    fn not_found(&self) -> Response<Full<Bytes>> {
        let mut writer = ResponseWriter::new();
        writer.write_header(StatusCode::NOT_FOUND);
        if let Err(e) = writer.write(self.config.not_found_body().as_bytes()) {
            error!(cause = %e, "failed to write not found response");
        }
        writer.into_response()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .field("mounts", &self.mounts)
            .field("config", &self.config)
            .finish()
    }
}
