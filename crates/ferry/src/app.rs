use crate::config::Config;
use crate::fs::StaticMount;
use crate::group::{Group, Routes};
use crate::handler::Handler;
use crate::router::{Route, RouteTable, Router};
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The application: routes, middleware and static mounts, registered before serving.
///
/// ```no_run
/// use ferry::{handler_fn, Context, Ferry, HandlerResult, Routes, StatusCode};
///
/// async fn hello(ctx: &mut Context) -> HandlerResult {
///     ctx.send(StatusCode::OK, "Hello, World")?;
///     Ok(())
/// }
///
/// async fn name(ctx: &mut Context) -> HandlerResult {
///     let name = ctx.param("name").unwrap_or_default().to_owned();
///     ctx.send(StatusCode::OK, format!("hello, {name}"))?;
///     Ok(())
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), ferry::ServerError> {
///     let mut app = Ferry::new();
///     app.get("/", handler_fn(hello));
///     app.get("/name/:name", handler_fn(name));
///     app.listen("127.0.0.1:3000").await
/// }
/// ```
pub struct Ferry {
    table: RouteTable,
    middleware: Vec<Arc<dyn Handler>>,
    group_middleware: HashMap<String, Vec<Arc<dyn Handler>>>,
    mounts: Vec<StaticMount>,
    config: Config,
}

impl Default for Ferry {
    fn default() -> Self {
        Self::new()
    }
}

impl Ferry {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            table: RouteTable::default(),
            middleware: Vec::new(),
            group_middleware: HashMap::new(),
            mounts: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves the files under `dir` for GET and HEAD requests below `prefix`.
    pub fn serve_dir(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> &mut Self {
        self.mounts.push(StaticMount::dir(prefix, dir.into()));
        self
    }

    /// Serves a single file for GET and HEAD requests to exactly `path`.
    pub fn serve_file(&mut self, path: &str, file: impl Into<PathBuf>) -> &mut Self {
        self.mounts.push(StaticMount::file(path, file.into()));
        self
    }

    pub(crate) fn push_route(&mut self, method: Method, route: Route) {
        debug!(method = %method, path = route.path(), "route registered");
        self.table.push(method, route);
    }

    pub(crate) fn push_group_middleware(&mut self, prefix: &str, middleware: Arc<dyn Handler>) {
        self.group_middleware.entry(prefix.to_owned()).or_default().push(middleware);
    }

    /// Freezes the registrations into a [`Router`].
    ///
    /// Each route gets the middleware of every group it was registered through, outermost
    /// group first, so middleware added to a group after its routes still applies.
    pub fn build(self) -> Router {
        let Self { table, middleware, group_middleware, mounts, config } = self;

        let routes = table
            .into_inner()
            .into_iter()
            .map(|(method, routes)| {
                let routes = routes
                    .into_iter()
                    .map(|route| {
                        let chain = route
                            .scopes()
                            .iter()
                            .filter_map(|scope| group_middleware.get(scope))
                            .flatten()
                            .cloned()
                            .collect::<Vec<_>>();
                        route.with_middleware(chain.into())
                    })
                    .collect::<Vec<_>>();
                (method, routes)
            })
            .collect();

        Router::new(routes, middleware.into(), mounts, config)
    }
}

impl Routes for Ferry {
    fn add_route<H: Handler + 'static>(&mut self, method: Method, path: &str, handler: H) -> &mut Self {
        self.push_route(method, Route::new(path.to_owned(), Arc::new(handler), Vec::new()));
        self
    }

    /// Appends a global middleware, run for every matched route before any group middleware.
    fn use_middleware<H: Handler + 'static>(&mut self, middleware: H) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix.to_owned(), vec![prefix.to_owned()])
    }
}

impl fmt::Debug for Ferry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ferry")
            .field("table", &self.table)
            .field("middleware", &self.middleware.len())
            .field("group_middleware", &self.group_middleware.keys().collect::<Vec<_>>())
            .field("mounts", &self.mounts)
            .field("config", &self.config)
            .finish()
    }
}
