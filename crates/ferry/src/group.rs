//! Route registration shared by [`Ferry`] and [`Group`].

use crate::app::Ferry;
use crate::handler::Handler;
use crate::router::Route;
use http::Method;
use std::sync::Arc;

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Registers a `", stringify!($upper_case_method), "` route.")]
        fn $method<H: Handler + 'static>(&mut self, path: &str, handler: H) -> &mut Self {
            self.add_route(Method::$upper_case_method, path, handler)
        }
    };
}

/// The registration API available on the server and on every group.
pub trait Routes {
    /// Registers `handler` for `method` requests matching `path`.
    ///
    /// Routes are matched in registration order; no conflict detection is done.
    fn add_route<H: Handler + 'static>(&mut self, method: Method, path: &str, handler: H) -> &mut Self;

    /// Appends a middleware to this scope.
    fn use_middleware<H: Handler + 'static>(&mut self, middleware: H) -> &mut Self;

    /// Opens a sub scope whose routes are registered under `prefix`.
    fn group(&mut self, prefix: &str) -> Group<'_>;

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(delete, DELETE);
    method_route!(patch, PATCH);
    method_route!(head, HEAD);
    method_route!(options, OPTIONS);
}

/// A path prefix scope.
///
/// Routes registered on a group land in the owning [`Ferry`]'s route table with the group's
/// prefix, which is the concatenation of every enclosing group's prefix. Middleware added to a
/// group runs for the routes of that group and of its sub groups, after the global middleware.
///
/// ```
/// use ferry::{handler_fn, Context, Ferry, HandlerResult, Routes, StatusCode};
///
/// async fn login(ctx: &mut Context) -> HandlerResult {
///     ctx.send(StatusCode::OK, "login")?;
///     Ok(())
/// }
///
/// let mut app = Ferry::new();
/// let mut auth = app.group("/auth");
/// auth.get("/login", handler_fn(login));
/// let mut admin = auth.group("/admin");
/// admin.get("/login", handler_fn(login));
///
/// let router = app.build();
/// assert!(router.at(&http::Method::GET, "/auth/admin/login").is_some());
/// ```
#[derive(Debug)]
pub struct Group<'ferry> {
    ferry: &'ferry mut Ferry,
    prefix: String,
    scopes: Vec<String>,
}

impl<'ferry> Group<'ferry> {
    pub(crate) fn new(ferry: &'ferry mut Ferry, prefix: String, scopes: Vec<String>) -> Self {
        Self { ferry, prefix, scopes }
    }

    /// The full prefix of this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Routes for Group<'_> {
    fn add_route<H: Handler + 'static>(&mut self, method: Method, path: &str, handler: H) -> &mut Self {
        let path = format!("{}{}", self.prefix, path);
        let route = Route::new(path, Arc::new(handler), self.scopes.clone());
        self.ferry.push_route(method, route);
        self
    }

    fn use_middleware<H: Handler + 'static>(&mut self, middleware: H) -> &mut Self {
        self.ferry.push_group_middleware(&self.prefix, Arc::new(middleware));
        self
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        let prefix = format!("{}{}", self.prefix, prefix);
        let mut scopes = self.scopes.clone();
        scopes.push(prefix.clone());
        Group::new(&mut *self.ferry, prefix, scopes)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::HandlerResult;
    use crate::{handler_fn, Context, Ferry, Routes};
    use http::Method;

    async fn noop(_ctx: &mut Context) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_group_prefixes_concatenate() {
        let mut app = Ferry::new();
        {
            let mut auth = app.group("/auth");
            assert_eq!(auth.prefix(), "/auth");
            auth.get("/login", handler_fn(noop));

            let mut admin = auth.group("/admin");
            assert_eq!(admin.prefix(), "/auth/admin");
            admin.post("/users/:id", handler_fn(noop));
        }
        app.get("/", handler_fn(noop));

        let router = app.build();
        let login = router.at(&Method::GET, "/auth/login").unwrap();
        assert_eq!(login.route().path(), "/auth/login");
        assert_eq!(login.route().scopes(), ["/auth".to_string()]);

        let user = router.at(&Method::POST, "/auth/admin/users/7").unwrap();
        assert_eq!(user.route().path(), "/auth/admin/users/:id");
        assert_eq!(user.route().scopes(), ["/auth".to_string(), "/auth/admin".to_string()]);
        assert_eq!(user.params().get("id"), Some("7"));

        assert!(router.at(&Method::GET, "/").unwrap().route().scopes().is_empty());
    }

    #[test]
    fn test_method_shorthands() {
        let mut app = Ferry::new();
        let mut api = app.group("/api");
        api.get("/r", handler_fn(noop))
            .post("/r", handler_fn(noop))
            .put("/r", handler_fn(noop))
            .delete("/r", handler_fn(noop))
            .patch("/r", handler_fn(noop))
            .head("/r", handler_fn(noop))
            .options("/r", handler_fn(noop));

        let router = app.build();
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD, Method::OPTIONS] {
            assert!(router.at(&method, "/api/r").is_some(), "{method} not registered");
        }
        assert!(router.at(&Method::TRACE, "/api/r").is_none());
    }
}
