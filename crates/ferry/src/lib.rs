//! A minimal async web framework.
//!
//! Routes are declared with `:name` wildcards, matched per method in registration order, and
//! run behind global and group middleware chained with [`Context::next`].

mod app;
mod body;
mod config;
mod context;
mod encoding;
mod error;
mod fs;
mod group;
mod handler;
mod params;
mod pattern;
mod response;
mod router;
mod server;

pub mod middleware;

pub use app::Ferry;
pub use body::RequestBody;
pub use config::Config;
pub use context::Context;
pub use encoding::ContentEncoding;
pub use error::{BindError, BodyError, BoxError, HandlerResult, QueryError, ResponseError, ServerError, UploadError};
pub use group::{Group, Routes};
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::{Handler, HandlerFn};
pub use params::{PathParams, QueryParams};
pub use pattern::Pattern;
pub use response::ResponseWriter;
pub use router::{Route, RouteMatch, Router};

pub use garde::{Report as ValidationReport, Validate};
pub use http::{Method, StatusCode};
