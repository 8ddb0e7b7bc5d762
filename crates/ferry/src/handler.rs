use crate::Context;
use crate::error::HandlerResult;
use async_trait::async_trait;
use std::fmt;

/// A route handler or a middleware link.
///
/// Both have the same shape: they receive the request [`Context`], write to its response and
/// return an error to fail the request with a 500. A middleware calls [`Context::next`] to run
/// the rest of the chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut Context) -> HandlerResult;
}

/// An async fn taking `&mut Context`.
///
/// Implemented for every `async fn(&mut Context) -> HandlerResult`, which lets such functions
/// be turned into handlers with [`handler_fn`].
pub trait HandlerFn<'a>: Send + Sync {
    type Future: Future<Output = HandlerResult> + Send + 'a;

    fn invoke(&self, ctx: &'a mut Context) -> Self::Future;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(&'a mut Context) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Future = Fut;

    #[inline]
    fn invoke(&self, ctx: &'a mut Context) -> Self::Future {
        (self)(ctx)
    }
}

/// a [`HandlerFn`] holder which represents any async fn handler
pub struct FnHandler<F> {
    f: F,
}

/// Wraps an async fn into a [`Handler`].
///
/// ```
/// use ferry::{handler_fn, Context, HandlerResult, StatusCode};
///
/// async fn hello(ctx: &mut Context) -> HandlerResult {
///     ctx.send(StatusCode::OK, "Hello, World")?;
///     Ok(())
/// }
///
/// let _handler = handler_fn(hello);
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> HandlerFn<'a>,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> HandlerFn<'a> + Send + Sync,
{
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        self.f.invoke(ctx).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}
