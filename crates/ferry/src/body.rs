use crate::error::{BodyError, BoxError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use http_body_util::Collected;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

type BoxBody = UnsyncBoxBody<Bytes, BoxError>;

/// The request body, which can be consumed only once.
pub struct RequestBody {
    inner: Option<BoxBody>,
}

impl RequestBody {
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: Some(body.map_err(Into::into).boxed_unsync()) }
    }

    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.is_none()
    }

    /// Reads the whole body into memory, failing once more than `limit` bytes arrive.
    pub async fn collect(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        let body = self.inner.take().ok_or(BodyError::Consumed)?;

        let collect: Pin<Box<dyn Future<Output = Result<Collected<Bytes>, BoxError>> + Send>> =
            Box::pin(Limited::new(body, limit).collect());
        match collect.await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge { limit }),
            Err(e) => Err(BodyError::Read { reason: e.to_string() }),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody").field("consumed", &self.is_consumed()).finish()
    }
}
