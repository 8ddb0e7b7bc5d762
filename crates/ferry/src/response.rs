//! The per-request response sink.
//!
//! Handlers write a status, headers and body bytes into a [`ResponseWriter`]; the dispatcher
//! turns it into the final `http::Response` once the handler chain returns. Like a raw socket
//! writer, the first status written wins and body writes only ever append.

use crate::encoding::{ContentEncoding, Encoder};
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use std::{fmt, io};
use tracing::{error, warn};

pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    encoder: Option<Encoder>,
    written: usize,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self { status: None, headers: HeaderMap::new(), body: BytesMut::new(), encoder: None, written: 0 }
    }

    /// The status that will be sent, `200 OK` until one is written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn is_status_written(&self) -> bool {
        self.status.is_some()
    }

    /// Number of body bytes written so far, before compression.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The active compression, if any.
    pub fn encoding(&self) -> Option<ContentEncoding> {
        self.encoder.as_ref().map(Encoder::encoding)
    }

    /// Sets the response status. Only the first call has an effect.
    pub fn write_header(&mut self, status: StatusCode) {
        if let Some(current) = self.status {
            warn!(current = %current, ignored = %status, "superfluous write_header call");
            return;
        }
        self.status = Some(status);
    }

    /// Appends body bytes, passing them through the active compression.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }

        match &mut self.encoder {
            Some(encoder) => encoder.write(data)?,
            None => self.body.extend_from_slice(data),
        }
        self.written += data.len();
        Ok(())
    }

    /// Routes every following body write through `encoder`.
    ///
    /// Returns false, leaving the writer untouched, once body bytes were written or another
    /// encoder is active.
    pub(crate) fn set_encoder(&mut self, encoder: Encoder) -> bool {
        if self.encoder.is_some() || self.written > 0 {
            return false;
        }

        let name = encoder.encoding().name();
        self.headers.insert(CONTENT_ENCODING, HeaderValue::from_static(name));
        self.headers.remove(CONTENT_LENGTH);
        self.headers.append(VARY, HeaderValue::from_static("accept-encoding"));
        self.encoder = Some(encoder);
        true
    }

    pub(crate) fn into_response(self) -> Response<Full<Bytes>> {
        let Self { status, mut headers, mut body, encoder, written } = self;
        let status = status.unwrap_or(StatusCode::OK);

        if let Some(encoder) = encoder {
            let bodiless = written == 0 || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED;
            if bodiless {
                headers.remove(CONTENT_ENCODING);
            } else {
                match encoder.finish() {
                    Ok(compressed) => body.extend_from_slice(&compressed),
                    Err(e) => {
                        error!(cause = %e, "failed to finish response compression");
                        headers.remove(CONTENT_ENCODING);
                        return internal_error(e.to_string());
                    }
                }
            }
        }

        let mut response = Response::new(Full::new(body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn internal_error(message: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("written", &self.written)
            .field("encoding", &self.encoding())
            .finish_non_exhaustive()
    }
}
