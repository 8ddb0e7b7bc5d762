//! Response body compression.

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io;
use std::io::Write;
use zstd::stream::write::Encoder as ZstdEncoder;

// inspired by from actix-http
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A content coding the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Zstd,
    Br,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Picks an encoding from an `Accept-Encoding` header value.
    ///
    /// Codings with `q=0` are refused; among the accepted ones the preference is zstd, br,
    /// gzip, deflate.
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        let accepted = accept_encoding
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';').map(str::trim);
                let coding = parts.next().filter(|coding| !coding.is_empty())?;
                let refused = parts
                    .filter_map(|param| param.strip_prefix("q="))
                    .any(|q| q.parse::<f32>().is_ok_and(|q| q <= 0.0));
                (!refused).then_some(coding)
            })
            .collect::<Vec<_>>();

        [Self::Zstd, Self::Br, Self::Gzip, Self::Deflate]
            .into_iter()
            .find(|encoding| accepted.iter().any(|coding| coding.eq_ignore_ascii_case(encoding.name())))
    }

    /// The `Content-Encoding` token.
    pub fn name(self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Br => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    pub(crate) fn encoder(self) -> io::Result<Encoder> {
        let encoder = match self {
            Self::Zstd => Encoder::Zstd(ZstdEncoder::new(Writer::new(), 6)?),
            Self::Br => Encoder::Br(Box::new(brotli::CompressorWriter::new(
                Writer::new(),
                32 * 1024, // 32 KiB buffer
                3,         // BROTLI_PARAM_QUALITY
                22,        // BROTLI_PARAM_LGWIN
            ))),
            Self::Gzip => Encoder::Gzip(GzEncoder::new(Writer::new(), Compression::default())),
            Self::Deflate => Encoder::Deflate(ZlibEncoder::new(Writer::new(), Compression::default())),
        };
        Ok(encoder)
    }
}

pub(crate) enum Encoder {
    Gzip(GzEncoder<Writer>),
    Deflate(ZlibEncoder<Writer>),
    Zstd(ZstdEncoder<'static, Writer>),
    Br(Box<brotli::CompressorWriter<Writer>>),
}

impl Encoder {
    pub(crate) fn encoding(&self) -> ContentEncoding {
        match self {
            Self::Gzip(_) => ContentEncoding::Gzip,
            Self::Deflate(_) => ContentEncoding::Deflate,
            Self::Zstd(_) => ContentEncoding::Zstd,
            Self::Br(_) => ContentEncoding::Br,
        }
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.write_all(data),
            Self::Deflate(encoder) => encoder.write_all(data),
            Self::Zstd(encoder) => encoder.write_all(data),
            Self::Br(encoder) => encoder.write_all(data),
        }
    }

    /// Flushes the remaining compressed data and returns everything the encoder produced.
    pub(crate) fn finish(self) -> io::Result<Bytes> {
        match self {
            Self::Gzip(encoder) => encoder.finish().map(|writer| writer.buf.freeze()),
            Self::Deflate(encoder) => encoder.finish().map(|writer| writer.buf.freeze()),
            Self::Zstd(encoder) => encoder.finish().map(|writer| writer.buf.freeze()),
            Self::Br(mut encoder) => {
                encoder.flush()?;
                Ok(encoder.into_inner().buf.freeze())
            }
        }
    }
}
