//! Route pattern compilation and matching.
//!
//! A declared route path is a `/` separated list of segments. A segment written as `:name`
//! captures exactly one request path segment made of ASCII letters, digits, `_` or `-`; every
//! other segment has to match literally. Matching is always anchored at both ends, so `/auth`
//! never matches `/authorize` or `/auth/`.
//!
//! ```
//! use ferry::Pattern;
//!
//! let pattern = Pattern::compile("/auth/:name/:age");
//! let params = pattern.extract("/auth/madhuri/32").unwrap();
//!
//! assert_eq!(params.get("name"), Some("madhuri"));
//! assert_eq!(params.get("age"), Some("32"));
//! assert!(!pattern.matches("/auth/madhuri"));
//! ```

use crate::PathParams;
use std::fmt;

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

impl Pattern {
    /// Compiles a declared route path.
    ///
    /// Empty segments produced by leading, trailing or doubled slashes are dropped, so
    /// `/auth//login` compiles to the same pattern as `/auth/login`.
    pub fn compile(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Static(segment.to_owned()),
            })
            .collect();

        Self { segments }
    }

    /// Returns true if the pattern has no `:name` segment.
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|segment| matches!(segment, Segment::Static(_)))
    }

    /// Names of the wildcard segments, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Tests a request path against the pattern.
    #[inline]
    pub fn matches(&self, path: &str) -> bool {
        self.walk(path, |_, _| {})
    }

    /// Matches a request path and collects the wildcard bindings.
    ///
    /// Returns `None` when the path does not match, including when the request path has a
    /// different number of segments than the pattern.
    pub fn extract(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::empty();
        let matched = self.walk(path, |name, value| params.push(name, value));
        matched.then_some(params)
    }

    fn walk<'p>(&self, path: &'p str, mut on_param: impl FnMut(&str, &'p str)) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };

        if self.segments.is_empty() {
            return rest.is_empty();
        }

        let mut pieces = rest.split('/');
        for segment in &self.segments {
            let Some(piece) = pieces.next() else {
                return false;
            };

            match segment {
                Segment::Static(literal) if literal == piece => {}
                Segment::Param(name) if is_param_value(piece) => on_param(name, piece),
                _ => return false,
            }
        }

        pieces.next().is_none()
    }
}

/// one or more of `[a-zA-Z0-9_-]`
#[inline]
fn is_param_value(piece: &str) -> bool {
    !piece.is_empty() && piece.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }

        for segment in &self.segments {
            match segment {
                Segment::Static(literal) => write!(f, "/{literal}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        Ok(())
    }
}
