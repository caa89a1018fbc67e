//! Path segment parsing.

use crate::error::{RouteError, RouteResult};

/// Segment used to represent the path `/`.
pub const ROOT_SEGMENT: &str = "__root";

/// Parameter name under which a wildcard match stores the rest of the path.
pub const WILDCARD_PARAM: &str = "*";

/// One segment of a registered route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures one request segment under the given name.
    Param(String),
    /// Matches whatever remains of the request path.
    Wildcard,
    /// Matches when the final request segment has this extension.
    /// An empty suffix matches any final segment.
    CatchAll(String),
}

impl Segment {
    /// Parses a single segment of a route path.
    pub fn parse(raw: &str, path: &str) -> RouteResult<Self> {
        if let Some(suffix) = raw.strip_prefix("**") {
            let suffix = suffix.strip_prefix('.').unwrap_or(suffix);
            return Ok(Self::CatchAll(suffix.to_string()));
        }
        if raw == "*" {
            return Ok(Self::Wildcard);
        }
        if let Some(name) = raw.strip_prefix(':') {
            return Self::param(name, path);
        }
        if let Some(inner) = raw.strip_prefix('{') {
            let name = inner
                .strip_suffix('}')
                .ok_or_else(|| RouteError::invalid_path(path, format!("unterminated '{raw}'")))?;
            return Self::param(name, path);
        }
        Ok(Self::Literal(raw.to_string()))
    }

    fn param(name: &str, path: &str) -> RouteResult<Self> {
        if name.is_empty() {
            return Err(RouteError::invalid_path(path, "empty parameter name"));
        }
        Ok(Self::Param(name.to_string()))
    }

    /// Returns `true` if nothing can follow this segment.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Wildcard | Self::CatchAll(_))
    }
}

/// Parses a registration path such as `/users/:id` into segments.
///
/// The path must start with `/`. Empty segments are ignored and `/` itself
/// becomes `[Literal("__root")]`.
pub fn parse_path(path: &str) -> RouteResult<Vec<Segment>> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(RouteError::invalid_path(path, "must start with '/'"));
    }

    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if raw.is_empty() {
        return Ok(vec![Segment::Literal(ROOT_SEGMENT.to_string())]);
    }

    let segments = raw
        .iter()
        .map(|s| Segment::parse(s, path))
        .collect::<RouteResult<Vec<_>>>()?;

    if let Some(pos) = segments.iter().position(Segment::is_terminal) {
        if pos + 1 != segments.len() {
            return Err(RouteError::invalid_path(
                path,
                "wildcard and catch-all segments must be last",
            ));
        }
    }

    Ok(segments)
}

/// Splits a request path into the segments used for resolution.
///
/// ```
/// use bamboo_router::split_request_path;
///
/// assert_eq!(split_request_path("/users//42/"), vec!["users", "42"]);
/// assert_eq!(split_request_path("/"), vec!["__root"]);
/// ```
pub fn split_request_path(path: &str) -> Vec<&str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        vec![ROOT_SEGMENT]
    } else {
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_path() {
        let segments = parse_path("/api/users").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("api".into()),
                Segment::Literal("users".into())
            ]
        );
    }

    #[test]
    fn test_parse_root() {
        assert_eq!(
            parse_path("/").unwrap(),
            vec![Segment::Literal(ROOT_SEGMENT.into())]
        );
    }

    #[test]
    fn test_parse_both_param_spellings() {
        assert_eq!(
            parse_path("/users/:id").unwrap()[1],
            Segment::Param("id".into())
        );
        assert_eq!(
            parse_path("/users/{id}").unwrap()[1],
            Segment::Param("id".into())
        );
    }

    #[test]
    fn test_parse_wildcard_and_catch_all() {
        assert_eq!(parse_path("/static/*").unwrap()[1], Segment::Wildcard);
        assert_eq!(
            parse_path("/files/**.png").unwrap()[1],
            Segment::CatchAll("png".into())
        );
        assert_eq!(
            parse_path("/files/**").unwrap()[1],
            Segment::CatchAll(String::new())
        );
    }

    #[test]
    fn test_parse_rejects_bad_paths() {
        assert_eq!(parse_path(""), Err(RouteError::EmptyPath));
        assert!(parse_path("users").is_err());
        assert!(parse_path("/users/:").is_err());
        assert!(parse_path("/users/{}").is_err());
        assert!(parse_path("/users/{id").is_err());
        assert!(parse_path("/files/*/more").is_err());
        assert!(parse_path("/files/**.png/more").is_err());
    }

    #[test]
    fn test_split_request_path() {
        assert_eq!(split_request_path("/a/b"), vec!["a", "b"]);
        assert_eq!(split_request_path(""), vec![ROOT_SEGMENT]);
        assert_eq!(split_request_path("//"), vec![ROOT_SEGMENT]);
    }
}
