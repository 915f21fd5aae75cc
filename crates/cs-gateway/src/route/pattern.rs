//! Path patterns with typed placeholder segments.
//!
//! Syntax: `/api/v2/training/{id:int}/check-in/` — literal segments plus
//! `{name}` (string capture) and `{name:int}` (signed integer capture).
//! A single trailing slash is not significant for matching; the spelling
//! used at registration is preserved for display and rewriting.

use std::collections::HashMap;
use std::fmt;

use crate::error::GatewayError;

/// Capture type of a placeholder segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Signed integer segment (`-1` is a valid sport id meaning "all sports")
    Int,
    /// Any non-empty segment
    Str,
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param { name: String, kind: ParamKind },
}

/// A captured placeholder value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// Captured placeholder values for one matched request path.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    values: HashMap<String, ParamValue>,
}

impl PathParams {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    fn insert(&mut self, name: String, value: ParamValue) {
        self.values.insert(name, value);
    }
}

/// A parsed, immutable path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl PathPattern {
    /// Parse a pattern string. Fails on malformed placeholders or unknown
    /// capture kinds.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if !raw.starts_with('/') {
            return Err(GatewayError::invalid_pattern(raw, "must start with '/'"));
        }

        let trailing_slash = raw.len() > 1 && raw.ends_with('/');
        let trimmed = raw.trim_end_matches('/');
        let mut segments = Vec::new();

        for part in trimmed.split('/').skip(1) {
            if part.is_empty() {
                return Err(GatewayError::invalid_pattern(raw, "empty segment"));
            }
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                let (name, kind) = match inner.split_once(':') {
                    Some((name, "int")) => (name, ParamKind::Int),
                    Some((name, "str")) => (name, ParamKind::Str),
                    Some((_, kind)) => {
                        return Err(GatewayError::invalid_pattern(
                            raw,
                            format!("unknown capture kind '{}'", kind),
                        ));
                    }
                    None => (inner, ParamKind::Str),
                };
                if name.is_empty() {
                    return Err(GatewayError::invalid_pattern(raw, "empty placeholder name"));
                }
                if segments.iter().any(|s| matches!(s, Segment::Param { name: n, .. } if n == name)) {
                    return Err(GatewayError::invalid_pattern(
                        raw,
                        format!("duplicate placeholder '{}'", name),
                    ));
                }
                segments.push(Segment::Param {
                    name: name.to_string(),
                    kind,
                });
            } else if part.contains('{') || part.contains('}') {
                return Err(GatewayError::invalid_pattern(raw, "malformed placeholder"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            trailing_slash,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of placeholder segments; the specificity metric (fewer wins).
    pub fn param_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Param { .. }))
            .count()
    }

    /// Names of all placeholder segments.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match a concrete request path, capturing typed placeholder values.
    /// A single trailing slash on the request is ignored.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        let parts: Vec<&str> = trimmed.split('/').skip(1).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param { name, kind } => {
                    if part.is_empty() {
                        return None;
                    }
                    match kind {
                        ParamKind::Int => {
                            let value: i64 = part.parse().ok()?;
                            params.insert(name.clone(), ParamValue::Int(value));
                        }
                        ParamKind::Str => {
                            params.insert(name.clone(), ParamValue::Str(part.to_string()));
                        }
                    }
                }
            }
        }
        Some(params)
    }

    /// Whether some concrete path could match both patterns.
    pub fn overlaps(&self, other: &PathPattern) -> bool {
        if self.segments.len() != other.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&other.segments)
            .all(|(a, b)| segments_compatible(a, b))
    }

    /// Render a concrete path by substituting captured values, keeping the
    /// registered trailing-slash spelling. Used for legacy -> canonical
    /// rewrites and successor links.
    pub fn render(&self, params: &PathParams) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param { name, .. } => {
                    let value = params.get(name)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        } else if self.trailing_slash {
            out.push('/');
        }
        Some(out)
    }
}

fn segments_compatible(a: &Segment, b: &Segment) -> bool {
    match (a, b) {
        (Segment::Literal(x), Segment::Literal(y)) => x == y,
        // An int capture only collides with a literal that is itself numeric
        (Segment::Param { kind: ParamKind::Int, .. }, Segment::Literal(lit))
        | (Segment::Literal(lit), Segment::Param { kind: ParamKind::Int, .. }) => {
            lit.parse::<i64>().is_ok()
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_match_literal() {
        let p = PathPattern::parse("/api/v2/group/sports/").unwrap();
        assert_eq!(p.param_count(), 0);
        assert!(p.match_path("/api/v2/group/sports").is_some());
        assert!(p.match_path("/api/v2/group/sports/").is_some());
        assert!(p.match_path("/api/v2/group/other/").is_none());
    }

    #[test]
    fn test_typed_int_capture() {
        let p = PathPattern::parse("/api/v2/training/{id:int}/check-in/").unwrap();
        let params = p.match_path("/api/v2/training/123/check-in").unwrap();
        assert_eq!(params.int("id"), Some(123));
        // Non-numeric segment does not match an int capture
        assert!(p.match_path("/api/v2/training/abc/check-in").is_none());
    }

    #[test]
    fn test_negative_int_capture() {
        let p = PathPattern::parse("/api/v2/calendar/sport/{sport_id:int}/schedule/").unwrap();
        let params = p.match_path("/api/v2/calendar/sport/-1/schedule/").unwrap();
        assert_eq!(params.int("sport_id"), Some(-1));
    }

    #[test]
    fn test_string_capture() {
        let p = PathPattern::parse("/api/v2/reference/{kind}/").unwrap();
        let params = p.match_path("/api/v2/reference/medical").unwrap();
        assert_eq!(params.str("kind"), Some("medical"));
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        assert!(PathPattern::parse("api/no-leading-slash").is_err());
        assert!(PathPattern::parse("/api/{id:uuid}").is_err());
        assert!(PathPattern::parse("/api/{").is_err());
        assert!(PathPattern::parse("/api/{}/x").is_err());
        assert!(PathPattern::parse("/api/{id:int}/{id:int}").is_err());
    }

    #[test]
    fn test_overlap_detection() {
        let a = PathPattern::parse("/api/v2/group/{id:int}/").unwrap();
        let b = PathPattern::parse("/api/v2/group/sports/").unwrap();
        // "sports" is not numeric, an int capture cannot shadow it
        assert!(!a.overlaps(&b));

        let c = PathPattern::parse("/api/v2/group/{name}/").unwrap();
        assert!(c.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_render_substitutes_params() {
        let legacy = PathPattern::parse("/api/training/{id:int}/check_in").unwrap();
        let canonical = PathPattern::parse("/api/v2/training/{id:int}/check-in/").unwrap();
        let params = legacy.match_path("/api/training/55/check_in").unwrap();
        assert_eq!(
            canonical.render(&params).unwrap(),
            "/api/v2/training/55/check-in/"
        );
    }
}
