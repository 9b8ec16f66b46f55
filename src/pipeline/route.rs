//! Route templates for host root paths, e.g. `/tenants/{tenant}/customers`.

use percent_encoding::percent_decode_str;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A parsed root path with optional `{name}` captures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

/// Route values captured by a template, and the fragment below the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'p> {
    pub values: Vec<(String, String)>,
    pub fragment: &'p str,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Capture(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Names of the captured values, in order.
    pub fn captures(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match the leading segments of `path`. Literals compare
    /// case-insensitively; the fragment keeps its leading `/`.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<RouteMatch<'p>> {
        let mut rest = path;
        let mut values = Vec::new();
        for segment in &self.segments {
            let trimmed = rest.strip_prefix('/')?;
            let end = trimmed.find('/').unwrap_or(trimmed.len());
            let (head, tail) = trimmed.split_at(end);
            match segment {
                Segment::Literal(literal) if literal.eq_ignore_ascii_case(head) => {}
                Segment::Literal(_) => return None,
                Segment::Capture(name) => {
                    if head.is_empty() {
                        return None;
                    }
                    let value = percent_decode_str(head).decode_utf8_lossy().into_owned();
                    values.push((name.clone(), value));
                }
            }
            rest = tail;
        }
        Some(RouteMatch {
            values,
            fragment: rest,
        })
    }
}
