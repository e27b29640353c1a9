use std::fmt;

/// A single step of a concrete data path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Splits a concrete path (`a.b[2].c`, `a.b.2.c`) into segments.
///
/// Both spellings of an array index produce `Index`, so paths that differ only
/// in notation compare equal. Malformed brackets keep the raw text as a key.
pub fn parse_segments(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.').filter(|part| !part.is_empty()) {
        match split_indices(part) {
            Some((key, indices)) => {
                if !key.is_empty() {
                    segments.push(key_segment(key));
                }
                segments.extend(indices.into_iter().map(PathSegment::Index));
            }
            None => segments.push(key_segment(part)),
        }
    }
    segments
}

fn key_segment(key: &str) -> PathSegment {
    match key.parse::<usize>() {
        Ok(index) => PathSegment::Index(index),
        Err(_) => PathSegment::Key(key.to_string()),
    }
}

/// `items[1][2]` -> ("items", [1, 2]). `None` if the brackets are malformed.
fn split_indices(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = part.find('[') else {
        return Some((part, Vec::new()));
    };

    let key = &part[..open];
    let mut indices = Vec::new();
    let mut rest = &part[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indices.push(inner[..close].trim().parse::<usize>().ok()?);
        rest = &inner[close + 1..];
    }
    Some((key, indices))
}
