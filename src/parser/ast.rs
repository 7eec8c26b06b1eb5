use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// The property name this segment reads on an object.
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Key(k) => k.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }
}

/// A parsed watch expression. The first segment is always a `Key`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPath {
    pub segments: Vec<PathSegment>,
}

impl KeyPath {
    pub fn head(&self) -> &str {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => k.as_str(),
            _ => "",
        }
    }

    pub fn tail(&self) -> &[PathSegment] {
        if self.segments.is_empty() {
            &[]
        } else {
            &self.segments[1..]
        }
    }

    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathSegment::Key(k) if is_identifier(k) => write!(f, ".{}", k)?,
                PathSegment::Key(k) if k.contains('\'') => write!(f, "[\"{}\"]", k)?,
                PathSegment::Key(k) => write!(f, "['{}']", k)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}
