use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

/// Evidence attached to an AC: a link to the work, or a free-text note.
///
/// Stored and exported as the bare string; classification only matters to
/// embedders that want to render links as links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proof {
    Link(Url),
    Note(String),
}

impl Proof {
    /// Classifies a raw proof string: an absolute URL becomes a `Link`,
    /// anything else is kept verbatim as a `Note`.
    #[must_use]
    pub fn from_text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match Url::parse(&raw) {
            Ok(url) => Self::Link(url),
            Err(_) => Self::Note(raw),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Link(url) => url.as_str(),
            Self::Note(text) => text,
        }
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_text(String::deserialize(deserializer)?))
    }
}
