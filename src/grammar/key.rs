use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Suffix markers that derive a state key from an argument key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    /// Enabled flag of an optional argument.
    Enabled,
    /// Instance count of a repeatable or an array.
    Count,
    /// Cached result of an evaluated embedded-code argument.
    Result,
    /// The command-level execution socket.
    Flow,
}

impl Marker {
    fn as_str(&self) -> &'static str {
        match self {
            Marker::Enabled => "#enabled",
            Marker::Count => "#count",
            Marker::Result => "#result",
            Marker::Flow => "#flow",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "#enabled" => Some(Marker::Enabled),
            "#count" => Some(Marker::Count),
            "#result" => Some(Marker::Result),
            "#flow" => Some(Marker::Flow),
            _ => None,
        }
    }
}

/// One step of an argument path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Position among siblings, or a repeat index.
    Ordinal(usize),
    /// Identifier of a grammar node.
    Name(String),
    /// The leading array-parameter of a command, subcommand or base.
    ArrayParam,
    Marker(Marker),
}

const ARRAY_PARAM: &str = "@param";

/// Structured address of one grammar-node occurrence inside a node instance.
///
/// Keys are built by the walker as it descends and are the only way values
/// are addressed. The string form exists solely for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgKey {
    segments: Vec<Segment>,
}

impl ArgKey {
    /// The empty path every walk starts from.
    pub fn root() -> Self {
        Self::default()
    }

    /// Key of the command-level flow sockets.
    pub fn flow() -> Self {
        Self::root().marked(Marker::Flow)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn pushed(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn ordinal(&self, index: usize) -> Self {
        self.pushed(Segment::Ordinal(index))
    }

    pub fn named(&self, name: &str) -> Self {
        self.pushed(Segment::Name(name.to_string()))
    }

    /// Appends `name` unless it is empty (anonymous groups, blocks and arrays).
    pub fn join(&self, name: &str) -> Self {
        if name.is_empty() {
            self.clone()
        } else {
            self.named(name)
        }
    }

    pub fn array_param(&self) -> Self {
        self.pushed(Segment::ArrayParam)
    }

    pub fn marked(&self, marker: Marker) -> Self {
        self.pushed(Segment::Marker(marker))
    }

    pub fn enabled(&self) -> Self {
        self.marked(Marker::Enabled)
    }

    pub fn count(&self) -> Self {
        self.marked(Marker::Count)
    }

    pub fn result(&self) -> Self {
        self.marked(Marker::Result)
    }

    /// The final marker of this key, if any.
    pub fn marker(&self) -> Option<Marker> {
        match self.segments.last() {
            Some(Segment::Marker(marker)) => Some(*marker),
            _ => None,
        }
    }

    /// True when `self` is `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &ArgKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

fn escape_name(name: &str, out: &mut String) {
    // A leading '/' or '\' is escaped below, which already marks the segment as a name.
    let ambiguous = name.starts_with(['#', '@'])
        || (!name.is_empty() && name.chars().all(|c| c.is_ascii_digit()));
    if ambiguous {
        out.push('\\');
    }
    for c in name.chars() {
        if c == '/' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            match segment {
                Segment::Ordinal(index) => out.push_str(&index.to_string()),
                Segment::Name(name) => escape_name(name, &mut out),
                Segment::ArrayParam => out.push_str(ARRAY_PARAM),
                Segment::Marker(marker) => out.push_str(marker.as_str()),
            }
        }
        f.write_str(&out)
    }
}

/// Error returned when a persisted key string is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParseError(pub String);

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed argument key '{}'", self.0)
    }
}

impl std::error::Error for KeyParseError {}

impl FromStr for ArgKey {
    type Err = KeyParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Ok(Self::root());
        }

        // Split on unescaped separators, remembering whether each raw segment was escaped.
        let mut raw: Vec<(String, bool)> = vec![(String::new(), false)];
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let next = chars
                        .next()
                        .ok_or_else(|| KeyParseError(text.to_string()))?;
                    let current = raw.last_mut().ok_or_else(|| KeyParseError(text.to_string()))?;
                    if current.0.is_empty() && !current.1 && !matches!(next, '/' | '\\') {
                        // Leading escape: the segment is a literal name.
                        current.1 = true;
                        current.0.push(next);
                    } else {
                        current.1 |= current.0.is_empty();
                        current.0.push(next);
                    }
                }
                '/' => raw.push((String::new(), false)),
                other => {
                    if let Some(current) = raw.last_mut() {
                        current.0.push(other);
                    }
                }
            }
        }

        let segments = raw
            .into_iter()
            .map(|(body, escaped)| {
                if escaped {
                    return Ok(Segment::Name(body));
                }
                if body.is_empty() {
                    return Err(KeyParseError(text.to_string()));
                }
                if body == ARRAY_PARAM {
                    return Ok(Segment::ArrayParam);
                }
                if let Some(marker) = Marker::parse(&body) {
                    return Ok(Segment::Marker(marker));
                }
                if body.chars().all(|c| c.is_ascii_digit()) {
                    return body
                        .parse()
                        .map(Segment::Ordinal)
                        .map_err(|_| KeyParseError(text.to_string()));
                }
                if body.starts_with(['#', '@']) {
                    return Err(KeyParseError(text.to_string()));
                }
                Ok(Segment::Name(body))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

impl Serialize for ArgKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct ArgKeyVisitor;

impl Visitor<'_> for ArgKeyVisitor {
    type Value = ArgKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an argument key string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<ArgKey, E> {
        value.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ArgKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ArgKeyVisitor)
    }
}
