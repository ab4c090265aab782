//! Compiled field paths.
//!
//! A path is a dot-delimited list of segments. Each segment is an object key, and
//! additionally an array index when its text is the canonical decimal form of a
//! non-negative integer. Paths are parsed once and reused for every edit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path '{path}' has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    key: String,
    index: Option<usize>,
}

impl Segment {
    pub fn key(key: impl Into<String>) -> Self {
        let key = key.into();
        let index = canonical_index(&key);
        Self { key, index }
    }

    pub fn as_key(&self) -> &str {
        &self.key
    }

    /// The array index this segment denotes, if its text round-trips as one.
    pub fn as_index(&self) -> Option<usize> {
        self.index
    }
}

/// `"3"` is an index; `"03"`, `"+3"`, `"3x"` and `"-1"` are plain keys.
fn canonical_index(key: &str) -> Option<usize> {
    let parsed = key.parse::<usize>().ok()?;
    (parsed.to_string() == key).then_some(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    parents: Vec<Segment>,
    last: Segment,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = raw
            .split('.')
            .enumerate()
            .map(|(position, part)| {
                if part.is_empty() {
                    Err(PathError::EmptySegment {
                        path: raw.to_string(),
                        position,
                    })
                } else {
                    Ok(Segment::key(part))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        // split('.') on a non-empty string yields at least one part
        let last = segments.pop().ok_or(PathError::Empty)?;
        Ok(Self {
            parents: segments,
            last,
        })
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.parents.iter().chain(std::iter::once(&self.last))
    }

    /// The segments leading to the container, and the final segment within it.
    pub fn split_last(&self) -> (&[Segment], &Segment) {
        (&self.parents, &self.last)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_key())?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_segments_become_indices() {
        let path = FieldPath::parse("experience.1.position").unwrap();
        let indices: Vec<_> = path.segments().map(Segment::as_index).collect();
        assert_eq!(indices, vec![None, Some(1), None]);
    }

    #[test]
    fn test_non_canonical_numbers_stay_keys() {
        for key in ["0x", "01", "+1", "-1", "1.5e3"] {
            assert_eq!(Segment::key(key).as_index(), None, "{key} must not be an index");
        }
        assert_eq!(Segment::key("0").as_index(), Some(0));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn test_empty_segment_rejected() {
        for raw in ["a..b", ".a", "a."] {
            assert!(
                matches!(FieldPath::parse(raw), Err(PathError::EmptySegment { .. })),
                "{raw} should fail"
            );
        }
    }

    #[test]
    fn test_brackets_are_not_interpreted() {
        let path = FieldPath::parse("sections[0].title").unwrap();
        let first = path.segments().next().unwrap();
        assert_eq!(first.as_key(), "sections[0]");
        assert_eq!(path.segments().count(), 2);
    }

    #[test]
    fn test_display_round_trips() {
        let path: FieldPath = "personalInfo.fullName".parse().unwrap();
        assert_eq!(path.to_string(), "personalInfo.fullName");
        assert_eq!(FieldPath::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn test_deserializes_from_string() {
        let path: FieldPath = serde_json::from_value(json!("skills.2.name")).unwrap();
        assert_eq!(path.to_string(), "skills.2.name");
        assert!(serde_json::from_value::<FieldPath>(json!("skills..name")).is_err());
    }
}
