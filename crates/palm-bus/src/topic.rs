//! Topic identity and versioned payloads

use std::fmt;

/// Topic identity - a static name, cheap to copy and hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopicId(pub &'static str);

impl TopicId {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        TopicId(name)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A payload together with its per-topic version.
///
/// INVARIANT: versions strictly increase per topic; observers see
/// non-decreasing versions but may skip intermediates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published<P> {
    pub version: u64,
    pub payload: P,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_id_equality() {
        assert_eq!(TopicId::new("score"), TopicId::new("score"));
        assert_ne!(TopicId::new("score"), TopicId::new("health"));
    }
}
