//! Observable events
//!
//! Every lifecycle point of the engine has an explicit, typed event.

use std::fmt;

/// Observable engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Engine configuration loaded
    ConfigLoaded,

    // Index building
    /// One manifest build started
    IndexBuildStart,
    /// One manifest built
    IndexBuildComplete,
    /// One manifest failed to build
    IndexBuildFailed,

    // Segment lifecycle
    /// Segment created in LOADING
    SegmentCreated,
    /// Segment data available
    SegmentLoaded,
    /// Unload requested, owners asked to release
    SegmentReleaseRequested,
    /// At least one owner refused to release
    SegmentReleasePending,
    /// Segment closed and backing indices dropped
    SegmentClosed,
    /// Closed segment removed from the registry
    SegmentForgotten,

    // Ownership
    /// Owner registered against a segment
    OwnerRegistered,
    /// Owner left its segment
    OwnerDeregistered,

    // Access
    /// A manifest operation was rejected
    AccessDenied,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::IndexBuildStart => "INDEX_BUILD_BEGIN",
            Event::IndexBuildComplete => "INDEX_BUILD_COMPLETE",
            Event::IndexBuildFailed => "INDEX_BUILD_FAILED",

            Event::SegmentCreated => "SEGMENT_CREATED",
            Event::SegmentLoaded => "SEGMENT_LOADED",
            Event::SegmentReleaseRequested => "SEGMENT_RELEASE_REQUESTED",
            Event::SegmentReleasePending => "SEGMENT_RELEASE_PENDING",
            Event::SegmentClosed => "SEGMENT_CLOSED",
            Event::SegmentForgotten => "SEGMENT_FORGOTTEN",

            Event::OwnerRegistered => "OWNER_REGISTERED",
            Event::OwnerDeregistered => "OWNER_DEREGISTERED",

            Event::AccessDenied => "ACCESS_DENIED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::IndexBuildFailed | Event::AccessDenied)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::ConfigLoaded,
            Event::IndexBuildStart,
            Event::IndexBuildComplete,
            Event::IndexBuildFailed,
            Event::SegmentCreated,
            Event::SegmentLoaded,
            Event::SegmentReleaseRequested,
            Event::SegmentReleasePending,
            Event::SegmentClosed,
            Event::SegmentForgotten,
            Event::OwnerRegistered,
            Event::OwnerDeregistered,
            Event::AccessDenied,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::IndexBuildFailed.is_failure());
        assert!(Event::AccessDenied.is_failure());
        assert!(!Event::SegmentClosed.is_failure());
    }
}
