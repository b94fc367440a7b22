use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique handle for a registered stream or mixer source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId(u64);

impl StreamId {
    /// Allocate a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Format a sending stream asks the capture path to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendProperties {
    pub sample_rate_hz: u32,
    pub num_channels: usize,
}

impl SendProperties {
    /// Aggregate used when no sender is registered.
    pub const FLOOR: SendProperties = SendProperties {
        sample_rate_hz: 8000,
        num_channels: 1,
    };

    /// Max rate and max channel count across `props`, never below [`Self::FLOOR`].
    pub fn aggregate<'a>(props: impl IntoIterator<Item = &'a SendProperties>) -> SendProperties {
        props.into_iter().fold(Self::FLOOR, |acc, p| SendProperties {
            sample_rate_hz: acc.sample_rate_hz.max(p.sample_rate_hz),
            num_channels: acc.num_channels.max(p.num_channels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_ordered() {
        let a = StreamId::next();
        let b = StreamId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn aggregate_of_nothing_is_floor() {
        assert_eq!(SendProperties::aggregate(&[]), SendProperties::FLOOR);
    }

    #[test]
    fn aggregate_takes_max_of_each_field() {
        let props = [
            SendProperties { sample_rate_hz: 16000, num_channels: 2 },
            SendProperties { sample_rate_hz: 48000, num_channels: 1 },
        ];
        let agg = SendProperties::aggregate(&props);
        assert_eq!(agg.sample_rate_hz, 48000);
        assert_eq!(agg.num_channels, 2);
    }
}
