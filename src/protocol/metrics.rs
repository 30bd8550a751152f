//! Process-wide wire-layer counters

use std::sync::atomic::{AtomicU64, Ordering};

use super::MessageKind;

/// Track wire-layer counters without external dependencies.
pub(crate) struct Metrics;

static FRAMES_SERIALIZED: AtomicU64 = AtomicU64::new(0);
static FRAMES_DESERIALIZED: AtomicU64 = AtomicU64::new(0);
static PACKETS_FRAGMENTED: AtomicU64 = AtomicU64::new(0);
static PACKETS_REASSEMBLED: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

struct KindCounters {
    helio_cmd: AtomicU64,
    calib_observation: AtomicU64,
    helio_target_pose: AtomicU64,
    heart_beat: AtomicU64,
}

static KIND_COUNTERS: KindCounters = KindCounters::new();

impl KindCounters {
    const fn new() -> Self {
        Self {
            helio_cmd: AtomicU64::new(0),
            calib_observation: AtomicU64::new(0),
            helio_target_pose: AtomicU64::new(0),
            heart_beat: AtomicU64::new(0),
        }
    }

    /// `None` for kinds that never travel as binary frames.
    fn counter(&self, kind: MessageKind) -> Option<&AtomicU64> {
        match kind {
            MessageKind::HelioCmd => Some(&self.helio_cmd),
            MessageKind::CalibObservation => Some(&self.calib_observation),
            MessageKind::HelioTargetPose => Some(&self.helio_target_pose),
            MessageKind::HeartBeat => Some(&self.heart_beat),
            MessageKind::PodConfigUpdate => None,
        }
    }
}

/// Direction of frame or packet flow for counting.
#[derive(Clone, Copy)]
pub(crate) enum Direction {
    Outbound,
    Inbound,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_frame(direction: Direction, kind: MessageKind) {
        match direction {
            Direction::Outbound => {
                FRAMES_SERIALIZED.fetch_add(1, Ordering::Relaxed);
            }
            Direction::Inbound => {
                FRAMES_DESERIALIZED.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(counter) = KIND_COUNTERS.counter(kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_packets(direction: Direction, count: usize) {
        let count = count as u64;
        match direction {
            Direction::Outbound => PACKETS_FRAGMENTED.fetch_add(count, Ordering::Relaxed),
            Direction::Inbound => PACKETS_REASSEMBLED.fetch_add(count, Ordering::Relaxed),
        };
    }

    #[inline]
    pub(crate) fn record_error() {
        ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    }
}

/// Copy of the process-wide wire-layer counters.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        frames_serialized: FRAMES_SERIALIZED.load(Ordering::Relaxed),
        frames_deserialized: FRAMES_DESERIALIZED.load(Ordering::Relaxed),
        packets_fragmented: PACKETS_FRAGMENTED.load(Ordering::Relaxed),
        packets_reassembled: PACKETS_REASSEMBLED.load(Ordering::Relaxed),
        total_errors: ERROR_COUNT.load(Ordering::Relaxed),
        helio_cmd: KIND_COUNTERS.helio_cmd.load(Ordering::Relaxed),
        calib_observation: KIND_COUNTERS.calib_observation.load(Ordering::Relaxed),
        helio_target_pose: KIND_COUNTERS.helio_target_pose.load(Ordering::Relaxed),
        heart_beat: KIND_COUNTERS.heart_beat.load(Ordering::Relaxed),
    }
}

/// Lightweight snapshot of wire-layer counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Frames encoded
    pub frames_serialized: u64,
    /// Frames decoded
    pub frames_deserialized: u64,
    /// Packets emitted by fragmentation
    pub packets_fragmented: u64,
    /// Packets consumed by reassembly
    pub packets_reassembled: u64,
    /// Serialize or deserialize failures
    pub total_errors: u64,
    /// `HelioCmd` frames in either direction
    pub helio_cmd: u64,
    /// `CalibObservation` frames in either direction
    pub calib_observation: u64,
    /// `HelioTargetPoseCmd` frames in either direction
    pub helio_target_pose: u64,
    /// `HeartBeat` frames in either direction
    pub heart_beat: u64,
}

impl MetricsSnapshot {
    /// Frames handled in either direction.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.frames_serialized + self.frames_deserialized
    }

    /// Errors per handled frame, or `None` before any frame was seen.
    #[must_use]
    pub fn error_ratio(&self) -> Option<f64> {
        let frames = self.total_frames();
        if frames == 0 {
            return None;
        }
        Some(self.total_errors as f64 / frames as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic() {
        let before = snapshot();
        Metrics::record_frame(Direction::Outbound, MessageKind::HeartBeat);
        Metrics::record_frame(Direction::Inbound, MessageKind::HelioCmd);
        Metrics::record_packets(Direction::Outbound, 3);
        Metrics::record_error();
        let after = snapshot();

        assert!(after.frames_serialized > before.frames_serialized);
        assert!(after.frames_deserialized > before.frames_deserialized);
        assert!(after.heart_beat > before.heart_beat);
        assert!(after.helio_cmd > before.helio_cmd);
        assert!(after.packets_fragmented >= before.packets_fragmented + 3);
        assert!(after.total_errors > before.total_errors);
        assert!(after.error_ratio().is_some());
    }

    #[test]
    fn every_framed_kind_has_a_counter() {
        for kind in MessageKind::ALL {
            assert_eq!(
                KIND_COUNTERS.counter(kind).is_some(),
                kind.has_binary_layout(),
                "{kind}"
            );
        }
    }

    #[test]
    fn empty_snapshot_has_no_ratio() {
        assert_eq!(MetricsSnapshot::default().error_ratio(), None);
    }
}
