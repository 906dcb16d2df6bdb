//! # Seek Controller
//!
//! Turns a granularity-quantized seek request into an absolute-sample seek,
//! falling back through a bounded ladder when the engine rejects the exact
//! target:
//!
//! 1. exact target
//! 2. up to `max_retries` targets stepped back by `step_secs`, while still
//!    ahead of the position before the seek
//! 3. the position before the seek
//! 4. sample zero
//! 5. byte offset zero, leaving the engine to resynchronise
//!
//! A request for position zero that fails goes straight to step 5.

use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::engine::CodecEngine;
use crate::frame_buffer::FrameBuffer;
use crate::stream::SharedStream;

/// Ladder parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekPolicy {
    pub granularity_secs: f64,
    pub step_secs: f64,
    pub max_retries: u32,
}

impl Default for SeekPolicy {
    fn default() -> Self {
        Self::from(&DecoderConfig::default())
    }
}

impl From<&DecoderConfig> for SeekPolicy {
    fn from(config: &DecoderConfig) -> Self {
        Self {
            granularity_secs: config.granularity_secs,
            step_secs: config.seek_step_secs,
            max_retries: config.seek_max_retries,
        }
    }
}

/// Where a seek ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// The requested time was reached.
    Exact(f64),
    /// A backward-stepped target was reached after `attempts` retries.
    SteppedBack { secs: f64, attempts: u32 },
    /// Every target failed; the pre-seek position was restored.
    Restored(f64),
    /// The engine was repositioned at sample zero.
    Restarted,
    /// Only the byte source could be rewound to its start.
    Rewound,
    /// Nothing worked, not even the byte rewind.
    Failed,
}

impl SeekOutcome {
    /// Time actually reached, or `None` when the seek failed outright.
    pub fn achieved_secs(&self) -> Option<f64> {
        match *self {
            SeekOutcome::Exact(secs)
            | SeekOutcome::SteppedBack { secs, .. }
            | SeekOutcome::Restored(secs) => Some(secs),
            SeekOutcome::Restarted | SeekOutcome::Rewound => Some(0.0),
            SeekOutcome::Failed => None,
        }
    }

    /// Whether the requested target was reached.
    pub fn is_exact(&self) -> bool {
        matches!(self, SeekOutcome::Exact(_))
    }
}

/// Drives one seek against a session's engine, buffer and stream.
pub struct SeekController<'a> {
    engine: &'a mut dyn CodecEngine,
    buffer: &'a mut FrameBuffer,
    stream: &'a SharedStream,
    sample_rate: u32,
    policy: SeekPolicy,
}

impl<'a> SeekController<'a> {
    pub fn new(
        engine: &'a mut dyn CodecEngine,
        buffer: &'a mut FrameBuffer,
        stream: &'a SharedStream,
        sample_rate: u32,
        policy: SeekPolicy,
    ) -> Self {
        Self {
            engine,
            buffer,
            stream,
            sample_rate,
            policy,
        }
    }

    /// Seek to `units` granularity units from the start.
    ///
    /// The scratch buffer is empty afterwards whatever the outcome. On
    /// success the buffer position is moved to the reached sample.
    pub fn seek(mut self, units: u32) -> SeekOutcome {
        let rate = self.sample_rate as f64;
        let cpos = self.buffer.position() as f64 / rate;
        let target = units as f64 * self.policy.granularity_secs;

        self.buffer.reset();
        self.stream.lock().set_scratch_empty(true);
        self.engine.flush();

        let outcome = if self.try_seek(target) {
            SeekOutcome::Exact(target)
        } else if units != 0 {
            self.fall_back(target, cpos)
        } else {
            self.rewind_bytes()
        };

        if let Some(secs) = outcome.achieved_secs() {
            self.buffer.set_position(self.to_sample(secs));
        }
        match outcome {
            SeekOutcome::Exact(_) => debug!(target_secs = target, "Seek reached target"),
            SeekOutcome::Failed => warn!(target_secs = target, "Seek failed completely"),
            _ => info!(target_secs = target, ?outcome, "Seek degraded"),
        }
        outcome
    }

    fn fall_back(&mut self, target: f64, cpos: f64) -> SeekOutcome {
        let mut time = target;
        for attempt in 0..self.policy.max_retries {
            time -= self.policy.step_secs;
            if !(time > cpos) {
                break;
            }
            self.engine.flush();
            if self.try_seek(time) {
                return SeekOutcome::SteppedBack {
                    secs: time,
                    attempts: attempt + 1,
                };
            }
        }

        self.engine.flush();
        if self.try_seek(cpos) {
            return SeekOutcome::Restored(cpos);
        }

        self.engine.flush();
        if self.engine.seek_absolute(0) {
            return SeekOutcome::Restarted;
        }

        self.rewind_bytes()
    }

    fn rewind_bytes(&mut self) -> SeekOutcome {
        match self.stream.lock().seek(0) {
            Ok(()) => SeekOutcome::Rewound,
            Err(_) => SeekOutcome::Failed,
        }
    }

    fn try_seek(&mut self, secs: f64) -> bool {
        let sample = self.to_sample(secs);
        let ok = self.engine.seek_absolute(sample);
        debug!(secs, sample, ok, "Absolute seek attempt");
        ok
    }

    fn to_sample(&self, secs: f64) -> u64 {
        (secs * self.sample_rate as f64) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineState, FrameSink};
    use crate::stream::StreamAdapter;
    use bridge_desktop::MemorySource;

    /// Engine that accepts seeks only where `accept` says so.
    struct LadderEngine {
        accept: fn(u64) -> bool,
        attempts: Vec<u64>,
        flushes: usize,
    }

    impl LadderEngine {
        fn new(accept: fn(u64) -> bool) -> Self {
            Self {
                accept,
                attempts: Vec::new(),
                flushes: 0,
            }
        }
    }

    impl CodecEngine for LadderEngine {
        fn process_until_end_of_metadata(&mut self, _sink: &mut dyn FrameSink) -> bool {
            true
        }

        fn process_single(&mut self, _sink: &mut dyn FrameSink) -> bool {
            true
        }

        fn flush(&mut self) -> bool {
            self.flushes += 1;
            true
        }

        fn seek_absolute(&mut self, sample: u64) -> bool {
            self.attempts.push(sample);
            (self.accept)(sample)
        }

        fn state(&self) -> EngineState {
            EngineState::Normal
        }
    }

    fn stream() -> SharedStream {
        StreamAdapter::new(Box::new(MemorySource::new(vec![0u8; 64]))).into_shared()
    }

    fn buffer_at(position: u64) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(16, 2, 16);
        let planar = [1i32; 32];
        buffer.write_frame(&crate::engine::DecodedFrame::new(&planar, 16, 2, 16, 0));
        buffer.set_position(position);
        buffer
    }

    const RATE: u32 = 1000;

    #[test]
    fn test_exact_seek() {
        let mut engine = LadderEngine::new(|_| true);
        let mut buffer = buffer_at(0);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(5000);

        assert_eq!(outcome, SeekOutcome::Exact(5.0));
        assert_eq!(outcome.achieved_secs(), Some(5.0));
        assert_eq!(engine.attempts, vec![5000]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.position(), 5000);
    }

    #[test]
    fn test_steps_back_three_seconds() {
        let mut engine = LadderEngine::new(|s| s <= 17_000);
        let mut buffer = buffer_at(0);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(20_000);

        assert_eq!(
            outcome,
            SeekOutcome::SteppedBack {
                secs: 17.0,
                attempts: 1
            }
        );
        assert_eq!(engine.attempts, vec![20_000, 17_000]);
        assert_eq!(buffer.position(), 17_000);
    }

    #[test]
    fn test_step_back_bounded_by_current_position() {
        // Before the seek the session was at 10s; only 10s itself works.
        let mut engine = LadderEngine::new(|s| s == 10_000);
        let mut buffer = buffer_at(10_000);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(20_000);

        // 17, 14, 11 are tried; 8 is not ahead of 10 so the ladder stops
        assert_eq!(outcome, SeekOutcome::Restored(10.0));
        assert_eq!(engine.attempts, vec![20_000, 17_000, 14_000, 11_000, 10_000]);
        assert_eq!(buffer.position(), 10_000);
    }

    #[test]
    fn test_ladder_terminates_after_max_retries() {
        let mut engine = LadderEngine::new(|s| s == 0);
        let mut buffer = buffer_at(0);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(100_000);

        // exact + 10 retries, then the pre-seek position (0s) is restored
        assert_eq!(outcome, SeekOutcome::Restored(0.0));
        assert_eq!(engine.attempts.len(), 12);
        assert_eq!(engine.attempts[10], 70_000);
        assert_eq!(engine.attempts[11], 0);
        assert_eq!(outcome.achieved_secs(), Some(0.0));
    }

    #[test]
    fn test_restart_at_sample_zero() {
        let mut engine = LadderEngine::new(|s| s == 0);
        let mut buffer = buffer_at(30_000);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(31_000);

        assert_eq!(outcome, SeekOutcome::Restarted);
        assert_eq!(engine.attempts, vec![31_000, 30_000, 0]);
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_restart_then_byte_rewind() {
        let mut engine = LadderEngine::new(|_| false);
        let mut buffer = buffer_at(2_000);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(4_000);

        // exact, 1s is not ahead of 2s, restore 2s, restart at zero
        assert_eq!(engine.attempts, vec![4_000, 2_000, 0]);
        assert_eq!(outcome, SeekOutcome::Rewound);
        assert_eq!(buffer.position(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_target_failure_rewinds_bytes() {
        let mut engine = LadderEngine::new(|_| false);
        let mut buffer = buffer_at(5_000);
        let stream = stream();

        let outcome =
            SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
                .seek(0);

        assert_eq!(outcome, SeekOutcome::Rewound);
        assert_eq!(engine.attempts, vec![0]);
        assert_eq!(stream.lock().tell(), 0);
    }

    #[test]
    fn test_buffer_reset_even_when_exact() {
        let mut engine = LadderEngine::new(|_| true);
        let mut buffer = buffer_at(0);
        assert!(!buffer.is_empty());
        let stream = stream();
        stream.lock().set_scratch_empty(false);

        SeekController::new(&mut engine, &mut buffer, &stream, RATE, SeekPolicy::default())
            .seek(1);

        assert_eq!(buffer.write_len(), 0);
        assert_eq!(buffer.read_pos(), 0);
        assert!(engine.flushes >= 1);
    }

    #[test]
    fn test_custom_policy() {
        let mut engine = LadderEngine::new(|s| s == 9_000);
        let mut buffer = buffer_at(0);
        let stream = stream();
        let policy = SeekPolicy {
            granularity_secs: 1.0,
            step_secs: 1.0,
            max_retries: 2,
        };

        let outcome = SeekController::new(&mut engine, &mut buffer, &stream, RATE, policy).seek(10);

        assert_eq!(
            outcome,
            SeekOutcome::SteppedBack {
                secs: 9.0,
                attempts: 1
            }
        );
    }
}
