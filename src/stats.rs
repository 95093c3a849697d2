//! Per-frame and running diagnostics for the fixed-step scheduler.

use core::fmt::Write;
use heapless::String;

/// What one `update` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Fixed steps executed during the call.
    pub substeps: u32,
    /// The substep cap stopped stepping while at least one full fixed step
    /// was still pending in the accumulator.
    pub starved: bool,
}

/// Running totals across all `update` calls of a solver.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    frames: u64,
    steps: u64,
    starved_frames: u64,
    last_frame: FrameReport,
}

impl SolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, report: FrameReport) {
        self.frames += 1;
        self.steps += u64::from(report.substeps);
        if report.starved {
            self.starved_frames += 1;
        }
        self.last_frame = report;
    }

    /// Number of `update` calls.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of fixed steps run by `update` calls.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of frames that hit the substep cap with time left over.
    pub fn starved_frames(&self) -> u64 {
        self.starved_frames
    }

    pub fn last_frame(&self) -> FrameReport {
        self.last_frame
    }

    /// Average fixed steps per frame, or zero before the first frame.
    pub fn steps_per_frame(&self) -> f32 {
        if self.frames == 0 {
            0.0
        } else {
            self.steps as f32 / self.frames as f32
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Short multi-line text block, e.g. for an on-screen overlay.
    pub fn summary(&self) -> String<128> {
        let mut text = String::new();
        let _ = write!(text, "frames: {}\n", self.frames);
        let _ = write!(text, "steps: {}\n", self.steps);
        let _ = write!(text, "starved: {}\n", self.starved_frames);
        let _ = write!(text, "last: {}\n", self.last_frame.substeps);
        text
    }
}
