/// Key-press vs. voice-activity heuristic for flagging keyboard noise.
///
/// Fed once per captured frame. Each frame that has recent key presses while
/// voice activity has only just started adds a penalty; the detector reports
/// typing once the accumulated penalty crosses the reporting threshold.
#[derive(Debug, Clone)]
pub struct TypingDetection {
    time_active: u32,
    time_since_last_typing: u32,
    penalty_counter: u32,

    /// Frames of voice activity after which typing is no longer blamed.
    time_window: u32,
    cost_per_typing: u32,
    reporting_threshold: u32,
    penalty_decay: u32,
    /// Frames a key press stays relevant.
    type_event_delay: u32,
}

impl Default for TypingDetection {
    fn default() -> Self {
        Self {
            time_active: 0,
            time_since_last_typing: 0,
            penalty_counter: 0,
            time_window: 10,
            cost_per_typing: 100,
            reporting_threshold: 300,
            penalty_decay: 1,
            type_event_delay: 2,
        }
    }
}

impl TypingDetection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if typing noise is detected in this frame.
    pub fn process(&mut self, key_pressed: bool, vad_activity: bool) -> bool {
        if vad_activity {
            self.time_active += 1;
        } else {
            self.time_active = 0;
        }

        if key_pressed {
            self.time_since_last_typing = 0;
        } else {
            self.time_since_last_typing = self.time_since_last_typing.saturating_add(1);
        }

        if self.time_since_last_typing < self.type_event_delay
            && vad_activity
            && self.time_active < self.time_window
        {
            self.penalty_counter += self.cost_per_typing;
            if self.penalty_counter > self.reporting_threshold {
                return true;
            }
        }

        if self.penalty_counter > 0 {
            self.penalty_counter = self.penalty_counter.saturating_sub(self.penalty_decay);
        }
        false
    }
}
