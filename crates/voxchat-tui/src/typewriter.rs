/// Where an animation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Revealing,
    /// Stopped early; the whole text is shown.
    Preempted,
    Done,
}

/// Edges produced by one step of a [`Typewriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub started: bool,
    pub ended: bool,
}

impl Signals {
    pub fn merge(self, other: Signals) -> Signals {
        Signals {
            started: self.started || other.started,
            ended: self.ended || other.ended,
        }
    }
}

/// Reveals a string one character per tick.
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    /// Characters currently shown.
    shown: usize,
    phase: Phase,
}

impl Typewriter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown: 0,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_revealing(&self) -> bool {
        self.phase == Phase::Revealing
    }

    /// The visible prefix of the text.
    pub fn visible(&self) -> &str {
        match self.text.char_indices().nth(self.shown) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }

    fn total(&self) -> usize {
        self.text.chars().count()
    }

    /// Advance by one character.
    pub fn tick(&mut self) -> Signals {
        let mut signals = Signals::default();
        match self.phase {
            Phase::Preempted | Phase::Done => return signals,
            Phase::Idle => {
                if self.total() == 0 {
                    self.phase = Phase::Done;
                    signals.ended = true;
                    return signals;
                }
                self.phase = Phase::Revealing;
                signals.started = true;
            }
            Phase::Revealing => {}
        }

        self.shown += 1;
        if self.shown >= self.total() {
            self.shown = self.total();
            self.phase = Phase::Done;
            signals.ended = true;
        }
        signals
    }

    /// Show everything now. A no-op once the animation has finished.
    pub fn preempt(&mut self) -> Signals {
        match self.phase {
            Phase::Preempted | Phase::Done => Signals::default(),
            Phase::Idle | Phase::Revealing => {
                self.shown = self.total();
                self.phase = Phase::Preempted;
                Signals {
                    started: false,
                    ended: true,
                }
            }
        }
    }

    /// Replace the text. Text that extends the current one keeps what is
    /// already shown and carries on revealing; anything else starts over.
    /// A finished animation that resumes fires `started` again; one cut off
    /// by a reset fires `ended`.
    pub fn set_text(&mut self, text: &str) -> Signals {
        if text == self.text {
            return Signals::default();
        }
        if text.starts_with(self.text.as_str()) {
            self.text = text.to_string();
            return match self.phase {
                Phase::Done => {
                    self.phase = Phase::Revealing;
                    Signals {
                        started: true,
                        ended: false,
                    }
                }
                Phase::Preempted => {
                    self.shown = self.total();
                    Signals::default()
                }
                Phase::Idle | Phase::Revealing => Signals::default(),
            };
        }
        let ended = self.is_revealing();
        *self = Typewriter::new(text);
        Signals {
            started: false,
            ended,
        }
    }
}
