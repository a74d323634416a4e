use crate::schedule::{Epoch, EpochCounter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pre-authored sampled reasoning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealEvent {
    pub id: u32,
    pub text: String,
    pub derived_answer: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPhase {
    #[default]
    Idle,
    Sampling,
}

impl RevealPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RevealPhase::Idle => "idle",
            RevealPhase::Sampling => "sampling",
        }
    }
}

/// Majority vote over the revealed answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub answer: String,
    pub votes: usize,
    pub total: usize,
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{} votes)", self.answer, self.votes, self.total)
    }
}

/// Mode of `answers`. Equal counts go to whichever answer appeared first.
pub fn consensus<'a, I>(answers: I) -> Option<Consensus>
where
    I: IntoIterator<Item = &'a str>,
{
    // Tallies stay in first-seen order so the strict `>` below keeps the
    // earliest answer on a tie.
    let mut tallies: Vec<(&'a str, usize)> = Vec::new();
    let mut total = 0usize;
    for answer in answers {
        total += 1;
        match tallies.iter_mut().find(|(a, _)| *a == answer) {
            Some((_, n)) => *n += 1,
            None => tallies.push((answer, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &(answer, n) in &tallies {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((answer, n));
        }
    }

    best.map(|(answer, votes)| Consensus {
        answer: answer.to_string(),
        votes,
        total,
    })
}

/// Result of revealing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealStep {
    pub index: usize,
    pub total: usize,
    /// Set on the final reveal of a run.
    pub consensus: Option<Consensus>,
}

/// Self-consistency playback: reveals a fixed script one path at a time,
/// then publishes the vote.
#[derive(Debug, Clone)]
pub struct RevealSession {
    script: Vec<RevealEvent>,
    revealed: usize,
    phase: RevealPhase,
    consensus: Option<Consensus>,
    epochs: EpochCounter,
}

impl RevealSession {
    pub fn new(script: Vec<RevealEvent>) -> Self {
        Self {
            script,
            revealed: 0,
            phase: RevealPhase::Idle,
            consensus: None,
            epochs: EpochCounter::new(),
        }
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_sampling(&self) -> bool {
        self.phase == RevealPhase::Sampling
    }

    pub fn script(&self) -> &[RevealEvent] {
        &self.script
    }

    pub fn revealed(&self) -> &[RevealEvent] {
        &self.script[..self.revealed]
    }

    pub fn consensus(&self) -> Option<&Consensus> {
        self.consensus.as_ref()
    }

    /// Number of revealed paths that reached the right answer on their own.
    pub fn correct_count(&self) -> usize {
        self.revealed().iter().filter(|e| e.is_correct).count()
    }

    /// Begin a run. Returns the epoch the host must tick with, or `None` if a
    /// run is already in progress (or there is nothing to reveal).
    pub fn start(&mut self) -> Option<Epoch> {
        if self.phase == RevealPhase::Sampling || self.script.is_empty() {
            return None;
        }
        self.revealed = 0;
        self.consensus = None;
        self.phase = RevealPhase::Sampling;
        Some(self.epochs.advance())
    }

    /// Reveal the next event of the run identified by `epoch`.
    pub fn reveal_next(&mut self, epoch: Epoch) -> Option<RevealStep> {
        if self.phase != RevealPhase::Sampling || !self.epochs.is_current(epoch) {
            return None;
        }
        if self.revealed >= self.script.len() {
            self.phase = RevealPhase::Idle;
            return None;
        }

        let index = self.revealed;
        self.revealed += 1;

        let mut step = RevealStep {
            index,
            total: self.script.len(),
            consensus: None,
        };
        if self.revealed == self.script.len() {
            self.consensus = consensus(self.revealed().iter().map(|e| e.derived_answer.as_str()));
            self.phase = RevealPhase::Idle;
            step.consensus = self.consensus.clone();
        }
        Some(step)
    }

    /// Abandon the current run without publishing a vote.
    pub fn cancel(&mut self) {
        if self.phase == RevealPhase::Sampling {
            self.phase = RevealPhase::Idle;
            self.epochs.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(answers: &[&str]) -> Vec<RevealEvent> {
        answers
            .iter()
            .enumerate()
            .map(|(i, a)| RevealEvent {
                id: i as u32 + 1,
                text: format!("path {}", i + 1),
                derived_answer: a.to_string(),
                is_correct: *a == "42",
            })
            .collect()
    }

    #[test]
    fn publishes_majority_after_last_reveal() {
        let mut s = RevealSession::new(script(&["42", "40", "42", "42", "12"]));
        let epoch = s.start().unwrap();

        for i in 0..4 {
            let step = s.reveal_next(epoch).unwrap();
            assert_eq!(step.index, i);
            assert!(step.consensus.is_none());
            assert!(s.is_sampling());
        }

        let last = s.reveal_next(epoch).unwrap();
        assert_eq!(last.index, 4);
        assert_eq!(last.consensus.unwrap().to_string(), "42 (3/5 votes)");
        assert_eq!(s.phase(), RevealPhase::Idle);
        assert_eq!(s.correct_count(), 3);
        assert!(s.reveal_next(epoch).is_none());
    }

    #[test]
    fn start_is_ignored_while_sampling() {
        let mut s = RevealSession::new(script(&["1", "2"]));
        let epoch = s.start().unwrap();
        s.reveal_next(epoch);

        assert!(s.start().is_none());
        assert_eq!(s.revealed().len(), 1);
        assert!(s.reveal_next(epoch).is_some());
    }

    #[test]
    fn rerun_clears_previous_result() {
        let mut s = RevealSession::new(script(&["7"]));
        let first = s.start().unwrap();
        s.reveal_next(first);
        assert!(s.consensus().is_some());

        let second = s.start().unwrap();
        assert!(s.revealed().is_empty());
        assert!(s.consensus().is_none());
        assert!(s.reveal_next(first).is_none(), "stale epoch must be rejected");
        assert!(s.reveal_next(second).is_some());
    }

    #[test]
    fn cancel_stops_without_publishing() {
        let mut s = RevealSession::new(script(&["1", "1"]));
        let epoch = s.start().unwrap();
        s.reveal_next(epoch);
        s.cancel();

        assert_eq!(s.phase(), RevealPhase::Idle);
        assert!(s.reveal_next(epoch).is_none());
        assert!(s.consensus().is_none());
    }

    #[test]
    fn empty_script_never_samples() {
        let mut s = RevealSession::new(Vec::new());
        assert!(s.start().is_none());
        assert_eq!(s.phase(), RevealPhase::Idle);
    }

    #[test]
    fn tie_goes_to_first_seen_answer() {
        let c = consensus(["b", "a", "a", "b"]).unwrap();
        assert_eq!(c.answer, "b");
        assert_eq!(c.votes, 2);
        assert_eq!(c.total, 4);
        assert!(consensus(std::iter::empty()).is_none());
    }
}
