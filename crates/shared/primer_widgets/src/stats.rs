use serde::{Deserialize, Serialize};

const RECENT_WINDOW: usize = 50;

/// How a grid-world episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEnd {
    Goal,
    Pit,
}

/// Running tally across grid-world episodes. Survives `reset()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episodes: u32,
    pub goals: u32,
    pub pits: u32,
    pub best_return: Option<i32>,
    pub last_return: Option<i32>,
    pub recent: Vec<bool>,
}

impl EpisodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, end: EpisodeEnd, episode_return: i32) {
        self.episodes += 1;
        match end {
            EpisodeEnd::Goal => self.goals += 1,
            EpisodeEnd::Pit => self.pits += 1,
        }

        self.last_return = Some(episode_return);
        self.best_return = Some(match self.best_return {
            Some(best) => best.max(episode_return),
            None => episode_return,
        });

        self.recent.push(end == EpisodeEnd::Goal);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.remove(0);
        }
    }

    /// Share of finished episodes that reached the goal (0.0 before any).
    pub fn success_rate(&self) -> f32 {
        if self.episodes == 0 {
            0.0
        } else {
            self.goals as f32 / self.episodes as f32
        }
    }

    pub fn recent_rate(&self) -> f32 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let hits = self.recent.iter().filter(|&&x| x).count();
        hits as f32 / self.recent.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_outcomes_and_best_return() {
        let mut s = EpisodeStats::new();
        assert_eq!(s.success_rate(), 0.0);

        s.record_episode(EpisodeEnd::Pit, -13);
        s.record_episode(EpisodeEnd::Goal, 5);
        s.record_episode(EpisodeEnd::Goal, 3);

        assert_eq!((s.episodes, s.goals, s.pits), (3, 2, 1));
        assert_eq!(s.best_return, Some(5));
        assert_eq!(s.last_return, Some(3));
        assert!((s.success_rate() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn recent_window_is_bounded() {
        let mut s = EpisodeStats::new();
        for _ in 0..RECENT_WINDOW {
            s.record_episode(EpisodeEnd::Pit, -11);
        }
        s.record_episode(EpisodeEnd::Goal, 9);
        assert_eq!(s.recent.len(), RECENT_WINDOW);
        assert!((s.recent_rate() - 1.0 / RECENT_WINDOW as f32).abs() < 1e-6);
    }
}
