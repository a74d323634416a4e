use crate::stats::{EpisodeEnd, EpisodeStats};
use serde::{Deserialize, Serialize};

pub const STEP_COST: i32 = -1;
pub const GOAL_BONUS: i32 = 10;
pub const PIT_PENALTY: i32 = -10;

const HISTORY_CAP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAction {
    Up,
    Right,
    Down,
    Left,
}

impl GridAction {
    pub fn from_action_str(action: &str) -> Option<Self> {
        match action {
            "up" => Some(GridAction::Up),
            "right" => Some(GridAction::Right),
            "down" => Some(GridAction::Down),
            "left" => Some(GridAction::Left),
            _ => None,
        }
    }

    /// Only the four unit vectors are moves; diagonals and `(0, 0)` are not.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(GridAction::Up),
            (1, 0) => Some(GridAction::Right),
            (0, 1) => Some(GridAction::Down),
            (-1, 0) => Some(GridAction::Left),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GridAction::Up => "up",
            GridAction::Right => "right",
            GridAction::Down => "down",
            GridAction::Left => "left",
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            GridAction::Up => (0, -1),
            GridAction::Right => (1, 0),
            GridAction::Down => (0, 1),
            GridAction::Left => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridEvent {
    #[default]
    None,
    Moved,
    HitWall,
    ReachedGoal,
    FellInPit,
    /// The episode is over; the move was not applied.
    Ignored,
}

impl GridEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            GridEvent::None => "none",
            GridEvent::Moved => "moved",
            GridEvent::HitWall => "hit_wall",
            GridEvent::ReachedGoal => "reached_goal",
            GridEvent::FellInPit => "fell_in_pit",
            GridEvent::Ignored => "ignored",
        }
    }

    /// Notice shown under the grid.
    pub fn message(self) -> &'static str {
        match self {
            GridEvent::None => "Use the arrows to move the agent.",
            GridEvent::Moved => "Moved. Step cost -1.",
            GridEvent::HitWall => "Hit a wall! The agent stays put.",
            GridEvent::ReachedGoal => "Reached the goal! +10",
            GridEvent::FellInPit => "Fell into the pit! -10",
            GridEvent::Ignored => "Episode over. Reset to play again.",
        }
    }
}

/// Fixed cells of a grid world. Nothing here changes during or across episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub size: u32,
    pub start: Cell,
    pub goal: Cell,
    pub pit: Cell,
    pub wall: Cell,
}

impl GridLayout {
    fn clamp_axis(&self, v: u32, d: i32) -> u32 {
        let max = self.size.saturating_sub(1) as i64;
        (v as i64 + d as i64).clamp(0, max) as u32
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.size && cell.y < self.size
    }
}

/// One committed (or wall-blocked) step, as an RL transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Cell,
    pub action: GridAction,
    pub reward: i32,
    pub to: Cell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub event: GridEvent,
    pub step_reward: i32,
    pub position: Cell,
    pub cumulative_reward: i32,
    pub is_terminal: bool,
}

#[derive(Debug, Clone)]
pub struct GridWorld {
    layout: GridLayout,
    agent: Cell,
    cumulative_reward: i32,
    is_terminal: bool,
    steps_in_episode: u32,
    last_event: GridEvent,
    history: Vec<Transition>,
    pub stats: EpisodeStats,
}

impl GridWorld {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            agent: layout.start,
            cumulative_reward: 0,
            is_terminal: false,
            steps_in_episode: 0,
            last_event: GridEvent::None,
            history: Vec::new(),
            stats: EpisodeStats::new(),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn agent(&self) -> Cell {
        self.agent
    }

    pub fn cumulative_reward(&self) -> i32 {
        self.cumulative_reward
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub fn steps_in_episode(&self) -> u32 {
        self.steps_in_episode
    }

    pub fn last_event(&self) -> GridEvent {
        self.last_event
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Move by a raw `(dx, dy)`. Anything but a unit step is refused and
    /// leaves the world untouched.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> Option<StepOutcome> {
        GridAction::from_delta(dx, dy).map(|a| self.step(a))
    }

    pub fn step(&mut self, action: GridAction) -> StepOutcome {
        if self.is_terminal {
            return self.outcome(GridEvent::Ignored, 0);
        }

        let (dx, dy) = action.delta();
        let candidate = Cell::new(
            self.layout.clamp_axis(self.agent.x, dx),
            self.layout.clamp_axis(self.agent.y, dy),
        );

        // Wall check happens before any reward accounting.
        if candidate == self.layout.wall {
            self.last_event = GridEvent::HitWall;
            self.push_history(Transition {
                from: self.agent,
                action,
                reward: 0,
                to: self.agent,
            });
            return self.outcome(GridEvent::HitWall, 0);
        }

        let from = self.agent;
        self.agent = candidate;
        self.steps_in_episode += 1;

        let mut reward = STEP_COST;
        let event = if candidate == self.layout.goal {
            reward += GOAL_BONUS;
            self.is_terminal = true;
            GridEvent::ReachedGoal
        } else if candidate == self.layout.pit {
            reward += PIT_PENALTY;
            self.is_terminal = true;
            GridEvent::FellInPit
        } else {
            GridEvent::Moved
        };

        self.cumulative_reward += reward;
        self.last_event = event;
        self.push_history(Transition {
            from,
            action,
            reward,
            to: candidate,
        });

        match event {
            GridEvent::ReachedGoal => self
                .stats
                .record_episode(EpisodeEnd::Goal, self.cumulative_reward),
            GridEvent::FellInPit => self
                .stats
                .record_episode(EpisodeEnd::Pit, self.cumulative_reward),
            _ => {}
        }

        self.outcome(event, reward)
    }

    /// Back to the start of a fresh episode. Layout and stats are kept.
    pub fn reset(&mut self) {
        self.agent = self.layout.start;
        self.cumulative_reward = 0;
        self.is_terminal = false;
        self.steps_in_episode = 0;
        self.last_event = GridEvent::None;
        self.history.clear();
    }

    pub fn render_rows(&self) -> Vec<String> {
        let l = &self.layout;
        (0..l.size)
            .map(|y| {
                (0..l.size)
                    .map(|x| {
                        let c = Cell::new(x, y);
                        if c == self.agent {
                            'A'
                        } else if c == l.goal {
                            'G'
                        } else if c == l.pit {
                            'P'
                        } else if c == l.wall {
                            '#'
                        } else {
                            '.'
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn outcome(&self, event: GridEvent, step_reward: i32) -> StepOutcome {
        StepOutcome {
            event,
            step_reward,
            position: self.agent,
            cumulative_reward: self.cumulative_reward,
            is_terminal: self.is_terminal,
        }
    }

    fn push_history(&mut self, t: Transition) {
        self.history.push(t);
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GridAction::*;

    fn layout() -> GridLayout {
        GridLayout {
            size: 4,
            start: Cell::new(0, 0),
            goal: Cell::new(3, 2),
            pit: Cell::new(1, 2),
            wall: Cell::new(2, 1),
        }
    }

    #[test]
    fn direct_path_to_goal_scores_five() {
        let mut g = GridWorld::new(layout());
        for a in [Right, Right, Right, Down] {
            let out = g.step(a);
            assert_eq!(out.event, GridEvent::Moved);
            assert_eq!(out.step_reward, -1);
        }
        let last = g.step(Down);
        assert_eq!(last.event, GridEvent::ReachedGoal);
        assert_eq!(last.step_reward, 9);
        assert_eq!(g.cumulative_reward(), 5);
        assert!(g.is_terminal());
        assert_eq!(g.stats.goals, 1);
        assert_eq!(g.stats.best_return, Some(5));
    }

    #[test]
    fn wall_is_reward_neutral() {
        let mut reference = GridWorld::new(layout());
        let mut g = GridWorld::new(layout());
        for w in [&mut reference, &mut g] {
            w.step(Right);
            w.step(Right);
        }

        let blocked = g.step(Down);
        assert_eq!(blocked.event, GridEvent::HitWall);
        assert_eq!(blocked.step_reward, 0);
        assert_eq!(g.agent(), Cell::new(2, 0));
        assert_eq!(g.cumulative_reward(), -2);
        assert_eq!(GridEvent::HitWall.message(), "Hit a wall! The agent stays put.");

        assert_eq!(g.step(Right), reference.step(Right));
        assert_eq!(g.agent(), reference.agent());
        assert_eq!(g.cumulative_reward(), reference.cumulative_reward());
    }

    #[test]
    fn boundary_is_clamped_but_still_costs_a_step() {
        let mut g = GridWorld::new(layout());
        for i in 1..=6 {
            let out = g.step(Up);
            assert_eq!(out.event, GridEvent::Moved);
            assert_eq!(g.agent(), Cell::new(0, 0));
            assert_eq!(g.cumulative_reward(), -i);
        }
    }

    #[test]
    fn pit_ends_the_episode() {
        let mut g = GridWorld::new(layout());
        g.step(Down);
        g.step(Down);
        let out = g.step(Right);
        assert_eq!(out.event, GridEvent::FellInPit);
        assert_eq!(out.step_reward, -11);
        assert_eq!(g.cumulative_reward(), -13);
        assert_eq!(g.stats.pits, 1);
    }

    #[test]
    fn terminal_state_locks_moves_until_reset() {
        let mut g = GridWorld::new(layout());
        g.step(Down);
        g.step(Down);
        g.step(Right);
        assert!(g.is_terminal());

        let pos = g.agent();
        let total = g.cumulative_reward();
        for a in [Up, Left, Right, Down] {
            let out = g.step(a);
            assert_eq!(out.event, GridEvent::Ignored);
            assert_eq!(g.agent(), pos);
            assert_eq!(g.cumulative_reward(), total);
        }

        g.reset();
        assert!(!g.is_terminal());
        assert_eq!(g.agent(), Cell::new(0, 0));
        assert_eq!(g.cumulative_reward(), 0);
        assert_eq!(g.layout(), &layout());
        assert_eq!(g.stats.episodes, 1);
        assert_eq!(g.step(Right).event, GridEvent::Moved);
    }

    #[test]
    fn non_unit_deltas_are_rejected() {
        let mut g = GridWorld::new(layout());
        assert!(g.try_move(1, 1).is_none());
        assert!(g.try_move(0, 0).is_none());
        assert!(g.try_move(2, 0).is_none());
        assert_eq!(g.agent(), Cell::new(0, 0));
        assert_eq!(g.cumulative_reward(), 0);

        let out = g.try_move(1, 0).unwrap();
        assert_eq!(out.position, Cell::new(1, 0));
    }

    #[test]
    fn history_records_transitions() {
        let mut g = GridWorld::new(layout());
        g.step(Right);
        g.step(Right);
        g.step(Down);
        let h = g.history();
        assert_eq!(h.len(), 3);
        assert_eq!(h[0].from, Cell::new(0, 0));
        assert_eq!(h[0].to, Cell::new(1, 0));
        assert_eq!(h[2].reward, 0);
        assert_eq!(h[2].to, h[2].from);

        g.reset();
        assert!(g.history().is_empty());
    }

    #[test]
    fn renders_layout() {
        let g = GridWorld::new(layout());
        assert_eq!(g.render_rows(), ["A...", "..#.", ".P.G", "...."]);
    }
}
