// ═══════════════════════════════════════════════════════════════════════════
// Protocol Messages
// ═══════════════════════════════════════════════════════════════════════════
//
// One JSON object per line, tagged on "type". Replies to a request come back
// in order; timer-driven messages (`RevealProgress`, `RevealConsensus`,
// `TypewriterFrame`) are pushed unsolicited on the same connection.

use primer_widgets::grid_world::{Cell, GridEvent};
use primer_widgets::reveal::{RevealEvent, RevealPhase};
use primer_widgets::scripted::CotMode;
use primer_widgets::stats::EpisodeStats;
use primer_widgets::thought_tree::{StatusCounts, VisibleRow};
use primer_widgets::typewriter::TypewriterPhase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    GetState,

    // Self-consistency
    RevealStart,

    // Chain-of-thought typewriter
    TypewriterSelect {
        mode: String,
    },
    TypewriterSetTarget {
        text: String,
    },

    // Tree of thoughts
    TreeToggle {
        id: String,
    },
    /// Fold the tree back to its initial root-only view.
    TreeCollapse,

    // Grid-world RL loop
    GridMove {
        dx: i32,
        dy: i32,
    },
    GridAction {
        action: String,
    },
    GridReset,

    /// Cancel every timer and rebuild all widgets from their scripts.
    Remount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(clippy::large_enum_variant)]
pub enum Response {
    State(Box<SessionSnapshot>),
    RevealProgress {
        index: usize,
        total: usize,
        event: RevealEvent,
    },
    RevealConsensus {
        /// `"<answer> (<votes>/<total> votes)"`
        summary: String,
        answer: String,
        votes: usize,
        total: usize,
        #[serde(default)]
        correct_paths: usize,
    },
    TypewriterFrame(TypewriterSnapshot),
    Tree(TreeSnapshot),
    Grid(Box<GridSnapshot>),
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub reveal: RevealSnapshot,
    pub typewriter: TypewriterSnapshot,
    pub tree: TreeSnapshot,
    pub grid: GridSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealSnapshot {
    pub phase: RevealPhase,
    pub question: String,
    pub revealed: Vec<RevealEvent>,
    pub total: usize,
    #[serde(default)]
    pub consensus: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypewriterSnapshot {
    pub phase: TypewriterPhase,
    #[serde(default)]
    pub mode: Option<CotMode>,
    pub visible: String,
    pub revealed_length: usize,
    pub total_length: usize,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub rows: Vec<VisibleRow>,
    pub counts: StatusCounts,
    #[serde(default)]
    pub solution_path: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub size: u32,
    pub agent: Cell,
    pub goal: Cell,
    pub pit: Cell,
    pub wall: Cell,
    pub cumulative_reward: i32,
    pub is_terminal: bool,
    pub steps_in_episode: u32,
    pub last_event: GridEvent,
    pub notice: String,
    pub rows: Vec<String>,
    #[serde(default)]
    pub stats: EpisodeStats,
}
