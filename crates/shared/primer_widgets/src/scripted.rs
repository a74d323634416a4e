//! Author-supplied demo data for the explainer widgets.

use crate::grid_world::{Cell, GridLayout};
use crate::reveal::RevealEvent;
use crate::thought_tree::{NodeStatus, ThoughtNode, ThoughtTree, TreeError};
use serde::{Deserialize, Serialize};

pub const SELF_CONSISTENCY_QUESTION: &str =
    "A bakery packs 7 cupcakes in each box and sells 6 boxes. How many cupcakes did it sell?";

pub fn self_consistency_paths() -> Vec<RevealEvent> {
    let paths: [(&str, &str, bool); 5] = [
        ("6 boxes x 7 cupcakes = 42.", "42", true),
        (
            "6 x 7 = 42, but 2 were samples, so 42 - 2 = 40.",
            "40",
            false,
        ),
        ("7 + 7 + 7 + 7 + 7 + 7 = 42.", "42", true),
        ("Each box holds 7, six boxes hold 6 x 7 = 42.", "42", true),
        ("6 boxes and 6 more cupcakes: 6 + 6 = 12.", "12", false),
    ];
    paths
        .iter()
        .enumerate()
        .map(|(i, (text, answer, ok))| RevealEvent {
            id: i as u32 + 1,
            text: text.to_string(),
            derived_answer: answer.to_string(),
            is_correct: *ok,
        })
        .collect()
}

/// Tree-of-thoughts search for the Game of 24 on `4 9 10 13`.
pub fn game_of_24_tree() -> Result<ThoughtTree, TreeError> {
    use NodeStatus::*;
    ThoughtTree::new(
        "root",
        vec![
            ThoughtNode::new("root", "Input: 4 9 10 13", Active, &["a", "b", "c"]),
            ThoughtNode::new("a", "13 - 9 = 4 (left: 4 4 10)", Promising, &["a1", "a2"]),
            ThoughtNode::new("a1", "10 - 4 = 6 (left: 4 6)", Promising, &["a1s"]),
            ThoughtNode::new("a1s", "4 * 6 = 24", Solved, &[]),
            ThoughtNode::new("a2", "4 + 4 = 8 (left: 8 10)", Pruned, &[]),
            ThoughtNode::new("b", "4 + 9 = 13 (left: 10 13 13)", Pruned, &[]),
            ThoughtNode::new("c", "10 - 4 = 6 (left: 6 9 13)", Promising, &["c1", "c2"]),
            ThoughtNode::new("c1", "13 - 9 = 4 (left: 4 6)", Promising, &["c1s"]),
            ThoughtNode::new("c1s", "6 * 4 = 24", Solved, &[]),
            ThoughtNode::new("c2", "9 + 6 = 15 (left: 13 15)", Pruned, &[]),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CotMode {
    #[default]
    Standard,
    ChainOfThought,
}

impl CotMode {
    pub fn from_param(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "standard" | "direct" => Some(CotMode::Standard),
            "cot" | "chain_of_thought" | "chain-of-thought" => Some(CotMode::ChainOfThought),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CotMode::Standard => "standard",
            CotMode::ChainOfThought => "cot",
        }
    }

    pub fn target_text(self) -> &'static str {
        match self {
            CotMode::Standard => {
                "Q: Roger has 5 tennis balls. He buys 2 more cans of tennis balls. \
                 Each can has 3 tennis balls. How many tennis balls does he have now?\n\
                 A: The answer is 11."
            }
            CotMode::ChainOfThought => {
                "Q: Roger has 5 tennis balls. He buys 2 more cans of tennis balls. \
                 Each can has 3 tennis balls. How many tennis balls does he have now?\n\
                 A: Roger started with 5 balls. 2 cans of 3 tennis balls each is 6 \
                 tennis balls. 5 + 6 = 11. The answer is 11."
            }
        }
    }
}

pub fn rl_loop_layout() -> GridLayout {
    GridLayout {
        size: 4,
        start: Cell::new(0, 0),
        goal: Cell::new(3, 2),
        pit: Cell::new(1, 2),
        wall: Cell::new(2, 1),
    }
}
