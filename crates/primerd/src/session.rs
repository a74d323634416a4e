//! Per-client widget session.
//!
//! The widgets themselves are synchronous state machines from
//! `primer_widgets`; this module adds the two timers (reveal and typewriter)
//! and turns requests into replies.

use crate::config::Timing;
use crate::error::DaemonError;
use crate::protocol::{
    GridSnapshot, RevealSnapshot, Request, Response, SessionSnapshot, TreeSnapshot,
    TypewriterSnapshot,
};
use crate::timers::TimerSlot;
use primer_widgets::grid_world::{GridAction, GridWorld};
use primer_widgets::reveal::RevealSession;
use primer_widgets::schedule::Epoch;
use primer_widgets::scripted::{self, CotMode};
use primer_widgets::thought_tree::TreeView;
use primer_widgets::typewriter::{TypewriterSession, TypewriterTick};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Channel for messages pushed to the client outside request/reply.
pub type EventSink = mpsc::UnboundedSender<Response>;

/// All widget state of one session.
#[derive(Debug)]
pub struct Widgets {
    pub reveal: RevealSession,
    pub typewriter: TypewriterSession,
    pub cot_mode: Option<CotMode>,
    pub tree: TreeView,
    pub grid: GridWorld,
}

impl Widgets {
    pub fn from_scripts() -> Result<Self, DaemonError> {
        Ok(Self {
            reveal: RevealSession::new(scripted::self_consistency_paths()),
            typewriter: TypewriterSession::new(),
            cot_mode: None,
            tree: TreeView::new(scripted::game_of_24_tree()?),
            grid: GridWorld::new(scripted::rl_loop_layout()),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            reveal: self.reveal_snapshot(),
            typewriter: self.typewriter_snapshot(),
            tree: self.tree_snapshot(),
            grid: self.grid_snapshot(),
        }
    }

    pub fn reveal_snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            phase: self.reveal.phase(),
            question: scripted::SELF_CONSISTENCY_QUESTION.to_string(),
            revealed: self.reveal.revealed().to_vec(),
            total: self.reveal.script().len(),
            consensus: self.reveal.consensus().map(|c| c.to_string()),
        }
    }

    pub fn typewriter_snapshot(&self) -> TypewriterSnapshot {
        TypewriterSnapshot {
            phase: self.typewriter.phase(),
            mode: self.cot_mode,
            visible: self.typewriter.visible_text().to_string(),
            revealed_length: self.typewriter.revealed_length(),
            total_length: self.typewriter.target_len(),
            is_active: self.typewriter.is_active(),
        }
    }

    pub fn tree_snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            rows: self.tree.visible_rows(),
            counts: self.tree.status_counts(),
            solution_path: self.tree.tree().solution_path(),
        }
    }

    pub fn grid_snapshot(&self) -> GridSnapshot {
        let layout = self.grid.layout();
        GridSnapshot {
            size: layout.size,
            agent: self.grid.agent(),
            goal: layout.goal,
            pit: layout.pit,
            wall: layout.wall,
            cumulative_reward: self.grid.cumulative_reward(),
            is_terminal: self.grid.is_terminal(),
            steps_in_episode: self.grid.steps_in_episode(),
            last_event: self.grid.last_event(),
            notice: self.grid.last_event().message().to_string(),
            rows: self.grid.render_rows(),
            stats: self.grid.stats.clone(),
        }
    }
}

pub struct WidgetSession {
    widgets: Arc<Mutex<Widgets>>,
    events: EventSink,
    timing: Timing,
    reveal_timer: TimerSlot,
    typewriter_timer: TimerSlot,
}

impl WidgetSession {
    pub fn new(timing: Timing, events: EventSink) -> Result<Self, DaemonError> {
        Ok(Self {
            widgets: Arc::new(Mutex::new(Widgets::from_scripts()?)),
            events,
            timing,
            reveal_timer: TimerSlot::new("reveal"),
            typewriter_timer: TimerSlot::new("typewriter"),
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.widgets.lock().await.snapshot()
    }

    pub async fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::GetState => Response::State(Box::new(self.snapshot().await)),
            Request::RevealStart => self.start_reveal().await,
            Request::TypewriterSelect { mode } => match CotMode::from_param(&mode) {
                Some(m) => self.start_typing(Some(m), m.target_text().to_string()).await,
                None => Response::Error {
                    message: format!("Unknown typewriter mode: {} (expected standard|cot)", mode),
                },
            },
            Request::TypewriterSetTarget { text } => self.start_typing(None, text).await,
            Request::TreeToggle { id } => {
                let mut w = self.widgets.lock().await;
                if !w.tree.toggle(&id) {
                    debug!("Tree toggle ignored for {:?} (leaf or unknown)", id);
                }
                Response::Tree(w.tree_snapshot())
            }
            Request::TreeCollapse => {
                let mut w = self.widgets.lock().await;
                w.tree.collapse_all();
                Response::Tree(w.tree_snapshot())
            }
            Request::GridMove { dx, dy } => {
                let mut w = self.widgets.lock().await;
                match w.grid.try_move(dx, dy) {
                    Some(_) => Response::Grid(Box::new(w.grid_snapshot())),
                    None => Response::Error {
                        message: format!(
                            "Invalid move ({}, {}): only single up/down/left/right steps",
                            dx, dy
                        ),
                    },
                }
            }
            Request::GridAction { action } => match GridAction::from_action_str(&action) {
                Some(a) => {
                    let mut w = self.widgets.lock().await;
                    w.grid.step(a);
                    Response::Grid(Box::new(w.grid_snapshot()))
                }
                None => Response::Error {
                    message: format!("Unknown action: {} (expected up|down|left|right)", action),
                },
            },
            Request::GridReset => {
                let mut w = self.widgets.lock().await;
                w.grid.reset();
                Response::Grid(Box::new(w.grid_snapshot()))
            }
            Request::Remount => self.remount().await,
        }
    }

    async fn start_reveal(&mut self) -> Response {
        let epoch = {
            let mut w = self.widgets.lock().await;
            match w.reveal.start() {
                Some(epoch) => epoch,
                None if w.reveal.is_sampling() => {
                    return Response::Success {
                        message: "Sampling already in progress".to_string(),
                    };
                }
                None => {
                    return Response::Error {
                        message: "No reasoning paths to sample".to_string(),
                    };
                }
            }
        };

        let widgets = Arc::clone(&self.widgets);
        let events = self.events.clone();
        let delay = self.timing.reveal_delay;
        self.reveal_timer
            .replace(move |cancel| run_reveal(widgets, events, epoch, delay, cancel));
        info!(epoch = epoch.get(), "Self-consistency sampling started");

        Response::Success {
            message: "Sampling started".to_string(),
        }
    }

    async fn start_typing(&mut self, mode: Option<CotMode>, text: String) -> Response {
        // Cancel first: a tick already waiting on the lock must find its token
        // cancelled once it gets in.
        if self.typewriter_timer.is_running() {
            debug!("Superseding running typewriter");
        }
        self.typewriter_timer.cancel();

        let (epoch, frame) = {
            let mut w = self.widgets.lock().await;
            w.cot_mode = mode;
            let epoch = w.typewriter.set_target(text);
            (epoch, w.typewriter_snapshot())
        };

        if frame.is_active {
            debug!(epoch = epoch.get(), chars = frame.total_length, "Typewriter started");
            let widgets = Arc::clone(&self.widgets);
            let events = self.events.clone();
            let tick = self.timing.typewriter_tick;
            self.typewriter_timer
                .replace(move |cancel| run_typewriter(widgets, events, epoch, tick, cancel));
        }

        Response::TypewriterFrame(frame)
    }

    async fn remount(&mut self) -> Response {
        self.cancel_timers().await;
        match Widgets::from_scripts() {
            Ok(fresh) => {
                *self.widgets.lock().await = fresh;
                info!("Widgets remounted");
                Response::Success {
                    message: "Widgets remounted".to_string(),
                }
            }
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    /// Stop both timers and bring the timed widgets to rest, so a snapshot
    /// taken afterwards never reports a run that nothing is driving.
    pub async fn cancel_timers(&mut self) {
        self.reveal_timer.cancel();
        self.typewriter_timer.cancel();

        let mut w = self.widgets.lock().await;
        w.reveal.cancel();
        if w.typewriter.is_active() {
            w.typewriter.halt();
        }
    }
}

async fn run_reveal(
    widgets: Arc<Mutex<Widgets>>,
    events: EventSink,
    epoch: Epoch,
    delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = time::sleep(delay) => {}
        }

        let mut w = widgets.lock().await;
        if cancel.is_cancelled() {
            return;
        }
        let Some(step) = w.reveal.reveal_next(epoch) else {
            return;
        };

        let event = w.reveal.script()[step.index].clone();
        let progress = Response::RevealProgress {
            index: step.index,
            total: step.total,
            event,
        };
        if events.send(progress).is_err() {
            return;
        }

        if let Some(c) = step.consensus {
            info!("Self-consistency consensus: {}", c);
            let _ = events.send(Response::RevealConsensus {
                summary: c.to_string(),
                answer: c.answer,
                votes: c.votes,
                total: c.total,
                correct_paths: w.reveal.correct_count(),
            });
            return;
        }
    }
}

async fn run_typewriter(
    widgets: Arc<Mutex<Widgets>>,
    events: EventSink,
    epoch: Epoch,
    tick: Duration,
    cancel: CancellationToken,
) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        let mut w = widgets.lock().await;
        if cancel.is_cancelled() {
            return;
        }
        let done = match w.typewriter.tick(epoch) {
            TypewriterTick::Stale => return,
            TypewriterTick::Typed => false,
            TypewriterTick::Done => true,
        };
        if events.send(Response::TypewriterFrame(w.typewriter_snapshot())).is_err() || done {
            return;
        }
    }
}
