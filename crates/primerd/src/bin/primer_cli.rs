//! CLI client for the `primerd` daemon.
//!
//! Examples:
//!   primer-cli status
//!   primer-cli reveal
//!   primer-cli type cot
//!   primer-cli type text "Let's think step by step."
//!   primer-cli tree toggle a a1
//!   primer-cli tree collapse
//!   primer-cli grid down down right right right
//!
//! Widget state lives in the connection, so every command opens one session
//! and runs all of its steps on it. By default it talks to 127.0.0.1:9877;
//! override with `--addr host:port`.

use primer_widgets::thought_tree::render_rows;
use primerd::protocol::{GridSnapshot, Request, Response, SessionSnapshot, TreeSnapshot};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

fn usage() -> ! {
    eprintln!("primer-cli (talks to primerd @ 127.0.0.1:9877 by default)");
    eprintln!("Usage: primer-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  status                        Show every widget's state");
    eprintln!("  reveal                        Stream the self-consistency vote");
    eprintln!("  type <standard|cot>           Typewrite a scripted answer");
    eprintln!("  type text <words...>          Typewrite arbitrary text");
    eprintln!("  tree [toggle <id>...]         Show (and expand/collapse) the thought tree");
    eprintln!("  tree collapse                 Fold the tree back to the root's children");
    eprintln!("  grid [up|down|left|right|reset]...  Step the grid-world agent");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = "127.0.0.1:9877".to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(addr: &str) -> Result<Self, String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .map_err(|e| format!("set_read_timeout: {e}"))?;
        let reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);
        Ok(Self { stream, reader })
    }

    fn send(&mut self, req: &Request) -> Result<(), String> {
        let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
        self.stream
            .write_all(line.as_bytes())
            .and_then(|_| self.stream.write_all(b"\n"))
            .map_err(|e| format!("send: {e}"))
    }

    /// Next message from the daemon, reply or push.
    fn recv(&mut self) -> Result<Response, String> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| format!("recv: {e}"))?;
        if n == 0 {
            return Err("recv: connection closed".to_string());
        }
        serde_json::from_str(&line).map_err(|e| format!("parse response: {e}"))
    }

    fn request(&mut self, req: &Request) -> Result<Response, String> {
        self.send(req)?;
        self.recv()
    }
}

fn print_grid(g: &GridSnapshot) {
    for row in &g.rows {
        println!("  {}", row);
    }
    println!(
        "agent=({}, {}) reward={} steps={} terminal={} episodes={} goals={} pits={} success={:.1}%",
        g.agent.x,
        g.agent.y,
        g.cumulative_reward,
        g.steps_in_episode,
        g.is_terminal,
        g.stats.episodes,
        g.stats.goals,
        g.stats.pits,
        g.stats.success_rate() * 100.0,
    );
}

fn print_tree(t: &TreeSnapshot) {
    for line in render_rows(&t.rows) {
        println!("{}", line);
    }
    println!(
        "nodes: active={} promising={} pruned={} solved={}",
        t.counts.active, t.counts.promising, t.counts.pruned, t.counts.solved
    );
    if let Some(path) = &t.solution_path {
        println!("solution path: {}", path.join(" > "));
    }
}

fn print_state(s: &SessionSnapshot) {
    println!(
        "reveal: phase={} revealed={}/{} consensus={}",
        s.reveal.phase.as_str(),
        s.reveal.revealed.len(),
        s.reveal.total,
        s.reveal.consensus.as_deref().unwrap_or("-"),
    );
    println!(
        "typewriter: mode={} active={} {}/{}",
        s.typewriter.mode.map(|m| m.name()).unwrap_or("-"),
        s.typewriter.is_active,
        s.typewriter.revealed_length,
        s.typewriter.total_length,
    );
    if !s.typewriter.visible.is_empty() {
        println!("  {}", s.typewriter.visible);
    }
    println!("tree:");
    print_tree(&s.tree);
    println!("grid:");
    print_grid(&s.grid);
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{}", msg);
    process::exit(1);
}

fn expect_ok(resp: Response) -> Response {
    match resp {
        Response::Error { message } => fail(format!("Error: {}", message)),
        other => other,
    }
}

fn run_reveal(client: &mut Client) -> Result<(), String> {
    if let Response::Success { message } = expect_ok(client.request(&Request::RevealStart)?) {
        println!("{}", message);
    }
    loop {
        match client.recv()? {
            Response::RevealProgress {
                index,
                total,
                event,
            } => {
                let mark = if event.is_correct { "ok" } else { "x" };
                println!(
                    "[{}/{}] {} -> {} ({})",
                    index + 1,
                    total,
                    event.text,
                    event.derived_answer,
                    mark
                );
            }
            Response::RevealConsensus {
                summary,
                correct_paths,
                total,
                ..
            } => {
                println!("Consensus: {} | correct paths {}/{}", summary, correct_paths, total);
                return Ok(());
            }
            Response::Error { message } => return Err(message),
            _ => {}
        }
    }
}

fn run_typewriter(client: &mut Client, req: Request) -> Result<(), String> {
    let Response::TypewriterFrame(mut frame) = expect_ok(client.request(&req)?) else {
        return Err("unexpected reply to typewriter request".to_string());
    };

    let mut printed = 0;
    let mut out = std::io::stdout();
    loop {
        let delta: String = frame.visible.chars().skip(printed).collect();
        printed = frame.revealed_length;
        let _ = out.write_all(delta.as_bytes());
        let _ = out.flush();
        if !frame.is_active {
            break;
        }
        frame = match client.recv()? {
            Response::TypewriterFrame(f) => f,
            Response::Error { message } => return Err(message),
            _ => continue,
        };
    }
    println!();
    Ok(())
}

fn current_state(client: &mut Client) -> Result<SessionSnapshot, String> {
    match expect_ok(client.request(&Request::GetState)?) {
        Response::State(s) => Ok(*s),
        _ => Err("unexpected reply to GetState".to_string()),
    }
}

fn run_tree(client: &mut Client, toggles: &[String]) -> Result<(), String> {
    let mut last = None;
    for id in toggles {
        if let Response::Tree(t) = expect_ok(client.request(&Request::TreeToggle { id: id.clone() })?)
        {
            last = Some(t);
        }
    }
    let tree = match last {
        Some(t) => t,
        None => current_state(client)?.tree,
    };
    print_tree(&tree);
    Ok(())
}

fn run_grid(client: &mut Client, steps: &[String]) -> Result<(), String> {
    let mut last = None;
    for step in steps {
        let req = match step.as_str() {
            "reset" => Request::GridReset,
            action => Request::GridAction {
                action: action.to_string(),
            },
        };
        if let Response::Grid(g) = expect_ok(client.request(&req)?) {
            println!("{:>5}: {}", step, g.notice);
            last = Some(*g);
        }
    }
    let grid = match last {
        Some(g) => g,
        None => current_state(client)?.grid,
    };
    print_grid(&grid);
    Ok(())
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = args[0].as_str();

    let mut client = match Client::connect(&addr) {
        Ok(c) => c,
        Err(e) => fail(format!("Error talking to primerd @ {}: {}", addr, e)),
    };

    let result = match cmd {
        "status" | "state" => current_state(&mut client).map(|s| print_state(&s)),
        "reveal" => run_reveal(&mut client),
        "type" => {
            let req = match args.get(1).map(String::as_str) {
                Some("text") if args.len() > 2 => Request::TypewriterSetTarget {
                    text: args[2..].join(" "),
                },
                Some(mode) if mode != "text" => Request::TypewriterSelect {
                    mode: mode.to_string(),
                },
                _ => usage(),
            };
            run_typewriter(&mut client, req)
        }
        "tree" => match args.get(1).map(String::as_str) {
            None => run_tree(&mut client, &[]),
            Some("toggle") if args.len() > 2 => run_tree(&mut client, &args[2..]),
            Some("collapse") => client.request(&Request::TreeCollapse).map(|resp| {
                if let Response::Tree(t) = expect_ok(resp) {
                    print_tree(&t);
                }
            }),
            _ => usage(),
        },
        "grid" => run_grid(&mut client, &args[1..]),
        _ => usage(),
    };

    if let Err(e) = result {
        fail(format!("Error talking to primerd @ {}: {}", addr, e));
    }
}
