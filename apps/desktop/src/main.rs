mod backend_bridge;
mod config;
mod controller;
mod ui;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver, Sender};
use shared::domain::{Decision, RequestId, Role, UserId};
use tracing_subscriber::EnvFilter;

use crate::{
    backend_bridge::{commands::BackendCommand, runtime},
    config::{load_settings, Settings},
    controller::{events::UiEvent, orchestration::dispatch_backend_command},
    ui::{
        input::{parse_line, InputAction},
        render,
    },
};

const COMMAND_QUEUE_CAPACITY: usize = 64;
const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "mentorship",
    about = "Manage mentor/learner relationships from the terminal"
)]
struct Args {
    /// TOML settings file; defaults to ./mentorship.toml or the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    user_id: Option<i64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current relationships.
    List,
    /// Search learners by name or username (mentors).
    Search { query: String },
    /// Send a mentorship request to a learner (mentors).
    Request { user_id: i64 },
    /// Accept or reject an incoming request (learners).
    Respond {
        request_id: i64,
        decision: Decision,
    },
    /// Read commands from stdin until `quit`.
    Interactive,
}

impl Args {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(url) = &self.server_url {
            settings.server_url = url.clone();
        }
        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        if let Some(role) = self.role {
            settings.role = Some(role);
        }
        if let Some(user_id) = self.user_id {
            settings.user_id = Some(user_id);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.request_timeout_ms = timeout_ms;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    args.apply_overrides(&mut settings);

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(COMMAND_QUEUE_CAPACITY);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(EVENT_QUEUE_CAPACITY);
    let worker = runtime::launch(settings, cmd_rx, ui_tx);

    let result = match args.command.unwrap_or(Command::Interactive) {
        Command::Interactive => run_interactive(cmd_tx, ui_rx),
        command => run_once(cmd_tx, ui_rx, one_shot_command(command)),
    };

    if worker.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    result
}

fn one_shot_command(command: Command) -> Option<BackendCommand> {
    match command {
        Command::List | Command::Interactive => None,
        Command::Search { query } => Some(BackendCommand::Search { query }),
        Command::Request { user_id } => Some(BackendCommand::SendRequest {
            user_id: UserId(user_id),
        }),
        Command::Respond {
            request_id,
            decision,
        } => Some(BackendCommand::Respond {
            request_id: RequestId(request_id),
            decision,
        }),
    }
}

/// Mounts the view, runs at most one command, and prints the final view.
fn run_once(
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    command: Option<BackendCommand>,
) -> Result<()> {
    dispatch_backend_command(&cmd_tx, BackendCommand::Mount).map_err(|err| anyhow!("{err}"))?;
    if let Some(command) = command {
        dispatch_backend_command(&cmd_tx, command).map_err(|err| anyhow!("{err}"))?;
    }
    drop(cmd_tx);

    let mut last_view = None;
    let mut failure = None;
    for event in ui_rx.iter() {
        match event {
            UiEvent::ViewUpdated(model) => last_view = Some(model),
            UiEvent::Info(_) => println!("{}", render::render_event(&event)),
            UiEvent::Error(err) => {
                eprintln!("{}", render::render_error(&err));
                failure = Some(err);
            }
        }
    }

    if let Some(model) = last_view {
        println!("{}", render::render_view(&model));
    }
    match failure {
        Some(err) => Err(anyhow!("{err}")),
        None => Ok(()),
    }
}

fn run_interactive(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Result<()> {
    let printer = thread::spawn(move || {
        for event in ui_rx.iter() {
            let text = render::render_event(&event);
            match event {
                UiEvent::Error(_) => eprintln!("{text}"),
                _ => println!("{text}"),
            }
        }
    });

    println!("{}", render::HELP);
    if let Err(err) = dispatch_backend_command(&cmd_tx, BackendCommand::Mount) {
        eprintln!("{}", render::render_error(&err));
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_line(&line) {
            Ok(InputAction::Quit) => break,
            Ok(InputAction::Help) => println!("{}", render::HELP),
            Ok(InputAction::Nothing) => {}
            Ok(InputAction::Command(cmd)) => {
                if let Err(err) = dispatch_backend_command(&cmd_tx, cmd) {
                    eprintln!("{}", render::render_error(&err));
                }
            }
            Err(err) => eprintln!("{}", render::render_error(&err)),
        }
        io::stdout().flush()?;
    }

    drop(cmd_tx);
    if printer.join().is_err() {
        tracing::error!("event printer panicked");
    }
    Ok(())
}
