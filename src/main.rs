mod app;
mod cli;
mod clipboard;
mod config;
mod dashboard;
mod error;
mod input;
mod message;
mod model;
mod navigator;
mod overlay;
mod process;
mod repo;
mod tasks;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::CliArgs;
use config::Preferences;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use message::{Command, Msg};
use process::TuiTerminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use repo::Repository;
use repo::cluster::KubeRepository;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config_path = config::discover_config_path(args.config.as_deref());
    let preferences = Preferences::load_or_default(config_path.as_deref());

    let repo = KubeRepository::connect()
        .await
        .map_err(|error| anyhow::anyhow!("{}", error.message()))
        .context("failed to connect to the cluster")?;
    info!(
        "connected to context {} ({}), default namespace {}",
        repo.context(),
        repo.cluster(),
        repo.default_namespace()
    );

    let mut app = App::new(&preferences, args.namespace.clone());
    app.set_kube_target(repo.context().to_string(), repo.cluster().to_string());
    if let Some(secs) = args.refresh_secs {
        app.set_refresh_interval(Duration::from_secs(secs));
    }

    let repo: Arc<dyn Repository> = Arc::new(repo);
    run(&mut app, repo).await?;

    save_preferences(&app.preferences(), config_path.as_deref());
    Ok(())
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };
    if let Err(error) = installed {
        debug!("tracing subscriber already initialized: {error}");
    }

    Ok(())
}

fn save_preferences(preferences: &Preferences, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Err(error) = preferences.save(path) {
        warn!("failed to save preferences: {error:#}");
        eprintln!("kubedeck: {}", compact_error(&error));
    }
}

async fn run(app: &mut App, repo: Arc<dyn Repository>) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, repo).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    repo: Arc<dyn Repository>,
) -> Result<()> {
    let mut reader = EventStream::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();

    let size = terminal.size().context("failed to read terminal size")?;
    app.update(Msg::Resize {
        width: size.width,
        height: size.height,
    });
    let commands = app.init();
    dispatch(terminal, app, &repo, &tx, commands).await;

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let msg = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => Msg::Key(key),
                    Some(Ok(Event::Resize(width, height))) => Msg::Resize { width, height },
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        warn!("terminal event error: {error}");
                        continue;
                    }
                    None => break,
                }
            }
            maybe_msg = rx.recv() => {
                match maybe_msg {
                    Some(msg) => msg,
                    None => break,
                }
            }
        };

        let commands = app.update(msg);
        dispatch(terminal, app, &repo, &tx, commands).await;
    }

    Ok(())
}

/// Runs follow-up commands. Repository tasks are spawned; terminal hand-offs run inline.
async fn dispatch(
    terminal: &mut TuiTerminal,
    app: &mut App,
    repo: &Arc<dyn Repository>,
    tx: &mpsc::UnboundedSender<Msg>,
    commands: Vec<Command>,
) {
    let mut queue = commands;
    while !queue.is_empty() {
        let mut follow_ups = Vec::new();
        for command in queue {
            if let Some(msg) = execute_command(terminal, repo, tx, command).await {
                follow_ups.extend(app.update(msg));
            }
        }
        queue = follow_ups;
    }
}

async fn execute_command(
    terminal: &mut TuiTerminal,
    repo: &Arc<dyn Repository>,
    tx: &mpsc::UnboundedSender<Msg>,
    command: Command,
) -> Option<Msg> {
    match command {
        Command::Task(task) => {
            debug!("dispatch {}", task.name());
            let repo = Arc::clone(repo);
            let tx = tx.clone();
            tokio::spawn(async move {
                let msg = tasks::run(task, repo).await;
                let _ = tx.send(msg);
            });
            None
        }
        Command::ExecShell { pod, container } => {
            let result = process::run_kubectl_shell(terminal, &pod, container.as_deref())
                .await
                .map_err(|error| compact_error(&error));
            Some(Msg::ExecFinished(result))
        }
        Command::StartPortForward {
            pod,
            local_port,
            remote_port,
        } => match process::spawn_port_forward(&pod, local_port, remote_port) {
            Ok((pid, mut child)) => {
                info!("port-forward pid {pid}: {pod} {local_port}:{remote_port}");
                let tx = tx.clone();
                let exited = pod.clone();
                tokio::spawn(async move {
                    let result = match child.wait().await {
                        Ok(status) if status.success() => Ok(()),
                        Ok(status) => Err(format!("exited with {status}")),
                        Err(error) => Err(error.to_string()),
                    };
                    let _ = tx.send(Msg::PortForwardExited {
                        pod: exited,
                        local_port,
                        result,
                    });
                });
                Some(Msg::PortForwardStarted {
                    pod,
                    local_port,
                    remote_port,
                })
            }
            Err(error) => Some(Msg::PortForwardExited {
                pod,
                local_port,
                result: Err(compact_error(&error)),
            }),
        },
        Command::CopyToClipboard { label, text } => {
            let result = clipboard::copy_to_clipboard(terminal.backend_mut(), &text)
                .map_err(|error| error.to_string());
            Some(Msg::ClipboardWritten { label, result })
        }
    }
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::compact_error;
    use anyhow::Context;

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = Err::<(), _>(anyhow::anyhow!("root"))
            .context("middle")
            .context("outer")
            .context("top")
            .unwrap_err();

        assert_eq!(
            compact_error(&error),
            "top\ncaused by: outer\ncaused by: middle"
        );
    }
}
