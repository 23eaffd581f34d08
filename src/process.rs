use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::Stdout;
use std::process::Stdio;
use tokio::process::{Child, Command as TokioCommand};

use crate::model::PodRef;

pub type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const EXEC_SHELL: &str = "sh";

fn shell_args(pod: &PodRef, container: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        "-it".to_string(),
        "-n".to_string(),
        pod.namespace.clone(),
        pod.name.clone(),
    ];
    if let Some(container) = container {
        args.push("-c".to_string());
        args.push(container.to_string());
    }
    args.push("--".to_string());
    args.push(EXEC_SHELL.to_string());
    args
}

fn port_forward_args(pod: &PodRef, local_port: u16, remote_port: u16) -> Vec<String> {
    vec![
        "port-forward".to_string(),
        "-n".to_string(),
        pod.namespace.clone(),
        format!("pod/{}", pod.name),
        format!("{local_port}:{remote_port}"),
    ]
}

/// Hands the terminal to an interactive `kubectl exec` and takes it back afterwards.
pub async fn run_kubectl_shell(
    terminal: &mut TuiTerminal,
    pod: &PodRef,
    container: Option<&str>,
) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;

    let run_result = TokioCommand::new("kubectl")
        .args(shell_args(pod, container))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run kubectl shell for {pod}"));
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };

    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("kubectl shell exited with {status}"))
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

/// Spawns a background `kubectl port-forward`. The child is killed when its handle is dropped.
pub fn spawn_port_forward(
    pod: &PodRef,
    local_port: u16,
    remote_port: u16,
) -> Result<(u32, Child)> {
    let child = TokioCommand::new("kubectl")
        .args(port_forward_args(pod, local_port, remote_port))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn port-forward for {pod}"))?;

    let pid = child
        .id()
        .context("failed to determine process id for kubectl port-forward")?;

    Ok((pid, child))
}

#[cfg(test)]
mod tests {
    use super::{port_forward_args, shell_args};
    use crate::model::PodRef;

    fn pod() -> PodRef {
        PodRef {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
        }
    }

    #[test]
    fn shell_targets_container_when_given() {
        assert_eq!(
            shell_args(&pod(), Some("app")).join(" "),
            "exec -it -n prod api-0 -c app -- sh"
        );
        assert_eq!(
            shell_args(&pod(), None).join(" "),
            "exec -it -n prod api-0 -- sh"
        );
    }

    #[test]
    fn port_forward_maps_local_to_remote() {
        assert_eq!(
            port_forward_args(&pod(), 18080, 8080).join(" "),
            "port-forward -n prod pod/api-0 18080:8080"
        );
    }
}
