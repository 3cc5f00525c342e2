//! Writers of the run's control signal: the interactive console and OS signals.

use std::future::Future;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use sorter_core::{parse_console_line, ConsoleCommand};
use sorter_engine::{ProviderSelector, RunController};
use sorter_logging::{sorter_info, sorter_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Read console commands from stdin on a dedicated thread.
///
/// Control commands go straight to `controller`. Provider switches are
/// forwarded to an async task, so a slow probe never blocks the reader.
pub fn spawn_console(controller: RunController, selector: Arc<ProviderSelector>) -> JoinHandle<()> {
    let (switch_tx, mut switch_rx) = mpsc::unbounded_channel::<String>();

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_console_line(&line) {
                Some(ConsoleCommand::Control(command)) => {
                    controller.apply(command);
                }
                Some(ConsoleCommand::SwitchProvider(id)) => {
                    if switch_tx.send(id).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => sorter_warn!(
                    "unknown command {:?}; use p (pause), r (resume), q (stop), s <provider>",
                    line.trim()
                ),
            }
        }
    });

    tokio::spawn(async move {
        while let Some(id) = switch_rx.recv().await {
            // Failures are logged by the selector; the old provider stays active.
            if let Ok(config) = selector.switch_to(&id).await {
                sorter_info!("now classifying with {} ({})", config.id, config.model);
            }
        }
    })
}

/// The first interrupt or terminate signal requests a cooperative stop; a
/// second Ctrl-C exits immediately.
pub fn spawn_interrupt_handler(controller: RunController) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !stop_on_signal(shutdown_signal(), &controller).await {
            return;
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            sorter_warn!("second interrupt; exiting without a final checkpoint save");
            std::process::exit(130);
        }
    })
}

/// Resolves with the signal's name once SIGINT (or SIGTERM on unix) arrives.
async fn shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| "interrupt"),
            _ = terminate.recv() => Ok("terminate"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "interrupt")
    }
}

/// Wait for `signal` and turn it into a stop request. Returns false when
/// the signal cannot be listened for.
async fn stop_on_signal<F>(signal: F, controller: &RunController) -> bool
where
    F: Future<Output = io::Result<&'static str>>,
{
    match signal.await {
        Ok(name) => {
            sorter_warn!("{name} received; stopping after the current item (Ctrl-C again to abort)");
            controller.request_stop();
            true
        }
        Err(err) => {
            sorter_warn!("cannot listen for shutdown signals ({err}); use `q` to stop");
            false
        }
    }
}
