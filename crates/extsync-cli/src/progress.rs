use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    thread::JoinHandle,
    time::Duration,
};

use extsync_events::{InstallStage, OperationId, SyncEvent};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Red};

use crate::utils::Colored;

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread started by [`spawn_event_handler`].
pub struct ProgressGuard {
    handle: Option<JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler thread to drain the remaining events.
    ///
    /// Every sender of the channel (the sync context) must be dropped first.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn create_spinner(msg: String) -> ProgressBar {
    let pb = MULTI.add(ProgressBar::new_spinner());
    pb.set_style(spinner_style());
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_line(line: String) {
    MULTI.suspend(|| eprintln!("{line}"));
}

/// Spawns a thread that renders [`SyncEvent`]s as spinners and result lines.
///
/// Each fetch gets a spinner that is cleared once the artifact is cached or the fetch fails.
/// Installs print one line per changed or failed profile. A batch spinner at the bottom tracks
/// how many extensions are done.
pub fn spawn_event_handler(receiver: Receiver<SyncEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut jobs: HashMap<OperationId, ProgressBar> = HashMap::new();
        let mut batch_job: Option<ProgressBar> = None;
        let mut batch_msg: Option<String> = None;

        while let Ok(event) = receiver.recv() {
            match event {
                SyncEvent::FetchStarting {
                    op_id,
                    store,
                    identifier,
                } => {
                    let pb = create_spinner(format!(
                        "{} {}: fetching",
                        Colored(Cyan, &store),
                        identifier
                    ));
                    jobs.insert(op_id, pb);

                    // keep the batch spinner below the fetch spinners
                    if let Some(old) = batch_job.take() {
                        old.finish_and_clear();
                        batch_job = batch_msg.clone().map(create_spinner);
                    }
                }
                SyncEvent::FetchComplete {
                    op_id, ..
                } => {
                    if let Some(pb) = jobs.remove(&op_id) {
                        pb.finish_and_clear();
                    }
                }
                SyncEvent::FetchFailed {
                    op_id,
                    store,
                    identifier,
                    error,
                } => {
                    if let Some(pb) = jobs.remove(&op_id) {
                        pb.finish_and_clear();
                    }
                    print_line(format!(
                        " {} {} {}: {}",
                        Colored(Red, "✗"),
                        Colored(Cyan, &store),
                        identifier,
                        Colored(Red, &error)
                    ));
                }
                SyncEvent::Installing {
                    identifier,
                    profile,
                    stage,
                    ..
                } => {
                    match stage {
                        InstallStage::Installed => {
                            print_line(format!(
                                " {} {} → {}",
                                Colored(Green, "✓"),
                                Colored(Cyan, &identifier),
                                profile.display()
                            ))
                        }
                        InstallStage::Failed(error) => {
                            print_line(format!(
                                " {} {} → {}: {}",
                                Colored(Red, "✗"),
                                Colored(Cyan, &identifier),
                                profile.display(),
                                Colored(Red, &error)
                            ))
                        }
                        InstallStage::Starting | InstallStage::Skipped => {}
                    }
                }
                SyncEvent::BatchProgress {
                    completed,
                    total,
                    failed,
                } => {
                    let fail_msg = if failed > 0 {
                        format!(" ({failed} failed)")
                    } else {
                        String::new()
                    };
                    let msg = format!("Progress: {completed}/{total}{fail_msg}");
                    batch_msg = Some(msg.clone());
                    match &batch_job {
                        Some(pb) => pb.set_message(msg),
                        None => batch_job = Some(create_spinner(msg)),
                    }
                }
            }
        }

        if let Some(pb) = batch_job.take() {
            pb.finish_and_clear();
        }
        for (_, pb) in jobs {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
