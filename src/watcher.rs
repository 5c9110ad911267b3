//! Background change watcher driving targeted reloads.
//!
//! A [`ChangeWatcher`] drives the manager's own dirty tracking: each pass
//! rescans the data root through [`ConfigManager::rescan`] and reloads every
//! dirty file, independently: one failed file never blocks another, and stays
//! dirty in the manager until a later pass reloads it. Passes run on a fixed interval and on manual
//! triggers; triggers that arrive while a pass is running collapse into one
//! extra pass.
//!
//! Optionally, filesystem events (debounced) are turned into triggers so
//! edits are picked up before the next tick.

use crate::error::{ReloadError, WatcherError};
use crate::manager::ConfigManager;
use crate::paths::is_data_file;
use notify::RecommendedWatcher;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Configuration for the change watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Time between scheduled passes.
    pub interval: Duration,
    /// Debounce duration for coalescing filesystem events.
    pub debounce: Duration,
    /// Whether filesystem events trigger extra passes.
    pub fs_events: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            debounce: Duration::from_millis(500),
            fs_events: false,
        }
    }
}

/// Outcome of one watcher pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Sequence number, starting at 1.
    pub pass: u64,
    pub reloaded: Vec<String>,
    /// Files whose reload failed, with the error message. Retried next pass.
    pub failed: Vec<(String, String)>,
    /// Changed files with no reloadable registration. Not retried.
    pub unregistered: Vec<String>,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty() && self.failed.is_empty() && self.unregistered.is_empty()
    }
}

pub struct ChangeWatcher {
    manager: Arc<ConfigManager>,
    passes: AtomicU64,
}

impl ChangeWatcher {
    /// Create a watcher over `manager`, recording the current timestamps.
    pub fn new(manager: Arc<ConfigManager>) -> Result<Self, WatcherError> {
        manager.start().map_err(|source| WatcherError::Scan {
            path: manager.base_path().to_path_buf(),
            source,
        })?;
        Ok(Self {
            manager,
            passes: AtomicU64::new(0),
        })
    }

    pub fn manager(&self) -> &Arc<ConfigManager> {
        &self.manager
    }

    /// Scan once and reload every dirty file. Blocking.
    pub fn run_pass(&self) -> io::Result<PassReport> {
        self.manager.rescan()?;

        let mut report = PassReport {
            pass: self.passes.fetch_add(1, Ordering::Relaxed) + 1,
            ..PassReport::default()
        };
        for file in self.manager.dirty_files() {
            match self.manager.reload_file(&file) {
                Ok(()) => report.reloaded.push(file),
                Err(ReloadError::NotRegistered(_) | ReloadError::NotReloadable(_)) => {
                    debug!(file = %file, "Changed file has no reloadable registration");
                    self.manager.forget_dirty(&file);
                    report.unregistered.push(file);
                }
                Err(e) => {
                    warn!(file = %file, code = ?e.code(), "Reload failed: {}", e);
                    report.failed.push((file, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Start the background loop.
    pub fn start(
        manager: Arc<ConfigManager>,
        config: WatcherConfig,
    ) -> Result<WatcherHandle, WatcherError> {
        let watcher = Arc::new(ChangeWatcher::new(manager)?);
        let trigger = Arc::new(Notify::new());
        let (stop_tx, stop_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);

        let debouncer = if config.fs_events {
            Some(watch_data_root(&watcher, config.debounce, Arc::clone(&trigger))?)
        } else {
            None
        };

        info!(
            base_path = %watcher.manager.base_path().display(),
            interval_secs = config.interval.as_secs(),
            fs_events = config.fs_events,
            "Change watcher started"
        );
        let task = tokio::spawn(run_loop(
            watcher,
            config.interval,
            Arc::clone(&trigger),
            stop_rx,
            report_tx,
            debouncer,
        ));

        Ok(WatcherHandle {
            trigger,
            stop: stop_tx,
            reports: report_rx,
            task,
        })
    }
}

async fn run_loop(
    watcher: Arc<ChangeWatcher>,
    interval: Duration,
    trigger: Arc<Notify>,
    mut stop: watch::Receiver<bool>,
    reports: watch::Sender<Option<PassReport>>,
    // Dropped when the loop exits, which ends the event forwarder.
    _debouncer: Option<Debouncer<RecommendedWatcher>>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    info!("Change watcher received shutdown signal, exiting loop");
                    break;
                }
                continue;
            }
            _ = trigger.notified() => debug!("Manual pass requested"),
            _ = ticker.tick() => {}
        }

        let w = Arc::clone(&watcher);
        match tokio::task::spawn_blocking(move || w.run_pass()).await {
            Ok(Ok(report)) => {
                if !report.is_empty() {
                    info!(
                        pass = report.pass,
                        reloaded = report.reloaded.len(),
                        failed = report.failed.len(),
                        unregistered = report.unregistered.len(),
                        "Watcher pass finished"
                    );
                }
                reports.send_replace(Some(report));
            }
            Ok(Err(e)) => warn!("Watcher scan failed: {}", e),
            Err(e) => error!("Watcher pass panicked: {}", e),
        }
    }
}

/// Forward debounced `.json` events under the data root to `trigger`.
fn watch_data_root(
    watcher: &ChangeWatcher,
    debounce: Duration,
    trigger: Arc<Notify>,
) -> Result<Debouncer<RecommendedWatcher>, WatcherError> {
    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(debounce, tx)?;
    let root = watcher.manager.base_path();
    debouncer
        .watcher()
        .watch(root, notify::RecursiveMode::Recursive)?;
    info!("Watching data root: {}", root.display());

    std::thread::spawn(move || {
        // Ends when the debouncer, and with it the sender, is dropped.
        while let Ok(result) = rx.recv() {
            match result {
                Ok(events) => {
                    let relevant = events.iter().any(|event| {
                        matches!(
                            event.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        ) && is_data_file(&event.path)
                    });
                    if relevant {
                        debug!("Data file event, requesting pass");
                        trigger.notify_one();
                    }
                }
                Err(e) => error!("File watcher error: {}", e),
            }
        }
        debug!("Data root event forwarder stopped");
    });

    Ok(debouncer)
}

/// Handle to a running watcher.
pub struct WatcherHandle {
    trigger: Arc<Notify>,
    stop: watch::Sender<bool>,
    reports: watch::Receiver<Option<PassReport>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Request a pass without waiting for it. Requests made while a pass is
    /// running are coalesced into a single follow-up pass.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Wait for the next finished pass. Returns `None` once the watcher stopped.
    pub async fn wait_for_pass(&mut self) -> Option<PassReport> {
        self.reports.changed().await.ok()?;
        self.reports.borrow_and_update().clone()
    }

    /// Report of the most recent pass, if any.
    pub fn latest_report(&self) -> Option<PassReport> {
        self.reports.borrow().clone()
    }

    /// A receiver that observes every pass report.
    pub fn reports(&self) -> watch::Receiver<Option<PassReport>> {
        self.reports.clone()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!("Change watcher task failed: {}", e);
        }
    }
}
