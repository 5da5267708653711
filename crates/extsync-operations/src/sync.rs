use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};

use extsync_config::extension::StoreKind;
use extsync_core::{
    error::ExtensionError,
    store::{InstallStatus, StoreHandle},
    ExtensionResult,
};
use extsync_events::{EventSinkHandle, InstallStage, OperationId, SyncEvent};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error};

use crate::{
    context::SyncContext,
    progress::next_op_id,
    request::ExtensionRequest,
    types::{ExtensionReport, InstallOutcome, RunSummary},
};

struct BatchCounter {
    total: u32,
    completed: AtomicU32,
    failed: AtomicU32,
}

impl BatchCounter {
    fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            failed: AtomicU32::new(0),
        }
    }

    fn finish(&self, events: &EventSinkHandle, failed: bool) {
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        events.emit(SyncEvent::BatchProgress {
            completed: done,
            total: self.total,
            failed: self.failed.load(Ordering::Relaxed),
        });
    }
}

/// Fetches every requested extension once and installs it into each profile that asked for it.
///
/// Fetches run concurrently; each successful fetch fans out to one install per profile. All
/// blocking store work shares a pool of `parallel_limit` permits. A failed fetch suppresses the
/// installs for that extension only, and a failed install affects nothing else. Every spawned
/// task is awaited before the summary is returned.
pub async fn synchronize(ctx: &SyncContext, requests: Vec<ExtensionRequest>) -> RunSummary {
    let started = Instant::now();
    debug!(count = requests.len(), "synchronizing extensions");

    let semaphore = Arc::new(Semaphore::new(ctx.parallel_limit()));
    let counter = Arc::new(BatchCounter::new(requests.len() as u32));
    let mut summary = RunSummary::default();
    let mut tasks = JoinSet::new();

    for (kind, requests) in partition_by_store(requests) {
        let Some(store) = ctx.store(kind) else {
            for request in requests {
                let err = ExtensionError::StoreUnavailable(kind);
                error!("{}: {err}", request.identifier);
                counter.finish(ctx.events(), true);
                summary.absorb(ExtensionReport {
                    store: kind,
                    identifier: request.identifier,
                    fetch_error: Some(err.to_string()),
                    installs: Vec::new(),
                });
            }
            continue;
        };

        let cache_dir = ctx.cache_dir(kind);
        for request in requests {
            tasks.spawn(sync_extension(
                ctx.clone(),
                store.clone(),
                semaphore.clone(),
                cache_dir.clone(),
                request,
                counter.clone(),
            ));
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => summary.absorb(report),
            Err(err) => {
                error!("synchronization task failed: {err}");
                summary.errors += 1;
            }
        }
    }

    summary.duration = started.elapsed();
    debug!(
        updates = summary.updates,
        skipped = summary.skipped,
        errors = summary.errors,
        "synchronization finished"
    );
    summary
}

fn partition_by_store(
    requests: Vec<ExtensionRequest>,
) -> BTreeMap<StoreKind, Vec<ExtensionRequest>> {
    let mut partitions: BTreeMap<StoreKind, Vec<ExtensionRequest>> = BTreeMap::new();
    for request in requests {
        partitions.entry(request.store).or_default().push(request);
    }
    partitions
}

/// Runs blocking store work on the blocking pool once a permit is available.
async fn run_blocking<T, F>(semaphore: &Semaphore, work: F) -> ExtensionResult<T>
where
    F: FnOnce() -> ExtensionResult<T> + Send + 'static,
    T: Send + 'static,
{
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|err| ExtensionError::TaskFailed(err.to_string()))?;

    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ExtensionError::TaskFailed(err.to_string()))?
}

async fn sync_extension(
    ctx: SyncContext,
    store: StoreHandle,
    semaphore: Arc<Semaphore>,
    cache_dir: PathBuf,
    request: ExtensionRequest,
    counter: Arc<BatchCounter>,
) -> ExtensionReport {
    let ExtensionRequest {
        store: kind,
        identifier,
        profiles,
    } = request;
    let op_id = next_op_id();

    ctx.events().emit(SyncEvent::FetchStarting {
        op_id,
        store: kind.to_string(),
        identifier: identifier.clone(),
    });

    let fetched = {
        let store = store.clone();
        let identifier = identifier.clone();
        run_blocking(&semaphore, move || store.fetch(&identifier, &cache_dir)).await
    };

    let artifact = match fetched {
        Ok(artifact) => {
            ctx.events().emit(SyncEvent::FetchComplete {
                op_id,
                store: kind.to_string(),
                identifier: identifier.clone(),
                artifact: artifact.clone(),
            });
            artifact
        }
        Err(err) => {
            error!("Failed to fetch {kind} extension {identifier}: {err}");
            ctx.events().emit(SyncEvent::FetchFailed {
                op_id,
                store: kind.to_string(),
                identifier: identifier.clone(),
                error: err.to_string(),
            });
            counter.finish(ctx.events(), true);
            return ExtensionReport {
                store: kind,
                identifier,
                fetch_error: Some(err.to_string()),
                installs: Vec::new(),
            };
        }
    };

    let handles: Vec<_> = profiles
        .into_iter()
        .map(|profile| {
            let handle = tokio::spawn(install_into_profile(
                ctx.clone(),
                store.clone(),
                semaphore.clone(),
                op_id,
                identifier.clone(),
                artifact.clone(),
                profile.clone(),
            ));
            (profile, handle)
        })
        .collect();

    let mut installs = Vec::with_capacity(handles.len());
    for (profile, handle) in handles {
        let outcome = handle.await.unwrap_or_else(|err| {
            error!("install task for {} failed: {err}", profile.display());
            InstallOutcome::Failed {
                error: format!("install task failed: {err}"),
                capability: false,
            }
        });
        installs.push((profile, outcome));
    }

    let report = ExtensionReport {
        store: kind,
        identifier,
        fetch_error: None,
        installs,
    };
    counter.finish(ctx.events(), report.failed());
    report
}

async fn install_into_profile(
    ctx: SyncContext,
    store: StoreHandle,
    semaphore: Arc<Semaphore>,
    op_id: OperationId,
    identifier: String,
    artifact: PathBuf,
    profile: PathBuf,
) -> InstallOutcome {
    let emit = |stage| {
        ctx.events().emit(SyncEvent::Installing {
            op_id,
            identifier: identifier.clone(),
            profile: profile.clone(),
            stage,
        })
    };

    emit(InstallStage::Starting);

    let target = profile.clone();
    let result = run_blocking(&semaphore, move || store.install(&artifact, &target)).await;

    match result {
        Ok(InstallStatus::Installed) => {
            emit(InstallStage::Installed);
            InstallOutcome::Installed
        }
        Ok(InstallStatus::Skipped) => {
            emit(InstallStage::Skipped);
            InstallOutcome::Skipped
        }
        Err(err) => {
            let capability = err.is_capability();
            error!(
                capability,
                "Failed to install {identifier} into {}: {err}",
                profile.display()
            );
            emit(InstallStage::Failed(err.to_string()));
            InstallOutcome::Failed {
                error: err.to_string(),
                capability,
            }
        }
    }
}
