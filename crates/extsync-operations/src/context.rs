use std::{collections::HashMap, path::PathBuf, sync::Arc};

use extsync_config::{config::Config, error::ConfigError, extension::StoreKind};
use extsync_core::store::{default_stores, StoreHandle};
use extsync_events::EventSinkHandle;

/// Shared state for a synchronization run: the registered stores, where artifacts are cached,
/// how much work may run at once, and where events go.
#[derive(Clone)]
pub struct SyncContext {
    inner: Arc<SyncContextInner>,
}

struct SyncContextInner {
    stores: HashMap<StoreKind, StoreHandle>,
    extensions_dir: PathBuf,
    parallel_limit: usize,
    events: EventSinkHandle,
}

impl SyncContext {
    pub fn new(
        stores: Vec<StoreHandle>,
        extensions_dir: PathBuf,
        parallel_limit: usize,
        events: EventSinkHandle,
    ) -> Self {
        let stores = stores
            .into_iter()
            .map(|store| (store.kind(), store))
            .collect();

        Self {
            inner: Arc::new(SyncContextInner {
                stores,
                extensions_dir,
                parallel_limit: parallel_limit.max(1),
                events,
            }),
        }
    }

    /// Builds a context with the default stores for `config`.
    pub fn from_config(
        config: &Config,
        refresh: bool,
        events: EventSinkHandle,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            default_stores(config, refresh),
            config.get_extensions_dir()?,
            config.get_parallel_limit(),
            events,
        ))
    }

    pub fn store(&self, kind: StoreKind) -> Option<StoreHandle> {
        self.inner.stores.get(&kind).cloned()
    }

    pub fn cache_dir(&self, kind: StoreKind) -> PathBuf {
        self.inner.extensions_dir.join(kind.as_str())
    }

    pub fn parallel_limit(&self) -> usize {
        self.inner.parallel_limit
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.inner.events
    }
}

#[cfg(test)]
mod tests {
    use extsync_events::NullSink;

    use super::*;

    #[test]
    fn test_from_config() {
        let config = Config {
            extensions_dir: Some("/var/cache/extsync".into()),
            parallel_limit: Some(3),
            ..Default::default()
        };

        let ctx = SyncContext::from_config(&config, false, Arc::new(NullSink)).unwrap();
        assert_eq!(ctx.parallel_limit(), 3);
        assert_eq!(
            ctx.cache_dir(StoreKind::Chromium),
            PathBuf::from("/var/cache/extsync/chromium")
        );
        assert!(ctx.store(StoreKind::Firefox).is_some());
        assert!(ctx.store(StoreKind::Chromium).is_some());
    }

    #[test]
    fn test_parallel_limit_floor() {
        let ctx = SyncContext::new(vec![], PathBuf::from("/tmp"), 0, Arc::new(NullSink));
        assert_eq!(ctx.parallel_limit(), 1);
        assert!(ctx.store(StoreKind::Firefox).is_none());
    }
}
