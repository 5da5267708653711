use std::{collections::HashMap, path::PathBuf};

use extsync_config::{
    error::ConfigError,
    extension::{ExtensionEntry, StoreKind},
};

/// One unique extension and every profile that wants it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub store: StoreKind,
    pub identifier: String,
    /// Resolved profile directories, without duplicates, in configuration order.
    pub profiles: Vec<PathBuf>,
}

/// Groups configuration entries into one request per `(store, identifier)` pair.
///
/// Requests keep the order in which identifiers first appear; a profile listed more than once
/// for the same identifier is kept once.
pub fn group_requests(entries: &[ExtensionEntry]) -> Result<Vec<ExtensionRequest>, ConfigError> {
    let mut requests: Vec<ExtensionRequest> = Vec::new();
    let mut index: HashMap<(StoreKind, String), usize> = HashMap::new();

    for entry in entries {
        let profile = entry.profile_path()?;

        for name in &entry.names {
            let identifier = name.trim().to_string();
            let slot = *index
                .entry((entry.browser, identifier.clone()))
                .or_insert_with(|| {
                    requests.push(ExtensionRequest {
                        store: entry.browser,
                        identifier,
                        profiles: Vec::new(),
                    });
                    requests.len() - 1
                });

            let request = &mut requests[slot];
            if !request.profiles.contains(&profile) {
                request.profiles.push(profile.clone());
            }
        }
    }

    Ok(requests)
}
