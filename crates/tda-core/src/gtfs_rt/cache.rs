use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::codec::FeedCodec;
use super::extensions::ExtensionSet;

/// Bounded memo table from an extension set to its configured codec.
///
/// The bound is the number of possible extension sets, so in practice every
/// combination stays cached once built.
#[derive(Debug)]
pub struct CodecCache {
    capacity: usize,
    entries: Mutex<HashMap<ExtensionSet, Arc<FeedCodec>>>,
}

impl Default for CodecCache {
    fn default() -> Self {
        Self::with_capacity(ExtensionSet::CARDINALITY)
    }
}

impl CodecCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn get(&self, extensions: ExtensionSet) -> Arc<FeedCodec> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(codec) = entries.get(&extensions) {
            return Arc::clone(codec);
        }

        let codec = Arc::new(FeedCodec::new(extensions));
        if entries.len() < self.capacity {
            entries.insert(extensions, Arc::clone(&codec));
            crate::metrics::record_codec_cache_size(entries.len());
        } else {
            tracing::warn!(?extensions, capacity = self.capacity, "codec cache full; not caching");
        }
        codec
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
