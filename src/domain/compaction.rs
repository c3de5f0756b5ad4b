use std::any::Any;
use std::collections::HashMap;
use std::fmt;

type Extractor = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// Per event type registry of compaction key extractors, populated once at
/// startup and shared read-only afterwards.
#[derive(Default)]
pub struct CompactionKeyResolver {
    extractors: HashMap<String, Vec<Extractor>>,
}

impl CompactionKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extractor guarded on the payload's concrete type `T`.
    pub fn register<T, F>(&mut self, event_type: impl Into<String>, extract: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        let guarded: Extractor =
            Box::new(move |payload: &dyn Any| payload.downcast_ref::<T>().and_then(|p| extract(p)));
        self.extractors
            .entry(event_type.into())
            .or_default()
            .push(guarded);
        self
    }

    /// Most recently registered extractor first; the first non-empty key wins.
    pub fn resolve(&self, event_type: &str, payload: &dyn Any) -> Option<String> {
        self.extractors
            .get(event_type)?
            .iter()
            .rev()
            .filter_map(|extract| extract(payload))
            .find(|key| !key.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl fmt::Debug for CompactionKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&String, usize)> =
            self.extractors.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("CompactionKeyResolver")
            .field("extractors", &counts)
            .finish()
    }
}
