use std::sync::Arc;

use crate::types::DetectProgress;

type ProgressFn = dyn Fn(DetectProgress) + Send + Sync + 'static;

/// Optional progress sink handed to the pipeline stages. Cloning shares the
/// same callback.
#[derive(Clone, Default)]
pub struct Progress(Option<Arc<ProgressFn>>);

impl Progress {
    pub fn new(cb: impl Fn(DetectProgress) + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(cb)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn emit(&self, event: DetectProgress) {
        if let Some(cb) = &self.0 {
            cb(event);
        }
    }

    pub fn stage(&self, name: &'static str) {
        self.emit(DetectProgress::Stage(name));
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Progress")
            .field(&self.0.as_ref().map(|_| "callback"))
            .finish()
    }
}
