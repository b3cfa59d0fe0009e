use crate::collections::map::HashSet;
use crate::effects::run_guarded;
use crate::error::RenderError;
use crate::hooks::{ComponentRecord, HookSlot};
use crate::path::Path;
use crate::root::RootId;
use crate::runtime::RuntimeInner;

impl RuntimeInner {
    /// Unmounts the components of `root` that the last pass did not render.
    pub(crate) fn reap(&self, root: RootId, visited: &HashSet<Path>) {
        let stale = self.hooks.borrow_mut().take_stale(root, visited);
        for (path, record) in stale {
            log::debug!("unmounting component at {path}");
            self.dispose(&path, record);
        }
    }

    /// Unmounts every component of every root.
    pub(crate) fn reap_all(&self) {
        let all = self.hooks.borrow_mut().take_all();
        for (path, record) in all {
            self.dispose(&path, record);
        }
    }

    /// Runs the pending effect cleanups of one record in slot order. A failing
    /// cleanup is reported and the rest still run.
    fn dispose(&self, path: &Path, record: ComponentRecord) {
        for slot in record.slots {
            let HookSlot::Effect(state) = slot else {
                continue;
            };
            let cleanup = state.borrow_mut().take_cleanup();
            if let Some(cleanup) = cleanup {
                if let Err(message) = run_guarded(cleanup) {
                    self.report(RenderError::UnmountCleanup {
                        path: path.clone(),
                        message,
                    });
                }
            }
        }
    }
}
