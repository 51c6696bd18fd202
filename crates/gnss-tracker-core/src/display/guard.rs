//! Render-in-progress flag
//!
//! Display updates can be triggered from several event sources at once. A
//! second update arriving while a render is running is dropped rather than
//! queued; the next reading redraws the display anyway.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

pub struct RenderGuard {
    rendering: Mutex<CriticalSectionRawMutex, Cell<bool>>,
}

impl Default for RenderGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGuard {
    pub const fn new() -> Self {
        Self {
            rendering: Mutex::new(Cell::new(false)),
        }
    }

    /// Claim the display for one render pass.
    ///
    /// The check and the set happen under the same lock. Returns `None` when
    /// a pass is already in progress.
    pub fn try_begin(&self) -> Option<RenderPass<'_>> {
        let claimed = self.rendering.lock(|rendering| {
            if rendering.get() {
                false
            } else {
                rendering.set(true);
                true
            }
        });

        claimed.then_some(RenderPass { guard: self })
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.lock(|rendering| rendering.get())
    }
}

/// Proof of a claimed render pass. Releases the guard when dropped, whether
/// the render succeeded, failed or unwound.
#[must_use = "the render pass ends as soon as it is dropped"]
pub struct RenderPass<'a> {
    guard: &'a RenderGuard,
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        self.guard.rendering.lock(|rendering| rendering.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_refused_while_held() {
        let guard = RenderGuard::new();
        let pass = guard.try_begin();
        assert!(pass.is_some());
        assert!(guard.is_rendering());
        assert!(guard.try_begin().is_none());

        drop(pass);
        assert!(!guard.is_rendering());
        assert!(guard.try_begin().is_some());
    }

    #[test]
    fn test_guard_released_after_panic() {
        let guard = RenderGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _pass = guard.try_begin();
            panic!("draw failed");
        }));

        assert!(result.is_err());
        assert!(!guard.is_rendering());
    }
}
