//! Milestone and change listeners (§4.6): a `Model` notifies zero or more
//! listeners of lifecycle events and cooperative pending actions between steps.
//! Each trait carries all-default no-op methods, implemented selectively by
//! callers who care about a subset.
use crate::model::Mode;

/// Lifecycle events a [`super::Model`] reports to every registered listener.
pub trait MilestoneListener {
    fn on_model_loaded(&mut self) {}
    fn on_model_unloaded(&mut self) {}
    fn on_model_running(&mut self) {}
    fn on_model_relaxed(&mut self) {}
    fn on_model_stopped(&mut self) {}
    fn on_did_reinit(&mut self) {}
    fn on_did_reset(&mut self) {}
}

/// A cooperative action the driver processes between steps (§4.6). Actions that
/// themselves trigger a milestone (`Init`, `Reset`) do not also fire `on_pending_action`
/// with a milestone-shaped listener -- the driver calls the milestone hooks directly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PendingAction {
    #[default]
    None,
    Shutdown,
    Init,
    Reset,
    Stop,
    Clo,
    ModeChange,
    Statistic,
    StatisticFailed,
    Console,
}

pub trait ChangeListener {
    fn on_pending_action(&mut self, action: PendingAction) {
        let _ = action;
    }
    fn on_mode_changed(&mut self, mode: Mode) {
        let _ = mode;
    }
}
