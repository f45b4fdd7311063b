use ratatui::Frame;

use crate::{App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Workout screen, including the confirmation dialogs drawn over it
pub struct WorkoutScreen;

impl Screen for WorkoutScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Post-session summary
pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Workout
        | AppState::ConfirmFinish
        | AppState::ConfirmAbandon
        | AppState::EditNotes => Box::new(WorkoutScreen),
        AppState::Summary => Box::new(SummaryScreen),
    }
}
