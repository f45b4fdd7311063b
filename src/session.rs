use chrono::{DateTime, Local};

use crate::error::SessionError;
use crate::record::{RecordedExercise, RecordedSet, WorkoutRecord};
use crate::template::{ExerciseTemplate, WorkoutTemplate};

type Result<T> = std::result::Result<T, SessionError>;

/// Session-scoped set identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub u32);

/// Values a user enters for a set. `None` leaves the existing value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetValues {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_secs: Option<u32>,
    pub rest_secs: Option<u32>,
    pub note: Option<String>,
}

impl SetValues {
    pub fn reps_weight(reps: u32, weight: f64) -> Self {
        Self {
            reps: Some(reps),
            weight: Some(weight),
            ..Default::default()
        }
    }

    pub fn with_rest(mut self, rest_secs: u32) -> Self {
        self.rest_secs = Some(rest_secs);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSet {
    pub id: SetId,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_secs: Option<u32>,
    pub rest_secs: u32,
    pub completed: bool,
    pub note: String,
}

impl ActiveSet {
    fn merge(&mut self, values: SetValues) {
        if let Some(reps) = values.reps {
            self.reps = Some(reps);
        }
        if let Some(weight) = values.weight {
            self.weight = Some(weight);
        }
        if let Some(duration) = values.duration_secs {
            self.duration_secs = Some(duration);
        }
        if let Some(rest) = values.rest_secs {
            self.rest_secs = rest;
        }
        if let Some(note) = values.note {
            self.note = note;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveExercise {
    pub exercise_id: String,
    pub name: String,
    pub sets: Vec<ActiveSet>,
    pub current_set_index: usize,
    pub note: String,
}

impl ActiveExercise {
    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }

    pub fn is_done(&self) -> bool {
        self.sets.iter().all(|s| s.completed)
    }

    pub fn current_set(&self) -> &ActiveSet {
        &self.sets[self.current_set_index]
    }
}

/// Workout-clock dimension of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Running,
    Paused,
    Finished,
}

/// Rest dimension, orthogonal to [`SessionPhase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestPhase {
    Idle,
    Resting { remaining_secs: u32 },
}

/// Notifications for whoever renders the session; drained with
/// [`WorkoutSessionState::take_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    Paused,
    Resumed,
    SetCompleted { exercise: usize, set: usize },
    RestStarted { secs: u32 },
    RestFinished,
    RestSkipped,
    ExerciseAdvanced { exercise: usize },
    SessionCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed_sets: usize,
    pub total_sets: usize,
}

impl Progress {
    pub fn ratio(&self) -> f64 {
        if self.total_sets == 0 {
            0.0
        } else {
            self.completed_sets as f64 / self.total_sets as f64
        }
    }
}

/// Live state of one workout session
#[derive(Debug, Clone)]
pub struct WorkoutSessionState {
    template_id: String,
    template_name: String,
    exercises: Vec<ActiveExercise>,
    exercise_cursor: usize,
    elapsed_secs: u64,
    started: bool,
    paused: bool,
    rest_remaining_secs: u32,
    resting: bool,
    notes: String,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    completed: bool,
    finalized: bool,
    events: Vec<SessionEvent>,
}

/// Builds a session from a template's exercises
pub fn initialize(template: &WorkoutTemplate) -> Result<WorkoutSessionState> {
    WorkoutSessionState::new(&template.id, &template.name, &template.exercises)
}

impl WorkoutSessionState {
    pub fn new(
        template_id: &str,
        template_name: &str,
        exercises: &[ExerciseTemplate],
    ) -> Result<Self> {
        if exercises.is_empty() || exercises.iter().any(|e| e.sets.is_empty()) {
            return Err(SessionError::EmptyTemplate);
        }

        let mut next_id = 0u32;
        let exercises = exercises
            .iter()
            .map(|template| ActiveExercise {
                exercise_id: template.id.clone(),
                name: template.name.clone(),
                sets: template
                    .sets
                    .iter()
                    .map(|planned| {
                        next_id += 1;
                        ActiveSet {
                            id: SetId(next_id),
                            reps: planned.target_reps,
                            weight: planned.target_weight,
                            duration_secs: planned.target_duration_secs,
                            rest_secs: planned.rest_secs,
                            completed: false,
                            note: String::new(),
                        }
                    })
                    .collect(),
                current_set_index: 0,
                note: String::new(),
            })
            .collect();

        log::debug!("initialized session from template {template_id}");

        Ok(Self {
            template_id: template_id.to_string(),
            template_name: template_name.to_string(),
            exercises,
            exercise_cursor: 0,
            elapsed_secs: 0,
            started: false,
            paused: false,
            rest_remaining_secs: 0,
            resting: false,
            notes: String::new(),
            started_at: None,
            ended_at: None,
            completed: false,
            finalized: false,
            events: Vec::new(),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            Err(SessionError::SessionFinalized)
        } else {
            Ok(())
        }
    }

    fn check_index(&self, exercise: usize, set: Option<usize>) -> Result<()> {
        let invalid = SessionError::InvalidIndex { exercise, set };
        let ex = self.exercises.get(exercise).ok_or(invalid.clone())?;
        match set {
            Some(s) if s >= ex.sets.len() => Err(invalid),
            _ => Ok(()),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.paused = false;
        self.started_at = Some(Local::now());
        self.events.push(SessionEvent::Started);
        log::debug!("session {} started", self.template_id);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        if !self.paused {
            self.paused = true;
            self.events.push(SessionEvent::Paused);
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.paused {
            self.paused = false;
            self.events.push(SessionEvent::Resumed);
        }
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        if self.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Advances both clocks. The rest clock keeps running while paused.
    pub fn tick(&mut self, delta_secs: u32) -> Result<()> {
        self.ensure_open()?;
        if self.started && !self.paused {
            self.elapsed_secs += u64::from(delta_secs);
        }
        if self.resting {
            self.rest_remaining_secs = self.rest_remaining_secs.saturating_sub(delta_secs);
            if self.rest_remaining_secs == 0 {
                self.resting = false;
                self.events.push(SessionEvent::RestFinished);
            }
        }
        Ok(())
    }

    /// Completes the current set of `exercise` and advances the cursors.
    /// The first completed set starts an unstarted session.
    pub fn complete_set(&mut self, exercise: usize, set: usize, values: SetValues) -> Result<()> {
        self.ensure_open()?;
        self.check_index(exercise, Some(set))?;

        let ex = &self.exercises[exercise];
        if ex.sets[set].completed {
            return Err(SessionError::AlreadyCompleted { exercise, set });
        }
        if self.completed {
            return Err(SessionError::SessionCompleted);
        }
        if set != ex.current_set_index {
            return Err(SessionError::NotCurrentSet {
                exercise,
                requested: set,
                current: ex.current_set_index,
            });
        }

        if !self.started {
            self.start()?;
        }

        let target = &mut self.exercises[exercise].sets[set];
        target.merge(values);
        target.completed = true;
        let rest = target.rest_secs;
        self.events.push(SessionEvent::SetCompleted { exercise, set });

        if rest > 0 {
            self.resting = true;
            self.rest_remaining_secs = rest;
            self.events.push(SessionEvent::RestStarted { secs: rest });
        }

        let last_exercise = self.exercises.len() - 1;
        let ex = &mut self.exercises[exercise];
        if set + 1 < ex.sets.len() {
            ex.current_set_index += 1;
        } else if exercise < last_exercise {
            self.exercise_cursor = exercise + 1;
            self.events.push(SessionEvent::ExerciseAdvanced {
                exercise: self.exercise_cursor,
            });
        } else {
            self.completed = true;
            self.events.push(SessionEvent::SessionCompleted);
            log::debug!("session {} completed", self.template_id);
        }
        Ok(())
    }

    /// Edits a set before it is completed
    pub fn update_set(&mut self, exercise: usize, set: usize, values: SetValues) -> Result<()> {
        self.ensure_open()?;
        self.check_index(exercise, Some(set))?;
        if self.exercises[exercise].sets[set].completed {
            return Err(SessionError::AlreadyCompleted { exercise, set });
        }
        if self.completed {
            return Err(SessionError::SessionCompleted);
        }
        self.exercises[exercise].sets[set].merge(values);
        Ok(())
    }

    pub fn skip_rest(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.resting {
            self.events.push(SessionEvent::RestSkipped);
        }
        self.resting = false;
        self.rest_remaining_secs = 0;
        Ok(())
    }

    pub fn navigate_to(&mut self, exercise: usize) -> Result<()> {
        self.ensure_open()?;
        self.check_index(exercise, None)?;
        self.exercise_cursor = exercise;
        Ok(())
    }

    pub fn set_exercise_note(&mut self, exercise: usize, note: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.check_index(exercise, None)?;
        if self.completed {
            return Err(SessionError::SessionCompleted);
        }
        self.exercises[exercise].note = note.into();
        Ok(())
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.notes = notes.into();
        Ok(())
    }

    /// Ends the session and produces the record for the session store.
    /// Incomplete sessions are recorded as such.
    pub fn finalize(&mut self, notes: &str) -> Result<WorkoutRecord> {
        self.ensure_open()?;
        let started_at = match (self.started, self.started_at) {
            (true, Some(at)) => at,
            _ => return Err(SessionError::NotStarted),
        };
        if !notes.is_empty() {
            self.notes = notes.to_string();
        }

        let ended_at = Local::now();
        self.ended_at = Some(ended_at);
        self.finalized = true;
        self.resting = false;
        self.rest_remaining_secs = 0;

        log::debug!(
            "session {} finalized after {}s (completed={})",
            self.template_id,
            self.elapsed_secs,
            self.completed
        );

        Ok(WorkoutRecord {
            template_id: self.template_id.clone(),
            template_name: self.template_name.clone(),
            started_at,
            ended_at,
            elapsed_secs: self.elapsed_secs,
            notes: self.notes.clone(),
            completed: self.completed,
            exercises: self
                .exercises
                .iter()
                .map(|ex| RecordedExercise {
                    exercise_id: ex.exercise_id.clone(),
                    name: ex.name.clone(),
                    note: ex.note.clone(),
                    sets: ex
                        .sets
                        .iter()
                        .map(|s| RecordedSet {
                            reps: s.reps,
                            weight: s.weight,
                            duration_secs: s.duration_secs,
                            rest_secs: s.rest_secs,
                            completed: s.completed,
                            note: s.note.clone(),
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    /// Drops the session without producing a record
    pub fn abandon(self) {
        log::debug!(
            "session {} abandoned after {}s",
            self.template_id,
            self.elapsed_secs
        );
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.finalized, self.started, self.paused) {
            (true, _, _) => SessionPhase::Finished,
            (false, false, _) => SessionPhase::NotStarted,
            (false, true, true) => SessionPhase::Paused,
            (false, true, false) => SessionPhase::Running,
        }
    }

    pub fn rest_phase(&self) -> RestPhase {
        if self.resting {
            RestPhase::Resting {
                remaining_secs: self.rest_remaining_secs,
            }
        } else {
            RestPhase::Idle
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed_sets: self.exercises.iter().map(|e| e.completed_sets()).sum(),
            total_sets: self.exercises.iter().map(|e| e.sets.len()).sum(),
        }
    }

    pub fn exercises(&self) -> &[ActiveExercise] {
        &self.exercises
    }

    pub fn exercise_cursor(&self) -> usize {
        self.exercise_cursor
    }

    pub fn current_exercise(&self) -> &ActiveExercise {
        &self.exercises[self.exercise_cursor]
    }

    pub fn current_set(&self) -> &ActiveSet {
        self.current_exercise().current_set()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn rest_remaining_secs(&self) -> u32 {
        self.rest_remaining_secs
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_resting(&self) -> bool {
        self.resting
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PlannedSet;
    use assert_matches::assert_matches;

    fn exercise(id: &str, sets: Vec<PlannedSet>) -> ExerciseTemplate {
        ExerciseTemplate {
            id: id.into(),
            name: id.to_uppercase(),
            sets,
        }
    }

    fn template(exercises: Vec<ExerciseTemplate>) -> WorkoutTemplate {
        WorkoutTemplate {
            id: "tpl".into(),
            name: "Template".into(),
            description: None,
            exercises,
        }
    }

    /// 1 exercise, 2 sets: reps 10/8, rest 30/0
    fn two_set_session() -> WorkoutSessionState {
        initialize(&template(vec![exercise(
            "curl",
            vec![PlannedSet::reps(10, 20.0, 30), PlannedSet::reps(8, 20.0, 0)],
        )]))
        .unwrap()
    }

    fn two_exercise_session() -> WorkoutSessionState {
        initialize(&template(vec![
            exercise(
                "squat",
                vec![
                    PlannedSet::reps(5, 100.0, 60),
                    PlannedSet::reps(5, 100.0, 60),
                    PlannedSet::reps(5, 100.0, 0),
                ],
            ),
            exercise("plank", vec![PlannedSet::timed(45, 30), PlannedSet::timed(45, 0)]),
        ]))
        .unwrap()
    }

    #[test]
    fn initialize_mirrors_template_shape() {
        let session = two_exercise_session();

        assert_eq!(session.exercises().len(), 2);
        assert_eq!(session.exercises()[0].sets.len(), 3);
        assert_eq!(session.exercises()[1].sets.len(), 2);
        assert!(session
            .exercises()
            .iter()
            .flat_map(|e| e.sets.iter())
            .all(|s| !s.completed));
        assert_eq!(session.exercise_cursor(), 0);
        assert_eq!(session.current_exercise().current_set_index, 0);
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert_eq!(session.rest_phase(), RestPhase::Idle);
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn initialize_copies_targets_and_assigns_unique_ids() {
        let session = two_exercise_session();
        let ids: std::collections::HashSet<SetId> = session
            .exercises()
            .iter()
            .flat_map(|e| e.sets.iter().map(|s| s.id))
            .collect();
        assert_eq!(ids.len(), 5);

        let first = &session.exercises()[0].sets[0];
        assert_eq!(first.reps, Some(5));
        assert_eq!(first.weight, Some(100.0));
        assert_eq!(first.rest_secs, 60);
        assert_eq!(session.exercises()[1].sets[0].duration_secs, Some(45));
    }

    #[test]
    fn initialize_rejects_empty_templates() {
        assert_matches!(initialize(&template(vec![])), Err(SessionError::EmptyTemplate));
        assert_matches!(
            initialize(&template(vec![
                exercise("a", vec![PlannedSet::reps(5, 10.0, 0)]),
                exercise("b", vec![]),
            ])),
            Err(SessionError::EmptyTemplate)
        );
    }

    #[test]
    fn start_is_idempotent() {
        let mut session = two_set_session();
        session.start().unwrap();
        let started_at = session.started_at();
        session.start().unwrap();

        assert_eq!(session.started_at(), started_at);
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.take_events(), vec![SessionEvent::Started]);
    }

    #[test]
    fn tick_before_start_freezes_workout_clock() {
        let mut session = two_set_session();
        for d in [0, 1, 5, 3600] {
            session.tick(d).unwrap();
        }
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn tick_advances_only_while_running() {
        let mut session = two_set_session();
        session.start().unwrap();
        session.tick(1).unwrap();
        session.tick(2).unwrap();
        assert_eq!(session.elapsed_secs(), 3);

        session.pause().unwrap();
        assert_eq!(session.phase(), SessionPhase::Paused);
        session.tick(10).unwrap();
        assert_eq!(session.elapsed_secs(), 3);

        session.resume().unwrap();
        session.tick(1).unwrap();
        assert_eq!(session.elapsed_secs(), 4);
    }

    #[test]
    fn pause_requires_start() {
        let mut session = two_set_session();
        assert_matches!(session.pause(), Err(SessionError::NotStarted));
        assert!(!session.is_paused());
    }

    #[test]
    fn toggle_pause_flips_state() {
        let mut session = two_set_session();
        session.start().unwrap();
        session.toggle_pause().unwrap();
        assert!(session.is_paused());
        session.toggle_pause().unwrap();
        assert!(!session.is_paused());
    }

    #[test]
    fn rest_clock_counts_down_and_finishes_once() {
        let mut session = two_set_session();
        session.complete_set(0, 0, SetValues::default()).unwrap();
        session.take_events();
        assert_eq!(session.rest_phase(), RestPhase::Resting { remaining_secs: 30 });

        session.tick(29).unwrap();
        assert!(session.is_resting());
        assert_eq!(session.rest_remaining_secs(), 1);

        session.tick(5).unwrap();
        assert!(!session.is_resting());
        assert_eq!(session.rest_remaining_secs(), 0);

        session.tick(1).unwrap();
        let finished = session
            .take_events()
            .into_iter()
            .filter(|e| *e == SessionEvent::RestFinished)
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn rest_clock_keeps_running_while_paused() {
        let mut session = two_set_session();
        session.complete_set(0, 0, SetValues::default()).unwrap();
        session.pause().unwrap();
        session.tick(10).unwrap();

        assert_eq!(session.rest_remaining_secs(), 20);
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn complete_set_starts_session_implicitly() {
        let mut session = two_set_session();
        session.complete_set(0, 0, SetValues::default()).unwrap();
        assert!(session.is_started());
        assert!(session.started_at().is_some());
    }

    #[test]
    fn complete_set_twice_is_rejected_without_changes() {
        let mut session = two_exercise_session();
        session
            .complete_set(0, 0, SetValues::reps_weight(5, 100.0))
            .unwrap();
        let before = session.exercises().to_vec();

        assert_matches!(
            session.complete_set(0, 0, SetValues::reps_weight(1, 1.0)),
            Err(SessionError::AlreadyCompleted { exercise: 0, set: 0 })
        );
        assert_eq!(session.exercises(), &before[..]);
    }

    #[test]
    fn only_current_set_can_be_completed() {
        let mut session = two_exercise_session();
        assert_matches!(
            session.complete_set(0, 2, SetValues::default()),
            Err(SessionError::NotCurrentSet { exercise: 0, requested: 2, current: 0 })
        );
        assert_matches!(
            session.complete_set(1, 1, SetValues::default()),
            Err(SessionError::NotCurrentSet { exercise: 1, requested: 1, current: 0 })
        );
        assert!(!session.is_started());
    }

    #[test]
    fn complete_set_rejects_out_of_range() {
        let mut session = two_exercise_session();
        assert_matches!(
            session.complete_set(2, 0, SetValues::default()),
            Err(SessionError::InvalidIndex { exercise: 2, set: Some(0) })
        );
        assert_matches!(
            session.complete_set(1, 2, SetValues::default()),
            Err(SessionError::InvalidIndex { exercise: 1, set: Some(2) })
        );
    }

    #[test]
    fn rest_override_wins_over_planned_rest() {
        let mut session = two_set_session();
        session
            .complete_set(0, 0, SetValues::default().with_rest(45))
            .unwrap();
        assert_eq!(session.rest_remaining_secs(), 45);
        assert_eq!(session.exercises()[0].sets[0].rest_secs, 45);

        session.tick(3).unwrap();
        session.skip_rest().unwrap();
        assert_eq!(session.rest_remaining_secs(), 0);
        assert!(!session.is_resting());

        session.skip_rest().unwrap();
        assert!(!session.is_resting());
    }

    #[test]
    fn zero_rest_override_starts_no_rest() {
        let mut session = two_set_session();
        session
            .complete_set(0, 0, SetValues::default().with_rest(0))
            .unwrap();
        assert!(!session.is_resting());
    }

    #[test]
    fn finishing_an_exercise_moves_to_the_next() {
        let mut session = two_exercise_session();
        for set in 0..3 {
            session.complete_set(0, set, SetValues::default()).unwrap();
        }
        assert_eq!(session.exercise_cursor(), 1);
        assert_eq!(session.exercises()[0].current_set_index, 2);
        assert_eq!(session.exercises()[1].current_set_index, 0);
        assert!(session.exercises()[0].is_done());
        assert!(!session.is_completed());
    }

    #[test]
    fn navigation_preserves_progress() {
        let mut session = two_exercise_session();
        session.complete_set(0, 0, SetValues::default()).unwrap();
        session.navigate_to(1).unwrap();
        session.complete_set(1, 0, SetValues::default()).unwrap();
        session.navigate_to(0).unwrap();

        assert_eq!(session.exercise_cursor(), 0);
        assert_eq!(session.current_exercise().current_set_index, 1);
        assert_eq!(session.exercises()[1].current_set_index, 1);
        assert_matches!(
            session.navigate_to(2),
            Err(SessionError::InvalidIndex { exercise: 2, set: None })
        );
    }

    #[test]
    fn completing_last_set_of_last_exercise_completes_session() {
        let mut session = two_set_session();
        session
            .complete_set(0, 0, SetValues::reps_weight(10, 50.0))
            .unwrap();
        assert!(session.is_resting());
        assert_eq!(session.rest_remaining_secs(), 30);
        assert_eq!(session.current_exercise().current_set_index, 1);

        session
            .complete_set(0, 1, SetValues::reps_weight(8, 55.0))
            .unwrap();
        assert!(session.is_completed());
        // zero planned rest leaves the running rest alone
        assert_eq!(session.rest_remaining_secs(), 30);
        assert_eq!(session.current_exercise().current_set_index, 1);
        assert!(session.take_events().contains(&SessionEvent::SessionCompleted));
    }

    #[test]
    fn completed_session_rejects_set_changes() {
        let mut session = initialize(&template(vec![
            exercise("a", vec![PlannedSet::reps(5, 10.0, 0)]),
            exercise("b", vec![PlannedSet::reps(5, 10.0, 0)]),
        ]))
        .unwrap();
        session.navigate_to(1).unwrap();
        session.complete_set(1, 0, SetValues::default()).unwrap();
        assert!(session.is_completed());

        assert_matches!(
            session.complete_set(0, 0, SetValues::default()),
            Err(SessionError::SessionCompleted)
        );
        assert_matches!(
            session.update_set(0, 0, SetValues::default()),
            Err(SessionError::SessionCompleted)
        );
        assert_matches!(
            session.set_exercise_note(0, "edited later"),
            Err(SessionError::SessionCompleted)
        );
        assert!(session.exercises()[0].note.is_empty());

        // session-level notes stay editable until finalize
        session.set_notes("done").unwrap();
    }

    #[test]
    fn update_set_edits_until_completion() {
        let mut session = two_set_session();
        session
            .update_set(
                0,
                1,
                SetValues {
                    reps: Some(6),
                    note: Some("drop set".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.exercises()[0].sets[1].reps, Some(6));
        assert_eq!(session.exercises()[0].sets[1].weight, Some(20.0));
        assert_eq!(session.exercises()[0].sets[1].note, "drop set");

        session.complete_set(0, 0, SetValues::default()).unwrap();
        assert_matches!(
            session.update_set(0, 0, SetValues::reps_weight(1, 1.0)),
            Err(SessionError::AlreadyCompleted { .. })
        );
    }

    #[test]
    fn finalize_requires_start() {
        let mut session = two_set_session();
        assert_matches!(session.finalize(""), Err(SessionError::NotStarted));
        assert!(!session.is_finalized());
    }

    #[test]
    fn finalize_records_partial_sessions() {
        let mut session = two_exercise_session();
        session.start().unwrap();
        session.tick(1).unwrap();
        session.complete_set(0, 0, SetValues::default()).unwrap();
        session.set_exercise_note(0, "knees ok").unwrap();

        let record = session.finalize("cut short").unwrap();
        assert!(!record.completed);
        assert_eq!(record.completed_sets(), 1);
        assert_eq!(record.total_sets(), 5);
        assert_eq!(record.notes, "cut short");
        assert_eq!(record.exercises[0].note, "knees ok");
        assert_eq!(record.elapsed_secs, 1);
        assert!(record.ended_at >= record.started_at);
        assert_eq!(session.phase(), SessionPhase::Finished);
    }

    #[test]
    fn finalize_keeps_notes_unless_replaced() {
        let mut session = two_set_session();
        session.start().unwrap();
        session.set_notes("grip slipping").unwrap();
        assert_eq!(session.notes(), "grip slipping");
        let record = session.finalize("").unwrap();
        assert_eq!(record.notes, "grip slipping");

        let mut session = two_set_session();
        session.start().unwrap();
        session.set_notes("grip slipping").unwrap();
        let record = session.finalize("chalk helped").unwrap();
        assert_eq!(record.notes, "chalk helped");
        assert_eq!(session.notes(), "chalk helped");
    }

    #[test]
    fn finalized_session_rejects_mutation() {
        let mut session = two_set_session();
        session.start().unwrap();
        session.finalize("").unwrap();

        assert_matches!(session.start(), Err(SessionError::SessionFinalized));
        assert_matches!(session.tick(1), Err(SessionError::SessionFinalized));
        assert_matches!(session.pause(), Err(SessionError::SessionFinalized));
        assert_matches!(session.skip_rest(), Err(SessionError::SessionFinalized));
        assert_matches!(session.navigate_to(0), Err(SessionError::SessionFinalized));
        assert_matches!(
            session.complete_set(0, 0, SetValues::default()),
            Err(SessionError::SessionFinalized)
        );
        assert_matches!(session.set_notes("late"), Err(SessionError::SessionFinalized));
        assert_matches!(session.finalize(""), Err(SessionError::SessionFinalized));
    }

    #[test]
    fn worked_example_two_sets() {
        let mut session = two_set_session();
        session
            .complete_set(0, 0, SetValues::reps_weight(10, 50.0))
            .unwrap();
        session
            .complete_set(0, 1, SetValues::reps_weight(8, 55.0))
            .unwrap();

        let record = session.finalize("felt good").unwrap();
        assert!(record.completed);
        assert_eq!(record.exercises[0].sets.len(), 2);
        assert!(record.exercises[0].sets.iter().all(|s| s.completed));
        assert_eq!(record.total_volume(), 10.0 * 50.0 + 8.0 * 55.0);
        assert_eq!(record.notes, "felt good");
    }

    #[test]
    fn progress_counts_completed_sets() {
        let mut session = two_exercise_session();
        assert_eq!(session.progress().ratio(), 0.0);
        session.complete_set(0, 0, SetValues::default()).unwrap();
        let progress = session.progress();
        assert_eq!(progress.completed_sets, 1);
        assert_eq!(progress.total_sets, 5);
    }
}
