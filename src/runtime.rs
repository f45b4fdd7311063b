use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEvent};

/// Terminal input relevant to a running session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Key(KeyEvent),
    Resize,
}

/// What one driver step produced: at most one input, plus the whole seconds
/// of wall time that passed since the previous step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub input: Option<Input>,
    pub elapsed_secs: u32,
}

/// Blocking source of terminal input
pub trait InputSource: Send + 'static {
    /// Waits up to `timeout`; `None` when nothing arrived.
    fn wait(&self, timeout: Duration) -> Option<Input>;
}

/// Reads crossterm events on a background thread
pub struct TerminalInput {
    rx: Receiver<Input>,
}

impl TerminalInput {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let input = match event::read() {
                Ok(Event::Key(key)) => Input::Key(key),
                Ok(Event::Resize(_, _)) => Input::Resize,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("terminal input stopped: {e}");
                    break;
                }
            };
            if tx.send(input).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl InputSource for TerminalInput {
    fn wait(&self, timeout: Duration) -> Option<Input> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Input fed through a channel; drives sessions without a terminal
pub struct ScriptedInput {
    rx: Receiver<Input>,
}

impl ScriptedInput {
    pub fn channel() -> (Sender<Input>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl InputSource for ScriptedInput {
    fn wait(&self, timeout: Duration) -> Option<Input> {
        match self.rx.recv_timeout(timeout) {
            Ok(input) => Some(input),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Time source for the driver
pub trait Clock {
    fn now(&mut self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Moves forward by a fixed amount every time it is read
#[derive(Debug, Clone)]
pub struct SteppingClock {
    now: Instant,
    step: Duration,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Instant::now(),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&mut self) -> Instant {
        self.now += self.step;
        self.now
    }
}

/// Converts wall-clock time into whole seconds for `WorkoutSessionState::tick`,
/// carrying the remainder so bursts of input never drop or double-count time.
#[derive(Debug, Clone)]
pub struct SecondClock {
    last: Instant,
    carry: Duration,
}

impl SecondClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last: now,
            carry: Duration::ZERO,
        }
    }

    /// Whole seconds elapsed since the previous call
    pub fn advance(&mut self, now: Instant) -> u32 {
        let total = self.carry + now.saturating_duration_since(self.last);
        self.last = now;
        let secs = total.as_secs();
        self.carry = total - Duration::from_secs(secs);
        secs as u32
    }
}

/// Paces the session loop: every step waits at most one tick interval for
/// input and reports how much time passed. All session mutations happen on
/// the thread calling `step`.
pub struct SessionDriver<I: InputSource, C: Clock> {
    input: I,
    clock: C,
    tick_interval: Duration,
    seconds: SecondClock,
}

impl<I: InputSource> SessionDriver<I, WallClock> {
    pub fn new(input: I, tick_interval: Duration) -> Self {
        Self::with_clock(input, WallClock, tick_interval)
    }
}

impl<I: InputSource, C: Clock> SessionDriver<I, C> {
    pub fn with_clock(input: I, mut clock: C, tick_interval: Duration) -> Self {
        let seconds = SecondClock::new(clock.now());
        Self {
            input,
            clock,
            tick_interval,
            seconds,
        }
    }

    pub fn step(&mut self) -> Step {
        let input = self.input.wait(self.tick_interval);
        Step {
            input,
            elapsed_secs: self.seconds.advance(self.clock.now()),
        }
    }
}
