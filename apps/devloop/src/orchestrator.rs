//! The coordination state machine.
//!
//! Every change notification (and one unconditional pass at startup) runs
//! through the same transition: suppression check, lint pass, then a
//! supervisor action chosen from the classified outcome. Fatal problems stop
//! the server first; fixes arm suppression so the linter's own writes do not
//! start another pass; plain errors stop the server; a clean pass starts or
//! restarts it.
//!
//! Transitions never overlap. Producers (watcher, signal listener) only push
//! `Event`s into a channel that `run` drains one transition at a time; changes
//! queued behind an in-flight pass are coalesced into a single notification.

use crate::error::{Error, Result};
use crate::lint::{LintRunner, Linter};
use crate::output::{print_status, Status};
use crate::supervisor::{Launcher, ProcessSupervisor};
use crate::suppress::ChangeSuppressor;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Inputs to the state machine.
pub enum Event {
    Change,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where the pipeline rests between events.
pub enum Phase {
    Idle,
    Running,
    BlockedFatal,
    BlockedErrors,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a single transition did.
pub enum Transition {
    /// Notification swallowed; no lint, no supervisor call.
    Suppressed,
    BlockedFatal,
    BlockedErrors,
    Started,
    Restarted,
    /// Clean pass in lint-only mode.
    LintOnly,
    /// Arrived after shutdown.
    Ignored,
}

/// Receives every operator status line.
pub type StatusSink = Box<dyn FnMut(Status)>;

pub struct Orchestrator<L: Linter, P: Launcher> {
    runner: LintRunner<L>,
    supervisor: ProcessSupervisor<P>,
    suppressor: ChangeSuppressor,
    watch: Vec<String>,
    phase: Phase,
    status: StatusSink,
}

impl<L: Linter, P: Launcher> Orchestrator<L, P> {
    pub fn new(
        runner: LintRunner<L>,
        supervisor: ProcessSupervisor<P>,
        watch: Vec<String>,
    ) -> Self {
        let output = runner.output().to_string();
        Self {
            runner,
            supervisor,
            suppressor: ChangeSuppressor::new(),
            watch,
            phase: Phase::Idle,
            status: Box::new(move |s| print_status(s, &output)),
        }
    }

    /// Replace the default stdout printer for status lines.
    pub fn with_status_sink(mut self, sink: impl FnMut(Status) + 'static) -> Self {
        self.status = Box::new(sink);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn suppression_armed(&self) -> bool {
        self.suppressor.is_armed()
    }

    pub fn supervisor(&self) -> &ProcessSupervisor<P> {
        &self.supervisor
    }

    /// Initial pass, run before any watcher event. Nothing to suppress yet.
    pub fn startup(&mut self) -> Result<Transition> {
        info!(paths = ?self.watch, "initial lint pass");
        self.lint_and_run()
    }

    /// Handle one (possibly coalesced) change notification.
    pub fn on_change(&mut self) -> Result<Transition> {
        if self.phase == Phase::Shutdown {
            return Ok(Transition::Ignored);
        }
        if self.suppressor.should_suppress() {
            debug!("skipping change produced by lint fixes");
            return Ok(Transition::Suppressed);
        }
        self.lint_and_run()
    }

    fn lint_and_run(&mut self) -> Result<Transition> {
        let outcome = self.runner.run(&self.watch)?;

        if outcome.has_fatal {
            (self.status)(Status::BlockedFatal);
            self.stop_blocked();
            self.phase = Phase::BlockedFatal;
            return Ok(Transition::BlockedFatal);
        }

        // Fixes and errors are independent: arm even if the server stays down.
        if outcome.has_fixes {
            self.suppressor.arm();
        }

        if outcome.has_errors {
            (self.status)(Status::BlockedErrors);
            self.stop_blocked();
            self.phase = Phase::BlockedErrors;
            return Ok(Transition::BlockedErrors);
        }

        if self.supervisor.lint_only() {
            debug!("lint-only mode, not starting server");
            self.phase = Phase::Idle;
            return Ok(Transition::LintOnly);
        }

        let transition = if self.supervisor.is_running() {
            (self.status)(Status::Restarting);
            self.supervisor.restart()?;
            Transition::Restarted
        } else {
            (self.status)(Status::Starting);
            self.supervisor.start()?;
            Transition::Started
        };
        self.phase = Phase::Running;
        Ok(transition)
    }

    /// Blocked states keep watching; the handle is released even if the kill fails.
    fn stop_blocked(&mut self) {
        if let Err(e) = self.supervisor.stop() {
            warn!("failed to stop server: {}", e);
        }
    }

    /// Terminal path. Stop failures are logged and swallowed; safe to repeat.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.supervisor.stop() {
            warn!("failed to stop server during shutdown: {}", e);
        }
        if self.phase != Phase::Shutdown {
            (self.status)(Status::ShuttingDown);
            self.phase = Phase::Shutdown;
        }
    }

    /// Run the startup pass, then process events until shutdown is requested
    /// or every producer has gone away.
    ///
    /// Collaborator failures end the loop with an error; the server is still
    /// stopped on the way out. A failure while a shutdown is already queued is
    /// treated as part of that shutdown.
    pub fn run(&mut self, events: &Receiver<Event>) -> Result<()> {
        let result = self.event_loop(events);
        self.shutdown();
        result
    }

    fn event_loop(&mut self, events: &Receiver<Event>) -> Result<()> {
        if let Err(e) = self.startup() {
            return unless_shutting_down(e, events);
        }
        while let Ok(event) = events.recv() {
            match coalesce(event, events) {
                Event::Shutdown => return Ok(()),
                Event::Change => match self.on_change() {
                    Ok(t) => debug!(?t, phase = ?self.phase, "transition"),
                    Err(e) => return unless_shutting_down(e, events),
                },
            }
        }
        Ok(())
    }
}

fn unless_shutting_down(err: Error, events: &Receiver<Event>) -> Result<()> {
    if shutdown_pending(events) {
        warn!("pass interrupted by shutdown: {}", err);
        return Ok(());
    }
    Err(err)
}

/// Drain the queue and report whether a shutdown was requested.
fn shutdown_pending(events: &Receiver<Event>) -> bool {
    loop {
        match events.try_recv() {
            Ok(Event::Shutdown) => return true,
            Ok(Event::Change) => {}
            Err(_) => return false,
        }
    }
}

/// Fold every event already queued behind `first` into one. Shutdown wins.
pub fn coalesce(first: Event, events: &Receiver<Event>) -> Event {
    if first == Event::Shutdown {
        return first;
    }
    while let Ok(next) = events.try_recv() {
        if next == Event::Shutdown {
            return Event::Shutdown;
        }
    }
    Event::Change
}
