//! One push cycle: declare, update, render.
//!
//! The host's scheduler calls [`PushCycle::run_once`] on every tick and hands
//! the returned payload to its transport. Nothing here spawns tasks or sleeps.

use std::marker::PhantomData;
use std::time::Instant;

use super::registry::Registry;
use crate::log_debug;

/// Drives user-supplied `init` and `update` callbacks against one registry.
///
/// `init` runs every cycle and (re)declares metrics; registration is
/// idempotent, so repeated declarations return equivalent handles. Its return
/// value is the state handed to `update`.
pub struct PushCycle<S, I, U> {
    registry: Registry,
    init: I,
    update: U,
    cycles: u64,
    _state: PhantomData<fn() -> S>,
}

impl<S, I, U> PushCycle<S, I, U>
where
    I: FnMut(&Registry) -> S,
    U: FnMut(&mut S),
{
    pub fn new(registry: Registry, init: I, update: U) -> Self {
        Self {
            registry,
            init,
            update,
            cycles: 0,
            _state: PhantomData,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs `init`, then `update`, then renders the exposition payload.
    pub fn run_once(&mut self) -> String {
        let started = Instant::now();
        let mut state = (self.init)(&self.registry);
        (self.update)(&mut state);
        let payload = self.registry.render_exposition();
        self.cycles += 1;

        log_debug!(
            "Push Cycle",
            &format!(
                "Cycle {} rendered {} bytes in {:?}",
                self.cycles,
                payload.len(),
                started.elapsed()
            ),
            "cycle_complete"
        );
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Counter, Gauge};

    struct State {
        runs: Counter,
        queue: Gauge,
    }

    #[test]
    fn test_cycle_declares_updates_and_renders() {
        let registry = Registry::new();
        let mut depth = 0.0;
        let mut cycle = PushCycle::new(
            registry.clone(),
            |r: &Registry| State {
                runs: r.register_counter("runs_total", Some("Runs"), &[]).unwrap(),
                queue: r.register_gauge("queue_depth", None, &["queue"]).unwrap(),
            },
            move |s: &mut State| {
                depth += 2.0;
                s.runs.inc(&[]);
                s.queue.set(depth, &["jobs"]);
            },
        );

        cycle.run_once();
        let payload = cycle.run_once();
        assert_eq!(cycle.cycles(), 2);
        assert!(payload.contains("runs_total 2\n"));
        assert!(payload.contains("queue_depth{queue=\"jobs\"} 4\n"));
        assert_eq!(registry.error_count(), 0.0);
    }

    #[test]
    fn test_bad_update_does_not_abort_cycle() {
        let registry = Registry::new();
        let mut cycle = PushCycle::new(
            registry,
            |r: &Registry| r.register_counter("ok_total", None, &["k"]).unwrap(),
            |c: &mut Counter| {
                c.inc(&[]);
                c.inc(&["fine"]);
            },
        );

        let payload = cycle.run_once();
        assert!(payload.contains("ok_total{k=\"fine\"} 1\n"));
        assert!(payload.contains("metric_errors_total 1\n"));
        assert_eq!(cycle.registry().error_count(), 1.0);
    }
}
