//! Tick-persist-yield driving loop.

use anyhow::{Context, Result};
use tracing::debug;

use crate::agent::Agent;
use crate::io::config::EngineConfig;
use crate::io::path_store::PathStore;
use crate::path::ActionPath;
use crate::recovery::MarkerChannel;
use crate::tree::Status;

/// Reason why [`run_loop`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// Repeat is disabled and the root returned a terminal status.
    Terminal(Status),
    /// The loop reached the configured `max_ticks`.
    MaxTicksReached,
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub ticks_executed: u64,
    pub stop: LoopStop,
}

/// Drive a path until a terminal status (or forever, with `repeat`).
///
/// Each iteration ticks the root once, persists the whole path
/// unconditionally, releases the recovery marker channel, then invokes
/// `on_tick` — the host yield point, and the crash-injection point for
/// tests: the process may be destroyed there and must resume from the
/// persisted snapshot. The channel release must come after the save: a
/// successful motion's marker stays armed through its tick, and only
/// once the snapshot is durable is the motion's outcome durably known.
/// With `repeat` enabled a terminal status re-enters the tree on the
/// next tick; the tree's own cursors have already reset themselves, so
/// no separate restart step exists.
///
/// Any fatal `Err` (die-on-failure escalation, recovery ambiguity, I/O)
/// aborts immediately.
pub fn run_loop<F: FnMut(u64, Status)>(
    path: &mut ActionPath,
    agent: &mut dyn Agent,
    store: &PathStore,
    channel: &MarkerChannel,
    config: &EngineConfig,
    mut on_tick: F,
) -> Result<LoopOutcome> {
    let mut ticks = 0u64;
    loop {
        if config.max_ticks > 0 && ticks >= config.max_ticks {
            debug!(ticks, "max ticks reached");
            return Ok(LoopOutcome {
                ticks_executed: ticks,
                stop: LoopStop::MaxTicksReached,
            });
        }

        let status = path.tick(agent)?;
        store
            .save(path)
            .with_context(|| format!("persist after tick {}", ticks + 1))?;
        channel
            .clear()
            .with_context(|| format!("release marker after tick {}", ticks + 1))?;
        ticks += 1;
        on_tick(ticks, status);

        if status.is_terminal() && !config.repeat {
            return Ok(LoopOutcome {
                ticks_executed: ticks,
                stop: LoopStop::Terminal(status),
            });
        }
    }
}
