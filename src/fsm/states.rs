//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers over
//! [`StabilityContext`]: no closures, no dynamic dispatch, no heap.
//!
//! ```text
//!  UNSTABLE ──[in band]──▶ STABILIZING ──[dwell met]──▶ STABLE_WAITING
//!     ▲                        │                            │
//!     └──[out of band|advance]─┴──[out of band|advance]─────┘
//! ```
//!
//! "Trigger" is `auto_advance || update_requested`.  An advance attempted
//! at a terminal entry does not move the cursor, so the machine stays in
//! STABLE_WAITING.

use log::{debug, info};

use super::context::StabilityContext;
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at construction.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Unstable
        StateDescriptor {
            id: StateId::Unstable,
            name: "Unstable",
            on_enter: Some(unstable_enter),
            on_update: unstable_update,
        },
        // Index 1 — Stabilizing
        StateDescriptor {
            id: StateId::Stabilizing,
            name: "Stabilizing",
            on_enter: None,
            on_update: stabilizing_update,
        },
        // Index 2 — StableWaiting
        StateDescriptor {
            id: StateId::StableWaiting,
            name: "StableWaiting",
            on_enter: Some(stable_waiting_enter),
            on_update: stable_waiting_update,
        },
    ]
}

/// Shared guard: leaving the band always drops back to Unstable.
fn left_band(ctx: &StabilityContext) -> Option<StateId> {
    if ctx.in_band() {
        return None;
    }
    info!(
        "Temperature {:.3} K left band around {:.2} K; stability timer reset",
        ctx.temperature, ctx.cursor.current_target
    );
    Some(StateId::Unstable)
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNSTABLE — outside the band, or just switched setpoint
// ═══════════════════════════════════════════════════════════════════════════

fn unstable_enter(ctx: &mut StabilityContext) {
    ctx.timer.reset();
}

fn unstable_update(ctx: &mut StabilityContext) -> Option<StateId> {
    if !ctx.in_band() {
        return None;
    }
    ctx.timer.stabilization_start = Some(ctx.now);
    ctx.timer.stable_duration = 0.0;
    info!(
        "Temperature {:.3} K within {:.2} K of {:.2} K; stabilizing for {:.1}s",
        ctx.temperature, ctx.threshold, ctx.cursor.current_target, ctx.cursor.current_dwell_time
    );
    Some(StateId::Stabilizing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  STABILIZING — in band, dwell not yet satisfied
// ═══════════════════════════════════════════════════════════════════════════

fn stabilizing_update(ctx: &mut StabilityContext) -> Option<StateId> {
    if let Some(next) = left_band(ctx) {
        return Some(next);
    }

    let elapsed = ctx.elapsed_in_band();
    ctx.timer.stable_duration = elapsed;
    if elapsed < ctx.cursor.current_dwell_time {
        return None;
    }

    // Dwell satisfied: fire the stabilized side effect exactly once.
    if !ctx.timer.is_stable {
        ctx.timer.is_stable = true;
        ctx.outcome.stabilized = true;
        info!(
            "Temperature stable at {:.2} K for {:.1}s",
            ctx.cursor.current_target, elapsed
        );
    }

    if ctx.advance_triggered() {
        if ctx.auto_advance {
            info!("Auto mode: advancing schedule");
        } else {
            info!("Advance requested: advancing schedule");
        }
        if ctx.advance() {
            return Some(StateId::Unstable);
        }
    } else {
        info!("Manual mode: waiting for advance request");
    }
    Some(StateId::StableWaiting)
}

// ═══════════════════════════════════════════════════════════════════════════
//  STABLE_WAITING — dwell satisfied, waiting for an advance trigger
// ═══════════════════════════════════════════════════════════════════════════

fn stable_waiting_enter(ctx: &mut StabilityContext) {
    debug!(
        "Holding {:.2} K (index {})",
        ctx.cursor.current_target, ctx.cursor.index
    );
}

fn stable_waiting_update(ctx: &mut StabilityContext) -> Option<StateId> {
    if let Some(next) = left_band(ctx) {
        return Some(next);
    }

    ctx.timer.stable_duration = ctx.elapsed_in_band();

    if ctx.advance_triggered() && ctx.advance() {
        return Some(StateId::Unstable);
    }
    None
}
