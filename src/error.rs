//! Stable reason codes for the audit log and error taxonomy (see DESIGN.md).

use thiserror::Error;

/// A stable, matchable reason code. `Display` yields the exact dotted string
/// used in the audit log (e.g. `gate.system`).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    #[error("config.invalid")]
    ConfigInvalid,
    #[error("walk.denied")]
    WalkDenied,
    #[error("walk.io")]
    WalkIo,
    #[error("hash.timeout")]
    HashTimeout,
    #[error("hash.read")]
    HashRead,
    #[error("group.collision")]
    GroupCollision,
    #[error("gate.system")]
    GateSystem,
    #[error("gate.in-use")]
    GateInUse,
    #[error("gate.loaded")]
    GateLoaded,
    #[error("gate.owner")]
    GateOwner,
    #[error("gate.cross-device")]
    GateCrossDevice,
    #[error("gate.not-identical")]
    GateNotIdentical,
    #[error("action.io")]
    ActionIo,
    #[error("action.backup")]
    ActionBackup,
    #[error("cache.locked")]
    CacheLocked,
    #[error("resume.corrupt")]
    ResumeCorrupt,
}

/// Marks a run as stopped by an operator interrupt rather than a failure,
/// so the CLI can map it to [`exit_code::CANCELLED`] instead of
/// [`exit_code::REFUSAL`]. Carried through `anyhow::Error` and recovered
/// with `downcast_ref`.
#[derive(Debug, Error)]
#[error("cancelled by user")]
pub struct Cancelled;

/// Process exit codes (spec §6).
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const REFUSAL: i32 = 2;
    pub const CANCELLED: i32 = 130;
}
