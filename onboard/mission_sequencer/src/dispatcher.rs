use mission_lib::{CommandClass, LandedState, VehicleCommand};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::telemetry::TelemetryTracker;

/// Outstanding-request bookkeeping for one command class
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    issued_at: Option<Instant>,
}

impl PendingCommand {
    /// Mark as issued. Refused while a previous request is still outstanding;
    /// the original timestamp is kept in that case.
    pub fn try_issue(&mut self, now: Instant) -> bool {
        if self.issued_at.is_some() {
            return false;
        }
        self.issued_at = Some(now);
        true
    }

    pub fn is_outstanding(&self) -> bool {
        self.issued_at.is_some()
    }

    #[allow(dead_code)]
    pub fn issued_at(&self) -> Option<Instant> {
        self.issued_at
    }

    pub fn has_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.issued_at
            .is_some_and(|issued| now.saturating_duration_since(issued) >= timeout)
    }

    pub fn resolve(&mut self) {
        self.issued_at = None;
    }
}

/// Issues vehicle commands and tracks them per class.
///
/// Commands are queued for the publisher rather than sent directly, so a
/// tick never blocks on the flight controller. Nothing is retried here: the
/// sequencer polls for timeouts and decides what to do.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    arm: PendingCommand,
    disarm: PendingCommand,
    set_mode: PendingCommand,
    land: PendingCommand,
    outbox: Vec<VehicleCommand>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, class: CommandClass) -> &PendingCommand {
        match class {
            CommandClass::Arm => &self.arm,
            CommandClass::Disarm => &self.disarm,
            CommandClass::SetMode => &self.set_mode,
            CommandClass::Land => &self.land,
        }
    }

    fn slot_mut(&mut self, class: CommandClass) -> &mut PendingCommand {
        match class {
            CommandClass::Arm => &mut self.arm,
            CommandClass::Disarm => &mut self.disarm,
            CommandClass::SetMode => &mut self.set_mode,
            CommandClass::Land => &mut self.land,
        }
    }

    /// Queue a command unless one of the same class is outstanding.
    pub fn issue(&mut self, command: VehicleCommand, now: Instant) -> bool {
        let class = command.class();
        if !self.slot_mut(class).try_issue(now) {
            debug!("{:?} command already outstanding, not reissuing", class);
            return false;
        }
        info!("Issuing {:?} command", command);
        self.outbox.push(command);
        true
    }

    pub fn is_outstanding(&self, class: CommandClass) -> bool {
        self.slot(class).is_outstanding()
    }

    pub fn has_timed_out(&self, class: CommandClass, now: Instant, timeout: Duration) -> bool {
        self.slot(class).has_timed_out(now, timeout)
    }

    pub fn resolve(&mut self, class: CommandClass) {
        self.slot_mut(class).resolve();
    }

    /// Resolve every outstanding command whose effect telemetry now confirms.
    pub fn confirm(&mut self, telemetry: &TelemetryTracker, offboard_mode: &str) {
        if self.arm.is_outstanding() && telemetry.armed() {
            debug!("Arm confirmed");
            self.arm.resolve();
        }
        if self.disarm.is_outstanding() && telemetry.state_valid() && !telemetry.armed() {
            debug!("Disarm confirmed");
            self.disarm.resolve();
        }
        if self.set_mode.is_outstanding() && telemetry.mode() == Some(offboard_mode) {
            debug!("Mode {} confirmed", offboard_mode);
            self.set_mode.resolve();
        }
        if self.land.is_outstanding() && telemetry.landed_state() == Some(LandedState::OnGround) {
            debug!("Landing confirmed");
            self.land.resolve();
        }
    }

    /// Drop all outstanding bookkeeping (queued commands are kept)
    pub fn reset(&mut self) {
        self.arm.resolve();
        self.disarm.resolve();
        self.set_mode.resolve();
        self.land.resolve();
    }

    pub fn drain(&mut self) -> Vec<VehicleCommand> {
        std::mem::take(&mut self.outbox)
    }
}
