//! Per-connection capability records.
//!
//! A single record replaces the fan of boolean wire events; the wire still
//! sees individual `can*` events, derived as deltas against the previous
//! record. `work` gates the veto-action capabilities; `report_winner` is
//! independent of it.

use crate::events::ServerEvent;
use serde::Serialize;

/// The kind of capability an inbound action requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapKind {
    Ban,
    Pick,
    ModeBan,
    ModePick,
    ReportWinner,
}

/// What one connection is currently allowed to do.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub work: bool,
    pub ban: bool,
    pub pick: bool,
    pub mode_ban: bool,
    pub mode_pick: bool,
    pub report_winner: bool,
}

impl Capabilities {
    pub fn ban() -> Self {
        Self {
            work: true,
            ban: true,
            ..Self::default()
        }
    }

    pub fn pick() -> Self {
        Self {
            work: true,
            pick: true,
            ..Self::default()
        }
    }

    pub fn mode_ban() -> Self {
        Self {
            work: true,
            mode_ban: true,
            ..Self::default()
        }
    }

    pub fn mode_pick() -> Self {
        Self {
            work: true,
            mode_pick: true,
            ..Self::default()
        }
    }

    pub fn report_winner() -> Self {
        Self {
            report_winner: true,
            ..Self::default()
        }
    }

    pub fn has(&self, kind: CapKind) -> bool {
        match kind {
            CapKind::Ban => self.work && self.ban,
            CapKind::Pick => self.work && self.pick,
            CapKind::ModeBan => self.work && self.mode_ban,
            CapKind::ModePick => self.work && self.mode_pick,
            CapKind::ReportWinner => self.report_winner,
        }
    }

    /// Wire events for the transition `prev -> self`.
    ///
    /// `canWorkUpdated` is always emitted first so that a client never sees
    /// a specific capability before the gate it depends on.
    pub fn wire_events(&self, prev: &Self) -> Vec<ServerEvent> {
        if self == prev {
            return Vec::new();
        }
        let mut events = vec![ServerEvent::CanWorkUpdated(self.work)];
        if self.ban != prev.ban {
            events.push(ServerEvent::CanBan(self.ban));
        }
        if self.pick != prev.pick {
            events.push(ServerEvent::CanPick(self.pick));
        }
        if self.mode_ban != prev.mode_ban {
            events.push(ServerEvent::CanModeBan(self.mode_ban));
        }
        if self.mode_pick != prev.mode_pick {
            events.push(ServerEvent::CanModePick(self.mode_pick));
        }
        if self.report_winner != prev.report_winner {
            events.push(ServerEvent::CanReportWinner(self.report_winner));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_gate_is_emitted_before_the_specific_capability() {
        let events = Capabilities::mode_ban().wire_events(&Capabilities::default());
        assert_eq!(events[0].name(), "canWorkUpdated");
        assert!(events.iter().any(|e| e.name() == "canModeBan"));
    }

    #[test]
    fn unchanged_record_emits_nothing() {
        let caps = Capabilities::pick();
        assert!(caps.wire_events(&caps).is_empty());
    }

    #[test]
    fn revocation_emits_the_cleared_flags() {
        let events = Capabilities::default().wire_events(&Capabilities::ban());
        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["canWorkUpdated", "canBan"]);
    }

    #[test]
    fn report_winner_is_not_gated_by_work() {
        let caps = Capabilities::report_winner();
        assert!(caps.has(CapKind::ReportWinner));
        assert!(!caps.work);
    }
}
