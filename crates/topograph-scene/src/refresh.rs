//! Last-write-wins ordering for overlapping model refreshes.

use serde::Serialize;

/// Generation handed out when a refresh request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// What to do with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome<T> {
    /// The response is newer than anything applied so far.
    Apply(T),
    /// A response to this or a later request was already applied; drop the
    /// payload.
    Stale {
        ticket: RefreshTicket,
        applied: RefreshTicket,
    },
}

impl<T> RefreshOutcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshOutcome::Stale { .. })
    }
}

/// Generation counter: every request takes a ticket, and a response is
/// accepted only when its ticket is newer than the last one applied.
///
/// Responses may arrive out of order. An older response still applies while
/// nothing newer has landed, so a server slower than the poll interval keeps
/// the scene moving, and a failed newest request leaves the last good
/// snapshot in place.
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    issued: u64,
    applied: u64,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    /// Newest ticket issued.
    pub fn latest(&self) -> Option<RefreshTicket> {
        (self.issued > 0).then_some(RefreshTicket(self.issued))
    }

    /// Newest ticket whose response was applied.
    pub fn applied(&self) -> Option<RefreshTicket> {
        (self.applied > 0).then_some(RefreshTicket(self.applied))
    }

    pub fn complete<T>(&mut self, ticket: RefreshTicket, payload: T) -> RefreshOutcome<T> {
        if ticket.0 <= self.applied || ticket.0 > self.issued {
            tracing::warn!(
                ticket = ticket.0,
                applied = self.applied,
                "dropping stale refresh response"
            );
            return RefreshOutcome::Stale {
                ticket,
                applied: RefreshTicket(self.applied),
            };
        }
        self.applied = ticket.0;
        RefreshOutcome::Apply(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_old_response_is_dropped() {
        let mut gate = RefreshGate::new();
        let old = gate.begin();
        let new = gate.begin();

        assert_eq!(gate.complete(new, "new"), RefreshOutcome::Apply("new"));
        assert_eq!(
            gate.complete(old, "old"),
            RefreshOutcome::Stale {
                ticket: old,
                applied: new
            }
        );
    }

    #[test]
    fn test_out_of_order_before_newest_arrives() {
        let mut gate = RefreshGate::new();
        let old = gate.begin();
        let new = gate.begin();
        assert!(!gate.complete(old, ()).is_stale());
        assert!(!gate.complete(new, ()).is_stale());
        assert!(gate.complete(new, ()).is_stale());
        assert!(gate.complete(old, ()).is_stale());
        assert_eq!(gate.latest().map(RefreshTicket::generation), Some(2));
        assert_eq!(gate.applied(), Some(new));
    }

    #[test]
    fn test_server_slower_than_poll_interval_still_applies() {
        let mut gate = RefreshGate::new();
        let first = gate.begin();
        let second = gate.begin();
        let third = gate.begin();

        // Each response lands after the next request went out.
        assert!(!gate.complete(first, ()).is_stale());
        let fourth = gate.begin();
        assert!(!gate.complete(second, ()).is_stale());
        assert!(!gate.complete(third, ()).is_stale());
        assert!(!gate.complete(fourth, ()).is_stale());
        assert_eq!(gate.applied(), Some(fourth));
    }

    #[test]
    fn test_unissued_ticket_is_rejected() {
        let mut gate = RefreshGate::new();
        assert!(gate.complete(RefreshTicket(1), ()).is_stale());
        assert_eq!(gate.applied(), None);
    }
}
