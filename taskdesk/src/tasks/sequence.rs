//! Monotonic request tickets.
//!
//! Every list request takes a [`Ticket`]. A response is applied only if its
//! ticket is still the newest one issued, so an older request that resolves
//! late cannot overwrite a newer result.

/// Sequence number of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Issues strictly increasing tickets for one resource.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    /// A sequence that has issued nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: 0 }
    }

    /// Issues the next ticket, superseding all earlier ones.
    pub const fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    /// Whether `ticket` is the newest one issued.
    #[must_use]
    pub const fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}
