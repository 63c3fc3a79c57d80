use crate::controller::Delivered;
use crate::models::Channel;
use crate::status::ProcessingState;

/// Why a scheduled refresh cycle produced no network calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Backend reported busy; the cycle was held back entirely.
    Busy,
    /// A previous cycle for the same group is still in flight.
    InFlight,
}

/// Outbound notifications for render collaborators. Every completed cycle
/// produces one `ChannelUpdate` per channel; skipped cycles still announce
/// themselves so the status indicator can be kept current.
#[derive(Debug, Clone)]
pub enum Event {
    ChannelUpdate { channel: Channel, delivered: Delivered },
    BusyStateChanged(ProcessingState),
    CycleSkipped { reason: SkipReason },
}
