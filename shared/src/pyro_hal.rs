use serde::{Deserialize, Serialize};

pub const PYRO_CHANNEL_COUNT: usize = 4;

/// Index of a physical pyro output, `0..PYRO_CHANNEL_COUNT`.
pub type PyroChannelId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// The timer service had no room or refused the request.
    Unavailable,
    InvalidChannel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    pub fired: bool,
    pub energized: bool,
    pub fire_time_ms: u32,
    pub duration_ms: u32,
}

/// GPIO-level contract for the pyro outputs. Implementations may be called
/// from the control task and from timer interrupt context, so writes must
/// be single register operations.
pub trait PyroOutputs: Sync {
    fn assert_output(&self, channel: PyroChannelId);
    fn deassert_output(&self, channel: PyroChannelId);
}

/// One-shot timer service that de-energizes channels independently of the
/// control loop. When a scheduled expiry comes due the platform must call
/// back into the channel bank with the same `channel` and `token`.
pub trait ExpiryScheduler: Sync {
    fn schedule(
        &self,
        channel: PyroChannelId,
        duration_ms: u32,
        token: u32,
    ) -> Result<(), ScheduleError>;
    fn cancel(&self, channel: PyroChannelId);
}
