use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use shared::{
    fcu_hal::Clock,
    pyro_hal::{
        ChannelStatus, ExpiryScheduler, PyroChannelId, PyroOutputs, ScheduleError,
        PYRO_CHANNEL_COUNT,
    },
};

// Low bit of the activation word. The remaining 31 bits hold the firing
// generation that an expiry token must match.
const ENERGIZED_BIT: u32 = 1;
const GENERATION_MASK: u32 = u32::MAX >> 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PyroError {
    InvalidChannel(PyroChannelId),
    InvalidDuration,
    AlreadyFired(PyroChannelId),
    ExpiryArmFailed(ScheduleError),
    /// Bit `n` is set for every channel `n` that did not fire.
    FireAllFailed { failed_channels: u8 },
}

#[derive(Debug)]
struct PyroChannel {
    fired: AtomicBool,
    activation: AtomicU32,
    fire_time_ms: AtomicU32,
    duration_ms: AtomicU32,
}

impl PyroChannel {
    fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            activation: AtomicU32::new(0),
            fire_time_ms: AtomicU32::new(0),
            duration_ms: AtomicU32::new(0),
        }
    }

    /// Moves the channel to a fresh generation, which orphans any expiry
    /// still in flight for the previous one.
    fn next_generation(&self, energized: bool) -> u32 {
        let generation = ((self.activation.load(Ordering::Acquire) >> 1) + 1) & GENERATION_MASK;
        let word = (generation << 1) | if energized { ENERGIZED_BIT } else { 0 };
        self.activation.store(word, Ordering::Release);

        generation
    }

    fn is_energized(&self) -> bool {
        self.activation.load(Ordering::Acquire) & ENERGIZED_BIT != 0
    }
}

/// Fire-once deployment outputs with timed auto-off.
///
/// Every operation takes `&self`, so the bank can be shared between the
/// control task and the timer interrupt that calls [`PyroChannelBank::expire`].
/// Each channel's expiry is scheduled on its own, so overlapping firings
/// never delay each other's turn-off.
pub struct PyroChannelBank<'a> {
    outputs: &'a dyn PyroOutputs,
    scheduler: &'a dyn ExpiryScheduler,
    clock: &'a dyn Clock,
    channels: [PyroChannel; PYRO_CHANNEL_COUNT],
}

impl<'a> PyroChannelBank<'a> {
    /// Drives every output to its inactive level before anything else can
    /// touch the bank.
    pub fn new(
        outputs: &'a dyn PyroOutputs,
        scheduler: &'a dyn ExpiryScheduler,
        clock: &'a dyn Clock,
    ) -> Self {
        for channel in 0..PYRO_CHANNEL_COUNT {
            outputs.deassert_output(channel as PyroChannelId);
        }

        Self {
            outputs,
            scheduler,
            clock,
            channels: core::array::from_fn(|_| PyroChannel::new()),
        }
    }

    pub fn fire(&self, channel: PyroChannelId, duration_ms: u32) -> Result<(), PyroError> {
        let state = self.channel(channel)?;

        if duration_ms == 0 {
            fcu_error!("Refusing to fire pyro channel {} for 0 ms", channel);
            return Err(PyroError::InvalidDuration);
        }

        if state
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            fcu_warn!("Pyro channel {} already fired", channel);
            return Err(PyroError::AlreadyFired(channel));
        }

        self.scheduler.cancel(channel);
        state
            .fire_time_ms
            .store(self.clock.timestamp_ms(), Ordering::Release);
        state.duration_ms.store(duration_ms, Ordering::Release);

        let token = state.next_generation(true);
        self.outputs.assert_output(channel);

        if let Err(err) = self.scheduler.schedule(channel, duration_ms, token) {
            // Never leave a charge energized without a turn-off armed
            self.outputs.deassert_output(channel);
            state.next_generation(false);
            state.fired.store(false, Ordering::Release);

            fcu_error!(
                "Failed to arm expiry for pyro channel {}: {:?}",
                channel,
                err
            );
            return Err(PyroError::ExpiryArmFailed(err));
        }

        fcu_info!("Pyro channel {} fired for {} ms", channel, duration_ms);

        Ok(())
    }

    /// Fires every channel, continuing past failures.
    pub fn fire_all(&self, duration_ms: u32) -> Result<(), PyroError> {
        let mut failed_channels = 0_u8;

        for channel in 0..PYRO_CHANNEL_COUNT as PyroChannelId {
            if self.fire(channel, duration_ms).is_err() {
                failed_channels |= 1_u8 << channel;
            }
        }

        if failed_channels != 0 {
            return Err(PyroError::FireAllFailed { failed_channels });
        }

        Ok(())
    }

    /// Timer callback. Turns the channel off if `token` still names the
    /// current firing; a stale token from before a reset is ignored.
    pub fn expire(&self, channel: PyroChannelId, token: u32) {
        let Ok(state) = self.channel(channel) else {
            return;
        };

        let energized = (token << 1) | ENERGIZED_BIT;
        if state
            .activation
            .compare_exchange(energized, token << 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.outputs.deassert_output(channel);
        }
    }

    /// Re-enables the channel for another firing. An active firing is cut
    /// short.
    pub fn reset(&self, channel: PyroChannelId) -> Result<(), PyroError> {
        let state = self.channel(channel)?;

        self.scheduler.cancel(channel);
        state.next_generation(false);
        self.outputs.deassert_output(channel);

        state.fired.store(false, Ordering::Release);
        state.fire_time_ms.store(0, Ordering::Release);
        state.duration_ms.store(0, Ordering::Release);

        Ok(())
    }

    pub fn reset_all(&self) {
        for channel in 0..PYRO_CHANNEL_COUNT as PyroChannelId {
            let _ = self.reset(channel);
        }
    }

    pub fn is_fired(&self, channel: PyroChannelId) -> bool {
        self.channel(channel)
            .map(|state| state.fired.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn is_energized(&self, channel: PyroChannelId) -> bool {
        self.channel(channel)
            .map(PyroChannel::is_energized)
            .unwrap_or(false)
    }

    pub fn get_status(&self, channel: PyroChannelId) -> Result<ChannelStatus, PyroError> {
        let state = self.channel(channel)?;

        Ok(ChannelStatus {
            fired: state.fired.load(Ordering::Acquire),
            energized: state.is_energized(),
            fire_time_ms: state.fire_time_ms.load(Ordering::Acquire),
            duration_ms: state.duration_ms.load(Ordering::Acquire),
        })
    }

    pub fn get_all_status(&self) -> [ChannelStatus; PYRO_CHANNEL_COUNT] {
        core::array::from_fn(|channel| {
            self.get_status(channel as PyroChannelId)
                .unwrap_or_default()
        })
    }

    pub fn fired_count(&self) -> u8 {
        self.channels
            .iter()
            .filter(|state| state.fired.load(Ordering::Acquire))
            .count() as u8
    }

    pub fn fired_bitmask(&self) -> u8 {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, state)| state.fired.load(Ordering::Acquire))
            .fold(0, |bitmask, (channel, _)| bitmask | 1_u8 << channel)
    }

    fn channel(&self, channel: PyroChannelId) -> Result<&PyroChannel, PyroError> {
        self.channels
            .get(channel as usize)
            .ok_or(PyroError::InvalidChannel(channel))
    }
}
