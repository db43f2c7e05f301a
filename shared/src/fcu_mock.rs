use core::{
    cell::Cell,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

use mint::Vector3;

use crate::{
    fcu_hal::{Clock, FcuDriver, Indicator, SensorError, SystemStatus},
    pyro_hal::{ExpiryScheduler, PyroChannelId, PyroOutputs, ScheduleError, PYRO_CHANNEL_COUNT},
    standard_atmosphere::{pressure_at_height, CELSIUS_TO_KELVIN},
};

pub const MOCK_GROUND_PRESSURE_PA: f64 = 101_325.0;
pub const MOCK_GROUND_TEMPERATURE_C: f64 = 15.0;

#[derive(Debug, Default)]
pub struct SimClock {
    now_ms: AtomicU32,
}

impl Clock for SimClock {
    fn timestamp_ms(&self) -> u32 {
        self.now_ms.load(Ordering::Acquire)
    }
}

impl SimClock {
    pub const fn new(start_ms: u32) -> Self {
        Self {
            now_ms: AtomicU32::new(start_ms),
        }
    }

    pub fn advance(&self, duration_ms: u32) {
        self.now_ms.fetch_add(duration_ms, Ordering::AcqRel);
    }

    pub fn set(&self, now_ms: u32) {
        self.now_ms.store(now_ms, Ordering::Release);
    }
}

/// Simulated board state behind [`FcuDriverMock`]. Held by shared
/// reference so a test can script the environment while the flight
/// controller owns the driver.
#[derive(Debug)]
pub struct MockBoard {
    pressure_pa: Cell<f64>,
    temperature_c: Cell<f64>,
    acceleration: Cell<Vector3<f32>>,
    barometer_fault: Cell<bool>,
    accelerometer_fault: Cell<bool>,
    indicator: Cell<Option<Indicator>>,
    system_status: Cell<SystemStatus>,
    delayed_ms: Cell<u32>,
}

impl MockBoard {
    /// A vehicle sitting on the pad under standard conditions, 1 g on z.
    pub fn new() -> Self {
        Self {
            pressure_pa: Cell::new(MOCK_GROUND_PRESSURE_PA),
            temperature_c: Cell::new(MOCK_GROUND_TEMPERATURE_C),
            acceleration: Cell::new(Vector3 {
                x: 0.0,
                y: 0.0,
                z: crate::GRAVITY,
            }),
            barometer_fault: Cell::new(false),
            accelerometer_fault: Cell::new(false),
            indicator: Cell::new(None),
            system_status: Cell::new(SystemStatus(SystemStatus::INIT_OK)),
            delayed_ms: Cell::new(0),
        }
    }

    pub fn set_pressure_temperature(&self, pressure_pa: f64, temperature_c: f64) {
        self.pressure_pa.set(pressure_pa);
        self.temperature_c.set(temperature_c);
    }

    /// Sets the barometer to read `height_m` above the mock ground level.
    pub fn set_height(&self, height_m: f64) {
        self.pressure_pa.set(pressure_at_height(
            height_m,
            MOCK_GROUND_TEMPERATURE_C + CELSIUS_TO_KELVIN,
            MOCK_GROUND_PRESSURE_PA,
        ));
    }

    pub fn set_acceleration(&self, x: f32, y: f32, z: f32) {
        self.acceleration.set(Vector3 { x, y, z });
    }

    pub fn set_barometer_fault(&self, fault: bool) {
        self.barometer_fault.set(fault);
    }

    pub fn set_accelerometer_fault(&self, fault: bool) {
        self.accelerometer_fault.set(fault);
    }

    pub fn set_system_status(&self, status: SystemStatus) {
        self.system_status.set(status);
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.indicator.get()
    }

    pub fn delayed_ms(&self) -> u32 {
        self.delayed_ms.get()
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct FcuDriverMock<'a> {
    clock: &'a SimClock,
    board: &'a MockBoard,
}

impl FcuDriver for FcuDriverMock<'_> {
    fn timestamp_ms(&self) -> u32 {
        self.clock.timestamp_ms()
    }

    fn read_pressure_temperature(&mut self) -> Result<(f64, f64), SensorError> {
        if self.board.barometer_fault.get() {
            return Err(SensorError::Barometer);
        }

        Ok((self.board.pressure_pa.get(), self.board.temperature_c.get()))
    }

    fn read_acceleration(&mut self) -> Result<Vector3<f32>, SensorError> {
        if self.board.accelerometer_fault.get() {
            return Err(SensorError::Accelerometer);
        }

        Ok(self.board.acceleration.get())
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.board.indicator.set(Some(indicator));
    }

    fn system_status(&self) -> SystemStatus {
        self.board.system_status.get()
    }

    fn delay_ms(&mut self, duration_ms: u32) {
        self.board.delayed_ms.set(self.board.delayed_ms.get() + duration_ms);
        self.clock.advance(duration_ms);
    }
}

impl<'a> FcuDriverMock<'a> {
    pub fn new(clock: &'a SimClock, board: &'a MockBoard) -> Self {
        Self { clock, board }
    }
}

#[derive(Debug)]
pub struct MockPyroOutputs {
    levels: [AtomicBool; PYRO_CHANNEL_COUNT],
    assert_counts: [AtomicU32; PYRO_CHANNEL_COUNT],
}

impl PyroOutputs for MockPyroOutputs {
    fn assert_output(&self, channel: PyroChannelId) {
        let channel = channel as usize;
        self.levels[channel].store(true, Ordering::Release);
        self.assert_counts[channel].fetch_add(1, Ordering::AcqRel);
    }

    fn deassert_output(&self, channel: PyroChannelId) {
        self.levels[channel as usize].store(false, Ordering::Release);
    }
}

impl MockPyroOutputs {
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| AtomicBool::new(false)),
            assert_counts: core::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Starts with every output driven high, as if the pins came up floating.
    pub fn all_asserted() -> Self {
        let outputs = Self::new();
        for level in &outputs.levels {
            level.store(true, Ordering::Release);
        }

        outputs
    }

    pub fn is_asserted(&self, channel: PyroChannelId) -> bool {
        self.levels[channel as usize].load(Ordering::Acquire)
    }

    pub fn assert_count(&self, channel: PyroChannelId) -> u32 {
        self.assert_counts[channel as usize].load(Ordering::Acquire)
    }

    pub fn any_asserted(&self) -> bool {
        self.levels.iter().any(|level| level.load(Ordering::Acquire))
    }
}

impl Default for MockPyroOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Stand-in for a hardware one-shot timer per channel. Expiries are only
/// delivered when the test calls [`MockExpiryScheduler::run_due`], which
/// plays the role of the timer interrupt.
#[derive(Debug)]
pub struct MockExpiryScheduler<'a> {
    clock: &'a SimClock,
    pending: [AtomicBool; PYRO_CHANNEL_COUNT],
    started_ms: [AtomicU32; PYRO_CHANNEL_COUNT],
    duration_ms: [AtomicU32; PYRO_CHANNEL_COUNT],
    tokens: [AtomicU32; PYRO_CHANNEL_COUNT],
    fail_next: AtomicBool,
}

impl ExpiryScheduler for MockExpiryScheduler<'_> {
    fn schedule(
        &self,
        channel: PyroChannelId,
        duration_ms: u32,
        token: u32,
    ) -> Result<(), ScheduleError> {
        let channel = channel as usize;
        if channel >= PYRO_CHANNEL_COUNT {
            return Err(ScheduleError::InvalidChannel);
        }

        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(ScheduleError::Unavailable);
        }

        self.started_ms[channel].store(self.clock.timestamp_ms(), Ordering::Release);
        self.duration_ms[channel].store(duration_ms, Ordering::Release);
        self.tokens[channel].store(token, Ordering::Release);
        self.pending[channel].store(true, Ordering::Release);

        Ok(())
    }

    fn cancel(&self, channel: PyroChannelId) {
        if let Some(pending) = self.pending.get(channel as usize) {
            pending.store(false, Ordering::Release);
        }
    }
}

impl<'a> MockExpiryScheduler<'a> {
    pub fn new(clock: &'a SimClock) -> Self {
        Self {
            clock,
            pending: core::array::from_fn(|_| AtomicBool::new(false)),
            started_ms: core::array::from_fn(|_| AtomicU32::new(0)),
            duration_ms: core::array::from_fn(|_| AtomicU32::new(0)),
            tokens: core::array::from_fn(|_| AtomicU32::new(0)),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Makes the next `schedule` call fail.
    pub fn fail_next_schedule(&self) {
        self.fail_next.store(true, Ordering::Release);
    }

    pub fn is_pending(&self, channel: PyroChannelId) -> bool {
        self.pending[channel as usize].load(Ordering::Acquire)
    }

    /// Delivers every expiry whose deadline has passed, returning how many
    /// were delivered.
    pub fn run_due(&self, mut on_expire: impl FnMut(PyroChannelId, u32)) -> usize {
        let now = self.clock.timestamp_ms();
        let mut delivered = 0;

        for channel in 0..PYRO_CHANNEL_COUNT {
            if !self.pending[channel].load(Ordering::Acquire) {
                continue;
            }

            let elapsed = now.wrapping_sub(self.started_ms[channel].load(Ordering::Acquire));
            if elapsed < self.duration_ms[channel].load(Ordering::Acquire) {
                continue;
            }

            self.pending[channel].store(false, Ordering::Release);
            on_expire(channel as PyroChannelId, self.tokens[channel].load(Ordering::Acquire));
            delivered += 1;
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_delivers_after_deadline() {
        let clock = SimClock::new(1_000);
        let scheduler = MockExpiryScheduler::new(&clock);

        scheduler.schedule(2, 500, 7).unwrap();
        assert!(scheduler.is_pending(2));

        clock.advance(499);
        assert_eq!(scheduler.run_due(|_, _| panic!("expired early")), 0);

        clock.advance(1);
        let mut expired = None;
        assert_eq!(scheduler.run_due(|channel, token| expired = Some((channel, token))), 1);
        assert_eq!(expired, Some((2, 7)));
        assert!(!scheduler.is_pending(2));
    }

    #[test]
    fn test_scheduler_cancel_and_failure() {
        let clock = SimClock::new(0);
        let scheduler = MockExpiryScheduler::new(&clock);

        scheduler.schedule(0, 10, 1).unwrap();
        scheduler.cancel(0);
        clock.advance(100);
        assert_eq!(scheduler.run_due(|_, _| {}), 0);

        scheduler.fail_next_schedule();
        assert_eq!(scheduler.schedule(0, 10, 2), Err(ScheduleError::Unavailable));
        assert!(scheduler.schedule(0, 10, 3).is_ok());
        assert_eq!(
            scheduler.schedule(PYRO_CHANNEL_COUNT as PyroChannelId, 10, 4),
            Err(ScheduleError::InvalidChannel)
        );
    }

    #[test]
    fn test_driver_mock_faults_and_delay() {
        let clock = SimClock::new(0);
        let board = MockBoard::new();
        let mut driver = FcuDriverMock::new(&clock, &board);

        assert!(driver.read_pressure_temperature().is_ok());
        board.set_barometer_fault(true);
        assert_eq!(driver.read_pressure_temperature(), Err(SensorError::Barometer));
        assert!(driver.read_acceleration().is_ok());

        driver.delay_ms(250);
        assert_eq!(driver.timestamp_ms(), 250);
        assert_eq!(board.delayed_ms(), 250);

        driver.set_indicator(Indicator::Armed);
        assert_eq!(board.indicator(), Some(Indicator::Armed));
    }
}
