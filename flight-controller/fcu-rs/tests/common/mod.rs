#![allow(dead_code)]

use fcu_rs::{pyro::PyroChannelBank, Fcu};
use heapless::spsc::{Consumer, Queue};
use shared::{
    fcu_hal::{Clock, FlightConfig, FlightPhase},
    fcu_mock::{FcuDriverMock, MockBoard, MockExpiryScheduler, MockPyroOutputs, SimClock},
    LogRecord, MeasurementKind, GRAVITY,
};

pub const LOOP_PERIOD_MS: u32 = 10;
pub const LOG_QUEUE_SIZE: usize = 64;

/// A flight controller wired to simulated hardware, stepped one control
/// cycle at a time.
pub struct Rig<'a> {
    pub fcu: Fcu<'a>,
    pub clock: &'a SimClock,
    pub board: &'a MockBoard,
    pub outputs: &'a MockPyroOutputs,
    pub scheduler: &'a MockExpiryScheduler<'a>,
    pub pyro: &'a PyroChannelBank<'a>,
    pub consumer: Consumer<'a, LogRecord, LOG_QUEUE_SIZE>,
    pub records: Vec<LogRecord>,
}

pub fn with_rig(config: FlightConfig, test: impl FnOnce(&mut Rig)) {
    let clock = SimClock::new(0);
    let board = MockBoard::new();
    let outputs = MockPyroOutputs::new();
    let scheduler = MockExpiryScheduler::new(&clock);
    let pyro = PyroChannelBank::new(&outputs, &scheduler, &clock);
    let mut driver = FcuDriverMock::new(&clock, &board);

    let mut queue: Queue<LogRecord, LOG_QUEUE_SIZE> = Queue::new();
    let (mut producer, consumer) = queue.split();

    let fcu = Fcu::init(config, &mut driver, &pyro, &mut producer).unwrap();

    let mut rig = Rig {
        fcu,
        clock: &clock,
        board: &board,
        outputs: &outputs,
        scheduler: &scheduler,
        pyro: &pyro,
        consumer,
        records: Vec::new(),
    };
    rig.drain_records();

    test(&mut rig);
}

impl<'a> Rig<'a> {
    /// One control cycle followed by whatever pyro expiries came due.
    pub fn step(&mut self) {
        self.clock.advance(LOOP_PERIOD_MS);
        self.fcu.update();

        let pyro = self.pyro;
        self.scheduler
            .run_due(|channel, token| pyro.expire(channel, token));

        self.drain_records();
    }

    pub fn step_n(&mut self, count: usize) {
        for _ in 0..count {
            self.step();
        }
    }

    pub fn step_at_height(&mut self, height_m: f64) {
        self.board.set_height(height_m);
        self.step();
    }

    pub fn drain_records(&mut self) {
        while let Some(record) = self.consumer.dequeue() {
            self.records.push(record);
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.fcu.phase()
    }

    pub fn arm(&mut self) {
        let arming_steps = self.fcu.config().arming_delay_ms / LOOP_PERIOD_MS;
        self.step_n(arming_steps as usize);
        assert_eq!(self.phase(), FlightPhase::Armed);
    }

    /// Six samples of 15 g, enough for the default debounce count of five.
    pub fn launch(&mut self) {
        self.board.set_acceleration(0.0, 0.0, 15.0 * GRAVITY);
        for _ in 0..=self.fcu.config().launch_debounce_count {
            self.step();
        }
        self.board.set_acceleration(0.0, 0.0, GRAVITY);

        assert_eq!(self.phase(), FlightPhase::Ascent);
    }

    /// Climbs one metre per cycle, then coasts until the apogee lockout
    /// after launch has passed.
    pub fn climb_to(&mut self, apogee_m: u32) {
        for height_m in 1..=apogee_m {
            self.step_at_height(height_m as f64);
        }

        while self.since_takeoff_ms() <= self.fcu.config().apogee_min_time_after_launch_ms {
            self.step_at_height(apogee_m as f64);
        }
    }

    /// Descends at `rate_m` per cycle until the phase changes or the
    /// ground is reached. Returns the height at which the phase changed.
    pub fn descend_until_transition(&mut self, rate_m: f64) -> Option<f64> {
        let start_phase = self.phase();
        let mut height_m = self.fcu.flight_state().current_height_m;

        while height_m > 0.0 {
            height_m -= rate_m;
            self.step_at_height(height_m);

            if self.phase() != start_phase {
                return Some(height_m);
            }
        }

        None
    }

    pub fn clock_ms(&self) -> u32 {
        self.clock.timestamp_ms()
    }

    pub fn since_takeoff_ms(&self) -> u32 {
        self.fcu
            .flight_state()
            .time_since_takeoff_ms(self.clock.timestamp_ms())
            .unwrap_or(0)
    }

    pub fn records_of(&self, kind: MeasurementKind) -> Vec<LogRecord> {
        self.records
            .iter()
            .filter(|record| record.kind == kind)
            .copied()
            .collect()
    }

    pub fn phase_history(&self) -> Vec<f32> {
        self.records_of(MeasurementKind::FlightPhase)
            .iter()
            .map(|record| record.value)
            .collect()
    }
}
