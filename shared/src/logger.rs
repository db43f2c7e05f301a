use heapless::spsc::Producer;
use postcard::{
    from_bytes_cobs,
    ser_flavors::{Cobs, Slice},
    serialize_with_flavor,
};
use serde::{Deserialize, Serialize};

pub const SERIALIZE_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementKind {
    Temperature,
    Pressure,
    Altitude,
    Acceleration,
    FlightPhase,
    PyroFired,
    SensorFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogRecord {
    pub timestamp_ms: u32,
    pub kind: MeasurementKind,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializationError {
    BufferTooSmall,
    BadEncoding,
}

/// Outbound queue for flight records. Must never block: a full queue
/// drops the record and returns `false`.
pub trait LogSink {
    fn try_enqueue(&mut self, record: LogRecord) -> bool;
}

impl<'a, const N: usize> LogSink for Producer<'a, LogRecord, N> {
    fn try_enqueue(&mut self, record: LogRecord) -> bool {
        self.enqueue(record).is_ok()
    }
}

impl LogRecord {
    pub const fn new(timestamp_ms: u32, kind: MeasurementKind, value: f32) -> Self {
        Self {
            timestamp_ms,
            kind,
            value,
        }
    }

    /// Writes the record as one COBS frame, trailing zero delimiter
    /// included, and returns the frame length.
    pub fn serialize_cobs(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let flavor =
            Cobs::try_new(Slice::new(buffer)).map_err(|_| SerializationError::BufferTooSmall)?;

        serialize_with_flavor::<Self, Cobs<Slice>, &mut [u8]>(self, flavor)
            .map(|frame| frame.len())
            .map_err(|_| SerializationError::BufferTooSmall)
    }

    pub fn deserialize_cobs(frame: &mut [u8]) -> Result<Self, SerializationError> {
        from_bytes_cobs(frame).map_err(|_| SerializationError::BadEncoding)
    }
}
