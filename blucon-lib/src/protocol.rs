//! The command/response state machine.
//!
//! One [`ProtocolSession`] per connection. The transport feeds every
//! notification through [`ProtocolSession::on_notification`] to
//! completion before reading the next one; the returned [`Outcome`]
//! says what to write next and which decoded events to forward. The
//! session never holds references into the transport or the consumer.

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::command::{BlockIndexMode, Command, rolling_index};
use crate::constants::{PATCH_INFO_HEX_LEN, PATCH_INFO_HEX_START, PATCH_MEMORY_HEX_LEN};
use crate::decoder::{self, GlucoseRecord, GlucoseScale, SensorAge};
use crate::error::BluconError;
use crate::hexstr;
use crate::response::{ResponseTag, classify};

/// Deployment-variant knobs. Defaults reproduce the shipped reader:
/// no sensor-time leg, decrement-wrap indexing, /10 calibration, no
/// bulk fetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub index_mode: BlockIndexMode,
    pub scale: GlucoseScale,
    /// Route the wakeup ACK through GetSensorTime before the glucose read.
    pub read_sensor_time: bool,
    /// After the now-glucose value, fetch and decode the trend series.
    pub fetch_trend: bool,
    /// Likewise for the 15-minute history series.
    pub fetch_history: bool,
}

/// Decoded results flowing out of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// 11 bytes of opaque patch identity data, as hex.
    PatchInfo(String),
    SensorActiveTime(SensorAge),
    Glucose {
        timestamp: DateTime<Local>,
        value: f64,
    },
    PatchReadError,
    TrendSeries(Vec<GlucoseRecord>),
    HistorySeries(Vec<GlucoseRecord>),
}

/// What one notification amounted to: at most one command to write,
/// zero or more events for the consumer.
#[derive(Debug, Default)]
pub struct Outcome {
    pub send: Option<Command>,
    pub events: Vec<ProtocolEvent>,
}

pub struct ProtocolSession {
    config: SessionConfig,
    current: Command,
    /// Byte-pair offset of the now-glucose value inside the next
    /// single-block response; recomputed every cycle.
    glucose_offset: usize,
    /// Accumulator for multi-block trend/history fetches.
    bulk: String,
}

impl ProtocolSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            current: Command::Idle,
            glucose_offset: 0,
            bulk: String::new(),
        }
    }

    /// The last command sent, i.e. the response class we are awaiting.
    pub fn current_command(&self) -> Command {
        self.current
    }

    /// Hard reset, used on connect, disconnect and device re-wake.
    pub fn reset(&mut self) {
        self.current = Command::Idle;
        self.glucose_offset = 0;
        self.bulk.clear();
    }

    /// The write for the previous `Outcome::send` failed; re-arm to
    /// Idle so the session cannot wedge awaiting a response to a
    /// command that never went out.
    pub fn on_write_failure(&mut self) {
        warn!(current = %self.current, "command write failed, re-arming to idle");
        self.reset();
    }

    /// Entry point for raw notification payloads.
    pub fn on_notification(&mut self, data: &[u8]) -> Result<Outcome, BluconError> {
        let response = hexstr::bytes_to_hex(data);
        self.on_response(&response)
    }

    /// Classify a hex response and run the transition table.
    pub fn on_response(&mut self, response: &str) -> Result<Outcome, BluconError> {
        let response = response.to_ascii_lowercase();
        hexstr::ensure_ascii(&response)?;
        let tag = classify(&response, self.current == Command::GetSensorTime);
        debug!(%tag, current = %self.current, len = response.len(), "classified response");

        match tag {
            ResponseTag::Wakeup => {
                // Device (re)woke, possibly mid-sequence; restart the
                // handshake from scratch.
                self.reset();
                Ok(self.advance(Command::GetPatchInfo))
            }
            ResponseTag::Ack => {
                if self.current == Command::AckWakeup {
                    if self.config.read_sensor_time {
                        Ok(self.advance(Command::GetSensorTime))
                    } else {
                        Ok(self.advance(Command::GetNowDataIndex))
                    }
                } else {
                    // The only other ACK in the protocol answers Sleep.
                    debug!("sleep acknowledged, session idle");
                    self.reset();
                    Ok(Outcome::default())
                }
            }
            ResponseTag::NackPatchReadError => {
                warn!("transmitter reported a patch read error");
                self.reset();
                Ok(Outcome {
                    send: None,
                    events: vec![ProtocolEvent::PatchReadError],
                })
            }
            ResponseTag::NackPatchNotFound | ResponseTag::NackOther => {
                warn!(%response, "NACK received, resetting");
                self.reset();
                Ok(Outcome::default())
            }
            ResponseTag::PatchInfo => self.on_patch_info(&response),
            ResponseTag::SensorTime => self.on_sensor_time(&response),
            ResponseTag::SingleBlock => self.on_single_block(&response),
            ResponseTag::MultiBlock => self.on_multi_block(&response),
            ResponseTag::Unrecognized => {
                // Bulk fetches stream continuation chunks with no
                // recognizable prefix; everything else is a no-op while
                // we keep awaiting the response that matches `current`.
                if matches!(self.current, Command::GetTrendData | Command::GetHistoricData) {
                    return self.on_multi_block(&response);
                }
                debug!(%response, "unrecognized response ignored");
                Ok(Outcome::default())
            }
        }
    }

    /// Record `next` as outstanding before the write happens (strict
    /// request/response pairing, no pipelining).
    fn advance(&mut self, next: Command) -> Outcome {
        self.current = next;
        Outcome {
            send: Some(next),
            events: Vec::new(),
        }
    }

    fn on_patch_info(&mut self, response: &str) -> Result<Outcome, BluconError> {
        if self.current != Command::GetPatchInfo {
            debug!(current = %self.current, "patch info outside handshake ignored");
            return Ok(Outcome::default());
        }
        let end = PATCH_INFO_HEX_START + PATCH_INFO_HEX_LEN;
        if response.len() < end {
            return Err(BluconError::InsufficientData {
                expected: end,
                actual: response.len(),
            });
        }
        let info = response[PATCH_INFO_HEX_START..end].to_string();
        let mut outcome = self.advance(Command::AckWakeup);
        outcome.events.push(ProtocolEvent::PatchInfo(info));
        Ok(outcome)
    }

    fn on_sensor_time(&mut self, response: &str) -> Result<Outcome, BluconError> {
        let pairs = decoder::parse_single_block(response)?;
        if pairs.len() < 4 {
            return Err(BluconError::InsufficientData {
                expected: 4,
                actual: pairs.len(),
            });
        }
        // minutes live in the 3rd- and 4th-from-last byte pairs
        let minutes_hex = format!("{}{}", pairs[pairs.len() - 3], pairs[pairs.len() - 4]);
        let age = decoder::sensor_active_time(&minutes_hex)?;
        let mut outcome = self.advance(Command::GetNowDataIndex);
        outcome.events.push(ProtocolEvent::SensorActiveTime(age));
        Ok(outcome)
    }

    fn on_single_block(&mut self, response: &str) -> Result<Outcome, BluconError> {
        match self.current {
            // A plain single-block prefix can still answer the
            // sensor-time command.
            Command::GetSensorTime => self.on_sensor_time(response),
            Command::GetNowDataIndex => {
                let pairs = decoder::parse_single_block(response)?;
                if pairs.len() < 6 {
                    return Err(BluconError::InsufficientData {
                        expected: 6,
                        actual: pairs.len(),
                    });
                }
                let raw_pair = pairs[pairs.len() - 6];
                let raw = u8::from_str_radix(raw_pair, 16)
                    .map_err(|e| BluconError::MalformedHex(format!("{e}: {raw_pair:?}")))?;
                let params = rolling_index(raw, self.config.index_mode);
                debug!(
                    raw,
                    index2 = params.index2,
                    index3 = params.index3,
                    offset = params.offset,
                    "computed rolling block index"
                );
                self.glucose_offset = params.offset;
                Ok(self.advance(Command::GetNowGlucoseData {
                    block: params.index3,
                }))
            }
            Command::GetNowGlucoseData { .. } => {
                let pairs = decoder::parse_single_block(response)?;
                let offset = self.glucose_offset;
                if pairs.len() < offset + 2 {
                    return Err(BluconError::InsufficientData {
                        expected: offset + 2,
                        actual: pairs.len(),
                    });
                }
                let pair_hex = format!("{}{}", pairs[offset + 1], pairs[offset]);
                let value = self.config.scale.apply(&pair_hex)?;
                let next = self.next_after_glucose();
                let mut outcome = self.advance(next);
                outcome.events.push(ProtocolEvent::Glucose {
                    timestamp: Local::now(),
                    value,
                });
                Ok(outcome)
            }
            Command::GetTrendData | Command::GetHistoricData => self.on_multi_block(response),
            _ => {
                debug!(current = %self.current, "unexpected single-block response ignored");
                Ok(Outcome::default())
            }
        }
    }

    fn next_after_glucose(&mut self) -> Command {
        if self.config.fetch_trend {
            self.bulk.clear();
            Command::GetTrendData
        } else if self.config.fetch_history {
            self.bulk.clear();
            Command::GetHistoricData
        } else {
            Command::Sleep
        }
    }

    fn on_multi_block(&mut self, response: &str) -> Result<Outcome, BluconError> {
        match self.current {
            Command::GetTrendData | Command::GetHistoricData => {
                self.bulk.push_str(response);
                if self.bulk.len() < PATCH_MEMORY_HEX_LEN {
                    debug!(
                        have = self.bulk.len(),
                        need = PATCH_MEMORY_HEX_LEN,
                        "accumulating block data"
                    );
                    return Ok(Outcome::default());
                }

                let image = std::mem::take(&mut self.bulk);
                let mut events = Vec::new();
                let next = if self.current == Command::GetTrendData {
                    events.push(ProtocolEvent::TrendSeries(decoder::decode_trend(&image)?));
                    if self.config.fetch_history {
                        Command::GetHistoricData
                    } else {
                        Command::Sleep
                    }
                } else {
                    events.push(ProtocolEvent::HistorySeries(decoder::decode_history(
                        &image,
                    )?));
                    Command::Sleep
                };
                let mut outcome = self.advance(next);
                outcome.events = events;
                Ok(outcome)
            }
            _ => {
                debug!(current = %self.current, "unexpected multi-block response ignored");
                Ok(Outcome::default())
            }
        }
    }
}
