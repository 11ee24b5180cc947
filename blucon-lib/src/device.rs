//! BLE transport adapter: finds a BluCon transmitter, wires its
//! notify/write characteristics to a [`ProtocolSession`], and forwards
//! decoded events over an mpsc channel.

use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::{Uuid, uuid};

use crate::command::Command;
use crate::error::BluconError;
use crate::protocol::{ProtocolEvent, ProtocolSession, SessionConfig};

/// BluCon GATT service and characteristic UUIDs.
pub const SERVICE_UUID: Uuid = uuid!("436a62c0-082e-4ce8-a08b-01d81f195b24");
pub const WRITE_CHARACTERISTIC_UUID: Uuid = uuid!("436aa6e9-082e-4ce8-a08b-01d81f195b24");
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid = uuid!("436a0c82-082e-4ce8-a08b-01d81f195b24");

/// Advertised device names start with this prefix.
pub const DEVICE_NAME_PREFIX: &str = "blu";

const SCAN_POLL: Duration = Duration::from_millis(500);
const WRITE_DEADLINE: Duration = Duration::from_secs(2);

/// Connection lifecycle and protocol output, in one outbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Adapter found and scanning started.
    Ready,
    Connected,
    Disconnected,
    Reconnecting,
    /// A notification could not be handled; the session keeps going.
    Error(String),
    Protocol(ProtocolEvent),
}

/// One connected patch reader. Owns the session for this connection;
/// independent instances drive independent devices.
pub struct PatchReader {
    peripheral: Peripheral,
    write_char: Characteristic,
    notify_char: Characteristic,
    session: ProtocolSession,
    events: mpsc::Sender<DeviceEvent>,
}

impl PatchReader {
    /// Scan for a BluCon transmitter and connect to it. Fails with
    /// [`BluconError::DeviceNotFound`] when no matching peripheral
    /// shows up within `scan_timeout`.
    pub async fn connect(
        config: SessionConfig,
        events: mpsc::Sender<DeviceEvent>,
        scan_timeout: Duration,
    ) -> Result<Self, BluconError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BluconError::DeviceNotFound)?;

        info!("scanning for BluCon transmitter...");
        let filter = ScanFilter {
            services: vec![SERVICE_UUID],
        };
        adapter.start_scan(filter).await?;
        let _ = events.send(DeviceEvent::Ready).await;

        let peripheral = timeout(scan_timeout, find_peripheral(&adapter))
            .await
            .map_err(|_| BluconError::DeviceNotFound)??;
        adapter.stop_scan().await?;

        info!("connecting to peripheral...");
        peripheral.connect().await?;
        peripheral.discover_services().await?;
        let (write_char, notify_char) = locate_characteristics(&peripheral)?;

        debug!(notify = %notify_char.uuid, "subscribing to notifications");
        peripheral.subscribe(&notify_char).await?;
        let _ = events.send(DeviceEvent::Connected).await;

        Ok(Self {
            peripheral,
            write_char,
            notify_char,
            session: ProtocolSession::new(config),
            events,
        })
    }

    /// Pump notifications through the protocol session until the
    /// connection drops. Each notification is handled to completion,
    /// including the follow-up write, before the next one is read.
    pub async fn run(&mut self) -> Result<(), BluconError> {
        let mut notifications = self.peripheral.notifications().await?;
        info!("waiting for transmitter wakeup");

        while let Some(data) = notifications.next().await {
            if data.uuid != self.notify_char.uuid {
                continue;
            }
            let outcome = match self.session.on_notification(&data.value) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%err, "failed to handle notification");
                    let _ = self.events.send(DeviceEvent::Error(err.to_string())).await;
                    continue;
                }
            };
            for event in outcome.events {
                let _ = self.events.send(DeviceEvent::Protocol(event)).await;
            }
            if let Some(command) = outcome.send {
                if let Err(err) = self.write(command).await {
                    warn!(%command, %err, "write failed");
                    self.session.on_write_failure();
                    let _ = self.events.send(DeviceEvent::Error(err.to_string())).await;
                }
            }
        }

        info!("notification stream ended, connection lost");
        self.session.reset();
        let _ = self.events.send(DeviceEvent::Disconnected).await;
        Ok(())
    }

    /// Re-establish a dropped connection and restart the handshake from
    /// the wakeup wait, never mid-sequence.
    pub async fn reconnect(&mut self) -> Result<(), BluconError> {
        let _ = self.events.send(DeviceEvent::Reconnecting).await;
        self.session.reset();
        self.peripheral.connect().await?;
        self.peripheral.discover_services().await?;
        let (write_char, notify_char) = locate_characteristics(&self.peripheral)?;
        self.peripheral.subscribe(&notify_char).await?;
        self.write_char = write_char;
        self.notify_char = notify_char;
        let _ = self.events.send(DeviceEvent::Connected).await;
        Ok(())
    }

    async fn write(&mut self, command: Command) -> Result<(), BluconError> {
        let bytes = command.to_bytes()?;
        debug!(%command, payload = %command.payload_hex(), "sending command");
        timeout(
            WRITE_DEADLINE,
            self.peripheral
                .write(&self.write_char, &bytes, WriteType::WithResponse),
        )
        .await??;
        Ok(())
    }
}

async fn find_peripheral(adapter: &Adapter) -> Result<Peripheral, BluconError> {
    loop {
        for peripheral in adapter.peripherals().await? {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            // Some environments ignore the scan filter, so check the
            // advertised service and the name prefix ourselves.
            let name_matches = properties
                .local_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().starts_with(DEVICE_NAME_PREFIX));
            if properties.services.contains(&SERVICE_UUID) || name_matches {
                info!(
                    address = %properties.address,
                    name = properties.local_name.as_deref().unwrap_or("NONE"),
                    "found BluCon peripheral"
                );
                return Ok(peripheral);
            }
        }
        sleep(SCAN_POLL).await;
    }
}

fn locate_characteristics(
    peripheral: &Peripheral,
) -> Result<(Characteristic, Characteristic), BluconError> {
    let mut write_char = None;
    let mut notify_char = None;
    for service in peripheral.services() {
        if service.uuid != SERVICE_UUID {
            continue;
        }
        for characteristic in &service.characteristics {
            if characteristic.uuid == WRITE_CHARACTERISTIC_UUID {
                write_char = Some(characteristic.clone());
            } else if characteristic.uuid == NOTIFY_CHARACTERISTIC_UUID {
                notify_char = Some(characteristic.clone());
            }
        }
    }
    match (write_char, notify_char) {
        (Some(w), Some(n)) => Ok((w, n)),
        _ => Err(BluconError::MissingCharacteristic),
    }
}
