//! BLE trainer and heart rate strap via btleplug.
//!
//! Trainers are controlled with FE-C over BLE (FEC3 writes) and read through
//! FE-C notifications (FEC2) or the Cycling Power Measurement.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::sensors::ant::fec::decode_trainer_data;
use crate::sensors::ant::AntFrame;
use crate::sensors::device::{ConnectionStage, ConnectionStatus, StatusCallback, TrainerDevice};
use crate::sensors::gatt::{
    parse_cycling_power_measurement, parse_heart_rate_measurement, CrankCadence,
    CYCLING_POWER_MEASUREMENT_UUID, FEC_READ_UUID, FEC_WRITE_UUID, HEART_RATE_MEASUREMENT_UUID,
    HEART_RATE_SERVICE_UUID, TRAINER_SERVICES,
};
use crate::sensors::types::{SensorError, TelemetrySample};

/// Default time allowed to find a device
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// BLE-connected trainer and optional heart rate strap.
pub struct BleTrainer {
    connect_timeout: Duration,
    adapter: Mutex<Option<Adapter>>,
    trainer: Mutex<Option<Peripheral>>,
    heart_rate_monitor: Mutex<Option<Peripheral>>,
    /// FEC3 characteristic, when the trainer speaks FE-C
    fec_write: Mutex<Option<Characteristic>>,
    streaming: Mutex<Option<CancellationToken>>,
}

impl Default for BleTrainer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl BleTrainer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            adapter: Mutex::new(None),
            trainer: Mutex::new(None),
            heart_rate_monitor: Mutex::new(None),
            fec_write: Mutex::new(None),
            streaming: Mutex::new(None),
        }
    }

    /// The first BLE adapter, initialised on first use.
    async fn adapter(&self) -> Result<Adapter, SensorError> {
        let mut slot = self.adapter.lock().await;
        if let Some(adapter) = slot.as_ref() {
            return Ok(adapter.clone());
        }

        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(SensorError::AdapterNotFound)?;

        tracing::info!("BLE adapter initialized");
        *slot = Some(adapter.clone());
        Ok(adapter)
    }

    /// Scan until a peripheral advertising one of `services` shows up.
    async fn find_peripheral(
        &self,
        services: &[Uuid],
        require_name: bool,
    ) -> Result<(Peripheral, String), SensorError> {
        let adapter = self.adapter().await?;
        let mut events = adapter.events().await?;

        adapter
            .start_scan(ScanFilter {
                services: services.to_vec(),
            })
            .await
            .map_err(|e| SensorError::ScanFailed(e.to_string()))?;

        let search = async {
            while let Some(event) = events.next().await {
                let CentralEvent::DeviceDiscovered(id) = event else {
                    continue;
                };
                let Ok(peripheral) = adapter.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(properties)) = peripheral.properties().await else {
                    continue;
                };

                let name = properties.local_name.unwrap_or_default();
                if require_name && name.is_empty() {
                    continue;
                }
                if properties.services.iter().any(|s| services.contains(s)) {
                    return Some((peripheral, name));
                }
            }
            None
        };

        let found = tokio::time::timeout(self.connect_timeout, search).await;
        if let Err(e) = adapter.stop_scan().await {
            tracing::warn!("Failed to stop scan: {}", e);
        }

        match found {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(SensorError::ScanFailed("adapter event stream ended".to_string())),
            Err(_) => Err(SensorError::ConnectionTimeout),
        }
    }

    async fn connect_peripheral(peripheral: &Peripheral) -> Result<(), SensorError> {
        peripheral
            .connect()
            .await
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    /// Subscribe to the data characteristics of `peripheral` and forward
    /// parsed samples until cancelled.
    async fn stream_notifications(
        peripheral: Peripheral,
        tx: mpsc::Sender<TelemetrySample>,
        cancel: CancellationToken,
    ) -> Result<(), SensorError> {
        let wanted = [
            FEC_READ_UUID,
            CYCLING_POWER_MEASUREMENT_UUID,
            HEART_RATE_MEASUREMENT_UUID,
        ];
        for characteristic in peripheral.characteristics() {
            if wanted.contains(&characteristic.uuid) {
                peripheral
                    .subscribe(&characteristic)
                    .await
                    .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;
                tracing::debug!("Subscribed to characteristic: {}", characteristic.uuid);
            }
        }

        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;

        tokio::spawn(async move {
            let mut cadence = CrankCadence::default();
            loop {
                let notification = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    next = notifications.next() => match next {
                        Some(n) => n,
                        None => {
                            tracing::warn!("Notification stream ended");
                            break;
                        }
                    },
                };

                let sample = match notification.uuid {
                    uuid if uuid == FEC_READ_UUID => {
                        let data = decode_trainer_data(&notification.value);
                        data.is_update()
                            .then(|| TelemetrySample::power(data.power, data.cadence))
                    }
                    uuid if uuid == CYCLING_POWER_MEASUREMENT_UUID => {
                        parse_cycling_power_measurement(&notification.value).map(|cp| {
                            let rpm = match (cp.crank_revolutions, cp.last_crank_event_time) {
                                (Some(revs), Some(time)) => cadence.update(revs, time),
                                _ => 0,
                            };
                            TelemetrySample::power(cp.power_watts.max(0), rpm)
                        })
                    }
                    uuid if uuid == HEART_RATE_MEASUREMENT_UUID => {
                        parse_heart_rate_measurement(&notification.value)
                            .map(TelemetrySample::heart_rate)
                    }
                    _ => None,
                };

                if let Some(sample) = sample {
                    if tx.send(sample).await.is_err() {
                        break;
                    }
                }
            }
        });

        Ok(())
    }
}

impl TrainerDevice for BleTrainer {
    async fn connect_trainer(&self, on_status: StatusCallback<'_>) -> Result<(), SensorError> {
        on_status(ConnectionStatus::new(
            ConnectionStage::ScanTrainer,
            "Searching for trainer (FTMS/FE-C)...",
        ));
        tracing::info!("Starting trainer scan");

        let (peripheral, name) = self.find_peripheral(&TRAINER_SERVICES, true).await?;
        on_status(ConnectionStatus::new(
            ConnectionStage::ConnectingTrainer,
            format!("Connecting to: {}", name),
        ));

        Self::connect_peripheral(&peripheral).await?;

        let fec_write = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == FEC_WRITE_UUID);
        if fec_write.is_some() {
            tracing::info!("FE-C control point found");
        }

        *self.fec_write.lock().await = fec_write;
        *self.trainer.lock().await = Some(peripheral);

        on_status(ConnectionStatus::new(
            ConnectionStage::TrainerConnected,
            "Trainer connected",
        ));
        tracing::info!("Trainer connected: {}", name);
        Ok(())
    }

    async fn connect_heart_rate(&self, on_status: StatusCallback<'_>) -> Result<(), SensorError> {
        on_status(ConnectionStatus::new(
            ConnectionStage::ScanHr,
            "Searching for HR...",
        ));
        tracing::info!("Starting HR scan");

        let (peripheral, name) = self
            .find_peripheral(&[HEART_RATE_SERVICE_UUID], false)
            .await?;
        on_status(ConnectionStatus::new(
            ConnectionStage::ConnectingHr,
            format!("Connecting HR: {}", name),
        ));

        Self::connect_peripheral(&peripheral).await?;
        *self.heart_rate_monitor.lock().await = Some(peripheral);

        on_status(ConnectionStatus::new(
            ConnectionStage::HrConnected,
            format!("HR connected: {}", name),
        ));
        tracing::info!("HR connected: {}", name);
        Ok(())
    }

    async fn subscribe(&self, tx: mpsc::Sender<TelemetrySample>) -> Result<(), SensorError> {
        let trainer = self.trainer.lock().await.clone();
        let heart_rate_monitor = self.heart_rate_monitor.lock().await.clone();
        if trainer.is_none() && heart_rate_monitor.is_none() {
            return Err(SensorError::NotConnected);
        }

        let cancel = CancellationToken::new();
        if let Some(previous) = self.streaming.lock().await.replace(cancel.clone()) {
            previous.cancel();
        }

        for peripheral in trainer.into_iter().chain(heart_rate_monitor) {
            if let Err(e) = Self::stream_notifications(peripheral, tx.clone(), cancel.clone()).await
            {
                cancel.cancel();
                return Err(e);
            }
        }

        Ok(())
    }

    /// Frames are dropped when the trainer has no FE-C control point.
    async fn write_frame(&self, frame: AntFrame) -> Result<(), SensorError> {
        let peripheral = self
            .trainer
            .lock()
            .await
            .clone()
            .ok_or(SensorError::NotConnected)?;
        let Some(characteristic) = self.fec_write.lock().await.clone() else {
            tracing::trace!("No FE-C control point, frame dropped");
            return Ok(());
        };

        peripheral
            .write(&characteristic, frame.as_bytes(), WriteType::WithoutResponse)
            .await
            .map_err(|e| SensorError::WriteFailed(e.to_string()))
    }

    async fn disconnect(&self) {
        if let Some(cancel) = self.streaming.lock().await.take() {
            cancel.cancel();
        }
        self.fec_write.lock().await.take();

        let trainer = self.trainer.lock().await.take();
        let heart_rate_monitor = self.heart_rate_monitor.lock().await.take();
        for peripheral in trainer.into_iter().chain(heart_rate_monitor) {
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!("Disconnect failed: {}", e);
            }
        }
        tracing::info!("BLE devices disconnected");
    }
}
