//! # GNSS Receiver Module
//!
//! Drives a u-blox receiver over UBX: detection, output configuration,
//! persisting configuration, position/time aiding and ground speed polling.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, SensorNodeError};
use crate::serial::port_trait::SerialPortIO;
use crate::serial::send_frame;
use crate::ubx::aiding::AidingFix;
use crate::ubx::decoder::{decode_ack, decode_ground_speed, with_output_protocols, FrameParser};
use crate::ubx::protocol::*;

/// Read chunk size for receiver output
const READ_CHUNK_SIZE: usize = 256;

/// Upper bound on chunks discarded before a request
const MAX_DISCARD_CHUNKS: usize = 16;

/// Convert ground speed from mm/s to whole km/h (truncated toward zero)
///
/// # Examples
///
/// ```
/// use h2_sensor_node::gnss::mm_per_s_to_km_per_h;
///
/// assert_eq!(mm_per_s_to_km_per_h(27_778), 100);
/// assert_eq!(mm_per_s_to_km_per_h(999), 3);
/// ```
pub fn mm_per_s_to_km_per_h(mm_per_s: i32) -> i32 {
    ((mm_per_s as f64 / 1000.0) * 3.6) as i32
}

/// UBX driver for a single receiver on an owned serial port
pub struct GnssReceiver<P: SerialPortIO> {
    port: P,
    parser: FrameParser,
    port_id: u8,
    timeout: Duration,
}

impl<P: SerialPortIO> std::fmt::Debug for GnssReceiver<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GnssReceiver")
            .field("port_id", &self.port_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<P: SerialPortIO> GnssReceiver<P> {
    /// Wrap an opened port
    ///
    /// # Arguments
    ///
    /// * `port` - Byte-sink/source connected to the receiver
    /// * `port_id` - Receiver-side port number (0 = I2C/DDC, 1 = UART1, 3 = USB)
    /// * `timeout` - How long to wait for each reply
    pub fn new(port: P, port_id: u8, timeout: Duration) -> Self {
        Self {
            port,
            parser: FrameParser::new(),
            port_id,
            timeout,
        }
    }

    /// Check that a receiver answers on the port
    ///
    /// # Errors
    ///
    /// Returns `DeviceAbsent` if the port-configuration poll gets no reply.
    pub async fn begin(&mut self) -> Result<()> {
        match self.poll_port_config().await {
            Ok(_) => {
                info!("u-blox receiver detected on port {}", self.port_id);
                Ok(())
            }
            Err(SensorNodeError::Timeout { .. }) => Err(SensorNodeError::DeviceAbsent(format!(
                "no reply to CFG-PRT within {} ms",
                self.timeout.as_millis()
            ))),
            Err(e) => Err(SensorNodeError::DeviceAbsent(e.to_string())),
        }
    }

    /// Restrict the port's output to UBX only (no NMEA)
    pub async fn set_output_ubx_only(&mut self) -> Result<()> {
        let current = self.poll_port_config().await?;
        let updated = with_output_protocols(&current, UBX_PROTO_MASK_UBX)?;

        let frame = UbxFrame::new(UBX_CLASS_CFG, UBX_CFG_PRT, updated)?;
        self.send(&frame).await?;
        self.await_ack(UBX_CLASS_CFG, UBX_CFG_PRT).await?;

        info!("Receiver port {} set to UBX-only output", self.port_id);
        Ok(())
    }

    /// Persist the current configuration to flash/BBR
    pub async fn save_configuration(&mut self) -> Result<()> {
        let mut payload = vec![0u8; UBX_CFG_CFG_PAYLOAD_SIZE];
        payload[4..8].copy_from_slice(&UBX_CFG_SAVE_ALL.to_le_bytes());

        let frame = UbxFrame::new(UBX_CLASS_CFG, UBX_CFG_CFG, payload)?;
        self.send(&frame).await?;
        self.await_ack(UBX_CLASS_CFG, UBX_CFG_CFG).await?;

        info!("Receiver configuration saved");
        Ok(())
    }

    /// Send AID-INI with the given assumed position and time
    ///
    /// The receiver does not acknowledge AID-INI; success means the frame
    /// was written.
    pub async fn send_aiding(&mut self, fix: &AidingFix) -> Result<()> {
        let frame = fix.to_frame()?;
        self.send(&frame).await?;

        info!(
            "AID-INI sent (lat={}, lon={}, alt={} m)",
            fix.latitude_deg, fix.longitude_deg, fix.altitude_m
        );
        Ok(())
    }

    /// Poll NAV-PVT and return ground speed in mm/s
    pub async fn ground_speed_mm_s(&mut self) -> Result<i32> {
        self.send(&UbxFrame::poll(UBX_CLASS_NAV, UBX_NAV_PVT)).await?;
        let frame = self.await_frame(UBX_CLASS_NAV, UBX_NAV_PVT).await?;
        decode_ground_speed(frame.payload())
    }

    async fn poll_port_config(&mut self) -> Result<Vec<u8>> {
        let poll = UbxFrame::new(UBX_CLASS_CFG, UBX_CFG_PRT, vec![self.port_id])?;
        self.send(&poll).await?;

        let reply = self.await_frame(UBX_CLASS_CFG, UBX_CFG_PRT).await?;
        if reply.payload().len() != UBX_CFG_PRT_PAYLOAD_SIZE {
            return Err(SensorNodeError::Ubx(format!(
                "CFG-PRT reply has {} bytes, expected {}",
                reply.payload().len(),
                UBX_CFG_PRT_PAYLOAD_SIZE
            )));
        }
        Ok(reply.into_payload())
    }

    /// Send a request; anything received before it cannot be its reply
    async fn send(&mut self, frame: &UbxFrame) -> Result<()> {
        self.discard_pending().await?;
        send_frame(&mut self.port, frame).await
    }

    /// Drop buffered frames and bytes the port already holds
    ///
    /// Late replies to timed-out requests would otherwise be taken as the
    /// answer to the next one.
    async fn discard_pending(&mut self) -> Result<()> {
        if self.parser.buffered() > 0 {
            debug!("Discarding {} buffered receiver bytes", self.parser.buffered());
            self.parser.clear();
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        for _ in 0..MAX_DISCARD_CHUNKS {
            // A zero timeout still polls the read once, so only bytes that
            // are already available are consumed
            match tokio::time::timeout(Duration::ZERO, self.port.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(count)) => debug!("Discarding {} stale receiver bytes", count),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn await_ack(&mut self, class: u8, id: u8) -> Result<()> {
        loop {
            let frame = self.await_class(UBX_CLASS_ACK, class, id).await?;
            let (accepted, acked_class, acked_id) = decode_ack(&frame)?;
            if acked_class != class || acked_id != id {
                debug!(
                    "Ignoring acknowledgement for 0x{:02X} 0x{:02X}",
                    acked_class, acked_id
                );
                continue;
            }
            if accepted {
                return Ok(());
            }
            return Err(SensorNodeError::Nak { class, id });
        }
    }

    async fn await_frame(&mut self, class: u8, id: u8) -> Result<UbxFrame> {
        loop {
            let frame = self.await_class(class, class, id).await?;
            if frame.id() == id {
                return Ok(frame);
            }
            debug!("Ignoring UBX 0x{:02X} 0x{:02X}", frame.class(), frame.id());
        }
    }

    /// Wait for the next frame of `class`; `expected_class`/`expected_id`
    /// name the message the caller is waiting on, for the timeout error.
    async fn await_class(&mut self, class: u8, expected_class: u8, expected_id: u8) -> Result<UbxFrame> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.read_until_class(class)).await {
            Ok(result) => result,
            Err(_) => {
                // A partial frame left behind would delay the next reply
                self.parser.clear();
                Err(SensorNodeError::Timeout {
                    class: expected_class,
                    id: expected_id,
                })
            }
        }
    }

    async fn read_until_class(&mut self, class: u8) -> Result<UbxFrame> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            while let Some(next) = self.parser.next_frame() {
                match next {
                    Ok(frame) if frame.class() == class => return Ok(frame),
                    Ok(frame) => debug!("Skipping UBX 0x{:02X} 0x{:02X}", frame.class(), frame.id()),
                    Err(e) => warn!("Discarding malformed receiver data: {}", e),
                }
            }

            let count = self.port.read(&mut chunk).await?;
            if count == 0 {
                return Err(SensorNodeError::Serial("Receiver port closed".to_string()));
            }
            self.parser.push(&chunk[..count]);
        }
    }
}
