//! # Sensor Node Module
//!
//! Owns every sensor and telemetry sink and drives them through the node
//! lifecycle:
//!
//! ```text
//! Initializing --calibrated, receiver configured--> Running
//!       |
//!       +--calibration fault / receiver absent--> Halted(Fault)
//! ```
//!
//! `Halted` is terminal. A halted node refuses to poll until the process is
//! restarted.

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SensorNodeError};
use crate::gas::calibration::{BaselineResistance, CalibrationEngine, CalibrationFault, CalibrationState};
use crate::gas::model::{GasReading, PowerLawModel};
use crate::gnss::{mm_per_s_to_km_per_h, GnssReceiver};
use crate::sensors::{GasSensor, Thermocouple};
use crate::serial::port_trait::SerialPortIO;
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::ubx::aiding::AidingFix;

/// Reason a node halted
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Gas sensor calibration found an open or shorted input
    Calibration(CalibrationFault),
    /// GNSS receiver did not answer at startup
    DeviceAbsent(String),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Calibration(fault) => write!(f, "Connection issue, {}", fault),
            Fault::DeviceAbsent(reason) => write!(
                f,
                "u-blox GNSS not detected ({}), check wiring",
                reason
            ),
        }
    }
}

/// Node lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Initializing,
    Running,
    Halted(Fault),
}

/// Delays and rates used by the node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTiming {
    /// Wait before touching any sensor
    pub startup_delay: Duration,
    /// Thermocouple settle time after power-up
    pub settle: Duration,
    /// Minimum spacing between ground speed polls
    pub gnss_interval: Duration,
}

impl Default for NodeTiming {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(5000),
            settle: Duration::from_millis(5000),
            gnss_interval: Duration::from_millis(1000),
        }
    }
}

/// The hydrogen vehicle sensor node
pub struct SensorNode<T: Thermocouple, G: GasSensor, P: SerialPortIO> {
    state: NodeState,
    thermocouple: T,
    gas: G,
    model: PowerLawModel,
    clean_air_ratio: f64,
    r0: Option<BaselineResistance>,
    gnss: Option<GnssReceiver<P>>,
    aiding: Option<AidingFix>,
    sinks: Vec<Box<dyn TelemetrySink>>,
    timing: NodeTiming,
    last_gnss_poll: Option<Instant>,
}

impl<T: Thermocouple, G: GasSensor, P: SerialPortIO> SensorNode<T, G, P> {
    /// Create a node without GNSS and without sinks
    ///
    /// # Arguments
    ///
    /// * `thermocouple` - Engine/cell temperature probe
    /// * `gas` - MQ-8 on its analog divider
    /// * `model` - Power-law coefficients for the ppm estimate
    /// * `clean_air_ratio` - Datasheet RS/R0 in clean air
    pub fn new(thermocouple: T, gas: G, model: PowerLawModel, clean_air_ratio: f64) -> Self {
        Self {
            state: NodeState::Initializing,
            thermocouple,
            gas,
            model,
            clean_air_ratio,
            r0: None,
            gnss: None,
            aiding: None,
            sinks: Vec::new(),
            timing: NodeTiming::default(),
            last_gnss_poll: None,
        }
    }

    /// Attach the GNSS receiver, optionally with a fix to aid it with
    pub fn with_gnss(mut self, receiver: GnssReceiver<P>, aiding: Option<AidingFix>) -> Self {
        self.gnss = Some(receiver);
        self.aiding = aiding;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_timing(mut self, timing: NodeTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// R0 once calibration succeeded
    pub fn baseline(&self) -> Option<BaselineResistance> {
        self.r0
    }

    /// Calibrate the gas sensor and bring up the receiver
    ///
    /// Faults do not surface as errors: they move the node to `Halted` and
    /// are reported to every sink. Check `state()` afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Halted` if the node already halted, and propagates sensor
    /// I/O errors hit while calibrating.
    pub async fn initialize(&mut self) -> Result<&NodeState> {
        match &self.state {
            NodeState::Initializing => {}
            NodeState::Running => return Ok(&self.state),
            NodeState::Halted(fault) => return Err(SensorNodeError::Halted(fault.clone())),
        }

        if !self.timing.startup_delay.is_zero() {
            info!("Waiting {:?} before sensor startup", self.timing.startup_delay);
            sleep(self.timing.startup_delay).await;
        }
        sleep(self.timing.settle).await;

        info!("Calibrating gas sensor in clean air...");
        let mut engine = CalibrationEngine::new(self.clean_air_ratio);
        match engine.run(&mut self.gas)? {
            CalibrationState::Ready(r0) => self.r0 = Some(r0),
            CalibrationState::Faulted(fault) => {
                self.halt(Fault::Calibration(fault));
                return Ok(&self.state);
            }
            other => {
                return Err(SensorNodeError::Sensor(format!(
                    "calibration stopped in {:?}",
                    other
                )))
            }
        }

        if let Some(gnss) = self.gnss.as_mut() {
            if let Err(e) = configure_receiver(gnss, self.aiding.as_ref()).await {
                match e {
                    SensorNodeError::DeviceAbsent(reason) => {
                        self.halt(Fault::DeviceAbsent(reason));
                        return Ok(&self.state);
                    }
                    other => return Err(other),
                }
            }
        }

        self.state = NodeState::Running;
        info!("Sensor node running");
        Ok(&self.state)
    }

    /// Read every sensor once and report the results to the sinks
    ///
    /// Ground speed is read at most once per `gnss_interval`. Read anomalies
    /// are logged and the corresponding record is skipped.
    ///
    /// # Errors
    ///
    /// `Halted` on a halted node (no sensor is touched), `NotInitialized`
    /// before `initialize` succeeded.
    pub async fn poll(&mut self) -> Result<Vec<TelemetryRecord>> {
        let r0 = match (&self.state, self.r0) {
            (NodeState::Halted(fault), _) => return Err(SensorNodeError::Halted(fault.clone())),
            (NodeState::Running, Some(r0)) => r0,
            _ => return Err(SensorNodeError::NotInitialized),
        };

        let mut records = Vec::new();

        match self.thermocouple.read_celsius() {
            Ok(celsius) => records.push(TelemetryRecord::Temperature { celsius }),
            Err(e) => warn!("Thermocouple read failed: {}", e),
        }

        match self.gas.update() {
            Ok(()) => {
                let reading = GasReading::compute(self.gas.resistance(), r0, &self.model);
                records.push(TelemetryRecord::Gas(reading));
            }
            Err(e) => warn!("Gas sensor read failed: {}", e),
        }

        if let Some(gnss) = self.gnss.as_mut() {
            let now = Instant::now();
            let due = self
                .last_gnss_poll
                .map_or(true, |last| now.duration_since(last) >= self.timing.gnss_interval);

            if due {
                self.last_gnss_poll = Some(now);
                match gnss.ground_speed_mm_s().await {
                    Ok(mm_per_s) => records.push(TelemetryRecord::GroundSpeed {
                        mm_per_s,
                        km_per_h: mm_per_s_to_km_per_h(mm_per_s),
                    }),
                    Err(e) => warn!("Ground speed poll failed: {}", e),
                }
            } else {
                debug!("Ground speed poll skipped, interval not elapsed");
            }
        }

        for record in &records {
            for sink in self.sinks.iter_mut() {
                if let Err(e) = sink.record(record) {
                    warn!("Telemetry sink failed: {}", e);
                }
            }
        }

        Ok(records)
    }

    fn halt(&mut self, fault: Fault) {
        error!("Node halted: {}", fault);

        let message = fault.to_string();
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.diagnostic(&message) {
                warn!("Telemetry sink failed: {}", e);
            }
        }

        self.state = NodeState::Halted(fault);
    }
}

/// Detect the receiver, then configure and aid it
///
/// Only detection is fatal; the receiver stays usable with its stored
/// configuration if a later step is rejected.
async fn configure_receiver<P: SerialPortIO>(
    gnss: &mut GnssReceiver<P>,
    aiding: Option<&AidingFix>,
) -> Result<()> {
    gnss.begin().await?;

    if let Err(e) = gnss.set_output_ubx_only().await {
        warn!("Could not restrict receiver output to UBX: {}", e);
    }
    if let Err(e) = gnss.save_configuration().await {
        warn!("Could not save receiver configuration: {}", e);
    }
    if let Some(fix) = aiding {
        if let Err(e) = gnss.send_aiding(fix).await {
            warn!("Could not send aiding data: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{MockGasSensor, MockThermocouple};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::ubx::aiding::AidingTime;
    use crate::ubx::decoder::decode_frame;
    use crate::ubx::encoder::encode;
    use crate::ubx::protocol::*;
    use std::sync::{Arc, Mutex};

    type TestNode = SensorNode<MockThermocouple, MockGasSensor, MockSerialPort>;

    const NO_DELAYS: NodeTiming = NodeTiming {
        startup_delay: Duration::ZERO,
        settle: Duration::ZERO,
        gnss_interval: Duration::from_millis(1000),
    };

    #[derive(Clone, Default)]
    struct RecordingSink {
        records: Arc<Mutex<Vec<TelemetryRecord>>>,
        diagnostics: Arc<Mutex<Vec<String>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn record(&mut self, record: &TelemetryRecord) -> Result<()> {
            self.records.lock().unwrap().push(*record);
            Ok(())
        }

        fn diagnostic(&mut self, message: &str) -> Result<()> {
            self.diagnostics.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    /// Gas sensor whose calibration samples are all `sample` and whose
    /// resistance reads `resistance`
    fn gas_sensor(sample: f64, resistance: f64) -> MockGasSensor {
        let mut gas = MockGasSensor::new();
        gas.expect_update().returning(|| Ok(()));
        gas.expect_calibration_ratio().returning(move |_| sample);
        gas.expect_resistance().returning(move || resistance);
        gas
    }

    fn thermocouple(celsius: f64) -> MockThermocouple {
        let mut thermocouple = MockThermocouple::new();
        thermocouple.expect_read_celsius().returning(move || Ok(celsius));
        thermocouple
    }

    fn node(thermocouple: MockThermocouple, gas: MockGasSensor) -> TestNode {
        SensorNode::new(thermocouple, gas, PowerLawModel::default(), 70.0).with_timing(NO_DELAYS)
    }

    fn aiding_fix() -> AidingFix {
        AidingFix {
            latitude_deg: 41.0082,
            longitude_deg: 28.9784,
            altitude_m: 50.0,
            time: AidingTime {
                year: 2025,
                month: 6,
                day: 30,
                hour: 12,
                minute: 0,
                second: 0,
            },
        }
    }

    fn queue_receiver_startup(port: &MockSerialPort) {
        let mut port_config = vec![0u8; UBX_CFG_PRT_PAYLOAD_SIZE];
        port_config[0] = 1;
        port_config[14] = 0x03;
        let reply = encode(UBX_CLASS_CFG, UBX_CFG_PRT, &port_config).unwrap();

        port.queue_response(&reply); // begin
        port.queue_response(&reply); // set_output_ubx_only
        port.queue_response(&encode(UBX_CLASS_ACK, UBX_ACK_ACK, &[UBX_CLASS_CFG, UBX_CFG_PRT]).unwrap());
        port.queue_response(&encode(UBX_CLASS_ACK, UBX_ACK_ACK, &[UBX_CLASS_CFG, UBX_CFG_CFG]).unwrap());
    }

    fn nav_pvt(ground_speed: i32) -> Vec<u8> {
        let mut payload = vec![0u8; UBX_NAV_PVT_PAYLOAD_SIZE];
        payload[UBX_NAV_PVT_GSPEED_OFFSET..UBX_NAV_PVT_GSPEED_OFFSET + 4]
            .copy_from_slice(&ground_speed.to_le_bytes());
        encode(UBX_CLASS_NAV, UBX_NAV_PVT, &payload).unwrap()
    }

    fn receiver(port: &MockSerialPort) -> GnssReceiver<MockSerialPort> {
        GnssReceiver::new(port.clone(), 1, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_initialize_without_gnss_runs() {
        let mut node = node(thermocouple(25.0), gas_sensor(1.0, 1.0));

        assert_eq!(*node.initialize().await.unwrap(), NodeState::Running);
        assert_eq!(node.baseline().unwrap().value(), 1.0);
    }

    #[tokio::test]
    async fn test_poll_reports_temperature_and_gas() {
        let sink = RecordingSink::default();
        let mut node = node(thermocouple(23.25), gas_sensor(1.0, 2.0)).with_sink(Box::new(sink.clone()));
        node.initialize().await.unwrap();

        let records = node.poll().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TelemetryRecord::Temperature { celsius: 23.25 });
        match records[1] {
            TelemetryRecord::Gas(reading) => {
                assert_eq!(reading.ratio, 2.0);
                assert!((reading.ppm - 606.4).abs() < 0.5);
            }
            other => panic!("Expected gas record, got: {:?}", other),
        }
        assert_eq!(*sink.records.lock().unwrap(), records);
    }

    #[tokio::test]
    async fn test_open_circuit_calibration_halts() {
        let sink = RecordingSink::default();
        let mut node =
            node(thermocouple(25.0), gas_sensor(f64::INFINITY, 0.0)).with_sink(Box::new(sink.clone()));

        let state = node.initialize().await.unwrap().clone();

        assert_eq!(state, NodeState::Halted(Fault::Calibration(CalibrationFault::OpenCircuit)));
        let diagnostics = sink.diagnostics.lock().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("open circuit"));
    }

    #[tokio::test]
    async fn test_short_circuit_calibration_halts() {
        let mut node = node(thermocouple(25.0), gas_sensor(0.0, 0.0));

        assert_eq!(
            *node.initialize().await.unwrap(),
            NodeState::Halted(Fault::Calibration(CalibrationFault::ShortCircuit))
        );
    }

    #[tokio::test]
    async fn test_halted_node_touches_no_sensor() {
        // Thermocouple with no expectations: any read would panic
        let mut node = node(MockThermocouple::new(), gas_sensor(0.0, 0.0));
        node.initialize().await.unwrap();

        match node.poll().await {
            Err(SensorNodeError::Halted(Fault::Calibration(CalibrationFault::ShortCircuit))) => {}
            other => panic!("Expected Halted, got: {:?}", other),
        }
        assert!(matches!(node.initialize().await, Err(SensorNodeError::Halted(_))));
    }

    #[test]
    fn test_poll_before_initialize() {
        let mut node = node(MockThermocouple::new(), MockGasSensor::new());

        let result = tokio_test::block_on(node.poll());
        assert!(matches!(result, Err(SensorNodeError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_calibration_io_error_propagates() {
        let mut gas = MockGasSensor::new();
        gas.expect_update()
            .returning(|| Err(SensorNodeError::Sensor("adc missing".to_string())));
        let mut node = node(thermocouple(25.0), gas);

        assert!(matches!(node.initialize().await, Err(SensorNodeError::Sensor(_))));
        assert_eq!(*node.state(), NodeState::Initializing);
    }

    #[tokio::test]
    async fn test_thermocouple_failure_skips_record() {
        let mut thermocouple = MockThermocouple::new();
        thermocouple
            .expect_read_celsius()
            .returning(|| Err(SensorNodeError::Sensor("open thermocouple".to_string())));
        let mut node = node(thermocouple, gas_sensor(1.0, 1.0));
        node.initialize().await.unwrap();

        let records = node.poll().await.unwrap();

        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], TelemetryRecord::Gas(_)));
    }

    #[tokio::test]
    async fn test_absent_receiver_halts() {
        let port = MockSerialPort::new();
        let sink = RecordingSink::default();
        let mut node = node(thermocouple(25.0), gas_sensor(1.0, 1.0))
            .with_gnss(receiver(&port), None)
            .with_sink(Box::new(sink.clone()));

        match node.initialize().await.unwrap() {
            NodeState::Halted(Fault::DeviceAbsent(_)) => {}
            other => panic!("Expected DeviceAbsent halt, got: {:?}", other),
        }
        assert!(sink.diagnostics.lock().unwrap()[0].contains("GNSS not detected"));
    }

    #[tokio::test]
    async fn test_receiver_startup_sequence() {
        let port = MockSerialPort::new();
        queue_receiver_startup(&port);
        let mut node = node(thermocouple(25.0), gas_sensor(1.0, 1.0))
            .with_gnss(receiver(&port), Some(aiding_fix()));

        assert_eq!(*node.initialize().await.unwrap(), NodeState::Running);

        let written: Vec<UbxFrame> = port
            .get_written_data()
            .iter()
            .map(|bytes| decode_frame(bytes).unwrap())
            .collect();
        assert_eq!(written.len(), 5);
        assert!(written[0].is(UBX_CLASS_CFG, UBX_CFG_PRT));
        assert!(written[1].is(UBX_CLASS_CFG, UBX_CFG_PRT));
        assert!(written[2].is(UBX_CLASS_CFG, UBX_CFG_PRT));
        assert!(written[3].is(UBX_CLASS_CFG, UBX_CFG_CFG));
        assert!(written[4].is(UBX_CLASS_AID, UBX_AID_INI));
        assert_eq!(written[4].payload().len(), 48);
    }

    #[tokio::test]
    async fn test_ground_speed_is_rate_limited() {
        let port = MockSerialPort::new();
        queue_receiver_startup(&port);
        let mut node = node(thermocouple(25.0), gas_sensor(1.0, 1.0)).with_gnss(receiver(&port), None);
        node.initialize().await.unwrap();

        port.queue_response(&nav_pvt(27_778));
        let first = node.poll().await.unwrap();
        assert_eq!(
            first[2],
            TelemetryRecord::GroundSpeed {
                mm_per_s: 27_778,
                km_per_h: 100
            }
        );

        let polls_before = port.get_written_data().len();
        let second = node.poll().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(port.get_written_data().len(), polls_before);
    }

    #[tokio::test]
    async fn test_ground_speed_timeout_is_not_fatal() {
        let port = MockSerialPort::new();
        queue_receiver_startup(&port);
        let mut node = node(thermocouple(25.0), gas_sensor(1.0, 1.0)).with_gnss(receiver(&port), None);
        node.initialize().await.unwrap();

        let records = node.poll().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(*node.state(), NodeState::Running);
    }

    #[test]
    fn test_fault_messages() {
        let open = Fault::Calibration(CalibrationFault::OpenCircuit).to_string();
        assert!(open.starts_with("Connection issue"));
        assert!(open.contains("open circuit"));

        let absent = Fault::DeviceAbsent("no reply".to_string()).to_string();
        assert!(absent.contains("no reply"));
    }
}
