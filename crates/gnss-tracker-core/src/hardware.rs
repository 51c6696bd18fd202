//! Peripheral discovery
//!
//! Board firmware tries to bring up every peripheral it knows about and hands
//! each result to [`TrackerHardware`]. A part that fails to initialize is
//! logged and left out; the tracker runs with whatever is present.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{info, warn};

use crate::sensors::{Capability, CapabilitySet, GnssReceiver, Peripheral, SensorError};

/// The set of peripherals that initialized successfully.
pub struct TrackerHardware<'a> {
    peripherals: Vec<Box<dyn Peripheral + 'a>>,
    gnss: Option<Box<dyn GnssReceiver + 'a>>,
}

impl Default for TrackerHardware<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TrackerHardware<'a> {
    pub fn new() -> Self {
        Self {
            peripherals: Vec::new(),
            gnss: None,
        }
    }

    /// Attach a peripheral from its initialization result.
    ///
    /// Returns `false` when initialization failed or when the peripheral
    /// provides a capability another attached peripheral already covers.
    pub fn attach<P>(&mut self, peripheral: Result<P, SensorError>) -> bool
    where
        P: Peripheral + 'a,
    {
        let peripheral = match peripheral {
            Ok(peripheral) => peripheral,
            Err(e) => {
                warn!("Peripheral unavailable: {}", e);
                return false;
            }
        };

        let provided = peripheral.capabilities();
        if provided.is_empty() {
            warn!("{} reports no capabilities, ignoring", peripheral.name());
            return false;
        }
        if self.sampled_capabilities().intersects(provided) {
            warn!(
                "{} duplicates an attached capability ({}), ignoring",
                peripheral.name(),
                provided
            );
            return false;
        }

        info!("{} attached: {}", peripheral.name(), provided);
        self.peripherals.push(Box::new(peripheral));
        true
    }

    /// Attach the GNSS receiver. Only one receiver is supported.
    pub fn attach_gnss<G>(&mut self, receiver: Result<G, SensorError>) -> bool
    where
        G: GnssReceiver + 'a,
    {
        match receiver {
            Ok(receiver) if self.gnss.is_none() => {
                info!("{} attached: gnss", receiver.name());
                self.gnss = Some(Box::new(receiver));
                true
            }
            Ok(receiver) => {
                warn!("{} ignored, a GNSS receiver is already attached", receiver.name());
                false
            }
            Err(e) => {
                warn!("GNSS receiver unavailable: {}", e);
                false
            }
        }
    }

    fn sampled_capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::empty();
        for peripheral in &self.peripherals {
            set.extend(peripheral.capabilities());
        }
        set
    }

    /// Every capability present, GNSS included.
    pub fn capabilities(&self) -> CapabilitySet {
        let mut set = self.sampled_capabilities();
        if self.gnss.is_some() {
            set.insert(Capability::Gnss);
        }
        set
    }

    pub fn peripheral_count(&self) -> usize {
        self.peripherals.len()
    }

    pub fn peripherals(&self) -> impl Iterator<Item = &(dyn Peripheral + 'a)> {
        self.peripherals.iter().map(|p| p.as_ref())
    }

    pub fn peripherals_mut(&mut self) -> impl Iterator<Item = &mut (dyn Peripheral + 'a)> {
        self.peripherals.iter_mut().map(|p| p.as_mut())
    }

    pub fn gnss(&self) -> Option<&(dyn GnssReceiver + 'a)> {
        self.gnss.as_deref()
    }

    pub fn gnss_mut(&mut self) -> Option<&mut (dyn GnssReceiver + 'a)> {
        self.gnss.as_deref_mut()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;
    use embassy_time::Duration;

    /// Peripheral double; the shared cells stay readable after the
    /// peripheral is moved into the hardware set.
    pub(crate) struct FakePeripheral {
        pub(crate) name: &'static str,
        pub(crate) capabilities: CapabilitySet,
        pub(crate) started: Rc<Cell<Option<Duration>>>,
        pub(crate) stopped: Rc<Cell<bool>>,
        pub(crate) fail_start: bool,
    }

    impl FakePeripheral {
        pub(crate) fn new(name: &'static str, capabilities: &[Capability]) -> Self {
            Self {
                name,
                capabilities: capabilities.iter().copied().collect(),
                started: Rc::new(Cell::new(None)),
                stopped: Rc::new(Cell::new(false)),
                fail_start: false,
            }
        }
    }

    impl Peripheral for FakePeripheral {
        fn name(&self) -> &'static str {
            self.name
        }

        fn capabilities(&self) -> CapabilitySet {
            self.capabilities
        }

        fn start_updating(&mut self, interval: Duration) -> Result<(), SensorError> {
            if self.fail_start {
                return Err(SensorError::StartFailed {
                    sensor: self.name,
                    details: "bus timeout",
                });
            }
            self.started.set(Some(interval));
            Ok(())
        }

        fn stop_updating(&mut self) {
            self.stopped.set(true);
        }
    }

    pub(crate) struct FakeReceiver {
        pub(crate) started: Rc<Cell<bool>>,
    }

    impl FakeReceiver {
        pub(crate) fn new() -> Self {
            Self {
                started: Rc::new(Cell::new(false)),
            }
        }
    }

    impl GnssReceiver for FakeReceiver {
        fn name(&self) -> &'static str {
            "NEO-M8"
        }

        fn start_updating(&mut self) -> Result<(), SensorError> {
            self.started.set(true);
            Ok(())
        }

        fn stop_updating(&mut self) {
            self.started.set(false);
        }
    }

    fn not_found(sensor: &'static str) -> SensorError {
        SensorError::InitializationFailed {
            sensor,
            details: "no ACK at address",
        }
    }

    #[test]
    fn test_failed_peripheral_is_absent() {
        let mut hardware = TrackerHardware::new();
        assert!(hardware.attach(Ok(FakePeripheral::new(
            "BME688",
            &[Capability::Temperature, Capability::Humidity]
        ))));
        assert!(!hardware.attach(Err::<FakePeripheral, _>(not_found("SCD40"))));

        let caps = hardware.capabilities();
        assert!(caps.contains(Capability::Temperature));
        assert!(!caps.contains(Capability::Co2));
        assert_eq!(hardware.peripheral_count(), 1);
    }

    #[test]
    fn test_overlapping_capability_is_rejected() {
        let mut hardware = TrackerHardware::new();
        assert!(hardware.attach(Ok(FakePeripheral::new(
            "BME688",
            &[Capability::Temperature, Capability::Pressure]
        ))));
        assert!(!hardware.attach(Ok(FakePeripheral::new(
            "SHT40",
            &[Capability::Temperature, Capability::Humidity]
        ))));
        assert!(!hardware.capabilities().contains(Capability::Humidity));
    }

    #[test]
    fn test_gnss_capability_follows_receiver() {
        let mut hardware = TrackerHardware::new();
        assert!(!hardware.capabilities().contains(Capability::Gnss));

        assert!(hardware.attach_gnss(Ok(FakeReceiver::new())));
        assert!(!hardware.attach_gnss(Ok(FakeReceiver::new())));
        assert!(hardware.capabilities().contains(Capability::Gnss));
        assert_eq!(hardware.gnss().map(|g| g.name()), Some("NEO-M8"));
    }
}
