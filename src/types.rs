use core::fmt;

/// Largest payload a [`Message`] may carry.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Largest payload that fits the one-byte message length field (`255 - 6 - 1`).
pub const MAX_WIRE_PAYLOAD_LEN: usize = 248;

/// Highest valid 6-bit NetFn or sequence value.
pub const SIX_BIT_MAX: u8 = 0x3F;

/// Network function codes.
pub mod netfn {
    /// Chassis requests.
    pub const CHASSIS: u8 = 0x00;
    /// Bridge requests.
    pub const BRIDGE: u8 = 0x02;
    /// Sensor/Event requests.
    pub const SENSOR_EVENT: u8 = 0x04;
    /// Application requests.
    pub const APP: u8 = 0x06;
    /// Firmware requests.
    pub const FIRMWARE: u8 = 0x08;
    /// Storage requests.
    pub const STORAGE: u8 = 0x0A;
    /// Transport requests.
    pub const TRANSPORT: u8 = 0x0C;

    /// Response NetFn for a request NetFn (low bit set).
    pub const fn response_of(request: u8) -> u8 {
        request | 0x01
    }
}

/// A protocol-level IPMI message, as exchanged with callers.
///
/// Requests carry the command payload; responses carry the completion code as
/// `payload[0]` followed by the response data.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// 6-bit network function.
    pub netfn: u8,
    /// Command code.
    pub cmd: u8,
    /// 6-bit sequence number. Assigned by the session on send, echoed by the BMC.
    pub seq: u8,
    /// Payload bytes (at most [`MAX_PAYLOAD_LEN`]).
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a request message. The sequence number is assigned when it is sent.
    pub fn request(netfn: u8, cmd: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            netfn,
            cmd,
            seq: 0,
            payload: payload.into(),
        }
    }

    /// Completion code of a response (`payload[0]`), if present.
    pub fn completion_code(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Response data after the completion code.
    pub fn data(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or_default()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("netfn", &format_args!("{:#04x}", self.netfn))
            .field("cmd", &format_args!("{:#04x}", self.cmd))
            .field("seq", &self.seq)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Parsed response for the `Get Device ID` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    /// Device ID (BMC-defined).
    pub device_id: u8,
    /// Device revision (low nibble of byte 2).
    pub device_revision: u8,
    /// Device provides Device SDRs (bit 7 of byte 2).
    pub provides_sdrs: bool,
    /// Firmware major revision (7 bits).
    pub firmware_major: u8,
    /// False while the device is in firmware update or self-initialization.
    pub device_available: bool,
    /// Firmware minor revision (BCD).
    pub firmware_minor: u8,
    /// IPMI version as BCD, least significant nibble first (0x02 is 2.0).
    pub ipmi_version: u8,
    /// Additional device support bitmask.
    pub additional_support: u8,
    /// Manufacturer ID (20-bit IANA number, sent least-significant byte first).
    pub manufacturer_id: u32,
    /// Product ID.
    pub product_id: u16,
    /// Auxiliary firmware revision. All zero when the BMC omits it.
    pub aux_firmware_revision: [u8; 4],
}

impl DeviceId {
    /// IPMI version as `(major, minor)`.
    pub fn ipmi_version_pair(&self) -> (u8, u8) {
        (self.ipmi_version & 0x0F, self.ipmi_version >> 4)
    }

    /// Well-known manufacturer name, if the IANA number is recognised.
    pub fn manufacturer_name(&self) -> Option<&'static str> {
        crate::debug::manufacturer_name(self.manufacturer_id)
    }
}

/// Parsed response for the `Get Self Test Results` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfTestResult {
    /// Self-test passed.
    Passed,
    /// Self-test is not implemented.
    NotImplemented,
    /// Device error details.
    DeviceError(SelfTestDeviceError),
    /// Fatal hardware error with a device-specific error code.
    FatalError(u8),
    /// Device-specific failure (code, detail).
    DeviceSpecific {
        /// Self-test result code.
        code: u8,
        /// Device-specific detail byte.
        detail: u8,
    },
}

/// Detailed device error flags from self-test result code 0x57.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestDeviceError {
    /// Firmware corrupted.
    pub firmware_corrupted: bool,
    /// Boot block corrupted.
    pub boot_block_corrupted: bool,
    /// FRU internal use area corrupted.
    pub fru_internal_corrupted: bool,
    /// SDR repository empty.
    pub sdr_repository_empty: bool,
    /// IPMB not responding.
    pub ipmb_not_responding: bool,
    /// Cannot access BMC FRU.
    pub bmc_fru_access_error: bool,
    /// Cannot access SDR repository.
    pub sdr_repository_access_error: bool,
    /// Cannot access SEL device.
    pub sel_access_error: bool,
}

impl From<u8> for SelfTestDeviceError {
    fn from(bits: u8) -> Self {
        let bit = |n: u8| bits & (1 << n) != 0;
        Self {
            firmware_corrupted: bit(0),
            boot_block_corrupted: bit(1),
            fru_internal_corrupted: bit(2),
            sdr_repository_empty: bit(3),
            ipmb_not_responding: bit(4),
            bmc_fru_access_error: bit(5),
            sdr_repository_access_error: bit(6),
            sel_access_error: bit(7),
        }
    }
}

/// Raw system GUID bytes as returned by `Get System GUID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemGuid {
    /// Raw GUID bytes.
    pub bytes: [u8; 16],
}

impl fmt::Display for SystemGuid {
    // IPMI sends the GUID with every field little-endian.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-",
            b[15], b[14], b[13], b[12], b[11], b[10], b[9], b[8], b[7], b[6]
        )?;
        for byte in b[..6].iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Power restore policy reported by `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRestorePolicy {
    /// Always remain off after AC loss.
    AlwaysOff,
    /// Restore previous power state after AC loss.
    Previous,
    /// Always power on after AC loss.
    AlwaysOn,
    /// Reserved or unknown value.
    Unknown(u8),
}

impl From<u8> for PowerRestorePolicy {
    fn from(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => Self::AlwaysOff,
            0x01 => Self::Previous,
            0x02 => Self::AlwaysOn,
            other => Self::Unknown(other),
        }
    }
}

/// Parsed response for the `Get Chassis Status` command.
///
/// The raw status bytes are kept; the accessors decode individual flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisStatus {
    /// Current power state byte.
    pub current_power_state: u8,
    /// Last power event byte.
    pub last_power_event: u8,
    /// Misc. chassis state byte.
    pub misc_chassis_state: u8,
    /// Front panel button capabilities byte; `0` when the BMC omits it.
    pub front_panel_button: u8,
}

impl ChassisStatus {
    /// System power is on.
    pub fn power_on(&self) -> bool {
        self.current_power_state & 0x01 != 0
    }

    /// Power overload.
    pub fn power_overload(&self) -> bool {
        self.current_power_state & 0x02 != 0
    }

    /// Power interlock active.
    pub fn power_interlock(&self) -> bool {
        self.current_power_state & 0x04 != 0
    }

    /// Main power fault detected.
    pub fn main_power_fault(&self) -> bool {
        self.current_power_state & 0x08 != 0
    }

    /// Power control fault detected.
    pub fn power_control_fault(&self) -> bool {
        self.current_power_state & 0x10 != 0
    }

    /// Power restore policy (bits 6:5 of the power state byte).
    pub fn power_restore_policy(&self) -> PowerRestorePolicy {
        PowerRestorePolicy::from(self.current_power_state >> 5)
    }

    /// Decoded last power event flags.
    pub fn last_power_event(&self) -> LastPowerEvent {
        let b = self.last_power_event;
        LastPowerEvent {
            ac_failed: b & 0x01 != 0,
            power_overload: b & 0x02 != 0,
            power_interlock: b & 0x04 != 0,
            power_fault: b & 0x08 != 0,
            power_on_command: b & 0x10 != 0,
        }
    }

    /// Chassis intrusion active.
    pub fn chassis_intrusion(&self) -> bool {
        self.misc_chassis_state & 0x01 != 0
    }

    /// Front panel lockout active.
    pub fn front_panel_lockout(&self) -> bool {
        self.misc_chassis_state & 0x02 != 0
    }

    /// Drive fault.
    pub fn drive_fault(&self) -> bool {
        self.misc_chassis_state & 0x04 != 0
    }

    /// Cooling/fan fault detected.
    pub fn cooling_fan_fault(&self) -> bool {
        self.misc_chassis_state & 0x08 != 0
    }

    /// Front panel control flags; `None` when the byte is absent or zero.
    pub fn front_panel_controls(&self) -> Option<FrontPanelControls> {
        let b = self.front_panel_button;
        if b == 0 {
            return None;
        }
        Some(FrontPanelControls {
            sleep_button_disable_allowed: b & 0x80 != 0,
            diag_button_disable_allowed: b & 0x40 != 0,
            reset_button_disable_allowed: b & 0x20 != 0,
            power_button_disable_allowed: b & 0x10 != 0,
            sleep_button_disabled: b & 0x08 != 0,
            diag_button_disabled: b & 0x04 != 0,
            reset_button_disabled: b & 0x02 != 0,
            power_button_disabled: b & 0x01 != 0,
        })
    }
}

/// Last power event flags reported by `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPowerEvent {
    /// AC failed.
    pub ac_failed: bool,
    /// Power overload.
    pub power_overload: bool,
    /// Power interlock activated.
    pub power_interlock: bool,
    /// Power fault.
    pub power_fault: bool,
    /// Power on command issued.
    pub power_on_command: bool,
}

/// Front panel controls (byte 4) from `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontPanelControls {
    /// Sleep button disable is allowed.
    pub sleep_button_disable_allowed: bool,
    /// Diagnostic button disable is allowed.
    pub diag_button_disable_allowed: bool,
    /// Reset button disable is allowed.
    pub reset_button_disable_allowed: bool,
    /// Power button disable is allowed.
    pub power_button_disable_allowed: bool,
    /// Sleep button is currently disabled.
    pub sleep_button_disabled: bool,
    /// Diagnostic button is currently disabled.
    pub diag_button_disabled: bool,
    /// Reset button is currently disabled.
    pub reset_button_disabled: bool,
    /// Power button is currently disabled.
    pub power_button_disabled: bool,
}

/// Chassis control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChassisControl {
    /// Power down the system.
    PowerDown = 0x00,
    /// Power up the system.
    PowerUp = 0x01,
    /// Power cycle the system.
    PowerCycle = 0x02,
    /// Hard reset the system.
    HardReset = 0x03,
    /// Pulse diagnostic interrupt.
    PulseDiagnostic = 0x04,
    /// ACPI soft shutdown.
    AcpiSoft = 0x05,
}

impl ChassisControl {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_data_skips_completion_code() {
        let msg = Message {
            netfn: 0x07,
            cmd: 0x01,
            seq: 3,
            payload: vec![0x00, 0xAA, 0xBB],
        };
        assert_eq!(msg.completion_code(), Some(0x00));
        assert_eq!(msg.data(), &[0xAA, 0xBB]);

        let empty = Message::request(netfn::APP, 0x01, Vec::new());
        assert_eq!(empty.completion_code(), None);
        assert!(empty.data().is_empty());
    }

    #[test]
    fn chassis_status_flags() {
        let status = ChassisStatus {
            current_power_state: 0x41,
            last_power_event: 0x10,
            misc_chassis_state: 0x09,
            front_panel_button: 0,
        };
        assert!(status.power_on());
        assert!(!status.power_overload());
        assert_eq!(status.power_restore_policy(), PowerRestorePolicy::AlwaysOn);
        assert!(status.last_power_event().power_on_command);
        assert!(status.chassis_intrusion());
        assert!(status.cooling_fan_fault());
        assert!(!status.drive_fault());
        assert_eq!(status.front_panel_controls(), None);
    }

    #[test]
    fn system_guid_display_reverses_fields() {
        let mut bytes = [0u8; 16];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let guid = SystemGuid { bytes };
        assert_eq!(guid.to_string(), "0f0e0d0c-0b0a-0908-0706-050403020100");
    }
}
