//! Typed IPMI commands and their response decoders.
//!
//! Each command knows its NetFn and command number, encodes its request data and
//! decodes the response payload, starting with the completion code.
//!
//! ```
//! use bmc_ipmi::Message;
//! use bmc_ipmi::commands::{Command, GetDeviceId};
//!
//! let request = GetDeviceId.request();
//! assert_eq!((request.netfn, request.cmd), (0x06, 0x01));
//!
//! let busy = Message::request(0x07, 0x01, vec![0xC0]);
//! let err = GetDeviceId.parse_response(&busy).unwrap_err();
//! assert_eq!(err.completion_code(), Some(0xC0));
//! ```

use crate::error::{Error, Result};
use crate::types::{
    ChassisControl, ChassisStatus, DeviceId, Message, SelfTestDeviceError, SelfTestResult,
    SystemGuid, netfn,
};
use crate::wire::Reader;

/// A typed IPMI command (single request/response).
pub trait Command {
    /// Parsed output type.
    type Output;

    /// Network Function (NetFn) for the request.
    const NETFN: u8;

    /// Command number.
    const CMD: u8;

    /// Encode request payload bytes (excluding NetFn/Cmd framing).
    fn request_data(&self) -> Vec<u8>;

    /// Parse a response message into the typed output.
    fn parse_response(&self, response: &Message) -> Result<Self::Output>;

    /// Build the request message for this command.
    fn request(&self) -> Message {
        Message::request(Self::NETFN, Self::CMD, self.request_data())
    }
}

/// Check the completion code and return the data that follows it.
pub(crate) fn ok_data(response: &Message) -> Result<&[u8]> {
    match response.completion_code() {
        None => Err(Error::Protocol("response missing completion code")),
        Some(0x00) => Ok(response.data()),
        Some(completion_code) => Err(Error::CompletionCode { completion_code }),
    }
}

/// `Get Device ID` (App NetFn, cmd 0x01).
#[derive(Debug, Clone, Copy)]
pub struct GetDeviceId;

impl Command for GetDeviceId {
    type Output = DeviceId;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = 0x01;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        parse_device_id(ok_data(response)?)
    }
}

/// `Cold Reset` (App NetFn, cmd 0x02).
#[derive(Debug, Clone, Copy)]
pub struct ColdReset;

impl Command for ColdReset {
    type Output = ();
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = 0x02;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        ok_data(response).map(drop)
    }
}

/// `Warm Reset` (App NetFn, cmd 0x03).
#[derive(Debug, Clone, Copy)]
pub struct WarmReset;

impl Command for WarmReset {
    type Output = ();
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = 0x03;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        ok_data(response).map(drop)
    }
}

/// `Get Self Test Results` (App NetFn, cmd 0x04).
#[derive(Debug, Clone, Copy)]
pub struct GetSelfTestResults;

impl Command for GetSelfTestResults {
    type Output = SelfTestResult;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = 0x04;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        parse_self_test_result(ok_data(response)?)
    }
}

/// `Get System GUID` (App NetFn, cmd 0x37).
#[derive(Debug, Clone, Copy)]
pub struct GetSystemGuid;

impl Command for GetSystemGuid {
    type Output = SystemGuid;
    const NETFN: u8 = netfn::APP;
    const CMD: u8 = 0x37;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        let mut r = Reader::new(ok_data(response)?, "Get System GUID response too short");
        Ok(SystemGuid { bytes: r.array()? })
    }
}

/// `Get Chassis Status` (Chassis NetFn, cmd 0x01).
#[derive(Debug, Clone, Copy)]
pub struct GetChassisStatus;

impl Command for GetChassisStatus {
    type Output = ChassisStatus;
    const NETFN: u8 = netfn::CHASSIS;
    const CMD: u8 = 0x01;

    fn request_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        parse_chassis_status(ok_data(response)?)
    }
}

/// `Chassis Control` (Chassis NetFn, cmd 0x02).
#[derive(Debug, Clone, Copy)]
pub struct ChassisControlCommand {
    /// Control operation.
    pub control: ChassisControl,
}

impl Command for ChassisControlCommand {
    type Output = ();
    const NETFN: u8 = netfn::CHASSIS;
    const CMD: u8 = 0x02;

    fn request_data(&self) -> Vec<u8> {
        vec![self.control.as_u8()]
    }

    fn parse_response(&self, response: &Message) -> Result<Self::Output> {
        ok_data(response).map(drop)
    }
}

pub(crate) fn parse_device_id(data: &[u8]) -> Result<DeviceId> {
    let mut r = Reader::new(data, "Get Device ID response too short");

    let device_id = r.u8()?;
    let revision = r.u8()?;
    let firmware_major = r.u8()?;
    let firmware_minor = r.u8()?;
    let ipmi_version = r.u8()?;
    let additional_support = r.u8()?;
    let manufacturer_id = r.u24_le()?;
    let product_id = r.u16_le()?;
    let aux_firmware_revision = r.optional_array::<4>().unwrap_or_default();

    Ok(DeviceId {
        device_id,
        device_revision: revision & 0x0F,
        provides_sdrs: revision & 0x80 != 0,
        firmware_major: firmware_major & 0x7F,
        device_available: firmware_major & 0x80 == 0,
        firmware_minor,
        ipmi_version,
        additional_support,
        manufacturer_id,
        product_id,
        aux_firmware_revision,
    })
}

pub(crate) fn parse_self_test_result(data: &[u8]) -> Result<SelfTestResult> {
    let mut r = Reader::new(data, "Get Self Test Results response too short");
    let code = r.u8()?;
    let detail = r.u8()?;

    Ok(match code {
        0x55 => SelfTestResult::Passed,
        0x56 => SelfTestResult::NotImplemented,
        0x57 => SelfTestResult::DeviceError(SelfTestDeviceError::from(detail)),
        0x58 => SelfTestResult::FatalError(detail),
        _ => SelfTestResult::DeviceSpecific { code, detail },
    })
}

pub(crate) fn parse_chassis_status(data: &[u8]) -> Result<ChassisStatus> {
    let mut r = Reader::new(data, "Get Chassis Status response too short");

    Ok(ChassisStatus {
        current_power_state: r.u8()?,
        last_power_event: r.u8()?,
        misc_chassis_state: r.u8()?,
        front_panel_button: r.u8().unwrap_or(0),
    })
}
