//! RMCP / IPMI v1.5 LAN framing for sessionless (auth type none) messages.

use crate::checksum::{checksum, verify_checksum};
use crate::error::{Error, Result};
use crate::types::{MAX_PAYLOAD_LEN, MAX_WIRE_PAYLOAD_LEN, Message, SIX_BIT_MAX};
use crate::wire::{Reader, Writer};

/// RMCP header values.
pub(crate) const RMCP_VERSION: u8 = 0x06;
pub(crate) const RMCP_RESERVED: u8 = 0x00;
pub(crate) const RMCP_SEQ_NO_ACK: u8 = 0xFF;
pub(crate) const RMCP_CLASS_IPMI: u8 = 0x07;

/// IPMI v1.5 session header: auth type "none".
pub(crate) const AUTH_TYPE_NONE: u8 = 0x00;

/// BMC responder address.
pub(crate) const BMC_ADDR: u8 = 0x20;
/// Remote console software ID.
pub(crate) const REMOTE_SWID: u8 = 0x81;

pub(crate) const RMCP_HEADER_LEN: usize = 4;
pub(crate) const SESSION_HEADER_LEN: usize = 1 + 4 + 4;
pub(crate) const MESSAGE_HEADER_LEN: usize = 6;

/// Offset of the message length byte.
pub(crate) const BODY_LEN_OFFSET: usize = RMCP_HEADER_LEN + SESSION_HEADER_LEN;

/// RMCP + session + length byte + message header.
pub const MIN_FRAME_LEN: usize = BODY_LEN_OFFSET + 1 + MESSAGE_HEADER_LEN;

/// Exact size of the frame that encodes a payload of `payload_len` bytes.
pub const fn encoded_len(payload_len: usize) -> usize {
    MIN_FRAME_LEN + payload_len + 1
}

/// Encode a request frame into `buf`, returning the number of bytes written.
///
/// Only the low 6 bits of `seq` are placed on the wire; `msg.seq` is ignored.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for a NetFn above 0x3F or a payload that does not fit
///   the one-byte message length (more than [`MAX_WIRE_PAYLOAD_LEN`] bytes).
/// - [`Error::Capacity`] when `buf` is shorter than [`encoded_len`].
pub fn encode_request_into(msg: &Message, seq: u8, buf: &mut [u8]) -> Result<usize> {
    if msg.netfn > SIX_BIT_MAX {
        return Err(Error::InvalidArgument("netfn must be 6-bit"));
    }
    if msg.payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::InvalidArgument("payload longer than 256 bytes"));
    }
    if msg.payload.len() > MAX_WIRE_PAYLOAD_LEN {
        return Err(Error::InvalidArgument(
            "payload does not fit the message length field (max 248 bytes)",
        ));
    }

    let required = encoded_len(msg.payload.len());
    if buf.len() < required {
        return Err(Error::Capacity {
            required,
            available: buf.len(),
        });
    }

    let mut w = Writer::new(buf);

    w.put_slice(&[
        RMCP_VERSION,
        RMCP_RESERVED,
        RMCP_SEQ_NO_ACK,
        RMCP_CLASS_IPMI,
    ])?;

    // Sessionless: sequence and session ID are both zero.
    w.put_u8(AUTH_TYPE_NONE)?;
    w.put_u32_le(0)?;
    w.put_u32_le(0)?;

    // Checked above: at most 6 + 248 + 1 = 255.
    let body_len = (MESSAGE_HEADER_LEN + msg.payload.len() + 1) as u8;
    w.put_u8(body_len)?;

    let netfn_lun = msg.netfn << 2;
    w.put_u8(BMC_ADDR)?;
    w.put_u8(netfn_lun)?;
    w.put_u8(checksum(&[BMC_ADDR, netfn_lun]))?;

    let data_start = w.position();
    w.put_u8(REMOTE_SWID)?;
    w.put_u8((seq & SIX_BIT_MAX) << 2)?;
    w.put_u8(msg.cmd)?;
    w.put_slice(&msg.payload)?;
    let data_checksum = checksum(w.written_since(data_start));
    w.put_u8(data_checksum)?;

    Ok(w.position())
}

/// Encode a request frame into a freshly allocated buffer.
pub fn encode_request(msg: &Message, seq: u8) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; encoded_len(msg.payload.len().min(MAX_PAYLOAD_LEN))];
    let n = encode_request_into(msg, seq, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Decode and validate a response frame.
///
/// Validation fails fast, in wire order: minimum length, RMCP header, message length,
/// header checksum, payload length, data checksum. A frame with a non-zero auth type
/// is decoded with the sessionless layout and a warning is logged.
///
/// Bytes after the message body are ignored.
pub fn decode_response(bytes: &[u8]) -> Result<Message> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(Error::Protocol("packet too short"));
    }

    let mut r = Reader::new(bytes, "packet too short");

    let [version, _reserved, _rmcp_seq, class] = r.array::<4>()?;
    if version != RMCP_VERSION {
        return Err(Error::Protocol("unexpected RMCP version"));
    }
    if class != RMCP_CLASS_IPMI {
        return Err(Error::Protocol("unexpected RMCP class"));
    }

    let auth_type = r.u8()?;
    let _session_seq = r.u32_le()?;
    let _session_id = r.u32_le()?;
    if auth_type != AUTH_TYPE_NONE {
        tracing::warn!(
            auth_type,
            "authenticated IPMI session not supported; decoding as sessionless"
        );
    }

    let body_len = usize::from(r.u8()?);
    let body = r
        .bytes(body_len)
        .map_err(|_| Error::Protocol("message length exceeds packet"))?;

    let mut r = Reader::new(body, "message shorter than its header");

    let target_addr = r.u8()?;
    let netfn_lun = r.u8()?;
    let header_checksum = r.u8()?;
    if !verify_checksum(&[target_addr, netfn_lun], header_checksum) {
        return Err(Error::protocol_owned(format!(
            "header checksum mismatch: expected {:#04x}, got {header_checksum:#04x}",
            checksum(&[target_addr, netfn_lun])
        )));
    }

    let data_start = r.position();
    let _source_addr = r.u8()?;
    let seq_lun = r.u8()?;
    let cmd = r.u8()?;

    let payload_len = body_len
        .checked_sub(MESSAGE_HEADER_LEN + 1)
        .ok_or(Error::Protocol("message too short for data checksum"))?;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(Error::Protocol("payload larger than 256 bytes"));
    }
    let payload = r.bytes(payload_len)?;

    let data_checksum = r.u8()?;
    let covered = &body[data_start..r.position() - 1];
    if !verify_checksum(covered, data_checksum) {
        return Err(Error::protocol_owned(format!(
            "data checksum mismatch: expected {:#04x}, got {data_checksum:#04x}",
            checksum(covered)
        )));
    }

    Ok(Message {
        netfn: netfn_lun >> 2,
        cmd,
        seq: seq_lun >> 2,
        payload: payload.to_vec(),
    })
}
