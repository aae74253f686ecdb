//! Packet diagnostics: hex dumps, frame analysis and name lookups.

use std::fmt::Write as _;

use crate::protocol::{
    AUTH_TYPE_NONE, BMC_ADDR, BODY_LEN_OFFSET, MESSAGE_HEADER_LEN, MIN_FRAME_LEN, RMCP_CLASS_IPMI,
    RMCP_SEQ_NO_ACK, RMCP_VERSION,
};
use crate::types::netfn;

/// Emit a one-line hex dump at trace level when `enabled`.
pub(crate) fn dump_hex(enabled: bool, label: &str, bytes: &[u8]) {
    if !dumps_active(enabled) {
        return;
    }
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, " {b:02x}");
    }
    tracing::trace!(len = bytes.len(), "{label}:{out}");
    tracing::trace!("\n{}", describe_frame(bytes));
}

/// Dumps are formatted only when requested and a subscriber wants trace events.
fn dumps_active(enabled: bool) -> bool {
    enabled && tracing::enabled!(tracing::Level::TRACE)
}

/// Human-readable name of a NetFn (request or response variant).
pub fn netfn_name(netfn: u8) -> &'static str {
    match netfn & !0x01 {
        netfn::CHASSIS => "Chassis",
        netfn::BRIDGE => "Bridge",
        netfn::SENSOR_EVENT => "Sensor/Event",
        netfn::APP => "App",
        netfn::FIRMWARE => "Firmware",
        netfn::STORAGE => "Storage",
        netfn::TRANSPORT => "Transport",
        _ => "Unknown",
    }
}

/// Human-readable name of a command this crate knows about.
pub fn command_name(netfn: u8, cmd: u8) -> &'static str {
    match (netfn & !0x01, cmd) {
        (netfn::APP, 0x01) => "Get Device ID",
        (netfn::APP, 0x02) => "Cold Reset",
        (netfn::APP, 0x03) => "Warm Reset",
        (netfn::APP, 0x04) => "Get Self Test Results",
        (netfn::APP, 0x37) => "Get System GUID",
        (netfn::CHASSIS, 0x01) => "Get Chassis Status",
        (netfn::CHASSIS, 0x02) => "Chassis Control",
        (netfn::SENSOR_EVENT, 0x2D) => "Get Sensor Reading",
        (netfn::STORAGE, 0x40) => "Get SEL Info",
        _ => "Unknown",
    }
}

/// Name of a well-known BMC vendor by IANA enterprise number.
pub fn manufacturer_name(id: u32) -> Option<&'static str> {
    Some(match id {
        0x000157 => "Intel",
        0x0002A2 => "IBM",
        0x00000B => "HP",
        0x0019A9 => "Dell",
        0x00004D => "Fujitsu",
        0x0000B4 => "Advantech",
        _ => return None,
    })
}

/// Classic 16-bytes-per-row hex dump with offsets and an ASCII gutter.
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}: ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

/// Layer-by-layer description of an RMCP/IPMI frame.
///
/// Unlike [`decode_response`](crate::decode_response) this never fails: malformed or
/// truncated input is described as far as it goes.
pub fn describe_frame(bytes: &[u8]) -> String {
    let mut out = String::new();
    if bytes.len() < BODY_LEN_OFFSET + 1 {
        let _ = writeln!(out, "invalid packet (too short: {} bytes)", bytes.len());
        return out;
    }

    let tag = |cond: bool, label: &'static str| if cond { label } else { "" };

    let _ = writeln!(out, "[RMCP Header]");
    let _ = writeln!(
        out,
        "  Version: {:#04x}{}",
        bytes[0],
        tag(bytes[0] == RMCP_VERSION, " (RMCP v1.0)")
    );
    let _ = writeln!(out, "  Reserved: {:#04x}", bytes[1]);
    let _ = writeln!(
        out,
        "  Sequence: {:#04x}{}",
        bytes[2],
        tag(bytes[2] == RMCP_SEQ_NO_ACK, " (No ACK)")
    );
    let _ = writeln!(
        out,
        "  Class: {:#04x}{}",
        bytes[3],
        tag(bytes[3] == RMCP_CLASS_IPMI, " (IPMI)")
    );

    let _ = writeln!(out, "[Session Header]");
    let _ = writeln!(
        out,
        "  Auth Type: {:#04x}{}",
        bytes[4],
        tag(bytes[4] == AUTH_TYPE_NONE, " (None)")
    );
    let _ = writeln!(out, "  Sequence: {:#010x}", le32(bytes, 5));
    let _ = writeln!(out, "  Session ID: {:#010x}", le32(bytes, 9));

    let body_len = usize::from(bytes[BODY_LEN_OFFSET]);
    let _ = writeln!(out, "[IPMI Message] (Length: {body_len} bytes)");
    if bytes.len() < MIN_FRAME_LEN {
        let _ = writeln!(out, "  ERROR: message header truncated");
        return out;
    }

    let h = &bytes[BODY_LEN_OFFSET + 1..];
    let (netfn, cmd) = (h[1] >> 2, h[5]);
    let _ = writeln!(
        out,
        "  Target Addr: {:#04x}{}",
        h[0],
        tag(h[0] == BMC_ADDR, " (BMC)")
    );
    let _ = writeln!(out, "  NetFn: {netfn:#04x} ({})", netfn_name(netfn));
    let _ = writeln!(out, "  LUN: {:#04x}", h[1] & 0x03);
    let _ = writeln!(out, "  Header Checksum: {:#04x}", h[2]);
    let _ = writeln!(out, "  Source Addr: {:#04x}", h[3]);
    let _ = writeln!(out, "  Sequence: {:#04x}", h[4] >> 2);
    let _ = writeln!(out, "  Source LUN: {:#04x}", h[4] & 0x03);
    let _ = writeln!(out, "  Command: {cmd:#04x} ({})", command_name(netfn, cmd));

    if bytes.len() < BODY_LEN_OFFSET + 1 + body_len {
        let _ = writeln!(out, "  ERROR: packet truncated");
        return out;
    }

    if let Some(data_len) = body_len.checked_sub(MESSAGE_HEADER_LEN + 1) {
        let data = &h[MESSAGE_HEADER_LEN..MESSAGE_HEADER_LEN + data_len];
        if !data.is_empty() {
            let _ = write!(out, "[Data] ({data_len} bytes)\n ");
            for b in data {
                let _ = write!(out, " {b:02x}");
            }
            out.push('\n');
        }
        let data_checksum = h[MESSAGE_HEADER_LEN + data_len];
        let _ = writeln!(out, "[Data Checksum] {data_checksum:#04x}");
    }

    let _ = writeln!(out, "[Raw] ({} bytes)", bytes.len());
    out.push_str(&hexdump(bytes));
    out
}

fn le32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata, Subscriber};

    use crate::protocol::encode_request;
    use crate::types::Message;

    /// Accepts every event and counts them.
    struct CountingSubscriber(Arc<AtomicUsize>);

    impl Subscriber for CountingSubscriber {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }

        fn record(&self, _: &Id, _: &Record<'_>) {}

        fn record_follows_from(&self, _: &Id, _: &Id) {}

        fn event(&self, _: &Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn enter(&self, _: &Id) {}

        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn names() {
        assert_eq!(netfn_name(0x06), "App");
        assert_eq!(netfn_name(0x07), "App");
        assert_eq!(netfn_name(0x3E), "Unknown");
        assert_eq!(command_name(0x07, 0x01), "Get Device ID");
        assert_eq!(command_name(0x00, 0x01), "Get Chassis Status");
        assert_eq!(manufacturer_name(0x0000B4), Some("Advantech"));
        assert_eq!(manufacturer_name(0x123456), None);
    }

    #[test]
    fn hexdump_layout() {
        let dump = hexdump(b"ABCDEFGHIJKLMNOPQ");
        let mut lines = dump.lines();
        assert_eq!(
            lines.next(),
            Some("0000: 41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  |ABCDEFGHIJKLMNOP|")
        );
        assert!(lines.next().expect("second row").starts_with("0010: 51 "));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn describes_a_request_frame() {
        let msg = Message::request(0x06, 0x01, Vec::new());
        let frame = encode_request(&msg, 1).expect("encode");
        let text = describe_frame(&frame);
        assert!(text.contains("(RMCP v1.0)"));
        assert!(text.contains("NetFn: 0x06 (App)"));
        assert!(text.contains("Command: 0x01 (Get Device ID)"));
        assert!(text.contains("[Data Checksum] 0x7a"));
    }

    #[test]
    fn describes_garbage_without_panicking() {
        assert!(describe_frame(&[0x06]).starts_with("invalid packet"));
        let msg = Message::request(0x06, 0x01, vec![1, 2]);
        let mut frame = encode_request(&msg, 1).expect("encode");
        frame[BODY_LEN_OFFSET] = 0xF0;
        assert!(describe_frame(&frame).contains("packet truncated"));
        frame[BODY_LEN_OFFSET] = 0x02;
        assert!(!describe_frame(&frame).contains("[Data Checksum]"));
    }

    #[test]
    fn packet_dumps_need_the_flag_and_a_trace_subscriber() {
        let msg = Message::request(0x06, 0x01, Vec::new());
        let frame = encode_request(&msg, 1).expect("encode");

        // No subscriber in scope: nothing to format for.
        assert!(!dumps_active(true));

        let events = Arc::new(AtomicUsize::new(0));
        let subscriber = CountingSubscriber(Arc::clone(&events));
        tracing::subscriber::with_default(subscriber, || {
            assert!(!dumps_active(false));
            dump_hex(false, "ipmi request", &frame);
            assert_eq!(events.load(Ordering::SeqCst), 0);

            assert!(dumps_active(true));
            dump_hex(true, "ipmi request", &frame);
        });
        // One hex line plus one frame analysis.
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }
}
