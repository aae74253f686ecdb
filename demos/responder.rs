//! Minimal sessionless BMC stand-in for trying the other demos locally.
//!
//!   cargo run --example responder -- 127.0.0.1:9623
//!   cargo run --example get_device_id -- 127.0.0.1 9623

use std::net::UdpSocket;

use bmc_ipmi::{Message, decode_response, describe_frame, encode_request, netfn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9623".to_string());
    let socket = UdpSocket::bind(&bind)?;
    println!("IPMI responder on {bind}");

    let mut buf = [0u8; 1024];
    loop {
        let (n, from) = socket.recv_from(&mut buf)?;
        // Request frames share the response layout, so the response decoder reads them too.
        let request = match decode_response(&buf[..n]) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("[{from}] dropped: {e}\n{}", describe_frame(&buf[..n]));
                continue;
            }
        };

        let payload = match (request.netfn, request.cmd) {
            (netfn::APP, 0x01) => vec![
                0x00, 0x20, 0x00, 0x01, 0x00, 0x02, 0x07, 0xB4, 0x00, 0x00, 0x00, 0x00,
            ],
            (netfn::CHASSIS, 0x01) => vec![0x00, 0x21, 0x00, 0x00, 0x00],
            (netfn::CHASSIS, 0x02) => vec![0x00],
            _ => vec![0xC1],
        };

        let response = Message::request(netfn::response_of(request.netfn), request.cmd, payload);
        let frame = encode_request(&response, request.seq)?;
        socket.send_to(&frame, from)?;
        println!(
            "[{from}] {} (seq={}) -> {} bytes",
            bmc_ipmi::command_name(request.netfn, request.cmd),
            request.seq,
            frame.len()
        );
    }
}
