//! In-process UDP responder that answers IPMI requests from a script.

use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bmc_ipmi::checksum;

/// What the responder does with the next request.
pub enum Reply {
    /// Answer with this payload (completion code first), echoing the request seq.
    Payload(Vec<u8>),
    /// Answer with this payload, but with the seq shifted by the given amount.
    SeqOffset(u8, Vec<u8>),
    /// Answer with the payload and a corrupted data checksum.
    BadChecksum(Vec<u8>),
    /// Read the request and never answer.
    Silent,
}

pub struct Responder {
    pub addr: SocketAddr,
    handle: JoinHandle<Vec<Vec<u8>>>,
}

impl Responder {
    /// Bind on loopback and serve one request per scripted reply.
    pub fn spawn(script: Vec<Reply>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind responder");
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("responder timeout");
        let addr = socket.local_addr().expect("responder addr");

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            let mut buf = [0u8; 1024];
            for reply in script {
                let Ok((n, from)) = socket.recv_from(&mut buf) else {
                    break;
                };
                let request = buf[..n].to_vec();
                if let Some(frame) = build_reply(&request, reply) {
                    socket.send_to(&frame, from).expect("responder send");
                }
                requests.push(request);
            }
            requests
        });

        Self { addr, handle }
    }

    /// Wait for the script to finish and return every request received.
    pub fn finish(self) -> Vec<Vec<u8>> {
        self.handle.join().expect("responder thread")
    }
}

fn build_reply(request: &[u8], reply: Reply) -> Option<Vec<u8>> {
    let seq = (request[18] >> 2) & 0x3F;
    let netfn = (request[15] >> 2) | 0x01;
    let cmd = request[19];

    let (seq, payload, corrupt) = match reply {
        Reply::Payload(p) => (seq, p, false),
        Reply::SeqOffset(delta, p) => (seq.wrapping_add(delta) & 0x3F, p, false),
        Reply::BadChecksum(p) => (seq, p, true),
        Reply::Silent => return None,
    };

    let target_addr = 0x20;
    let netfn_lun = netfn << 2;
    let source_addr = 0x81;
    let seq_lun = seq << 2;

    let mut frame = vec![0x06, 0x00, 0xFF, 0x07];
    frame.extend_from_slice(&[0x00; 9]);
    frame.push((6 + payload.len() + 1) as u8);
    frame.extend_from_slice(&[
        target_addr,
        netfn_lun,
        checksum(&[target_addr, netfn_lun]),
        source_addr,
        seq_lun,
        cmd,
    ]);
    frame.extend_from_slice(&payload);

    let mut covered = vec![source_addr, seq_lun, cmd];
    covered.extend_from_slice(&payload);
    let data_checksum = checksum(&covered);
    frame.push(if corrupt {
        data_checksum.wrapping_add(1)
    } else {
        data_checksum
    });

    Some(frame)
}

/// Get Device ID response of a minimal BMC: no aux firmware revision.
pub fn device_id_payload() -> Vec<u8> {
    vec![
        0x00, // completion code
        0x20, // device ID
        0x00, // device revision
        0x01, // firmware major
        0x00, // firmware minor
        0x02, // IPMI 2.0
        0x07, // additional device support
        0xB4, 0x00, 0x00, // manufacturer (Advantech)
        0x00, 0x00, // product ID
    ]
}
