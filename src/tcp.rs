/// ----- TCP COMMAND SERVER MODULE -----
/// One listener per car, one handler thread per accepted connection, one
/// protocol decoder per connection. Business failures (bad payloads,
/// unknown ids) are answered and logged; only transport errors and framing
/// corruption end a connection.
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::spawn;

use log::{info, warn};

use crate::protocol::{self, Decoder, Frame};
use crate::registry::{Ack, Registry};
use crate::runtime::LiftReq;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct GotoReq {
    dest_floor: String,
}

pub fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port))
}

pub fn serve(listener: TcpListener, lift_id: String, registry: Arc<Registry>) {
    if let Ok(addr) = listener.local_addr() {
        info!("lift {}: command server listening on {}", lift_id, addr);
    }
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let lift_id = lift_id.clone();
                let registry = registry.clone();
                spawn(move || handle_client(stream, lift_id, registry));
            }
            Err(e) => warn!("lift {}: failed to accept connection: {}", lift_id, e),
        }
    }
}

fn handle_client(mut stream: TcpStream, lift_id: String, registry: Arc<Registry>) {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) => {
                warn!("lift {}: connection error: {}", lift_id, e);
                return;
            }
        };
        let frames = match decoder.feed(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("lift {}: closing connection: {}", lift_id, e);
                return;
            }
        };
        for frame in frames {
            let response = respond(&frame, &lift_id, &registry);
            if let Err(e) = stream.write_all(&protocol::encode(&response)) {
                warn!("lift {}: failed to write response: {}", lift_id, e);
                return;
            }
        }
    }
}

/// The real controller answers with the request's sequence number echoed
/// and a command code of sequence-byte-as-signed + 100000, truncated to
/// the 16-bit field. Kept bit-for-bit.
pub fn response_command(flow_no: u8) -> u16 {
    ((i32::from(flow_no as i8) + 100_000) & 0xffff) as u16
}

fn respond(frame: &Frame, lift_id: &str, registry: &Registry) -> Frame {
    let payload = match frame.command {
        protocol::CMD_GOTO_FLOOR => goto_floor(&frame.payload, lift_id, registry),
        protocol::CMD_CLOSE_DOOR => close_door(lift_id, registry),
        protocol::CMD_GET_STATUS => get_status(lift_id, registry),
        other => {
            warn!("lift {}: unknown command {:#06x}", lift_id, other);
            String::new()
        }
    };
    Frame {
        flow_no: frame.flow_no,
        command: response_command(frame.flow_no),
        payload,
    }
}

fn goto_floor(payload: &str, lift_id: &str, registry: &Registry) -> String {
    let req: GotoReq = match serde_json::from_str(payload) {
        Ok(req) => req,
        Err(e) => {
            warn!("lift {}: malformed goto payload {:?}: {}", lift_id, payload, e);
            return String::new();
        }
    };
    let dest_floor = match req.dest_floor.parse::<i32>() {
        Ok(floor) => floor,
        Err(_) => {
            warn!("lift {}: destFloor {:?} is not a number", lift_id, req.dest_floor);
            return String::new();
        }
    };
    match registry.request(lift_id, LiftReq::tcp(dest_floor)) {
        Ok(ack) => serde_json::to_string(&ack).unwrap_or_default(),
        Err(e) => {
            warn!("lift {}: {}", lift_id, e);
            serde_json::to_string(&Ack::not_found(lift_id)).unwrap_or_default()
        }
    }
}

fn close_door(lift_id: &str, registry: &Registry) -> String {
    // busy is not surfaced on this interface; the wire contract always acks
    match registry.close(lift_id) {
        Ok(_) => serde_json::to_string(&Ack::ok()).unwrap_or_default(),
        Err(e) => {
            warn!("lift {}: {}", lift_id, e);
            serde_json::to_string(&Ack::not_found(lift_id)).unwrap_or_default()
        }
    }
}

fn get_status(lift_id: &str, registry: &Registry) -> String {
    match registry.status(lift_id) {
        Ok(status) => serde_json::to_string(&status).unwrap_or_default(),
        Err(e) => {
            warn!("lift {}: {}", lift_id, e);
            serde_json::to_string(&Ack::not_found(lift_id)).unwrap_or_default()
        }
    }
}
