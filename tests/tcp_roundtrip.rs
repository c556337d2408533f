use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use liftsim::config::default_lift;
use liftsim::protocol::{self, Decoder, Frame};
use liftsim::registry::Registry;
use liftsim::tcp;

fn start_server(registry: Arc<Registry>) -> std::net::SocketAddr {
    let listener = tcp::bind("127.0.0.1", 0).unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || tcp::serve(listener, String::from("A"), registry));
    addr
}

fn read_frame(stream: &mut TcpStream) -> Frame {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; 256];
    loop {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "connection closed before a full frame arrived");
        let mut frames = decoder.feed(&buf[..n]).unwrap();
        if let Some(frame) = frames.pop() {
            return frame;
        }
    }
}

#[test]
fn drives_a_car_over_the_wire() {
    let registry = Arc::new(Registry::new(vec![default_lift()]));
    let addr = start_server(registry.clone());
    let mut stream = TcpStream::connect(addr).unwrap();

    // go-to-floor, split across two writes to exercise stream reassembly
    let goto = Frame {
        flow_no: 1,
        command: protocol::CMD_GOTO_FLOOR,
        payload: String::from(r#"{"destFloor":"3"}"#),
    };
    let bytes = protocol::encode(&goto);
    stream.write_all(&bytes[..5]).unwrap();
    stream.flush().unwrap();
    stream.write_all(&bytes[5..]).unwrap();

    let response = read_frame(&mut stream);
    assert_eq!(response.flow_no, 1);
    assert_eq!(response.command, tcp::response_command(1));
    assert!(response.payload.contains("\"code\":\"0\""));

    // the request is queued by the time the ack arrives
    let lift = registry.get("A").unwrap();
    {
        let state = lift.state.lock();
        assert_eq!(state.reqs.len(), 1);
        assert_eq!(state.reqs[0].dest_floor, 3);
    }

    // close door: always acked on this interface
    let close = Frame { flow_no: 2, command: protocol::CMD_CLOSE_DOOR, payload: String::new() };
    stream.write_all(&protocol::encode(&close)).unwrap();
    let response = read_frame(&mut stream);
    assert_eq!(response.command, tcp::response_command(2));
    assert!(response.payload.contains("\"code\":\"0\""));

    // status
    let status = Frame { flow_no: 3, command: protocol::CMD_GET_STATUS, payload: String::new() };
    stream.write_all(&protocol::encode(&status)).unwrap();
    let response = read_frame(&mut stream);
    assert_eq!(response.command, tcp::response_command(3));
    assert!(response.payload.contains("\"currentFloor\":\"1\""));
    assert!(response.payload.contains("\"doorStatus\""));

    // unknown commands answer with an empty payload, connection stays up
    let unknown = Frame { flow_no: 4, command: 0xbeef, payload: String::new() };
    stream.write_all(&protocol::encode(&unknown)).unwrap();
    let response = read_frame(&mut stream);
    assert_eq!(response.flow_no, 4);
    assert_eq!(response.payload, "");

    // and the connection still serves real commands afterwards
    let status = Frame { flow_no: 5, command: protocol::CMD_GET_STATUS, payload: String::new() };
    stream.write_all(&protocol::encode(&status)).unwrap();
    let response = read_frame(&mut stream);
    assert_eq!(response.command, tcp::response_command(5));
}

#[test]
fn malformed_payload_keeps_the_connection_open() {
    let registry = Arc::new(Registry::new(vec![default_lift()]));
    let addr = start_server(registry);
    let mut stream = TcpStream::connect(addr).unwrap();

    let bad = Frame {
        flow_no: 1,
        command: protocol::CMD_GOTO_FLOOR,
        payload: String::from("this is not json"),
    };
    stream.write_all(&protocol::encode(&bad)).unwrap();
    let response = read_frame(&mut stream);
    assert_eq!(response.payload, "");

    let status = Frame { flow_no: 2, command: protocol::CMD_GET_STATUS, payload: String::new() };
    stream.write_all(&protocol::encode(&status)).unwrap();
    let response = read_frame(&mut stream);
    assert!(response.payload.contains("\"currentFloor\""));
}
