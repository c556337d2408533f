/// ----- BINARY PROTOCOL MODULE -----
/// Wire format, all integers big-endian:
///
///   [0x5A] [sequence: u8] [command: u16] [length: i32] [length bytes UTF-8]
///
/// The decoder is a streaming state machine: it discards bytes until a start
/// marker, then reads the header and payload as one unit, rolling back to
/// just after the marker while bytes are missing. It never re-scans for the
/// marker on a retry, so a 0x5A inside a payload cannot desynchronize it.
pub const START_MARK: u8 = 0x5a;

pub const CMD_GOTO_FLOOR: u16 = 0x3e8;
pub const CMD_CLOSE_DOOR: u16 = 0x3e9;
pub const CMD_GET_STATUS: u16 = 0x7d0;

/// Bytes following the start marker: sequence (1) + command (2) + length (4).
const HEADER_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flow_no: u8,
    pub command: u16,
    pub payload: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame declares negative payload length {0}")]
    BadLength(i32),
}

#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    started: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Feed one chunk of the stream, returning every frame it completes.
    /// Chunks may be split at any byte boundary.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Frame>, DecodeError> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = self.try_decode()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_decode(&mut self) -> Result<Option<Frame>, DecodeError> {
        if !self.started {
            match self.buf.iter().position(|&b| b == START_MARK) {
                Some(pos) => {
                    self.buf.drain(..=pos);
                    self.started = true;
                }
                None => {
                    self.buf.clear();
                    return Ok(None);
                }
            }
        }

        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let flow_no = self.buf[0];
        let command = u16::from_be_bytes([self.buf[1], self.buf[2]]);
        let declared = i32::from_be_bytes([self.buf[3], self.buf[4], self.buf[5], self.buf[6]]);
        if declared < 0 {
            return Err(DecodeError::BadLength(declared));
        }

        let len = declared as usize;
        if self.buf.len() < HEADER_LEN + len {
            // wait for more bytes, keeping the position just after the marker
            return Ok(None);
        }

        let payload = String::from_utf8_lossy(&self.buf[HEADER_LEN..HEADER_LEN + len]).into_owned();
        self.buf.drain(..HEADER_LEN + len);
        self.started = false;
        Ok(Some(Frame { flow_no, command, payload }))
    }
}

pub fn encode(frame: &Frame) -> Vec<u8> {
    let payload = frame.payload.as_bytes();
    let mut out = Vec::with_capacity(1 + HEADER_LEN + payload.len());
    out.push(START_MARK);
    out.push(frame.flow_no);
    out.extend_from_slice(&frame.command.to_be_bytes());
    out.extend_from_slice(&(payload.len() as i32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}
