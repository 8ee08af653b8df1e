// Newline framing for the stdio transport

use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// One line read from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw line bytes without the terminator; not necessarily UTF-8
    Message(Vec<u8>),
    /// A line longer than the limit; its bytes were discarded
    Oversized,
}

/// Splits input on `\n`, like `LinesCodec`, but never fails on content.
///
/// Invalid UTF-8 is passed through for the dispatcher to reject, and an
/// overlong line is skipped up to its terminator. Only I/O errors end the
/// stream.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_length: usize,
    next_index: usize,
    discarding: bool,
}

impl MessageCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        loop {
            // never scan further than one byte past the limit
            let read_to = std::cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|byte| *byte == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(end)) => {
                    buf.advance(end + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(end)) => {
                    self.next_index = 0;
                    let mut line = buf.split_to(end + 1);
                    line.truncate(end);
                    if line.last() == Some(&b'\r') {
                        line.truncate(end - 1);
                    }
                    return Ok(Some(Frame::Message(line.to_vec())));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                    return Ok(Some(Frame::Oversized));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        Ok(match self.decode(buf)? {
            Some(frame) => Some(frame),
            None if buf.is_empty() || self.discarding => {
                buf.clear();
                None
            }
            None => {
                self.next_index = 0;
                let mut line = buf.split();
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Some(Frame::Message(line.to_vec()))
            }
        })
    }
}
