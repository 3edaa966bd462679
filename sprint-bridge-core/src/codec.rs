//! Length-prefixed message framing
//!
//! Every frame is a 4-byte little-endian body length followed by the bincode
//! encoding of `(tag, payload)`, where `payload` is `Option<InitPayload>`,
//! `Option<DataPayload>` or `Option<()>` depending on the tag. The writer
//! emits a whole frame with a single `write_all` and flushes right after, so a
//! consumer blocked on a read sees each message as soon as it is produced.

use std::io::{self, Cursor, Read, Write};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use static_assertions::const_assert;
use tracing::trace;

use crate::error::{Error, Result};
use crate::message::{DataPayload, InitPayload, MessageTag, StreamMessage};

/// Size of the length prefix in bytes
pub const HEADER_SIZE: usize = 4;

/// Largest frame body accepted on either side (1 GiB)
pub const MAX_FRAME_LEN: usize = 1 << 30;

const_assert!(MAX_FRAME_LEN <= u32::MAX as usize);

/// Fixed-width little-endian integers, same layout as `bincode::serialize`
fn wire_options() -> impl Options {
    bincode::options().with_fixint_encoding()
}

fn encode_body<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(wire_options().serialize(value)?)
}

/// Decode the next value, never reading or allocating past the end of the body
fn decode_next<T: DeserializeOwned>(cursor: &mut Cursor<&[u8]>) -> Result<T> {
    let remaining = (cursor.get_ref().len() as u64).saturating_sub(cursor.position());
    wire_options()
        .with_limit(remaining)
        .deserialize_from(cursor)
        .map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => Error::Protocol(format!(
                "length field exceeds the {remaining} bytes left in the frame"
            )),
            bincode::ErrorKind::Io(ref err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Error::Protocol("frame body ends inside a value".into())
            }
            _ => Error::Serialization(e),
        })
}

/// Encode a message into a complete frame, length prefix included
pub fn encode_frame(message: &StreamMessage) -> Result<Vec<u8>> {
    let tag = message.tag().as_str();
    let body = match message {
        StreamMessage::Init(payload) => encode_body(&(tag, Some(payload)))?,
        StreamMessage::Data(payload) => encode_body(&(tag, Some(payload)))?,
        StreamMessage::Exit => encode_body(&(tag, None::<()>))?,
    };

    if body.len() > MAX_FRAME_LEN {
        return Err(Error::InvalidArgument(format!(
            "{tag} message of {} bytes exceeds frame limit of {MAX_FRAME_LEN}",
            body.len()
        )));
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
    #[allow(clippy::cast_possible_truncation)]
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a frame body (without the length prefix) into a message
pub fn decode_body(body: &[u8]) -> Result<StreamMessage> {
    let mut cursor = Cursor::new(body);
    let tag: String = decode_next(&mut cursor)?;

    let message = match tag.parse::<MessageTag>()? {
        MessageTag::Init => {
            let payload: InitPayload = required_payload(&mut cursor, MessageTag::Init)?;
            StreamMessage::Init(payload)
        }
        MessageTag::Data => {
            let payload: DataPayload = required_payload(&mut cursor, MessageTag::Data)?;
            payload.features.validate()?;
            if let Some(targets) = &payload.targets {
                targets.validate()?;
            }
            StreamMessage::Data(payload)
        }
        MessageTag::Exit => {
            let payload: Option<()> = decode_next(&mut cursor)?;
            if payload.is_some() {
                return Err(Error::Protocol("exit message carries a payload".into()));
            }
            StreamMessage::Exit
        }
    };

    #[allow(clippy::cast_possible_truncation)]
    let consumed = cursor.position() as usize;
    if consumed != body.len() {
        return Err(Error::Protocol(format!(
            "{} trailing bytes after {tag} message",
            body.len() - consumed
        )));
    }

    Ok(message)
}

fn required_payload<T: DeserializeOwned>(
    cursor: &mut Cursor<&[u8]>,
    tag: MessageTag,
) -> Result<T> {
    let payload: Option<T> = decode_next(cursor)?;
    payload.ok_or_else(|| Error::Protocol(format!("{tag} message without payload")))
}

/// Writes framed messages to a byte stream
pub struct FrameWriter<W: Write> {
    /// Underlying stream
    inner: W,

    /// Total bytes written, length prefixes included
    bytes_written: u64,
}

impl<W: Write> FrameWriter<W> {
    /// Create a writer over the given stream
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Encode, write and flush one message; returns the frame size
    pub fn write_message(&mut self, message: &StreamMessage) -> Result<usize> {
        let frame = encode_frame(message)?;
        self.inner.write_all(&frame)?;
        self.inner.flush()?;
        self.bytes_written += frame.len() as u64;
        trace!(tag = %message.tag(), bytes = frame.len(), "frame written");
        Ok(frame.len())
    }

    /// Total bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads framed messages from a byte stream
///
/// This is the consumer end of the pipe. It yields messages in the order they
/// were written and reports `None` on a clean end of stream.
pub struct FrameReader<R: Read> {
    /// Underlying stream
    inner: R,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader over the given stream
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next message, or `None` if the stream ended at a frame boundary
    pub fn read_message(&mut self) -> Result<Option<StreamMessage>> {
        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.inner.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(Error::Protocol(format!(
                        "stream ended inside frame header after {filled} bytes"
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::Protocol(format!(
                "frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
            )));
        }

        let mut body = vec![0u8; len];
        self.inner.read_exact(&mut body).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::Protocol(format!("stream ended inside frame body of {len} bytes"))
            } else {
                Error::Io(e)
            }
        })?;

        decode_body(&body).map(Some)
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<StreamMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_message().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DenseTensor;
    use proptest::prelude::*;

    fn data_message(rows: usize, frames: usize, with_targets: bool) -> StreamMessage {
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<f32> = (0..rows * frames).map(|i| i as f32 * 0.5).collect();
        let features = DenseTensor::matrix(values, rows, frames).unwrap();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let targets = with_targets.then(|| DenseTensor::vector((0..frames as i32).collect()));
        StreamMessage::Data(DataPayload { features, targets })
    }

    #[test]
    fn test_reader_sees_writer_order() {
        let messages = vec![
            StreamMessage::Init(InitPayload {
                input_dim: 3,
                output_dim: 2,
                num_segments: Some(2),
            }),
            data_message(3, 4, true),
            data_message(3, 1, false),
            StreamMessage::Exit,
        ];

        let mut writer = FrameWriter::new(Vec::new());
        for message in &messages {
            writer.write_message(message).unwrap();
        }
        let bytes = writer.into_inner();

        let decoded: Vec<_> = FrameReader::new(bytes.as_slice())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_bytes_written_counts_prefix() {
        let mut writer = FrameWriter::new(Vec::new());
        let n = writer.write_message(&StreamMessage::Exit).unwrap();
        assert_eq!(writer.bytes_written(), n as u64);
        assert_eq!(writer.get_ref().len(), n);
        assert!(n > HEADER_SIZE);
    }

    #[test]
    fn test_empty_stream_is_clean_eof() {
        let mut reader = FrameReader::new(&[][..]);
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn test_truncated_header() {
        let mut reader = FrameReader::new(&[1u8, 0][..]);
        assert!(matches!(reader.read_message(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_truncated_body() {
        let frame = encode_frame(&data_message(2, 2, true)).unwrap();
        let mut reader = FrameReader::new(&frame[..frame.len() - 1]);
        assert!(matches!(reader.read_message(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_oversize_frame_rejected() {
        let header = u32::MAX.to_le_bytes();
        let mut reader = FrameReader::new(&header[..]);
        assert!(matches!(reader.read_message(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_huge_inner_length_rejected() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&12u32.to_le_bytes());
        frame.extend_from_slice(&(1u64 << 50).to_le_bytes());
        frame.extend_from_slice(b"init");

        let mut reader = FrameReader::new(frame.as_slice());
        assert!(matches!(reader.read_message(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_huge_element_count_rejected() {
        let mut frame = encode_frame(&data_message(2, 2, false)).unwrap();
        // tag length (8) + "data" (4) + Some (1) + shape length (8) + two dims (16)
        // + buffer variant (4) puts the element count at offset 41 of the body
        let count_at = HEADER_SIZE + 41;
        frame[count_at..count_at + 8].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(decode_body(&frame[HEADER_SIZE..]), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_layout_matches_plain_bincode() {
        let message = StreamMessage::Init(InitPayload {
            input_dim: 40,
            output_dim: 5,
            num_segments: Some(3),
        });
        let frame = encode_frame(&message).unwrap();
        let plain = bincode::serialize(&("init", Some(InitPayload {
            input_dim: 40,
            output_dim: 5,
            num_segments: Some(3),
        })))
        .unwrap();
        assert_eq!(&frame[HEADER_SIZE..], plain.as_slice());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let body = bincode::serialize(&("ack", None::<()>)).unwrap();
        assert!(matches!(decode_body(&body), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_init_without_payload_rejected() {
        let body = bincode::serialize(&("init", None::<InitPayload>)).unwrap();
        assert!(matches!(decode_body(&body), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_exit_with_payload_rejected() {
        let body = bincode::serialize(&("exit", Some(()))).unwrap();
        assert!(matches!(decode_body(&body), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut body = bincode::serialize(&("exit", None::<()>)).unwrap();
        body.push(0);
        assert!(matches!(decode_body(&body), Err(Error::Protocol(_))));
    }

    proptest! {
        #[test]
        fn prop_data_frames_round_trip(rows in 1usize..48, frames in 0usize..32, with_targets in any::<bool>()) {
            let message = data_message(rows, frames, with_targets);
            let frame = encode_frame(&message).unwrap();
            let decoded = FrameReader::new(frame.as_slice()).read_message().unwrap();
            prop_assert_eq!(decoded, Some(message));
        }

        #[test]
        fn prop_float64_bytes_preserved(values in proptest::collection::vec(any::<f64>(), 0..64)) {
            let features = DenseTensor::matrix(values.clone(), 1, values.len()).unwrap();
            let message = StreamMessage::Data(DataPayload { features, targets: None });
            let frame = encode_frame(&message).unwrap();
            let decoded = decode_body(&frame[HEADER_SIZE..]).unwrap();
            match (decoded, message) {
                (StreamMessage::Data(got), StreamMessage::Data(sent)) => {
                    prop_assert_eq!(got.features.as_bytes(), sent.features.as_bytes());
                    prop_assert_eq!(got.features.shape(), sent.features.shape());
                }
                _ => prop_assert!(false, "expected data messages"),
            }
        }
    }
}
