//! Messages exchanged over the producer-to-consumer pipe
//!
//! On the wire every message is the pair `(tag, payload)`. The tag is one of
//! `"init"`, `"data"` or `"exit"`; the payload tuple ordering is part of the
//! compatibility contract with the consumer and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tensor::DenseTensor;

/// Tag identifying the kind of a stream message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    /// Handshake carrying stream parameters
    Init,
    /// One segment of features and optional targets
    Data,
    /// End of stream
    Exit,
}

impl MessageTag {
    /// Wire name of this tag
    pub fn as_str(self) -> &'static str {
        match self {
            MessageTag::Init => "init",
            MessageTag::Data => "data",
            MessageTag::Exit => "exit",
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(MessageTag::Init),
            "data" => Ok(MessageTag::Data),
            "exit" => Ok(MessageTag::Exit),
            other => Err(Error::Protocol(format!("unknown message tag {other:?}"))),
        }
    }
}

/// Handshake payload: `(input_dim, output_dim, num_segments)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Number of feature rows per frame
    pub input_dim: u32,
    /// Number of output classes
    pub output_dim: u32,
    /// Expected number of segments, `None` when unknown in advance
    pub num_segments: Option<u64>,
}

/// Data payload: `(features, targets)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    /// Feature matrix shaped `[input_dim, frames]`
    pub features: DenseTensor,
    /// Per-frame target alignment, absent for unsupervised feeds
    pub targets: Option<DenseTensor>,
}

/// A single unit of wire communication
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Stream parameters, always the first message
    Init(InitPayload),
    /// One segment of data
    Data(DataPayload),
    /// End of stream, carries no payload
    Exit,
}

impl StreamMessage {
    /// Tag of this message
    pub fn tag(&self) -> MessageTag {
        match self {
            StreamMessage::Init(_) => MessageTag::Init,
            StreamMessage::Data(_) => MessageTag::Data,
            StreamMessage::Exit => MessageTag::Exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(MessageTag::Init, "init")]
    #[test_case(MessageTag::Data, "data")]
    #[test_case(MessageTag::Exit, "exit")]
    fn test_tag_names(tag: MessageTag, name: &str) {
        assert_eq!(tag.as_str(), name);
        assert_eq!(name.parse::<MessageTag>().unwrap(), tag);
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!("ack".parse::<MessageTag>(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_message_tag() {
        let init = StreamMessage::Init(InitPayload {
            input_dim: 40,
            output_dim: 5,
            num_segments: None,
        });
        assert_eq!(init.tag(), MessageTag::Init);
        assert_eq!(StreamMessage::Exit.tag(), MessageTag::Exit);
    }
}
