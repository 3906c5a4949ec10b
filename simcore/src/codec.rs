use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::model::{Event, MergedRecord, TransformResult};

/// A self-identifying data-plane message: either a payload or the terminal DONE sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Frame<T> {
    Data(T),
    Done,
}

/// Pluggable byte-level framing for one of the four logical message kinds.
///
/// The core only requires that `unframe` inverts `frame` and that DONE is
/// distinguishable from a data payload; the wire layout itself is opaque to
/// every component that uses a `Codec`.
pub trait Codec<T> {
    fn frame(&self, frame: &Frame<T>) -> Result<Vec<u8>, CodecError>;
    fn unframe(&self, bytes: &[u8]) -> Result<Frame<T>, CodecError>;
}

/// The default codec: JSON text over the `Frame<T>` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn frame(&self, frame: &Frame<T>) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(frame)?)
    }

    fn unframe(&self, bytes: &[u8]) -> Result<Frame<T>, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub fn datasource_frame(frame: &Frame<Event>) -> Result<Vec<u8>, CodecError> {
    JsonCodec.frame(frame)
}

pub fn datasource_unframe(bytes: &[u8]) -> Result<Frame<Event>, CodecError> {
    JsonCodec.unframe(bytes)
}

pub fn feed_frame(frame: &Frame<Event>) -> Result<Vec<u8>, CodecError> {
    JsonCodec.frame(frame)
}

pub fn feed_unframe(bytes: &[u8]) -> Result<Frame<Event>, CodecError> {
    JsonCodec.unframe(bytes)
}

pub fn transform_frame(frame: &Frame<TransformResult>) -> Result<Vec<u8>, CodecError> {
    JsonCodec.frame(frame)
}

pub fn transform_unframe(bytes: &[u8]) -> Result<Frame<TransformResult>, CodecError> {
    JsonCodec.unframe(bytes)
}

pub fn merge_frame(frame: &Frame<MergedRecord>) -> Result<Vec<u8>, CodecError> {
    JsonCodec.frame(frame)
}

pub fn merge_unframe(bytes: &[u8]) -> Result<Frame<MergedRecord>, CodecError> {
    JsonCodec.unframe(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use serde_json::json;

    #[test]
    fn datasource_round_trips() {
        let event = Event::new("A", Timestamp(1), json!(42));
        let frame = Frame::Data(event.clone());
        let bytes = datasource_frame(&frame).unwrap();
        assert_eq!(datasource_unframe(&bytes).unwrap(), frame);
    }

    #[test]
    fn done_round_trips_for_every_kind() {
        let bytes = feed_frame(&Frame::Done).unwrap();
        assert_eq!(feed_unframe(&bytes).unwrap(), Frame::<Event>::Done);

        let bytes = transform_frame(&Frame::Done).unwrap();
        assert_eq!(transform_unframe(&bytes).unwrap(), Frame::<TransformResult>::Done);

        let bytes = merge_frame(&Frame::Done).unwrap();
        assert_eq!(merge_unframe(&bytes).unwrap(), Frame::<MergedRecord>::Done);
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(
            datasource_unframe(&[]),
            Err(CodecError::Empty)
        ));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            datasource_unframe(b"not json"),
            Err(CodecError::Decode(_))
        ));
    }

    #[quickcheck_macros::quickcheck]
    fn datasource_round_trips_arbitrary_events(source_id: String, dt: u64, payload: i64) -> bool {
        let frame = Frame::Data(Event::new(source_id, Timestamp(dt), json!(payload)));
        datasource_unframe(&datasource_frame(&frame).unwrap()).unwrap() == frame
    }
}
