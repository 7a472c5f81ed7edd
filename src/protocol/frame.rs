use bytes::{BufMut, Bytes, BytesMut};

use super::{EventKind, ProtocolError};

/// One tagged message on the subscription channel.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────────────┐
/// │  event tag   │        payload          │
/// │  (1 byte)    │  (var, kind-specific)   │
/// └──────────────┴─────────────────────────┘
/// ```
///
/// The relay never looks past the tag. Cloning shares the underlying buffer,
/// so fan-out to many subscribers does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Prefix `payload` with the tag for `kind`.
    pub fn new(kind: EventKind, payload: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(1 + payload.len());
        buf.put_u8(kind.tag());
        buf.put_slice(payload);
        Self(buf.freeze())
    }

    /// Wrap bytes received from the wire. Only checks that a tag byte is present.
    pub fn from_bytes(bytes: Bytes) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        Ok(Self(bytes))
    }

    pub fn tag(&self) -> u8 {
        self.0[0]
    }

    pub fn kind(&self) -> Result<EventKind, ProtocolError> {
        EventKind::try_from(self.tag())
    }

    /// Everything after the tag byte.
    pub fn payload(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a frame carries at least its tag.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_is_prepended_verbatim() {
        let frame = Frame::new(EventKind::InitSilhouetteArea, &[9, 8, 7]);
        assert_eq!(frame.as_bytes(), &[0x03, 9, 8, 7]);
        assert_eq!(frame.kind(), Ok(EventKind::InitSilhouetteArea));
        assert_eq!(frame.payload(), &[9, 8, 7]);
    }

    #[test]
    fn test_empty_payload_is_still_a_frame() {
        let frame = Frame::new(EventKind::UpdateObject, &[]);
        assert_eq!(frame.as_bytes(), &[0x02]);
        assert!(frame.payload().is_empty());
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(
            Frame::from_bytes(Bytes::new()),
            Err(ProtocolError::EmptyFrame)
        );

        let frame = Frame::from_bytes(Bytes::from_static(&[0x7f, 1])).unwrap();
        assert_eq!(frame.tag(), 0x7f);
        assert_eq!(frame.kind(), Err(ProtocolError::UnknownTag(0x7f)));
    }

    #[test]
    fn test_clone_shares_buffer() {
        let frame = Frame::new(EventKind::InitObject, &[1, 2, 3, 4]);
        let copy = frame.clone();
        assert_eq!(frame.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
    }
}
