//! Property-based tests for the v1 framer and the license codec.
//!
//! Verifies that:
//! 1. Framing yields exactly the sent messages however the stream is chunked
//! 2. License payloads survive an encode/decode roundtrip

use bytes::BytesMut;
use proptest::prelude::*;
use termrd_proto::{
    decode_license, decode_license_bytes, encode_license, encode_license_bytes, Frame, FrameCodec,
};
use tokio_util::codec::Decoder;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Command text without framing delimiters.
fn message_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\u{1e}\u{1f}]{0,64}").expect("valid regex")
}

/// Split points for chunking an encoded stream.
fn chunk_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..16, 1..32)
}

fn encode(messages: &[String]) -> Vec<u8> {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();
    codec
        .encode_batch(messages.iter().cloned(), &mut buf)
        .expect("messages contain no delimiters");
    buf.to_vec()
}

fn decode_chunked(bytes: &[u8], chunks: &[usize]) -> Vec<Frame> {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();
    let mut frames = Vec::new();
    let mut offset = 0;
    let mut sizes = chunks.iter().cycle();

    while offset < bytes.len() {
        let size = (*sizes.next().expect("cycle never ends")).min(bytes.len() - offset);
        buf.extend_from_slice(&bytes[offset..offset + size]);
        offset += size;
        while let Some(frame) = codec.decode(&mut buf).expect("valid stream") {
            frames.push(frame);
        }
    }
    frames
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn framing_is_independent_of_chunking(
        messages in prop::collection::vec(message_strategy(), 1..20),
        chunks in chunk_sizes(),
    ) {
        let bytes = encode(&messages);
        let frames = decode_chunked(&bytes, &chunks);

        let mut expected: Vec<Frame> = messages.iter().cloned().map(Frame::Message).collect();
        expected.push(Frame::EndOfBatch);
        prop_assert_eq!(frames, expected);
    }

    #[test]
    fn single_read_and_bytewise_reads_agree(
        messages in prop::collection::vec(message_strategy(), 0..10),
    ) {
        let bytes = encode(&messages);
        prop_assert_eq!(decode_chunked(&bytes, &[bytes.len().max(1)]), decode_chunked(&bytes, &[1]));
    }

    #[test]
    fn license_string_roundtrip(raw in any::<String>()) {
        prop_assert_eq!(decode_license(&encode_license(&raw)).unwrap(), raw);
    }

    #[test]
    fn license_bytes_roundtrip(raw in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(decode_license_bytes(&encode_license_bytes(&raw)).unwrap(), raw);
    }
}
