use pushflow::framing::{
    decode_payload, encode_frame, frame_payload, message_source, FrameDecoder, FramedChannel,
    FramedReader, FramedWriter, FramingError, END_BYTE, START_BYTE,
};
use pushflow::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id: u32,
    url: String,
}

#[test]
fn test_wire_format() {
    let frame = encode_frame(&json!({"a": 1})).unwrap();
    assert_eq!(frame.first(), Some(&START_BYTE));
    assert_eq!(frame.last(), Some(&END_BYTE));
    assert_eq!(&frame[1..frame.len() - 1], br#"{"a":1}"#);
}

#[test]
fn test_round_trip() {
    let message = json!({"a": 1});
    let mut decoder = FrameDecoder::default();
    let frame = encode_frame(&message).unwrap();
    let decoded: Vec<Result<Value, FramingError>> = decoder.push_messages(&frame);
    assert_eq!(decoded, vec![Ok(message)]);
    assert!(!decoder.has_partial());
}

#[test]
fn test_two_messages_split_at_every_offset() {
    let first = Task {
        id: 1,
        url: "http://a".to_string(),
    };
    let second = Task {
        id: 2,
        url: "http://b/ünïcode".to_string(),
    };
    let mut bytes = encode_frame(&first).unwrap();
    bytes.extend(encode_frame(&second).unwrap());

    for offset in 0..=bytes.len() {
        let mut decoder = FrameDecoder::default();
        let mut decoded: Vec<Result<Task, FramingError>> = decoder.push_messages(&bytes[..offset]);
        decoded.extend(decoder.push_messages(&bytes[offset..]));
        assert_eq!(decoded, vec![Ok(first.clone()), Ok(second.clone())], "split at {}", offset);
    }
}

#[test]
fn test_byte_at_a_time() {
    let mut decoder = FrameDecoder::default();
    let mut decoded = Vec::new();
    for byte in encode_frame(&json!([1, 2, 3])).unwrap() {
        decoded.extend(decoder.push_messages::<Value>(&[byte]));
    }
    assert_eq!(decoded, vec![Ok(json!([1, 2, 3]))]);
}

#[test]
fn test_decode_error_does_not_corrupt_following_frames() {
    let mut bytes = frame_payload(b"{not json").unwrap();
    bytes.extend(encode_frame(&json!({"ok": true})).unwrap());

    let decoded: Vec<Result<Value, FramingError>> = FrameDecoder::default().push_messages(&bytes);
    assert_eq!(decoded.len(), 2);
    assert!(matches!(decoded[0], Err(FramingError::Decode(_))));
    assert_eq!(decoded[1], Ok(json!({"ok": true})));
}

#[test]
fn test_invalid_utf8_is_reported() {
    let bytes = [START_BYTE, 0xC3, 0x28, END_BYTE];
    let decoded: Vec<Result<Value, FramingError>> = FrameDecoder::default().push_messages(&bytes);
    assert!(matches!(decoded.as_slice(), [Err(FramingError::InvalidUtf8(_))]));
}

#[test]
fn test_empty_frame() {
    let decoded = FrameDecoder::default().push(&[START_BYTE, END_BYTE]);
    assert_eq!(decoded, vec![Err(FramingError::EmptyFrame)]);
    assert_eq!(decode_payload::<Value>(b""), Err(FramingError::EmptyFrame));
}

#[test]
fn test_start_byte_discards_partial_frame() {
    let mut decoder = FrameDecoder::default();
    assert!(decoder.push(&[START_BYTE, b'{', b'"']).is_empty());
    assert!(decoder.has_partial());

    // a new frame starts before the old one was terminated
    let frame = encode_frame(&json!(5)).unwrap();
    let decoded: Vec<Result<Value, FramingError>> = decoder.push_messages(&frame);
    assert_eq!(decoded, vec![Ok(json!(5))]);
}

#[test]
fn test_oversized_frame_is_rejected() {
    let config = FramingConfig::default().max_frame_len(8);
    let mut decoder = FrameDecoder::new(&config);

    let mut bytes = encode_frame(&json!("this payload is too long")).unwrap();
    bytes.extend(encode_frame(&json!(1)).unwrap());
    let decoded: Vec<Result<Value, FramingError>> = decoder.push_messages(&bytes);

    assert_eq!(decoded, vec![Err(FramingError::FrameTooLarge { limit: 8 }), Ok(json!(1))]);
}

#[test]
fn test_frame_payload_rejects_sentinels() {
    assert_eq!(
        frame_payload(&[b'a', END_BYTE]),
        Err(FramingError::ReservedByte { byte: 0xFF, offset: 1 })
    );
    assert_eq!(
        frame_payload(&[START_BYTE]),
        Err(FramingError::ReservedByte { byte: 0x00, offset: 0 })
    );
}

#[test]
fn test_nul_in_string_is_escaped() {
    let frame = encode_frame(&json!("a\u{0}b")).unwrap();
    assert_eq!(frame.iter().filter(|b| **b == START_BYTE).count(), 1);
    let decoded: Vec<Result<Value, FramingError>> = FrameDecoder::default().push_messages(&frame);
    assert_eq!(decoded, vec![Ok(json!("a\u{0}b"))]);
}

#[tokio::test]
async fn test_framed_channel_duplex() {
    let (left, right) = tokio::io::duplex(64);
    let mut left = FramedChannel::new(left);
    let mut right = FramedChannel::new(right);

    let task = Task {
        id: 7,
        url: "http://example.com".to_string(),
    };
    left.send(&task).await.unwrap();
    let received: Task = right.recv().await.unwrap().unwrap();
    assert_eq!(received, task);

    right.send(&json!({"ack": 7})).await.unwrap();
    let ack: Value = left.recv().await.unwrap().unwrap();
    assert_eq!(ack, json!({"ack": 7}));
}

#[tokio::test]
async fn test_reader_with_small_chunks() {
    let (client, server) = tokio::io::duplex(1024);
    let mut writer = FramedWriter::new(client);
    let config = FramingConfig::default().read_chunk_size(3);
    let mut reader = FramedReader::with_config(server, &config);

    for id in 0..5 {
        writer
            .send(&Task {
                id,
                url: format!("http://host/{}", id),
            })
            .await
            .unwrap();
    }
    drop(writer);

    let mut ids = Vec::new();
    while let Some(task) = reader.recv::<Task>().await {
        ids.push(task.unwrap().id);
    }
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_send_all_then_message_source() {
    let (client, server) = tokio::io::duplex(4096);
    let mut writer = FramedWriter::new(client);

    let sent = writer.send_all(range(1, 5, 1).map(|n| json!({"n": n}))).await.unwrap();
    assert_eq!(sent, 5);
    drop(writer);

    let source = message_source::<Value, _>(FramedReader::new(server));
    let numbers = source
        .clone()
        .filter_map(|message| message.ok())
        .pluck("n")
        .collect()
        .await
        .unwrap();
    assert_eq!(numbers, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

    // the byte channel is single-pass
    assert_eq!(source.collect().await, Err(StreamError::SourceExhausted));
}

#[tokio::test]
async fn test_message_source_surfaces_malformed_frames() {
    use tokio::io::AsyncWriteExt;

    let (mut client, server) = tokio::io::duplex(1024);
    let mut bytes = encode_frame(&json!(1)).unwrap();
    bytes.extend(frame_payload(b"oops").unwrap());
    bytes.extend(encode_frame(&json!(2)).unwrap());
    client.write_all(&bytes).await.unwrap();
    drop(client);

    let messages = message_source::<Value, _>(FramedReader::new(server)).collect().await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], Ok(json!(1)));
    assert!(matches!(messages[1], Err(FramingError::Decode(_))));
    assert_eq!(messages[2], Ok(json!(2)));
}

#[tokio::test]
async fn test_send_all_propagates_stream_error() {
    let (client, _server) = tokio::io::duplex(1024);
    let mut writer = FramedWriter::new(client);
    let failing: Stream<Value> = Stream::new(|mut sink: BoxSink<Value>| {
        sink.emit(json!(1));
        sink.end(Err(StreamError::Failed("producer".to_string())));
    });

    assert_eq!(
        writer.send_all(failing).await,
        Err(StreamError::Failed("producer".to_string()))
    );
}
