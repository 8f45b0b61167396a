use bytes::BytesMut;
use respd::protocol::try_decode_frame;
use respd::Value;

#[test]
fn decodes_ping_set_get_in_order() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"*1\r\n$4\r\nPING\r\n");
    buf.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n");
    buf.extend_from_slice(b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n");

    let ping = try_decode_frame(&mut buf).unwrap();
    let set = try_decode_frame(&mut buf).unwrap();
    let get = try_decode_frame(&mut buf).unwrap();

    assert_eq!(ping, Value::Array(vec![Value::str("PING")]));
    assert_eq!(
        set,
        Value::Array(vec![Value::str("SET"), Value::str("a"), Value::str("1")])
    );
    assert_eq!(get, Value::Array(vec![Value::str("GET"), Value::str("a")]));
    assert!(buf.is_empty());
}
