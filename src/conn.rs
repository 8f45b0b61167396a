/*!
 * Connection State Machine
 *
 * `handle_read`/`handle_write` are the core's entire contract with whatever
 * drives it: hand them anything that's `Read`/`Write` and a monotonic
 * clock's worth of readiness, and they'll drain it, run every complete
 * frame through the shard, and report back what the connection wants next.
 * Generic over the stream type so the state machine can be exercised with
 * an in-memory buffer in tests, without a real socket.
 */

use std::io::{self, Read, Write};

use bytes::{Buf, BytesMut};

use crate::protocol::try_decode_frame;
use crate::shard::Shard;

/// Bytes pulled per `read(2)` call before yielding back to the poller.
pub const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Nothing buffered, nothing queued; wait for readability.
    Idle,
    /// A partial frame is buffered; still waiting on more bytes.
    Read,
    /// At least one reply is queued; wants writability.
    Write,
    /// EOF or an unrecoverable I/O error; the loop should drop this
    /// connection.
    Close,
}

pub struct Connection {
    pub id: usize,
    pub incoming: BytesMut,
    pub outgoing: BytesMut,
    pub state: ConnState,
}

impl Connection {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            incoming: BytesMut::new(),
            outgoing: BytesMut::new(),
            state: ConnState::Idle,
        }
    }
}

/// Drains everything currently readable from `sock`, feeds it through the
/// RESP decoder, dispatches every complete frame against `shard`, and
/// queues the replies onto `conn.outgoing`.
///
/// A `read` returning `0` means the peer closed its write half; that always
/// becomes `ConnState::Close`, even if `outgoing` still has bytes to flush.
pub fn handle_read<S: Read>(
    conn: &mut Connection,
    shard: &mut Shard,
    sock: &mut S,
) -> io::Result<ConnState> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match sock.read(&mut chunk) {
            Ok(0) => {
                conn.state = ConnState::Close;
                return Ok(ConnState::Close);
            }
            Ok(n) => conn.incoming.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    while let Some(frame) = try_decode_frame(&mut conn.incoming) {
        let reply = shard.dispatch(frame);
        conn.outgoing.extend_from_slice(&reply.encode());
    }

    conn.state = next_state_after_read(conn);
    Ok(conn.state)
}

fn next_state_after_read(conn: &Connection) -> ConnState {
    if !conn.outgoing.is_empty() {
        ConnState::Write
    } else if !conn.incoming.is_empty() {
        ConnState::Read
    } else {
        ConnState::Idle
    }
}

/// Writes as much of `conn.outgoing` as `sock` accepts right now.
pub fn handle_write<S: Write>(conn: &mut Connection, sock: &mut S) -> io::Result<ConnState> {
    while !conn.outgoing.is_empty() {
        match sock.write(&conn.outgoing) {
            Ok(0) => {
                conn.state = ConnState::Close;
                return Ok(ConnState::Close);
            }
            Ok(n) => conn.outgoing.advance(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    conn.state = if conn.outgoing.is_empty() {
        ConnState::Idle
    } else {
        ConnState::Write
    };
    Ok(conn.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::register_all;
    use crate::registry::CommandRegistry;

    fn shard() -> Shard {
        let mut registry = CommandRegistry::new();
        register_all(&mut registry);
        Shard::new(registry)
    }

    /// A `Read` stream that behaves like a nonblocking socket: yields its
    /// buffered bytes, then `WouldBlock` once drained, unless built with
    /// `closed` in which case exhaustion reports EOF (`Ok(0)`) instead —
    /// `Cursor` can't distinguish those two cases, so real sockets need this.
    struct MockStream {
        data: Vec<u8>,
        pos: usize,
        closed: bool,
    }

    impl MockStream {
        fn open(data: &[u8]) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                closed: false,
            }
        }

        fn closed() -> Self {
            Self {
                data: Vec::new(),
                pos: 0,
                closed: true,
            }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos < self.data.len() {
                let n = buf.len().min(self.data.len() - self.pos);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            } else if self.closed {
                Ok(0)
            } else {
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }

    #[test]
    fn full_frame_produces_a_queued_reply() {
        let mut conn = Connection::new(1);
        let mut shard = shard();
        let mut sock = MockStream::open(b"*1\r\n$4\r\nPING\r\n");
        let state = handle_read(&mut conn, &mut shard, &mut sock).unwrap();
        assert_eq!(state, ConnState::Write);
        assert_eq!(conn.outgoing, &b"$4\r\nPONG\r\n"[..]);
    }

    #[test]
    fn partial_frame_leaves_state_as_read() {
        let mut conn = Connection::new(1);
        let mut shard = shard();
        let mut sock = MockStream::open(b"*1\r\n$4\r\nPI");
        let state = handle_read(&mut conn, &mut shard, &mut sock).unwrap();
        assert_eq!(state, ConnState::Read);
        assert!(conn.outgoing.is_empty());
    }

    #[test]
    fn eof_on_read_closes_the_connection() {
        let mut conn = Connection::new(1);
        let mut shard = shard();
        let mut sock = MockStream::closed();
        let state = handle_read(&mut conn, &mut shard, &mut sock).unwrap();
        assert_eq!(state, ConnState::Close);
    }

    #[test]
    fn handle_write_drains_outgoing_into_the_sink() {
        let mut conn = Connection::new(1);
        conn.outgoing.extend_from_slice(b"+OK\r\n");
        let mut sink = Vec::new();
        let state = handle_write(&mut conn, &mut sink).unwrap();
        assert_eq!(state, ConnState::Idle);
        assert_eq!(sink, b"+OK\r\n");
        assert!(conn.outgoing.is_empty());
    }

    #[test]
    fn two_frames_in_one_read_both_get_replies() {
        let mut conn = Connection::new(1);
        let mut shard = shard();
        let mut sock = MockStream::open(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n");
        handle_read(&mut conn, &mut shard, &mut sock).unwrap();
        assert_eq!(conn.outgoing, &b"$4\r\nPONG\r\n$4\r\nPONG\r\n"[..]);
    }
}
