/*!
 * Network Layer and Event Loop
 *
 * A single-threaded, mio-driven event loop. One thread owns the listening
 * socket and the whole connection table; command execution never leaves
 * that thread, so the shard behind it needs no locking. The listener binds
 * dual-stack IPv6 so a lone address serves both v4 and v6 clients.
 */

use std::io;
use std::net::SocketAddr;

use hashbrown::HashMap;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::conn::{handle_read, handle_write, ConnState, Connection};
use crate::shard::Shard;

const LISTENER: Token = Token(0);

/// Approximates `SOMAXCONN` without pulling in `libc` for one constant;
/// every platform this targets accepts a backlog this size.
const BACKLOG: i32 = 1024;

/// Binds `addr` as a non-blocking, dual-stack (when `addr` is IPv6) TCP
/// listener with `SO_REUSEADDR` set, then hands it to mio.
pub fn bind_dual_stack(addr: SocketAddr) -> io::Result<TcpListener> {
    let is_v6 = addr.is_ipv6();
    let domain = if is_v6 { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if is_v6 {
        socket.set_only_v6(false).ok();
    }
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Binds `addr` and runs the event loop. Never returns under normal
/// operation.
pub fn run(addr: SocketAddr, shard: Shard) -> io::Result<()> {
    let listener = bind_dual_stack(addr)?;
    log::info!("respd listening on {addr}");
    run_on(listener, shard)
}

/// Runs the event loop against an already-bound listener. Split out from
/// [`run`] so tests can bind an ephemeral port, learn its address, and only
/// then start serving it.
pub fn run_on(mut listener: TcpListener, mut shard: Shard) -> io::Result<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(1024);
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)?;

    let mut connections: HashMap<usize, (TcpStream, Connection)> = HashMap::new();
    let mut next_token: usize = 1;

    loop {
        poll.poll(&mut events, None)?;
        for event in events.iter() {
            match event.token() {
                LISTENER => accept_all(&listener, &poll, &mut connections, &mut next_token),
                Token(id) => service(id, event, &poll, &mut connections, &mut shard),
            }
        }
    }
}

fn accept_all(
    listener: &TcpListener,
    poll: &Poll,
    connections: &mut HashMap<usize, (TcpStream, Connection)>,
    next_token: &mut usize,
) {
    loop {
        match listener.accept() {
            Ok((mut sock, peer)) => {
                sock.set_nodelay(true).ok();
                let id = *next_token;
                *next_token += 1;
                if let Err(e) = poll.registry().register(
                    &mut sock,
                    Token(id),
                    Interest::READABLE | Interest::WRITABLE,
                ) {
                    log::warn!("failed to register connection {id}: {e}");
                    continue;
                }
                log::debug!("accepted connection {id} from {peer}");
                connections.insert(id, (sock, Connection::new(id)));
            }
            Err(e) if would_block(&e) => return,
            Err(e) => {
                log::warn!("accept error: {e}");
                return;
            }
        }
    }
}

fn service(
    id: usize,
    event: &mio::event::Event,
    poll: &Poll,
    connections: &mut HashMap<usize, (TcpStream, Connection)>,
    shard: &mut Shard,
) {
    let mut close = false;

    if let Some((sock, conn)) = connections.get_mut(&id) {
        if event.is_readable() {
            match handle_read(conn, shard, sock) {
                Ok(ConnState::Close) => close = true,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("read error on connection {id}: {e}");
                    close = true;
                }
            }
        }
        if !close && (event.is_writable() || conn.state == ConnState::Write) {
            match handle_write(conn, sock) {
                Ok(ConnState::Close) => close = true,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("write error on connection {id}: {e}");
                    close = true;
                }
            }
        }
    } else {
        return;
    }

    if close {
        if let Some((mut sock, _)) = connections.remove(&id) {
            let _ = poll.registry().deregister(&mut sock);
        }
        log::debug!("closed connection {id}");
    }
}

#[inline]
fn would_block(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}
