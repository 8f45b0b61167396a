use std::net::ToSocketAddrs;

use respd::{commands::register_all, registry::CommandRegistry, shard::Shard, DEFAULT_ADDR};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let addr = DEFAULT_ADDR
        .to_socket_addrs()?
        .next()
        .expect("DEFAULT_ADDR resolves to at least one address");

    let mut registry = CommandRegistry::new();
    register_all(&mut registry);
    let shard = Shard::new(registry);

    respd::net::run(addr, shard)?;
    Ok(())
}
