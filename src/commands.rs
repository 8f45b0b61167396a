/*!
 * Command Handlers
 *
 * Every handler has the shape `fn(&[Value], &mut CommandContext) -> Value`:
 * it never sees the command name (the registry already consumed it) and it
 * never touches the wire — it returns the `Value` the connection layer will
 * encode. Handlers that can fail build a `CommandError` and convert it with
 * `.into()` rather than returning `Result`, since the registry's call site
 * has nowhere to propagate one to.
 */

use std::time::Duration;

use smol_str::SmolStr;
use thiserror::Error;

use crate::keyspace::Keyspace;
use crate::registry::CommandRegistry;
use crate::value::Value;

/// A RESP error reply, already carrying its stable prefix (`ERR`,
/// `WRONGTYPE`, ...).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CommandError(String);

impl CommandError {
    pub fn err(msg: impl Into<String>) -> Self {
        CommandError(format!("ERR {}", msg.into()))
    }

    pub fn wrong_type(msg: impl Into<String>) -> Self {
        CommandError(format!("WRONGTYPE {}", msg.into()))
    }
}

impl From<CommandError> for Value {
    fn from(e: CommandError) -> Value {
        Value::error(e.0)
    }
}

/// The state a handler is allowed to touch: the keyspace it may read or
/// mutate, and the read-only list of every registered command name (for
/// `COMMAND DOCS`'s self-reflection).
pub struct CommandContext<'a> {
    pub keyspace: &'a mut Keyspace,
    pub command_names: &'a [SmolStr],
}

fn key_bytes(v: &Value) -> Vec<u8> {
    match v {
        Value::Str(b) => b.clone(),
        other => other.to_display_string().into_bytes(),
    }
}

pub fn cmd_ping(args: &[Value], _ctx: &mut CommandContext) -> Value {
    match args {
        [] => Value::str("PONG"),
        [msg] => msg.clone(),
        _ => CommandError::err("wrong number of arguments for 'ping' command").into(),
    }
}

pub fn cmd_echo(args: &[Value], _ctx: &mut CommandContext) -> Value {
    match args {
        [msg] => msg.clone(),
        _ => CommandError::err("wrong number of arguments for 'echo' command").into(),
    }
}

pub fn cmd_command(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [sub] if sub.to_display_string().eq_ignore_ascii_case("docs") => {
            let pairs = ctx
                .command_names
                .iter()
                .map(|name| {
                    (
                        Value::str(name.as_str()),
                        Value::Array(vec![Value::str(name.as_str())]),
                    )
                })
                .collect();
            Value::map(pairs)
        }
        [sub] => CommandError::err(format!(
            "unknown subcommand '{}' for 'command'",
            sub.to_display_string()
        ))
        .into(),
        _ => CommandError::err("wrong number of arguments for 'command' command").into(),
    }
}

pub fn cmd_hello(args: &[Value], _ctx: &mut CommandContext) -> Value {
    match args {
        [ver] => match ver.to_int_safe() {
            Some(3) => Value::map(vec![(Value::str("proto"), Value::Int(3))]),
            _ => CommandError::err("unsupported protocol version").into(),
        },
        _ => CommandError::err("wrong number of arguments for 'hello' command").into(),
    }
}

pub fn cmd_client(_args: &[Value], _ctx: &mut CommandContext) -> Value {
    // Every subcommand (SETNAME, SETINFO, ...) is accepted and ignored;
    // there is no per-connection identity to attach it to.
    Value::str("OK")
}

pub fn cmd_config(args: &[Value], _ctx: &mut CommandContext) -> Value {
    match args {
        [sub, key] => {
            if !sub.to_display_string().eq_ignore_ascii_case("get") {
                return CommandError::err(format!(
                    "unknown subcommand '{}' for 'config'",
                    sub.to_display_string()
                ))
                .into();
            }
            let value = match key.to_display_string().to_ascii_lowercase().as_str() {
                "save" => "",
                "appendonly" => "no",
                _ => "",
            };
            Value::str(value)
        }
        _ => CommandError::err("wrong number of arguments for 'config' command").into(),
    }
}

pub fn cmd_set(args: &[Value], ctx: &mut CommandContext) -> Value {
    if args.len() < 2 {
        return CommandError::err("wrong number of arguments for 'set' command").into();
    }
    let key = key_bytes(&args[0]);
    let value = args[1].clone();

    let mut expire_in: Option<Duration> = None;
    let mut i = 2;
    while i < args.len() {
        let opt = args[i].to_display_string();
        let is_px = opt.eq_ignore_ascii_case("px");
        let is_ex = opt.eq_ignore_ascii_case("ex");
        if !is_px && !is_ex {
            i += 1;
            continue;
        }
        if expire_in.is_some() {
            return CommandError::err("Only one of EX or PX is allowed").into();
        }
        let amount = match args.get(i + 1).and_then(Value::to_int_safe) {
            Some(n) if n >= 0 => n as u64,
            _ => return CommandError::err("value is not an integer or out of range").into(),
        };
        expire_in = Some(if is_px {
            Duration::from_millis(amount)
        } else {
            Duration::from_secs(amount)
        });
        i += 2;
    }

    ctx.keyspace.set(key, value, expire_in);
    Value::str("OK")
}

pub fn cmd_get(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [key, ..] => match ctx.keyspace.get(&key_bytes(key)) {
            Some(v) => Value::str(v.to_display_string()),
            None => Value::Null,
        },
        [] => CommandError::err("wrong number of arguments for 'get' command").into(),
    }
}

fn counter_op(key: &[u8], ctx: &mut CommandContext, delta: i64) -> Value {
    match ctx.keyspace.get(key) {
        Some(existing) => match existing.to_int_safe() {
            Some(n) => {
                let updated = n.wrapping_add(delta);
                ctx.keyspace.set(key.to_vec(), Value::Int(updated), None);
                Value::Int(updated)
            }
            None => CommandError::wrong_type("value is not an integer or out of range").into(),
        },
        None => {
            ctx.keyspace.set(key.to_vec(), Value::Int(delta), None);
            Value::Int(delta)
        }
    }
}

pub fn cmd_incr(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [key] => counter_op(&key_bytes(key), ctx, 1),
        _ => CommandError::err("wrong number of arguments for 'incr' command").into(),
    }
}

pub fn cmd_decr(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [key] => counter_op(&key_bytes(key), ctx, -1),
        _ => CommandError::err("wrong number of arguments for 'decr' command").into(),
    }
}

pub fn cmd_incrby(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [key, amount] => match amount.to_int_safe() {
            Some(n) => counter_op(&key_bytes(key), ctx, n),
            None => CommandError::err("value is not an integer or out of range").into(),
        },
        _ => CommandError::err("wrong number of arguments for 'incrby' command").into(),
    }
}

pub fn cmd_decrby(args: &[Value], ctx: &mut CommandContext) -> Value {
    match args {
        [key, amount] => match amount.to_int_safe() {
            Some(n) => counter_op(&key_bytes(key), ctx, -n),
            None => CommandError::err("value is not an integer or out of range").into(),
        },
        _ => CommandError::err("wrong number of arguments for 'decrby' command").into(),
    }
}

/// Populates `registry` with every command this server understands. Called
/// once from `main`, before the event loop is given the listener.
pub fn register_all(registry: &mut CommandRegistry) {
    registry.register("ping", cmd_ping);
    registry.register("echo", cmd_echo);
    registry.register("command", cmd_command);
    registry.register("hello", cmd_hello);
    registry.register("client", cmd_client);
    registry.register("config", cmd_config);
    registry.register("set", cmd_set);
    registry.register("get", cmd_get);
    registry.register("incr", cmd_incr);
    registry.register("decr", cmd_decr);
    registry.register("incrby", cmd_incrby);
    registry.register("decrby", cmd_decrby);
}
