/*!
 * Command Registry
 *
 * An explicit table from lowercase command name to handler, built once in
 * `main` via `commands::register_all` before the event loop starts
 * accepting connections. No linker-side inventory collection, no global
 * singleton — a `Shard` owns its registry and it can be rebuilt fresh in
 * every test.
 */

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::commands::CommandContext;
use crate::value::Value;

pub type CommandHandler = fn(&[Value], &mut CommandContext) -> Value;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: FxHashMap<SmolStr, CommandHandler>,
    names: Vec<SmolStr>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under the lowercased form of `name`. Panics on a
    /// duplicate registration — that's a programming error, never a runtime
    /// condition a client can trigger.
    pub fn register(&mut self, name: &str, handler: CommandHandler) {
        let key = SmolStr::new(name.to_ascii_lowercase());
        if self.handlers.insert(key.clone(), handler).is_some() {
            panic!("duplicate command registration for '{name}'");
        }
        self.names.push(key);
        self.names.sort();
    }

    /// Every registered command name, sorted, lowercase. Used by `COMMAND
    /// DOCS` to enumerate the table it's reflecting over.
    pub fn names(&self) -> &[SmolStr] {
        &self.names
    }

    pub fn dispatch(&self, name: &[u8], args: &[Value], ctx: &mut CommandContext) -> Value {
        let lowered = name.to_ascii_lowercase();
        let key = match std::str::from_utf8(&lowered) {
            Ok(s) => s,
            Err(_) => return Value::error("ERR invalid command name"),
        };
        match self.handlers.get(key) {
            Some(handler) => handler(args, ctx),
            None => Value::error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::Keyspace;

    fn noop(_args: &[Value], _ctx: &mut CommandContext) -> Value {
        Value::str("OK")
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register("ping", noop);
        let mut ks = Keyspace::new();
        let mut ctx = CommandContext {
            keyspace: &mut ks,
            command_names: registry.names(),
        };
        assert_eq!(registry.dispatch(b"PING", &[], &mut ctx), Value::str("OK"));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let registry = CommandRegistry::new();
        let mut ks = Keyspace::new();
        let mut ctx = CommandContext {
            keyspace: &mut ks,
            command_names: registry.names(),
        };
        let reply = registry.dispatch(b"NOSUCH", &[], &mut ctx);
        assert!(matches!(reply, Value::Error(_)));
    }

    #[test]
    #[should_panic(expected = "duplicate command registration")]
    fn duplicate_registration_panics() {
        let mut registry = CommandRegistry::new();
        registry.register("ping", noop);
        registry.register("PING", noop);
    }
}
