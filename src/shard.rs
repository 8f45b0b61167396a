/*!
 * Command Execution Shard
 *
 * A shard owns everything a connection needs dispatched against: the
 * command table and the keyspace it operates on. The server is
 * single-threaded, so there is exactly one shard for the whole process —
 * but keeping it as its own type (rather than threading `CommandRegistry`
 * and `Keyspace` separately through `conn`/`net`) keeps the event loop's
 * signature small and makes it trivial to stand up a second, isolated
 * shard in a test.
 */

use crate::commands::CommandContext;
use crate::keyspace::Keyspace;
use crate::registry::CommandRegistry;
use crate::value::Value;

pub struct Shard {
    registry: CommandRegistry,
    keyspace: Keyspace,
}

impl Shard {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            keyspace: Keyspace::new(),
        }
    }

    /// Dispatches one already-decoded frame and returns the reply to send
    /// back. `frame` is expected to be a command array (`*<n>\r\n...`); any
    /// other top-level shape is coerced via `to_array_safe` and, if that
    /// yields something that doesn't start with a command name, rejected.
    pub fn dispatch(&mut self, frame: Value) -> Value {
        let mut items = frame.to_array_safe();
        if items.is_empty() {
            return Value::error("ERR empty command");
        }
        let name = match items.remove(0) {
            Value::Str(bytes) => bytes,
            other => {
                return Value::error(format!(
                    "ERR unexpected command token '{}'",
                    other.to_display_string()
                ))
            }
        };
        let mut ctx = CommandContext {
            keyspace: &mut self.keyspace,
            command_names: self.registry.names(),
        };
        self.registry.dispatch(&name, &items, &mut ctx)
    }
}
