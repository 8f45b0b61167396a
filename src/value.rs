/*!
 * RESP Value Model
 *
 * A tagged union over every RESP2/RESP3 data kind the server speaks, plus
 * the wire encoder and the handful of "safe coercions" handlers use to pull
 * typed data back out of a `Value` without matching on every variant
 * themselves.
 */

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::xxh3_64;

/// A RESP value.
///
/// `Str` serves both the "simple string" and "bulk string" wire forms —
/// the decoder folds both into this one variant (see `protocol::simple_string`
/// and `protocol::bulk_string`); the encoder always re-emits bulk strings,
/// which is why `encode(decode(b)) == b` does not hold byte-for-byte but
/// `decode(encode(decode(b)))` does.
#[derive(Debug, Clone)]
pub enum Value {
    Str(Vec<u8>),
    Int(i64),
    Error(Vec<u8>),
    Array(Vec<Value>),
    /// RESP3 map. Represented as an association list rather than a hash map:
    /// RESP map keys can themselves be arbitrary `Value`s, and an association
    /// list sidesteps needing a `Hash`/`Eq`-keyed map over a recursive sum
    /// type for what is, in this server, always a handful of entries.
    Map(Vec<(Value, Value)>),
    Null,
}

/// Structural equality, matching spec's "Equality is structural across all
/// variants". `Map` is unordered on the wire, so it can't simply derive this:
/// two maps built from the same pairs in a different order must compare
/// equal, hence the explicit multiset comparison below rather than a
/// positional `Vec` comparison.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|pair| b.contains(pair))
            }
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    pub fn str(s: impl Into<Vec<u8>>) -> Value {
        Value::Str(s.into())
    }

    pub fn error(msg: impl Into<Vec<u8>>) -> Value {
        Value::Error(msg.into())
    }

    /// Build a `Map`, deduplicating keys by structural equality (last write
    /// wins), matching spec's "keys unique by structural equality".
    pub fn map(pairs: Vec<(Value, Value)>) -> Value {
        let mut out: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            if let Some(slot) = out.iter_mut().find(|(ek, _)| *ek == k) {
                slot.1 = v;
            } else {
                out.push((k, v));
            }
        }
        Value::Map(out)
    }

    /// Exact wire bytes for this value (`to_protocol_representation` in
    /// spec terms).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::Str(s) => {
                out.extend_from_slice(format!("${}\r\n", s.len()).as_bytes());
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            Value::Int(n) => {
                out.extend_from_slice(format!(":{}\r\n", n).as_bytes());
            }
            Value::Error(e) => {
                out.push(b'-');
                out.extend_from_slice(e);
                out.extend_from_slice(b"\r\n");
            }
            Value::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode_into(out);
                }
            }
            Value::Map(pairs) => {
                out.extend_from_slice(format!("%{}\r\n", pairs.len()).as_bytes());
                for (k, v) in pairs {
                    k.encode_into(out);
                    v.encode_into(out);
                }
            }
            Value::Null => out.extend_from_slice(b"_\r\n"),
        }
    }

    /// Display form for logs and error messages. Not round-tripping — never
    /// use this to build a wire reply.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => String::from_utf8_lossy(s).into_owned(),
            Value::Int(n) => n.to_string(),
            Value::Error(e) => String::from_utf8_lossy(e).into_owned(),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::to_display_string).collect();
                format!("[{}]", inner.join(" "))
            }
            Value::Map(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k.to_display_string(), v.to_display_string()))
                    .collect();
                format!("{{{}}}", inner.join(" "))
            }
            Value::Null => "(nil)".to_string(),
        }
    }

    /// Coerce to an array the way handlers expect: already an array passes
    /// through, a scalar becomes a one-element array, a map becomes an
    /// array of two-element `[k, v]` arrays, and null becomes empty.
    pub fn to_array_safe(&self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.clone(),
            Value::Map(pairs) => pairs
                .iter()
                .map(|(k, v)| Value::Array(vec![k.clone(), v.clone()]))
                .collect(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Coerce to an integer: `Int` passes through, `Str` is parsed as ASCII
    /// decimal, everything else fails.
    pub fn to_int_safe(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(s) => std::str::from_utf8(s).ok()?.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Like `encode_into`, except a `Map`'s pairs are written in sorted
    /// order rather than insertion order. Two `Value`s that compare equal
    /// (multiset equality for `Map`, see the `PartialEq` impl above) always
    /// produce identical canonical bytes, which is what `Hash` is built on
    /// below — encoding in insertion order would let equal-but-differently-
    /// ordered maps hash unequally, breaking `a == b ⇒ hash(a) == hash(b)`.
    fn canonical_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Value::Map(pairs) => {
                let mut encoded_pairs: Vec<Vec<u8>> = pairs
                    .iter()
                    .map(|(k, v)| {
                        let mut buf = Vec::new();
                        k.canonical_bytes(&mut buf);
                        v.canonical_bytes(&mut buf);
                        buf
                    })
                    .collect();
                encoded_pairs.sort();
                out.extend_from_slice(format!("%{}\r\n", pairs.len()).as_bytes());
                for pair in encoded_pairs {
                    out.extend_from_slice(&pair);
                }
            }
            Value::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.canonical_bytes(out);
                }
            }
            other => other.encode_into(out),
        }
    }
}

/// Computed over the canonical (order-normalized) encoding, per spec's note
/// that implementations may hash RESP values this way rather than deriving
/// a structural hash over a recursive sum type. Using the canonical form
/// rather than the wire encoding keeps this consistent with `PartialEq`'s
/// order-independent treatment of `Map`.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut bytes = Vec::new();
        self.canonical_bytes(&mut bytes);
        state.write_u64(xxh3_64(&bytes));
    }
}
