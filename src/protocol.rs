// src/protocol.rs

//! # Command Protocol
//!
//! This module maps one newline-terminated text request onto a [`Store`]
//! operation and renders the typed result back into wire bytes.
//! Requests are tokenized on whitespace; the first token is the
//! case-insensitive command name, the rest are positional arguments
//! (no quoting support).
//!
//! Supported commands:
//! - `PING`, `QUIT`
//! - `GET`, `SET` (with `EX <seconds>`), `DEL`, `EXISTS`, `INCR`, `DECR`
//! - `KEYS`, `FLUSHDB`
//! - `HSET`, `HGET`
//! - `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LRANGE`, `RRANGE`
//! - `EXPIRE`, `TTL`, `PERSIST`

use glob::Pattern;

use crate::store::Store;

/// Typed result of one dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No value
    Nil,
    /// Plain status or payload text
    Status(String),
    /// Error text, reported to the client without closing the connection
    Error(String),
    /// Integer result
    Integer(i64),
    /// Sequence of text elements
    Array(Vec<String>),
    /// Sentinel: write no bytes, the server closes the connection
    Quit,
}

impl Reply {
    /// Render the reply into wire bytes.
    ///
    /// | Reply     | Encoding                                             |
    /// |-----------|------------------------------------------------------|
    /// | `Nil`     | `(nil)\n`                                            |
    /// | `Status`  | `<text>\n`                                           |
    /// | `Error`   | `(<text>)\n`                                         |
    /// | `Integer` | `(integer) <n>\n`                                    |
    /// | `Array`   | `*<count>\n` then `$<len>\r\n<elem>\r\n` per element |
    /// | `Quit`    | no bytes                                             |
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Nil => b"(nil)\n".to_vec(),
            Reply::Status(text) => format!("{}\n", text).into_bytes(),
            Reply::Error(msg) => format!("({})\n", msg).into_bytes(),
            Reply::Integer(n) => format!("(integer) {}\n", n).into_bytes(),
            Reply::Array(items) => {
                let mut out = format!("*{}\n", items.len());
                for item in items {
                    out.push_str(&format!("${}\r\n{}\r\n", item.len(), item));
                }
                out.into_bytes()
            }
            Reply::Quit => Vec::new(),
        }
    }
}

/// The arity error every command arm reports.
fn wrong_args(cmd: &str) -> Reply {
    Reply::Error(format!("ERR wrong number of arguments for '{}'", cmd))
}

/// Convert an optional store value into a `Status` / `Nil` reply.
fn text_or_nil(value: Option<String>) -> Reply {
    match value {
        Some(text) => Reply::Status(text),
        None => Reply::Nil,
    }
}

/// Dispatch one request line against the store.
///
/// Returns `None` for blank input, in which case the caller writes no
/// reply. Argument-count and integer-format violations produce a
/// [`Reply::Error`] without touching the store.
pub fn dispatch(line: &str, store: &Store) -> Option<Reply> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (cmd_raw, args) = parts.split_first()?;
    let cmd = cmd_raw.to_uppercase();

    let reply = match cmd.as_str() {
        "PING" => Reply::Status("PONG".to_string()),

        "GET" => {
            if args.len() != 1 {
                wrong_args("GET")
            } else {
                text_or_nil(store.get(args[0]))
            }
        }

        "SET" => match args {
            [key, value] => {
                store.set(key, value, None);
                Reply::Status("OK".to_string())
            }
            [key, value, opt, secs] if opt.eq_ignore_ascii_case("EX") => {
                match secs.parse::<u64>() {
                    Ok(secs) => {
                        store.set(key, value, Some(secs));
                        Reply::Status("OK".to_string())
                    }
                    Err(_) => {
                        Reply::Error("ERR value is not an integer or out of range".to_string())
                    }
                }
            }
            _ => wrong_args("SET"),
        },

        "DEL" => {
            if args.is_empty() {
                wrong_args("DEL")
            } else {
                let keys: Vec<String> = args.iter().map(|s| s.to_string()).collect();
                Reply::Integer(store.del(&keys) as i64)
            }
        }

        "EXISTS" => {
            if args.is_empty() {
                wrong_args("EXISTS")
            } else {
                let keys: Vec<String> = args.iter().map(|s| s.to_string()).collect();
                Reply::Integer(store.exists(&keys) as i64)
            }
        }

        "INCR" | "DECR" => {
            if args.len() != 1 {
                wrong_args(&cmd)
            } else {
                let delta = if cmd == "INCR" { 1 } else { -1 };
                match store.incr_by(args[0], delta) {
                    Ok(n) => Reply::Integer(n),
                    Err(e) => Reply::Error(format!("ERR {}", e)),
                }
            }
        }

        "KEYS" => {
            if args.len() != 1 {
                wrong_args("KEYS")
            } else {
                match Pattern::new(args[0]) {
                    Ok(pattern) => Reply::Array(store.keys(&pattern)),
                    Err(_) => Reply::Error("ERR invalid glob pattern".to_string()),
                }
            }
        }

        "FLUSHDB" => {
            if !args.is_empty() {
                wrong_args("FLUSHDB")
            } else {
                store.flushdb();
                Reply::Status("OK".to_string())
            }
        }

        "HSET" => {
            if args.len() != 3 {
                wrong_args("HSET")
            } else {
                Reply::Integer(store.hset(args[0], args[1], args[2]))
            }
        }

        "HGET" => {
            if args.len() != 2 {
                wrong_args("HGET")
            } else {
                text_or_nil(store.hget(args[0], args[1]))
            }
        }

        "LPUSH" | "RPUSH" => {
            if args.len() < 2 {
                wrong_args(&cmd)
            } else {
                let values: Vec<String> = args[1..].iter().map(|s| s.to_string()).collect();
                let len = if cmd == "LPUSH" {
                    store.lpush(args[0], &values)
                } else {
                    store.rpush(args[0], &values)
                };
                Reply::Integer(len as i64)
            }
        }

        "LPOP" => {
            if args.len() != 1 {
                wrong_args("LPOP")
            } else {
                text_or_nil(store.lpop(args[0]))
            }
        }

        "RPOP" => {
            if args.len() != 1 {
                wrong_args("RPOP")
            } else {
                text_or_nil(store.rpop(args[0]))
            }
        }

        "LRANGE" | "RRANGE" => {
            if args.len() != 3 {
                wrong_args(&cmd)
            } else {
                match (args[1].parse::<i64>(), args[2].parse::<i64>()) {
                    (Ok(start), Ok(end)) => {
                        let items = if cmd == "LRANGE" {
                            store.lrange(args[0], start, end)
                        } else {
                            store.rrange(args[0], start, end)
                        };
                        Reply::Array(items)
                    }
                    _ => Reply::Error("ERR invalid start or stop".to_string()),
                }
            }
        }

        "EXPIRE" => {
            if args.len() != 2 {
                wrong_args("EXPIRE")
            } else {
                match args[1].parse::<u64>() {
                    Ok(secs) => Reply::Integer(store.expire(args[0], secs) as i64),
                    Err(_) => {
                        Reply::Error("ERR value is not an integer or out of range".to_string())
                    }
                }
            }
        }

        "TTL" => {
            if args.len() != 1 {
                wrong_args("TTL")
            } else {
                Reply::Integer(store.ttl(args[0]))
            }
        }

        "PERSIST" => {
            if args.len() != 1 {
                wrong_args("PERSIST")
            } else {
                Reply::Integer(store.persist(args[0]) as i64)
            }
        }

        "QUIT" => Reply::Quit,

        other => Reply::Error(format!("ERR unknown command '{}'", other)),
    };

    Some(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_yields_no_reply() {
        let store = Store::new();
        assert_eq!(dispatch("", &store), None);
        assert_eq!(dispatch("   \t ", &store), None);
    }

    #[test]
    fn test_ping_and_quit() {
        let store = Store::new();
        assert_eq!(dispatch("PING", &store), Some(Reply::Status("PONG".into())));
        // command word is case-insensitive
        assert_eq!(dispatch("ping", &store), Some(Reply::Status("PONG".into())));
        assert_eq!(dispatch("QUIT", &store), Some(Reply::Quit));
    }

    #[test]
    fn test_set_get_with_ex_option() {
        let store = Store::new();
        assert_eq!(dispatch("SET foo bar", &store), Some(Reply::Status("OK".into())));
        assert_eq!(dispatch("GET foo", &store), Some(Reply::Status("bar".into())));

        // EX is case-insensitive and takes an integer
        assert_eq!(dispatch("SET foo bar ex 100", &store), Some(Reply::Status("OK".into())));
        assert_eq!(dispatch("TTL foo", &store), Some(Reply::Integer(100)));

        // bad seconds leave the store untouched
        assert_eq!(
            dispatch("SET other v EX abc", &store),
            Some(Reply::Error("ERR value is not an integer or out of range".into()))
        );
        assert_eq!(dispatch("GET other", &store), Some(Reply::Nil));

        // a stray option token is an arity error
        assert_eq!(
            dispatch("SET k v PX 10", &store),
            Some(Reply::Error("ERR wrong number of arguments for 'SET'".into()))
        );
    }

    #[test]
    fn test_arity_errors() {
        let store = Store::new();
        assert_eq!(
            dispatch("GET", &store),
            Some(Reply::Error("ERR wrong number of arguments for 'GET'".into()))
        );
        assert_eq!(
            dispatch("SET k", &store),
            Some(Reply::Error("ERR wrong number of arguments for 'SET'".into()))
        );
        assert_eq!(
            dispatch("HSET k f", &store),
            Some(Reply::Error("ERR wrong number of arguments for 'HSET'".into()))
        );
        assert_eq!(
            dispatch("LRANGE k 0", &store),
            Some(Reply::Error("ERR wrong number of arguments for 'LRANGE'".into()))
        );
        // none of the above touched the store
        assert_eq!(dispatch("KEYS *", &store), Some(Reply::Array(Vec::new())));
    }

    #[test]
    fn test_unknown_command() {
        let store = Store::new();
        assert_eq!(
            dispatch("blorp x", &store),
            Some(Reply::Error("ERR unknown command 'BLORP'".into()))
        );
    }

    #[test]
    fn test_del_exists_multi_key() {
        let store = Store::new();
        dispatch("SET a 1", &store);
        dispatch("SET b 2", &store);
        assert_eq!(dispatch("EXISTS a b missing", &store), Some(Reply::Integer(2)));
        assert_eq!(dispatch("DEL a b missing", &store), Some(Reply::Integer(2)));
        assert_eq!(dispatch("EXISTS a b", &store), Some(Reply::Integer(0)));
    }

    #[test]
    fn test_incr_decr() {
        let store = Store::new();
        assert_eq!(dispatch("INCR n", &store), Some(Reply::Integer(1)));
        assert_eq!(dispatch("DECR n", &store), Some(Reply::Integer(0)));
        dispatch("SET n abc", &store);
        assert_eq!(
            dispatch("INCR n", &store),
            Some(Reply::Error("ERR value is not an integer or out of range".into()))
        );
    }

    #[test]
    fn test_encode_wire_format() {
        assert_eq!(Reply::Nil.encode(), b"(nil)\n");
        assert_eq!(Reply::Status("PONG".into()).encode(), b"PONG\n");
        assert_eq!(Reply::Error("ERR boom".into()).encode(), b"(ERR boom)\n");
        assert_eq!(Reply::Integer(42).encode(), b"(integer) 42\n");
        assert_eq!(
            Reply::Array(vec!["a".into(), "bc".into()]).encode(),
            b"*2\n$1\r\na\r\n$2\r\nbc\r\n"
        );
        assert!(Reply::Quit.encode().is_empty());
    }

    #[test]
    fn test_list_commands_wire_scenario() {
        let store = Store::new();
        assert_eq!(dispatch("LPUSH mylist a b c", &store), Some(Reply::Integer(3)));

        // block insert: the first given value sits at the head
        let reply = dispatch("LRANGE mylist 0 -1", &store).unwrap();
        assert_eq!(reply, Reply::Array(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(reply.encode(), b"*3\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n");

        assert_eq!(
            dispatch("RRANGE mylist 0 -1", &store),
            Some(Reply::Array(vec!["c".into(), "b".into(), "a".into()]))
        );
        assert_eq!(dispatch("LPOP mylist", &store), Some(Reply::Status("a".into())));
        assert_eq!(dispatch("RPOP mylist", &store), Some(Reply::Status("c".into())));
        assert_eq!(dispatch("LPOP missing", &store), Some(Reply::Nil));
    }
}
