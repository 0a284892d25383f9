//! Command-line shell and REPL
//!
//! Commands operate on raw primitives: the shell does not know the domain
//! types behind the keys, so every handle it builds decodes to
//! `Option<Primitive>` of the requested kind.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use live_prefs::{
    MemoryStore, Observable, PreferenceFactory, Primitive, PrimitiveKind, Subscription,
    ValueAdapter,
};
use rustyline::DefaultEditor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Sink for shell output lines
pub type Output = Arc<dyn Fn(String) + Send + Sync>;

const HELP: &str = "\
commands:
  get <kind> <key>            read a value
  set <kind> <key> <value>    write a value (string-list: comma separated)
  clear <key>                 remove a key
  keys                        list keys
  dump                        list every entry
  watch <kind> <key>          print every change of a key
  unwatch <key>               stop watching a key
  help                        show this text
  quit                        leave the shell
kinds: bool, int, float, string, string-list";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get { kind: PrimitiveKind, key: String },
    Set { key: String, value: Primitive },
    Clear { key: String },
    Keys,
    Dump,
    Watch { kind: PrimitiveKind, key: String },
    Unwatch { key: String },
    Help,
    Quit,
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = split_word(line);

    let command = match verb {
        "get" => {
            let (kind, key) = parse_kind_and_key(rest)?;
            Command::Get { kind, key }
        }
        "set" => {
            let (kind, rest) = split_word(rest);
            let kind = parse_kind(kind)?;
            let (key, value) = split_word(rest);
            if key.is_empty() {
                bail!("usage: set <kind> <key> <value>");
            }
            Command::Set {
                key: key.to_string(),
                value: parse_value(kind, value)?,
            }
        }
        "clear" => Command::Clear {
            key: single_key(rest, "clear <key>")?,
        },
        "keys" => Command::Keys,
        "dump" => Command::Dump,
        "watch" => {
            let (kind, key) = parse_kind_and_key(rest)?;
            Command::Watch { kind, key }
        }
        "unwatch" => Command::Unwatch {
            key: single_key(rest, "unwatch <key>")?,
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => bail!("empty command"),
        other => bail!("unknown command: {} (try 'help')", other),
    };

    Ok(command)
}

/// Parse `text` as a value of `kind`
pub fn parse_value(kind: PrimitiveKind, text: &str) -> Result<Primitive> {
    let text = text.trim();
    let value = match kind {
        PrimitiveKind::Bool => Primitive::Bool(
            text.parse()
                .with_context(|| format!("not a bool: {:?}", text))?,
        ),
        PrimitiveKind::Int => Primitive::Int(
            text.parse()
                .with_context(|| format!("not an integer: {:?}", text))?,
        ),
        PrimitiveKind::Float => Primitive::Float(
            text.parse()
                .with_context(|| format!("not a number: {:?}", text))?,
        ),
        PrimitiveKind::String => Primitive::String(text.to_string()),
        PrimitiveKind::StringList => Primitive::StringList(if text.is_empty() {
            Vec::new()
        } else {
            text.split(',').map(|item| item.trim().to_string()).collect()
        }),
    };
    Ok(value)
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    }
}

fn parse_kind(text: &str) -> Result<PrimitiveKind> {
    match PrimitiveKind::from_str(text) {
        Some(kind) => Ok(kind),
        None => bail!("unknown kind: {:?}", text),
    }
}

fn parse_kind_and_key(text: &str) -> Result<(PrimitiveKind, String)> {
    let (kind, rest) = split_word(text);
    let kind = parse_kind(kind)?;
    Ok((kind, single_key(rest, "<kind> <key>")?))
}

fn single_key(text: &str, usage: &str) -> Result<String> {
    let (key, rest) = split_word(text);
    if key.is_empty() || !rest.is_empty() {
        bail!("usage: {}", usage);
    }
    Ok(key.to_string())
}

/// Reads and writes one primitive kind as-is; absence stays `None`
struct RawAdapter(PrimitiveKind);

impl ValueAdapter<Option<Primitive>> for RawAdapter {
    fn kind(&self) -> PrimitiveKind {
        self.0
    }

    fn decode(&self, raw: Primitive) -> Option<Option<Primitive>> {
        Some(Some(raw))
    }

    fn encode(&self, value: &Option<Primitive>) -> Option<Primitive> {
        value.clone()
    }
}

fn describe(value: &Option<Primitive>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "<unset>".to_string(),
    }
}

/// Interactive shell state
pub struct Shell {
    factory: PreferenceFactory,
    store: Arc<MemoryStore>,
    watches: HashMap<String, Subscription>,
    out: Output,
}

impl Shell {
    pub fn new(factory: PreferenceFactory, store: Arc<MemoryStore>, out: Output) -> Self {
        Self {
            factory,
            store,
            watches: HashMap::new(),
            out,
        }
    }

    /// Run one command; returns `false` once the shell should exit
    pub fn execute(&mut self, command: Command) -> Result<bool> {
        debug!("Executing {:?}", command);
        match command {
            Command::Get { kind, key } => {
                let pref = self.factory.get_custom_value(&key, None, RawAdapter(kind))?;
                self.print(format!("{} = {}", key, describe(&pref.get())));
            }
            Command::Set { key, value } => {
                let pref = self
                    .factory
                    .get_custom_value(&key, None, RawAdapter(value.kind()))?;
                if !pref.set(Some(value)) {
                    bail!("write to '{}' was not committed", key);
                }
            }
            Command::Clear { key } => {
                if !self.factory.remove(&key) {
                    bail!("removal of '{}' was not committed", key);
                }
            }
            Command::Keys => {
                let keys: Vec<String> = self.factory.keys().get().into_iter().collect();
                self.print(keys.join(" "));
            }
            Command::Dump => {
                for (key, value) in self.store.snapshot() {
                    self.print(format!("{} ({}) = {}", key, value.kind(), value));
                }
            }
            Command::Watch { kind, key } => {
                let pref = self.factory.get_custom_value(&key, None, RawAdapter(kind))?;
                let out = Arc::clone(&self.out);
                let label = key.clone();
                let subscription = pref.observe(move |value| {
                    out(format!("{} {} = {}", "~".cyan(), label.bold(), describe(&value)));
                });
                // Replacing an existing watch drops (and cancels) the old one
                self.watches.insert(key, subscription);
            }
            Command::Unwatch { key } => {
                if self.watches.remove(&key).is_none() {
                    bail!("'{}' is not watched", key);
                }
            }
            Command::Help => self.print(HELP.to_string()),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    pub fn watched(&self) -> usize {
        self.watches.len()
    }

    fn print(&self, line: String) {
        (self.out)(line);
    }
}

/// Read-eval-print loop on the terminal; blocks until `quit` or EOF
pub fn run_repl(mut shell: Shell) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("prefs> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                let result = parse_command(&line).and_then(|command| shell.execute(command));
                match result {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("{} {:#}", "error:".red().bold(), e),
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn shell() -> (Shell, Arc<Mutex<Vec<String>>>) {
        colored::control::set_override(false);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let store = Arc::new(MemoryStore::new());
        let factory = PreferenceFactory::with_store(store.clone());
        let shell = Shell::new(factory, store, Arc::new(move |line: String| sink.lock().push(line)));
        (shell, lines)
    }

    fn run(shell: &mut Shell, line: &str) -> Result<bool> {
        shell.execute(parse_command(line)?)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("get int volume").unwrap(),
            Command::Get {
                kind: PrimitiveKind::Int,
                key: "volume".to_string()
            }
        );
        assert_eq!(
            parse_command("set string title  hello world ").unwrap(),
            Command::Set {
                key: "title".to_string(),
                value: Primitive::String("hello world".to_string())
            }
        );
        assert_eq!(
            parse_command("set list recent a.txt, b.txt").unwrap(),
            Command::Set {
                key: "recent".to_string(),
                value: Primitive::StringList(vec!["a.txt".to_string(), "b.txt".to_string()])
            }
        );
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert!(parse_command("frobnicate").is_err());
        assert!(parse_command("get blob key").is_err());
        assert!(parse_command("get int").is_err());
        assert!(parse_command("set int volume loud").is_err());
        assert!(parse_command("clear a b").is_err());
    }

    #[test]
    fn test_set_then_get() {
        let (mut shell, lines) = shell();
        run(&mut shell, "set int volume 80").unwrap();
        run(&mut shell, "get int volume").unwrap();
        run(&mut shell, "get string volume").unwrap();

        assert_eq!(*lines.lock(), vec!["volume = 80", "volume = <unset>"]);
    }

    #[test]
    fn test_watch_prints_changes_until_unwatched() {
        let (mut shell, lines) = shell();
        run(&mut shell, "watch bool muted").unwrap();
        run(&mut shell, "set bool muted true").unwrap();
        run(&mut shell, "clear muted").unwrap();
        run(&mut shell, "unwatch muted").unwrap();
        run(&mut shell, "set bool muted false").unwrap();

        assert_eq!(
            *lines.lock(),
            vec!["~ muted = <unset>", "~ muted = true", "~ muted = <unset>"]
        );
        assert_eq!(shell.watched(), 0);
        assert!(run(&mut shell, "unwatch muted").is_err());
    }

    #[test]
    fn test_keys_and_dump() {
        let (mut shell, lines) = shell();
        run(&mut shell, "set float gain 0.5").unwrap();
        run(&mut shell, "set bool muted false").unwrap();
        run(&mut shell, "keys").unwrap();
        run(&mut shell, "dump").unwrap();

        assert_eq!(
            *lines.lock(),
            vec!["gain muted", "gain (float) = 0.5", "muted (bool) = false"]
        );
    }

    #[test]
    fn test_quit_stops_the_loop() {
        let (mut shell, _) = shell();
        assert!(run(&mut shell, "help").unwrap());
        assert!(!run(&mut shell, "quit").unwrap());
    }
}
