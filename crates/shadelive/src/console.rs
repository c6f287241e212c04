//! Line-oriented stdin console for poking at uniforms while a shader runs.
//!
//! ```text
//! set NAME[IDX] VALUE       incr NAME[IDX] DELTA
//! ease NAME[IDX] TARGET RATE
//! decay NAME[IDX] RATE      ramp NAME[IDX] SPEED
//! clear NAME[IDX]           get NAME[IDX]
//! dump                      reload          quit
//! ```
//!
//! `[IDX]` is optional and defaults to component 0.

use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use renderer::{DocumentId, LiveProxy, ModifierSpec, UniformCommand, UniformReply};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Uniform(UniformCommand),
    Reload,
    Quit,
}

/// Parses one console line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    let (verb, rest) = words.split_first().ok_or_else(|| "empty command".to_string())?;

    let command = match (*verb, rest) {
        ("dump", []) => ConsoleCommand::Uniform(UniformCommand::Dump),
        ("reload", []) => ConsoleCommand::Reload,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        ("set", [target, value]) => {
            let (name, index) = parse_target(target)?;
            ConsoleCommand::Uniform(UniformCommand::Set {
                name,
                index,
                value: parse_number(value)?,
            })
        }
        ("incr", [target, delta]) => {
            let (name, index) = parse_target(target)?;
            ConsoleCommand::Uniform(UniformCommand::Increment {
                name,
                index,
                delta: parse_number(delta)?,
            })
        }
        ("ease", [target, goal, rate]) => animate(
            target,
            ModifierSpec::Approach {
                target: parse_number(goal)?,
                rate: parse_rate(rate)?,
            },
        )?,
        ("decay", [target, rate]) => animate(
            target,
            ModifierSpec::Decay {
                rate: parse_rate(rate)?,
            },
        )?,
        ("ramp", [target, speed]) => animate(
            target,
            ModifierSpec::Ramp {
                speed: parse_number(speed)?,
            },
        )?,
        ("clear", [target]) => {
            let (name, index) = parse_target(target)?;
            ConsoleCommand::Uniform(UniformCommand::Clear { name, index })
        }
        ("get", [target]) => {
            let (name, index) = parse_target(target)?;
            ConsoleCommand::Uniform(UniformCommand::Get { name, index })
        }
        (
            "dump" | "reload" | "quit" | "exit" | "set" | "incr" | "ease" | "decay" | "ramp"
            | "clear" | "get",
            _,
        ) => return Err(format!("wrong number of arguments for '{verb}'")),
        _ => return Err(format!("unknown command '{verb}'")),
    };
    Ok(Some(command))
}

fn animate(target: &str, modifier: ModifierSpec) -> Result<ConsoleCommand, String> {
    let (name, index) = parse_target(target)?;
    Ok(ConsoleCommand::Uniform(UniformCommand::Animate {
        name,
        index,
        modifier,
    }))
}

/// Splits `name[3]` into `("name", 3)`; a bare name means component 0.
fn parse_target(raw: &str) -> Result<(String, usize), String> {
    let (name, index) = match raw.split_once('[') {
        Some((name, rest)) => {
            let digits = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("missing ']' in '{raw}'"))?;
            let index = digits
                .parse::<usize>()
                .map_err(|_| format!("invalid component index in '{raw}'"))?;
            (name, index)
        }
        None => (raw, 0),
    };
    if name.is_empty() {
        return Err("uniform name must not be empty".to_string());
    }
    Ok((name.to_string(), index))
}

fn parse_number(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{raw}' is not a finite number"));
    }
    Ok(value)
}

fn parse_rate(raw: &str) -> Result<f32, String> {
    let rate = parse_number(raw)?;
    if rate < 0.0 {
        return Err(format!("rate must be non-negative, got {raw}"));
    }
    Ok(rate)
}

/// Text to print for a reply, if any.
pub fn render_reply(reply: &UniformReply) -> Result<Option<String>> {
    Ok(match reply {
        UniformReply::Applied => None,
        UniformReply::Value { value } => Some(value.to_string()),
        UniformReply::Snapshot { uniforms } => Some(
            serde_json::to_string_pretty(uniforms).context("failed to encode uniform snapshot")?,
        ),
        UniformReply::Unknown { name } => Some(format!("unknown uniform '{name}'")),
        UniformReply::NoShader => Some("no shader is running".to_string()),
    })
}

/// Reads commands from stdin until EOF or `quit`.
pub fn spawn(shader: PathBuf, document: DocumentId, proxy: LiveProxy) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("shadelive-console".into())
        .spawn(move || {
            if let Err(err) = serve(io::stdin().lock(), &shader, &document, &proxy) {
                tracing::warn!(%err, "console stopped");
            }
        })
        .map_err(|err| anyhow!("failed to spawn console thread: {err}"))
}

fn serve(
    input: impl BufRead,
    shader: &PathBuf,
    document: &DocumentId,
    proxy: &LiveProxy,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("failed to read console input")?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match command {
            ConsoleCommand::Uniform(command) => {
                if let Some(text) = render_reply(&proxy.uniform(command)?)? {
                    println!("{text}");
                }
            }
            ConsoleCommand::Reload => match fs::read_to_string(shader) {
                Ok(source) => proxy.eval(source, document.clone())?,
                Err(err) => eprintln!("failed to read {}: {err}", shader.display()),
            },
            ConsoleCommand::Quit => {
                proxy.shutdown()?;
                break;
            }
        }
    }
    tracing::debug!("console input closed");
    Ok(())
}
