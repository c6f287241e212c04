use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result};
use liveconfig::DialectSetting;
use renderer::{wrap_fragment, ShaderDialect, TEMPLATE_HEADER_LINES};

use crate::cli::WrapArgs;

pub fn print(args: WrapArgs) -> Result<()> {
    let source = fs::read_to_string(&args.shader)
        .with_context(|| format!("failed to read shader {}", args.shader.display()))?;
    let dialect = match args.dialect {
        Some(DialectSetting::Desktop) => ShaderDialect::Glsl330,
        _ => ShaderDialect::Gles300,
    };
    print!("{}", render(&source, dialect));
    Ok(())
}

/// Numbers every line twice: as the driver reports it and, for user code,
/// as it appears in the editor.
pub fn render(source: &str, dialect: ShaderDialect) -> String {
    let wrapped = wrap_fragment(source, dialect);
    let user_lines = source.lines().count();
    let mut out = String::with_capacity(wrapped.len() + wrapped.lines().count() * 12);
    for (index, line) in wrapped.lines().enumerate() {
        let driver_line = index + 1;
        let user_line = driver_line
            .checked_sub(TEMPLATE_HEADER_LINES)
            .filter(|line| (1..=user_lines).contains(line));
        let _ = match user_line {
            Some(user_line) => writeln!(out, "{driver_line:>5} {user_line:>5} | {line}"),
            None => writeln!(out, "{driver_line:>5} {:>5} | {line}", ""),
        };
    }
    out
}
