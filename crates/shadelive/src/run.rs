use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use liveconfig::{DialectSetting, LiveConfig};
use renderer::{
    ContextPreference, DocumentId, LiveWindow, PresentationMode, SessionOptions, WindowOptions,
};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::{console, watch::ShaderWatcher};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let shader = args
        .shader
        .clone()
        .ok_or_else(|| anyhow!("no shader given; pass a path to a fragment shader"))?;
    let config = load_config(args.config.as_deref())?;
    let options = window_options(&config, &args);

    let source = fs::read_to_string(&shader)
        .with_context(|| format!("failed to read shader {}", shader.display()))?;
    let document = DocumentId::new(shader.display().to_string());

    let window = LiveWindow::new(
        options,
        Box::new(|diagnostic, document| match diagnostic.line() {
            Some(line) => tracing::error!("{document}:{line}: {}", diagnostic.message()),
            None => tracing::error!("{document}: {diagnostic}"),
        }),
    )?;
    let proxy = window.proxy();
    proxy.eval(source, document.clone())?;

    let _watcher = if config.watch.enabled && !args.no_watch {
        Some(ShaderWatcher::spawn(
            &shader,
            document.clone(),
            config.watch.debounce,
            proxy.clone(),
        )?)
    } else {
        None
    };
    console::spawn(shader, document, proxy)?;

    window.run()
}

/// An explicit path must exist; the default location is optional.
fn load_config(explicit: Option<&Path>) -> Result<LiveConfig> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = AppPaths::discover()?.config_file();
            if !default.exists() {
                tracing::debug!(path = %default.display(), "no config file; using defaults");
                return Ok(LiveConfig::default());
            }
            default
        }
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = LiveConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Merges the config file with command-line overrides.
fn window_options(config: &LiveConfig, args: &RunArgs) -> WindowOptions {
    let window = &config.window;
    let dialect = args.dialect.unwrap_or(config.runtime.dialect);
    WindowOptions {
        title: window.title.clone(),
        size: (window.width, window.height),
        small_size: (window.small_width, window.small_height),
        context: match dialect {
            DialectSetting::Auto => ContextPreference::Auto,
            DialectSetting::Gles => ContextPreference::Gles,
            DialectSetting::Desktop => ContextPreference::Desktop,
        },
        presentation: if args.small {
            PresentationMode::Small
        } else {
            PresentationMode::Fullscreen
        },
        session: SessionOptions {
            idle_frames: args.idle_frames.unwrap_or(config.runtime.idle_frames),
            defaults: config.uniform_defaults(),
            ..SessionOptions::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn config_values_flow_into_window_options() {
        let config = LiveConfig::from_toml_str(
            "version = 1\n[window]\ntitle = \"demo\"\nwidth = 640\nheight = 480\n\
             [runtime]\nidle_frames = 30\ndialect = \"gles\"\n[uniforms]\nspeed = 2.0\n",
        )
        .unwrap();
        let options = window_options(&config, &RunArgs::default());

        assert_eq!(options.title, "demo");
        assert_eq!(options.size, (640, 480));
        assert_eq!(options.small_size, (480, 270));
        assert_eq!(options.context, ContextPreference::Gles);
        assert_eq!(options.presentation, PresentationMode::Fullscreen);
        assert_eq!(options.session.idle_frames, 30);
        assert_eq!(options.session.defaults["speed"], vec![2.0]);
    }

    #[test]
    fn command_line_overrides_config() {
        let config = LiveConfig::default();
        let args = RunArgs {
            small: true,
            idle_frames: Some(7),
            dialect: Some(DialectSetting::Desktop),
            ..RunArgs::default()
        };
        let options = window_options(&config, &args);

        assert_eq!(options.presentation, PresentationMode::Small);
        assert_eq!(options.session.idle_frames, 7);
        assert_eq!(options.context, ContextPreference::Desktop);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }

    #[test]
    fn explicit_config_is_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shadelive.toml");
        fs::write(&path, "version = 1\n[runtime]\nidle_frames = 12\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().runtime.idle_frames, 12);

        fs::write(&path, "version = 3\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
