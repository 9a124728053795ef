use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

/// Log targets that receive the caller's default level: this library and the
/// `soullinker` binary. Everything else (reqwest, hyper, ...) stays at `warn`.
const CLIENT_TARGETS: [&str; 2] = ["soullinker_analysis", "soullinker"];
const DEFAULT_JSON_LOG_FILE: &str = "soullinker.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn observability_enabled() -> bool {
    std::env::var("SOULLINKER_OBSERVABILITY_ENABLED")
        .ok()
        .and_then(|value| parse_bool_env(&value))
        .unwrap_or(true)
}

fn default_directive(level: &str) -> String {
    let mut directive = String::from("warn");
    for target in CLIENT_TARGETS {
        directive.push_str(&format!(",{target}={level}"));
    }
    directive
}

fn resolve_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("SOULLINKER_LOG_LEVEL")
        && let Ok(filter) = EnvFilter::try_new(level)
    {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_directive(default_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

/// Directory and file name for the JSONL log. A bare file name lands in the
/// working directory.
fn json_log_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Installs the global tracing subscriber once per process.
///
/// `default_level` applies to the soullinker crates only, and only when
/// neither `SOULLINKER_LOG_LEVEL` nor `RUST_LOG` is set.
///
/// With `SOULLINKER_JSON_LOG_PATH` set, session logs (`session_id`,
/// `target_id`, stage, token counts) are written there as JSONL. Otherwise
/// they go to stderr, leaving stdout for results.
/// `SOULLINKER_OBSERVABILITY_ENABLED=false` skips installation.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        if !observability_enabled() {
            return;
        }

        let env_filter = resolve_env_filter(default_level);
        match std::env::var("SOULLINKER_JSON_LOG_PATH") {
            Ok(raw) if !raw.trim().is_empty() => {
                let (dir, file_name) = json_log_target(Path::new(raw.trim()));
                let _ = std::fs::create_dir_all(&dir);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            _ => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}
