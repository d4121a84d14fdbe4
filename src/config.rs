use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::engine::{DEFAULT_MAX_DEPTH, Settings};

/// How the command-line host reports a ding.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    /// Terminal bell on stderr.
    Bell,
    /// A short visible message on stderr.
    Flash,
    Quiet,
}

impl SignalMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bell => "bell",
            Self::Flash => "flash",
            Self::Quiet => "quiet",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub interactive: bool,
    pub silent: bool,
    pub json: bool,
    pub max_depth: Option<usize>,
    pub signal: Option<SignalMode>,
    pub library: Option<PathBuf>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            interactive: self.interactive || other.interactive,
            silent: self.silent || other.silent,
            json: self.json || other.json,
            max_depth: other.max_depth.or(self.max_depth),
            signal: other.signal.or(self.signal),
            library: other.library.clone().or_else(|| self.library.clone()),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            interactive: self.interactive,
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }

    /// Silent mode wins over any signal mode.
    pub fn signal_mode(&self) -> SignalMode {
        if self.silent {
            SignalMode::Quiet
        } else {
            self.signal.unwrap_or(SignalMode::Bell)
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("tempo").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("tempo")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("tempo").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("tempo").join("config");
        }
    }

    PathBuf::from(".temporc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".temporc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(line_tokens)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// One flag per line; everything after the flag is its value, spaces included.
fn line_tokens(line: &str) -> Vec<String> {
    match line.split_once(char::is_whitespace) {
        Some((flag, value)) if !flag.contains('=') => {
            vec![flag.to_string(), value.trim().to_string()]
        }
        _ => vec![line.to_string()],
    }
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# tempo defaults (saved with --save)".to_string());
    if flags.interactive {
        lines.push("--interactive".to_string());
    }
    if flags.silent {
        lines.push("--silent".to_string());
    }
    if flags.json {
        lines.push("--json".to_string());
    }
    if let Some(depth) = flags.max_depth {
        lines.push(format!("--max-depth {depth}"));
    }
    if let Some(signal) = flags.signal {
        lines.push(format!("--signal {}", signal.as_str()));
    }
    if let Some(library) = &flags.library {
        lines.push(format!("--library {}", library.display()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the saveable flags out of raw arguments. Unknown tokens are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--interactive" || token == "-i" {
            flags.interactive = true;
        } else if token == "--silent" {
            flags.silent = true;
        } else if token == "--json" {
            flags.json = true;
        } else if token == "--max-depth" {
            if let Some(next) = tokens.get(i + 1) {
                flags.max_depth = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--max-depth=") {
            flags.max_depth = value.parse().ok();
        } else if token == "--signal" {
            if let Some(next) = tokens.get(i + 1) {
                flags.signal = parse_signal(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--signal=") {
            flags.signal = parse_signal(value);
        } else if token == "--library" || token == "-l" {
            if let Some(next) = tokens.get(i + 1) {
                flags.library = Some(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--library=") {
            flags.library = Some(PathBuf::from(value));
        }
        i += 1;
    }
    flags
}

fn parse_signal(s: &str) -> Option<SignalMode> {
    match s {
        "bell" => Some(SignalMode::Bell),
        "flash" => Some(SignalMode::Flash),
        "quiet" => Some(SignalMode::Quiet),
        _ => None,
    }
}
