use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const DEFAULT_PROMPT: &'static str = "psh$";
pub const SETTINGS_FILE: &'static str = "psh.toml";

/// What survives between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub prompt: String,
	/// Directories appended to `PATH` by `set path`.
	pub paths: Vec<String>,
	pub aliases: BTreeMap<String, String>,
}

impl Default for Settings {
	fn default() -> Settings {
		Settings {
			prompt: DEFAULT_PROMPT.to_owned(),
			paths: vec![],
			aliases: BTreeMap::new(),
		}
	}
}

impl Settings {
	/// A missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Settings, SettingsError> {
		let text = match fs::read_to_string(path) {
			Ok(text) => text,
			Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
				log::debug!("no settings at {}", path.display());
				return Ok(Settings::default());
			},
			Err(e) => {
				return Err(SettingsError::Io { path: path.display().to_string(), source: e });
			},
		};
		let settings = toml::from_str(&text)?;
		log::debug!("loaded settings from {}", path.display());
		Ok(settings)
	}

	pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
		let text = toml::to_string(self)?;
		fs::write(path, text).map_err(|e| SettingsError::Io { path: path.display().to_string(), source: e })?;
		log::debug!("saved settings to {}", path.display());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;

	#[test]
	#[serial]
	fn missing_file_is_default() {
		let dir = tempfile::tempdir().unwrap();
		let s = Settings::load(&dir.path().join("nope.toml")).unwrap();
		assert_eq!(s, Settings::default());
	}

	#[test]
	#[serial]
	fn save_then_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(SETTINGS_FILE);
		let mut s = Settings::default();
		s.prompt = "=>".to_owned();
		s.paths.push("/opt/tools/bin".to_owned());
		s.aliases.insert("ll".to_owned(), "ls -l".to_owned());
		s.save(&path).unwrap();
		assert_eq!(Settings::load(&path).unwrap(), s);
	}

	#[test]
	#[serial]
	fn partial_file_fills_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(SETTINGS_FILE);
		fs::write(&path, "[aliases]\ng = \"git\"\n").unwrap();
		let s = Settings::load(&path).unwrap();
		assert_eq!(s.prompt, DEFAULT_PROMPT);
		assert_eq!(s.aliases.get("g").map(String::as_str), Some("git"));
	}

	#[test]
	#[serial]
	fn malformed_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(SETTINGS_FILE);
		fs::write(&path, "prompt = [").unwrap();
		match Settings::load(&path) {
			Err(SettingsError::Parse(_)) => {},
			other => panic!("unexpected {:?}", other),
		}
	}
}
