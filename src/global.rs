use std::env;

use crate::alias::AliasMap;
use crate::builtin;
use crate::compiler::Context;
use crate::history::History;
use crate::job::ProcessGroup;
use crate::settings::Settings;
use crate::tilde;

const PATH_KEY: &'static str = "PATH";

/// Everything that lives for the whole session. Constructed once in `main`
/// and passed by reference to whatever needs it.
pub struct State {
	pub prompt: String,
	pub aliases: AliasMap,
	pub history: History,
	pub group: ProcessGroup,
	new_paths: Vec<String>,
}

impl State {
	pub fn new(settings: Settings, interactive: bool) -> State {
		let mut state = State {
			prompt: settings.prompt,
			aliases: AliasMap::new(),
			history: History::new(),
			group: ProcessGroup::new(interactive),
			new_paths: vec![],
		};
		for dir in settings.paths {
			state.add_to_path(&dir);
		}
		for (name, value) in &settings.aliases {
			if let Err(e) = state.aliases.add(name, value) {
				log::warn!("ignoring saved alias {}: {}", name, e);
			}
		}
		state
	}

	pub fn add_to_path(&mut self, dir: &str) {
		let path = match env::var(PATH_KEY) {
			Ok(ref old) if !old.is_empty() => format!("{}:{}", old, dir),
			_ => dir.to_owned(),
		};
		env::set_var(PATH_KEY, path);
		self.new_paths.push(dir.to_owned());
	}

	pub fn settings(&self) -> Settings {
		Settings {
			prompt: self.prompt.clone(),
			paths: self.new_paths.clone(),
			aliases: self.aliases.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
		}
	}
}

impl Context for State {
	fn is_builtin(&self, name: &str) -> bool {
		builtin::match_builtin(name).is_some()
	}

	fn expand_alias(&self, name: &str) -> String {
		self.aliases.expand(name)
	}

	fn expand_tilde(&self, arg: &str) -> String {
		tilde::expand(arg)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;

	#[test]
	#[serial]
	fn settings_round_trip_through_state() {
		let saved = env::var_os(PATH_KEY);
		let mut settings = Settings::default();
		settings.prompt = "%".to_owned();
		settings.paths.push("/opt/psh-test".to_owned());
		settings.aliases.insert("l".to_owned(), "ls".to_owned());
		settings.aliases.insert("loop".to_owned(), "loop".to_owned());

		let state = State::new(settings, false);
		assert!(env::var(PATH_KEY).unwrap().ends_with(":/opt/psh-test"));
		let back = state.settings();
		assert_eq!(back.prompt, "%");
		assert_eq!(back.paths, vec!["/opt/psh-test".to_owned()]);
		assert_eq!(back.aliases.len(), 1);

		match saved {
			Some(v) => env::set_var(PATH_KEY, v),
			None => env::remove_var(PATH_KEY),
		}
	}

	#[test]
	fn context_lookups() {
		let mut state = State::new(Settings::default(), false);
		state.aliases.add("hi", "echo hi").unwrap();
		assert!(state.is_builtin("cd"));
		assert!(!state.is_builtin("ls"));
		assert_eq!(state.expand_alias("hi"), "echo hi");
	}
}
