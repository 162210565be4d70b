use std::collections::{BTreeMap, BTreeSet};

use crate::error::BuiltinError;

#[derive(Debug, Default, Clone)]
pub struct AliasMap {
	imp: BTreeMap<String, String>,
}

fn first_word(s: &str) -> &str {
	s.split_whitespace().next().unwrap_or("")
}

impl AliasMap {
	pub fn new() -> AliasMap {
		AliasMap { imp: BTreeMap::new() }
	}

	/// Defines or replaces `name`. Refused if following `value` through the
	/// map would ever lead back to `name`.
	pub fn add(&mut self, name: &str, value: &str) -> Result<(), BuiltinError> {
		if name.is_empty() || name.contains(char::is_whitespace) {
			return Err(BuiltinError::new("Invalid alias name."));
		}
		if value.trim().is_empty() {
			return Err(BuiltinError::new("Alias value cannot be empty."));
		}
		let mut seen = BTreeSet::new();
		let mut word = first_word(value);
		loop {
			if word == name {
				return Err(BuiltinError::new(format!("Alias {} would form a cycle.", name)));
			}
			if !seen.insert(word) {
				break;
			}
			match self.imp.get(word) {
				Some(next) => word = first_word(next),
				None => break,
			}
		}
		self.imp.insert(name.to_owned(), value.trim().to_owned());
		Ok(())
	}

	pub fn remove(&mut self, name: &str) -> bool {
		self.imp.remove(name).is_some()
	}

	#[cfg(test)]
	pub fn get(&self, name: &str) -> Option<&str> {
		self.imp.get(name).map(|s| s.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.imp.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Expands `name` until its first word is no longer an alias. Words that
	/// follow the first word of a multi-word value are kept in order, ahead of
	/// anything the earlier expansions contributed.
	pub fn expand(&self, name: &str) -> String {
		let mut words: Vec<String> = vec![name.to_owned()];
		let mut seen = BTreeSet::new();
		while let Some(value) = self.imp.get(&words[0]) {
			if !seen.insert(words[0].clone()) {
				log::warn!("alias loop through {}, expansion stopped", words[0]);
				break;
			}
			let mut next: Vec<String> = value.split_whitespace().map(String::from).collect();
			next.extend(words.drain(1..));
			words = next;
			if words.is_empty() {
				break;
			}
		}
		words.join(" ")
	}
}
