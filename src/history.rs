/// Trailing marker asking the shell to complete the line from history.
pub const COMPLETION_MARKER: &'static str = "\\\\";

#[derive(Debug, Default)]
pub struct History {
	entries: Vec<String>,
}

impl History {
	pub fn new() -> History {
		History { entries: vec![] }
	}

	pub fn push<S: Into<String>>(&mut self, line: S) {
		self.entries.push(line.into());
	}

	pub fn entries(&self) -> &[String] {
		&self.entries
	}

	/// The entry before the most recent one, which is the line that asked.
	pub fn previous(&self) -> Option<&str> {
		let n = self.entries.len();
		if n < 2 {
			None
		} else {
			Some(&self.entries[n - 2])
		}
	}

	/// Longest entry containing `fragment`; the most recent wins a tie.
	pub fn complete(&self, fragment: &str) -> Option<&str> {
		let fragment: String = fragment.chars().filter(|&c| c != '\\').collect();
		if fragment.is_empty() {
			return None;
		}
		let mut best: Option<&str> = None;
		for entry in self.entries.iter().rev() {
			if entry.contains(fragment.as_str()) && best.map_or(true, |b| entry.len() > b.len()) {
				best = Some(entry);
			}
		}
		best
	}
}

pub fn wants_completion(line: &str) -> bool {
	line.trim_end().ends_with(COMPLETION_MARKER)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn previous_skips_current_line() {
		let mut h = History::new();
		assert_eq!(h.previous(), None);
		h.push("ls");
		assert_eq!(h.previous(), None);
		h.push("prev");
		assert_eq!(h.previous(), Some("ls"));
	}

	#[test]
	fn completion_prefers_longest_then_latest() {
		let mut h = History::new();
		h.push("grep foo a.txt");
		h.push("grep bar b.txt");
		h.push("grep");
		assert_eq!(h.complete("grep\\\\"), Some("grep bar b.txt"));
		assert_eq!(h.complete("foo"), Some("grep foo a.txt"));
		assert_eq!(h.complete("zzz"), None);
		assert_eq!(h.complete("\\\\"), None);
	}

	#[test]
	fn marker_detection() {
		assert!(wants_completion("gre\\\\"));
		assert!(wants_completion("gre\\\\  "));
		assert!(!wants_completion("gre\\"));
	}
}
