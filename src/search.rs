use std::ffi::{CString, NulError};
use std::path::{Path, PathBuf};
use std::{env, fs};

const PATH_KEY: &'static str = "PATH";

/// Directories searched for an unqualified program name: the current `PATH`
/// followed by the working directory at the moment of the launch.
pub struct SearchPath {
	dirs: Vec<PathBuf>,
}

impl SearchPath {
	pub fn from_env() -> SearchPath {
		let mut dirs: Vec<PathBuf> = match env::var_os(PATH_KEY) {
			Some(path) => env::split_paths(&path).collect(),
			None => vec![],
		};
		if let Ok(cwd) = env::current_dir() {
			dirs.push(cwd);
		}
		SearchPath { dirs: dirs }
	}

	#[cfg(test)]
	pub fn with_dirs(dirs: Vec<PathBuf>) -> SearchPath {
		SearchPath { dirs: dirs }
	}

	/// Paths worth handing to `execv`, in order. A name containing `/` is
	/// used as given.
	pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
		if name.contains('/') {
			return vec![PathBuf::from(name)];
		}
		self.dirs.iter()
			.filter(|d| !d.as_os_str().is_empty())
			.map(|d| d.join(name))
			.filter(|p| fs::metadata(p).map(|m| m.is_file()).unwrap_or(false))
			.collect()
	}
}

pub fn to_cstring(path: &Path) -> Result<CString, NulError> {
	use std::os::unix::ffi::OsStrExt;
	CString::new(path.as_os_str().as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::PermissionsExt;
	use serial_test::serial;

	#[test]
	#[serial]
	fn qualified_names_are_used_directly() {
		let s = SearchPath::with_dirs(vec![]);
		assert_eq!(s.candidates("./run.sh"), vec![PathBuf::from("./run.sh")]);
		assert_eq!(s.candidates("/bin/sh"), vec![PathBuf::from("/bin/sh")]);
	}

	#[test]
	#[serial]
	fn searches_dirs_in_order() {
		let a = tempfile::tempdir().unwrap();
		let b = tempfile::tempdir().unwrap();
		for dir in &[&a, &b] {
			let tool = dir.path().join("tool");
			fs::write(&tool, "#!/bin/sh\n").unwrap();
			fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
		}
		let s = SearchPath::with_dirs(vec![b.path().to_path_buf(), a.path().to_path_buf()]);
		assert_eq!(s.candidates("tool"), vec![b.path().join("tool"), a.path().join("tool")]);
		assert!(s.candidates("missing").is_empty());
	}

	#[test]
	#[serial]
	fn directories_are_not_candidates() {
		let a = tempfile::tempdir().unwrap();
		fs::create_dir(a.path().join("sub")).unwrap();
		let s = SearchPath::with_dirs(vec![a.path().to_path_buf()]);
		assert!(s.candidates("sub").is_empty());
	}
}
