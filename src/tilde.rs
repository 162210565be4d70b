use std::env;

use nix::unistd::User;

fn home_of(user: &str) -> Option<String> {
	if user.is_empty() {
		return env::var("HOME").ok();
	}
	match User::from_name(user) {
		Ok(Some(u)) => Some(u.dir.to_string_lossy().into_owned()),
		Ok(None) => None,
		Err(e) => {
			log::debug!("passwd lookup for {} failed: {}", user, e);
			None
		},
	}
}

/// Expands a leading `~` or `~user`. Anything that cannot be resolved is
/// returned unchanged.
pub fn expand(arg: &str) -> String {
	let rest = match arg.strip_prefix('~') {
		Some(rest) => rest,
		None => return arg.to_owned(),
	};
	let (user, tail) = match rest.find('/') {
		Some(i) => (&rest[..i], &rest[i..]),
		None => (rest, ""),
	};
	match home_of(user) {
		Some(home) => home + tail,
		None => arg.to_owned(),
	}
}
