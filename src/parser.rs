use crate::error::SyntaxError;

pub const INPUT_TOKEN: u8 = b'<';
pub const OUTPUT_TOKEN: u8 = b'>';
pub const PIPE_TOKEN: u8 = b'|';

type ParseResult<T> = Result<T, SyntaxError>;

/// A validated line cut into its pipeline stages and redirection targets.
/// Everything borrows from the input line.
#[derive(Debug, PartialEq, Eq)]
pub struct Segments<'a> {
	pub stages: Vec<&'a str>,
	pub input_file: Option<&'a str>,
	pub output_file: Option<&'a str>,
}

struct Parser<'a> {
	line: &'a str,
	/// The line with every whitespace byte dropped. All structural checks
	/// run on this so `a | | b` and `a||b` are judged alike.
	bare: Vec<u8>,
}

impl<'a> Parser<'a> {
	fn new(line: &'a str) -> Parser<'a> {
		let bare = line.bytes().filter(|c| !Parser::is_whitespace(*c)).collect();
		Parser { line: line, bare: bare }
	}

	fn is_whitespace(c: u8) -> bool {
		match c {
			b' ' | b'\t' | b'\n' | b'\r' => true,
			_ => false,
		}
	}

	fn count(&self, token: u8) -> usize {
		self.bare.iter().filter(|&&c| c == token).count()
	}

	fn position(&self, token: u8) -> Option<usize> {
		self.bare.iter().position(|&c| c == token)
	}

	fn check_not_first_or_last(bare: &[u8], token: u8) -> ParseResult<()> {
		if bare.first() == Some(&token) || bare.last() == Some(&token) {
			return Err(SyntaxError::DanglingToken(token as char));
		}
		Ok(())
	}

	fn validate(&self) -> ParseResult<()> {
		if self.bare.is_empty() {
			return Err(SyntaxError::Empty);
		}
		for &token in &[INPUT_TOKEN, OUTPUT_TOKEN] {
			if self.count(token) > 1 {
				return Err(SyntaxError::DuplicateRedirect(token as char));
			}
		}
		if self.bare.windows(2).any(|w| w[0] == PIPE_TOKEN && w[1] == PIPE_TOKEN) {
			return Err(SyntaxError::AdjacentPipes);
		}

		let input = self.position(INPUT_TOKEN);
		let output = self.position(OUTPUT_TOKEN);
		if let (Some(i), Some(o)) = (input, output) {
			if i > o {
				return Err(SyntaxError::RedirectOrder);
			}
		}
		for (pipe, _) in self.bare.iter().enumerate().filter(|&(_, &c)| c == PIPE_TOKEN) {
			for redirect in input.iter().chain(output.iter()) {
				if pipe > *redirect {
					return Err(SyntaxError::PipeAfterRedirect);
				}
				if *redirect == pipe + 1 {
					return Err(SyntaxError::PipeTouchesRedirect);
				}
			}
		}

		let mut rest = self.bare.clone();
		for &token in &[OUTPUT_TOKEN, INPUT_TOKEN, PIPE_TOKEN] {
			Parser::check_not_first_or_last(&rest, token)?;
			rest.retain(|&c| c != token);
		}
		if rest.is_empty() {
			return Err(SyntaxError::NoCommand);
		}
		Ok(())
	}

	fn take_target(part: &'a str, token: u8) -> ParseResult<&'a str> {
		let target = part.trim();
		if target.is_empty() {
			return Err(SyntaxError::MissingTarget(token as char));
		}
		Ok(target)
	}

	/// Redirections bind to the whole pipeline, so they are cut off first:
	/// output, then input, then the remainder is split into stages.
	fn split(&self) -> ParseResult<Segments<'a>> {
		let mut rest = self.line;

		let mut output_file = None;
		if let Some((head, tail)) = rest.split_once(OUTPUT_TOKEN as char) {
			output_file = Some(Parser::take_target(tail, OUTPUT_TOKEN)?);
			rest = head;
		}
		let mut input_file = None;
		if let Some((head, tail)) = rest.split_once(INPUT_TOKEN as char) {
			input_file = Some(Parser::take_target(tail, INPUT_TOKEN)?);
			rest = head;
		}

		let mut stages = vec![];
		for stage in rest.split(PIPE_TOKEN as char) {
			let stage = stage.trim();
			if stage.is_empty() {
				return Err(SyntaxError::EmptyStage);
			}
			stages.push(stage);
		}
		Ok(Segments { stages: stages, input_file: input_file, output_file: output_file })
	}
}

/// Validates `line` and splits it into stages. Nothing is opened or
/// spawned here; the first violated rule is the error.
pub fn parse<'a>(line: &'a str) -> ParseResult<Segments<'a>> {
	let parser = Parser::new(line);
	parser.validate()?;
	parser.split()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn err(line: &str) -> SyntaxError {
		parse(line).unwrap_err()
	}

	#[test]
	fn single_command() {
		let s = parse("echo hi").unwrap();
		assert_eq!(s.stages, vec!["echo hi"]);
		assert_eq!(s.input_file, None);
		assert_eq!(s.output_file, None);
	}

	#[test]
	fn redirections_are_cut_before_pipes() {
		let s = parse("  sort -r |\tuniq < in.txt   > out.txt ").unwrap();
		assert_eq!(s.stages, vec!["sort -r", "uniq"]);
		assert_eq!(s.input_file, Some("in.txt"));
		assert_eq!(s.output_file, Some("out.txt"));
	}

	#[test]
	fn blank_lines_are_empty() {
		assert_eq!(err(""), SyntaxError::Empty);
		assert_eq!(err("   \t  "), SyntaxError::Empty);
		assert_eq!(err("\n"), SyntaxError::Empty);
	}

	#[test]
	fn duplicate_redirects() {
		assert_eq!(err("a > b > c"), SyntaxError::DuplicateRedirect('>'));
		assert_eq!(err("a < b < c"), SyntaxError::DuplicateRedirect('<'));
	}

	#[test]
	fn adjacent_pipes() {
		assert_eq!(err("a || b"), SyntaxError::AdjacentPipes);
		assert_eq!(err("a | | b"), SyntaxError::AdjacentPipes);
	}

	#[test]
	fn redirect_order() {
		assert_eq!(err("cat > out < in"), SyntaxError::RedirectOrder);
	}

	#[test]
	fn pipes_after_redirects() {
		assert_eq!(err("a < in | b"), SyntaxError::PipeAfterRedirect);
		assert_eq!(err("a > out | b"), SyntaxError::PipeAfterRedirect);
		assert_eq!(err("a |> out"), SyntaxError::PipeTouchesRedirect);
		assert_eq!(err("a | < in"), SyntaxError::PipeTouchesRedirect);
	}

	#[test]
	fn dangling_tokens() {
		assert_eq!(err("| a"), SyntaxError::DanglingToken('|'));
		assert_eq!(err("a |"), SyntaxError::DanglingToken('|'));
		assert_eq!(err("a >"), SyntaxError::DanglingToken('>'));
		assert_eq!(err("< in a"), SyntaxError::DanglingToken('<'));
	}

	#[test]
	fn tokens_only() {
		assert_eq!(err("<>"), SyntaxError::DanglingToken('>'));
		assert_eq!(err("|"), SyntaxError::DanglingToken('|'));
	}

	#[test]
	fn empty_redirect_target() {
		assert_eq!(err("a < > b"), SyntaxError::MissingTarget('<'));
	}
}
