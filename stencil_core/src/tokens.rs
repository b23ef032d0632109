use serde::Deserialize;
use serde::Serialize;

use crate::StencilError;
use crate::StencilResult;

/// Default start marker for requirement declarations.
pub const DEFAULT_REQUIRE_START: &str = "/*[REQUIRE]";
/// Default start marker for injected expressions.
pub const DEFAULT_INJECT_START: &str = "/*[INJECT]";
/// Default end marker shared by both token kinds.
pub const DEFAULT_END: &str = "*/";
/// Default escape sequence shared by both token kinds.
pub const DEFAULT_ESCAPE: &str = "[ESCAPE]";

/// One delimited region matched in a template.
///
/// `start_index` and `length` are byte offsets into the scanned text and
/// describe the whole match, markers included. `full_token` is the exact
/// source slice and is used verbatim as a substitution key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
	/// Text between the markers with escape sequences removed.
	pub content: String,
	pub start_index: usize,
	pub length: usize,
	pub full_token: String,
}

impl Token {
	/// Byte offset one past the end of the match.
	pub fn end_index(&self) -> usize {
		self.start_index + self.length
	}
}

/// A start/end/escape marker triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParserConfig {
	#[serde(rename = "start")]
	pub start_token: String,
	#[serde(rename = "end")]
	pub end_token: String,
	/// An escape sequence placed directly before an end marker turns that
	/// end marker into literal content.
	#[serde(rename = "escape", default)]
	pub escape_token: Option<String>,
}

impl TokenParserConfig {
	/// Create a validated marker triple.
	pub fn new(
		start_token: impl Into<String>,
		end_token: impl Into<String>,
		escape_token: Option<String>,
	) -> StencilResult<Self> {
		let config = Self {
			start_token: start_token.into(),
			end_token: end_token.into(),
			escape_token,
		};
		config.validate()?;

		Ok(config)
	}

	/// The default `/*[REQUIRE]` … `*/` markers.
	pub fn require() -> Self {
		Self {
			start_token: DEFAULT_REQUIRE_START.to_string(),
			end_token: DEFAULT_END.to_string(),
			escape_token: Some(DEFAULT_ESCAPE.to_string()),
		}
	}

	/// The default `/*[INJECT]` … `*/` markers.
	pub fn inject() -> Self {
		Self {
			start_token: DEFAULT_INJECT_START.to_string(),
			end_token: DEFAULT_END.to_string(),
			escape_token: Some(DEFAULT_ESCAPE.to_string()),
		}
	}

	/// Check the marker invariants. Configs built by deserialization skip
	/// [`TokenParserConfig::new`], so loaders call this explicitly.
	pub fn validate(&self) -> StencilResult<()> {
		if self.start_token.is_empty() || self.end_token.is_empty() {
			return Err(StencilError::InvalidMarkers(
				"start and end markers must not be empty".to_string(),
			));
		}

		if self.start_token == self.end_token {
			return Err(StencilError::InvalidMarkers(format!(
				"start and end markers are both `{}`",
				self.start_token
			)));
		}

		if self.escape() == Some(self.end_token.as_str()) {
			return Err(StencilError::InvalidMarkers(format!(
				"escape marker `{}` is the same as the end marker",
				self.end_token
			)));
		}

		Ok(())
	}

	/// The escape sequence, treating an empty string as unset.
	pub fn escape(&self) -> Option<&str> {
		self.escape_token.as_deref().filter(|escape| !escape.is_empty())
	}
}

/// The two marker triples used by a template: one for requirement
/// declarations and one for injected expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
	pub require: TokenParserConfig,
	pub inject: TokenParserConfig,
}

impl Default for TemplateConfig {
	fn default() -> Self {
		Self {
			require: TokenParserConfig::require(),
			inject: TokenParserConfig::inject(),
		}
	}
}

impl TemplateConfig {
	pub fn validate(&self) -> StencilResult<()> {
		self.require.validate()?;
		self.inject.validate()
	}
}

/// Lazy scanner over the tokens of one text.
///
/// A clone carries on from the same position as the original. Call
/// [`scan_tokens`] again to restart from the beginning.
#[derive(Debug, Clone)]
pub struct TokenScanner<'a> {
	text: &'a str,
	config: &'a TokenParserConfig,
	cursor: usize,
	unterminated: Option<usize>,
	finished: bool,
}

impl<'a> TokenScanner<'a> {
	/// Byte offset of the start marker of an unterminated region, once the
	/// scanner has reached it.
	pub fn unterminated(&self) -> Option<usize> {
		self.unterminated
	}

	/// Match the region whose start marker sits at `start`. Returns `None`
	/// when no terminating end marker follows.
	fn match_region(&self, start: usize) -> Option<Token> {
		let bytes = self.text.as_bytes();
		let end_marker = self.config.end_token.as_bytes();
		let escape = self.config.escape().map(str::as_bytes);
		let content_start = start + self.config.start_token.len();
		let mut search_from = content_start;
		let mut content = String::new();

		loop {
			let end = search_from + memstr(&bytes[search_from..], end_marker)?;

			if let Some(escape) = escape {
				let escaped = end >= search_from + escape.len()
					&& &bytes[end - escape.len()..end] == escape;

				if escaped {
					content.push_str(&self.text[search_from..end - escape.len()]);
					content.push_str(&self.config.end_token);
					search_from = end + end_marker.len();
					continue;
				}
			}

			content.push_str(&self.text[search_from..end]);
			let region_end = end + end_marker.len();

			return Some(Token {
				content,
				start_index: start,
				length: region_end - start,
				full_token: self.text[start..region_end].to_string(),
			});
		}
	}
}

impl Iterator for TokenScanner<'_> {
	type Item = Token;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished || self.cursor >= self.text.len() {
			return None;
		}

		let start_marker = self.config.start_token.as_bytes();
		let Some(offset) = memstr(&self.text.as_bytes()[self.cursor..], start_marker) else {
			self.finished = true;
			return None;
		};
		let start = self.cursor + offset;

		if let Some(token) = self.match_region(start) {
			self.cursor = token.end_index();
			return Some(token);
		}

		tracing::warn!(
			offset = start,
			marker = %self.config.start_token,
			"unterminated token region, expected `{}`",
			self.config.end_token
		);
		self.unterminated = Some(start);
		self.finished = true;

		None
	}
}

/// Scan `text` for regions delimited by the markers in `config`. Regions are
/// produced left to right and never overlap.
pub fn scan_tokens<'a>(text: &'a str, config: &'a TokenParserConfig) -> TokenScanner<'a> {
	TokenScanner {
		text,
		config,
		cursor: 0,
		unterminated: None,
		finished: false,
	}
}

/// Scan all tokens and also report the byte offset of an unterminated region,
/// if the scan stopped at one.
pub fn scan_with_diagnostics(
	text: &str,
	config: &TokenParserConfig,
) -> (Vec<Token>, Option<usize>) {
	let mut scanner = scan_tokens(text, config);
	let tokens = scanner.by_ref().collect();

	(tokens, scanner.unterminated())
}

pub(crate) fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() {
		return None;
	}

	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}
