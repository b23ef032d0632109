use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::StencilError;
use crate::StencilResult;
use crate::tokens::TemplateConfig;
use crate::tokens::Token;
use crate::tokens::TokenParserConfig;
use crate::tokens::scan_tokens;

/// Separator expected as the third part of every declaration line.
pub const DECLARATION_SEPARATOR: &str = "-";

/// The data kind of a declared input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementType {
	#[default]
	Unknown,
	Text,
	Integer,
	Decimal,
	Boolean,
	File,
	Date,
	Time,
	DateTime,
}

/// Lowercase type names accepted in declarations.
const TYPE_NAMES: &[(&str, RequirementType)] = &[
	("text", RequirementType::Text),
	("int", RequirementType::Integer),
	("float", RequirementType::Decimal),
	("number", RequirementType::Decimal),
	("file", RequirementType::File),
	("bit", RequirementType::Boolean),
	("boolean", RequirementType::Boolean),
	("bool", RequirementType::Boolean),
	("date", RequirementType::Date),
	("time", RequirementType::Time),
	("datetime", RequirementType::DateTime),
];

impl RequirementType {
	/// Look up a declared type name, ignoring case.
	pub fn from_name(name: &str) -> Option<Self> {
		TYPE_NAMES
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, kind)| *kind)
	}
}

impl Display for RequirementType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Unknown => "unknown",
			Self::Text => "text",
			Self::Integer => "int",
			Self::Decimal => "number",
			Self::Boolean => "bool",
			Self::File => "file",
			Self::Date => "date",
			Self::Time => "time",
			Self::DateTime => "datetime",
		};
		write!(f, "{name}")
	}
}

/// A named input variable declared inside a require token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRequirement {
	pub r#type: RequirementType,
	/// Type qualifier following a colon, e.g. a range or a format string.
	pub parameter: Option<String>,
	pub name: String,
	pub description: String,
	/// The require token this declaration was read from.
	pub source: Token,
}

impl TemplateRequirement {
	/// Convert a raw textual value into a typed value for this requirement.
	pub fn coerce(&self, raw: &str) -> StencilResult<serde_json::Value> {
		let invalid = |reason: String| {
			StencilError::InvalidParameter {
				name: self.name.clone(),
				reason,
			}
		};
		let trimmed = raw.trim();

		match self.r#type {
			RequirementType::Integer => {
				trimmed
					.parse::<i64>()
					.map(serde_json::Value::from)
					.map_err(|e| invalid(format!("`{raw}` is not an integer: {e}")))
			}
			RequirementType::Decimal => {
				let value = trimmed
					.parse::<f64>()
					.map_err(|e| invalid(format!("`{raw}` is not a number: {e}")))?;
				serde_json::Number::from_f64(value)
					.map(serde_json::Value::Number)
					.ok_or_else(|| invalid(format!("`{raw}` is not a finite number")))
			}
			RequirementType::Boolean => {
				match trimmed.to_ascii_lowercase().as_str() {
					"true" | "1" | "yes" => Ok(serde_json::Value::Bool(true)),
					"false" | "0" | "no" => Ok(serde_json::Value::Bool(false)),
					_ => Err(invalid(format!("`{raw}` is not a boolean"))),
				}
			}
			RequirementType::Unknown
			| RequirementType::Text
			| RequirementType::File
			| RequirementType::Date
			| RequirementType::Time
			| RequirementType::DateTime => Ok(serde_json::Value::String(raw.to_string())),
		}
	}
}

/// Split a declared type into its kind and optional parameter.
///
/// `"number:2"` yields `(Decimal, Some("2"))`. Names outside the vocabulary
/// yield `Unknown` with the parameter set to `"<type>:<parameter>"` so the
/// original declaration is kept for diagnostics.
pub fn determine_type(declaration: &str) -> (RequirementType, Option<String>) {
	let (type_name, parameter) = match declaration.split_once(':') {
		Some((type_name, rest)) => (type_name.trim(), Some(rest.trim().to_string())),
		None => (declaration.trim(), None),
	};

	match RequirementType::from_name(type_name) {
		Some(kind) => (kind, parameter),
		None => {
			let parameter = parameter.unwrap_or_default();
			(RequirementType::Unknown, Some(format!("{type_name}:{parameter}")))
		}
	}
}

/// Parse a single declaration line, `<type>[:<parameter>] <name> - <description...>`.
pub fn parse_declaration(line: &str, source: &Token) -> StencilResult<TemplateRequirement> {
	let ast: Vec<&str> = line.split(' ').filter(|part| !part.is_empty()).collect();

	if ast.len() < 3 {
		return Err(StencilError::InvalidDeclaration {
			line: line.to_string(),
			reason: format!("expected at least 3 parts, found {}", ast.len()),
		});
	}

	if ast[2] != DECLARATION_SEPARATOR {
		return Err(StencilError::InvalidDeclaration {
			line: line.to_string(),
			reason: format!("expected `{DECLARATION_SEPARATOR}` separator, found `{}`", ast[2]),
		});
	}

	let (r#type, parameter) = determine_type(ast[0]);

	Ok(TemplateRequirement {
		r#type,
		parameter,
		name: ast[1].to_string(),
		description: ast[3..].join(" "),
		source: source.clone(),
	})
}

/// Extract every requirement declared by the require tokens in `text`, in
/// source order. A malformed line aborts the whole extraction.
pub fn extract_requirements(
	text: &str,
	config: &TokenParserConfig,
) -> StencilResult<Vec<TemplateRequirement>> {
	let mut requirements = Vec::new();

	for token in scan_tokens(text, config) {
		for line in token
			.content
			.split(['\r', '\n'])
			.filter(|line| !line.trim().is_empty())
		{
			requirements.push(parse_declaration(line, &token)?);
		}
	}

	Ok(requirements)
}

/// Extract requirements using the require markers of a [`TemplateConfig`].
pub fn extract_template_requirements(
	text: &str,
	config: &TemplateConfig,
) -> StencilResult<Vec<TemplateRequirement>> {
	extract_requirements(text, &config.require)
}
