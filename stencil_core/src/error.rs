use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum StencilError {
	#[error(transparent)]
	#[diagnostic(code(stencil::io_error))]
	Io(#[from] std::io::Error),

	#[error("invalid requirement declaration `{line}`: {reason}")]
	#[diagnostic(
		code(stencil::invalid_declaration),
		help("declarations take the form `<type>[:<parameter>] <name> - <description>`")
	)]
	InvalidDeclaration { line: String, reason: String },

	#[error("missing required input `{name}` ({description})")]
	#[diagnostic(
		code(stencil::missing_requirement),
		help("supply a value for `{name}` before rendering this template")
	)]
	MissingRequirement { name: String, description: String },

	#[error("template directory not found: `{0}`")]
	#[diagnostic(code(stencil::directory_not_found))]
	DirectoryNotFound(String),

	#[error(transparent)]
	#[diagnostic(code(stencil::interpreter))]
	Interpreter(#[from] minijinja::Error),

	#[error("expression failed: {0}")]
	#[diagnostic(code(stencil::script))]
	Script(String),

	#[error("invalid token markers: {0}")]
	#[diagnostic(
		code(stencil::invalid_markers),
		help("start and end markers must be non-empty and distinct, and the escape marker must differ from the end marker")
	)]
	InvalidMarkers(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(stencil::config_parse),
		help("check that stencil.toml is valid TOML with [markers] and/or [parameters] sections")
	)]
	ConfigParse(String),

	#[error("failed to load parameter file `{path}`: {reason}")]
	#[diagnostic(code(stencil::parameter_file))]
	ParameterFile { path: String, reason: String },

	#[error("unsupported parameter file format: `{0}`")]
	#[diagnostic(
		code(stencil::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedParameterFormat(String),

	#[error("invalid value for parameter `{name}`: {reason}")]
	#[diagnostic(code(stencil::invalid_parameter))]
	InvalidParameter { name: String, reason: String },
}

pub type StencilResult<T> = Result<T, StencilError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
