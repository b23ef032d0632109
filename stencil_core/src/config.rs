use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::Parameters;
use crate::StencilError;
use crate::StencilResult;
use crate::parameters::load_parameter_file;
use crate::parameters::toml_to_json;
use crate::tokens::TemplateConfig;
use crate::tokens::TokenParserConfig;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["stencil.toml", ".stencil.toml", ".config/stencil.toml"];

/// Configuration loaded from a `stencil.toml` file.
///
/// ```toml
/// parameter_files = ["defaults.json"]
/// recursive = true
///
/// [markers.require]
/// start = "{{require"
/// end = "}}"
///
/// [markers.inject]
/// start = "{{inject"
/// end = "}}"
/// escape = "\\"
///
/// [parameters]
/// company = "Acme"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct StencilConfig {
	/// Marker overrides for require and inject tokens.
	#[serde(default)]
	pub markers: MarkersConfig,
	/// Default parameter values available to every template.
	#[serde(default)]
	pub parameters: HashMap<String, toml::Value>,
	/// Parameter files, relative to the project root, loaded in order after
	/// the inline `[parameters]`.
	#[serde(default)]
	pub parameter_files: Vec<PathBuf>,
	/// Whether directory commands descend into subdirectories by default.
	#[serde(default)]
	pub recursive: bool,
}

/// Marker overrides for both token kinds.
#[derive(Debug, Default, Deserialize)]
pub struct MarkersConfig {
	#[serde(default)]
	pub require: MarkerOverride,
	#[serde(default)]
	pub inject: MarkerOverride,
}

/// Any subset of a marker triple. Unset fields keep their defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MarkerOverride {
	pub start: Option<String>,
	pub end: Option<String>,
	pub escape: Option<String>,
}

impl MarkerOverride {
	fn apply(&self, mut config: TokenParserConfig) -> TokenParserConfig {
		if let Some(start) = &self.start {
			config.start_token.clone_from(start);
		}
		if let Some(end) = &self.end {
			config.end_token.clone_from(end);
		}
		if let Some(escape) = &self.escape {
			// An empty escape disables escaping.
			config.escape_token = Some(escape.clone()).filter(|escape| !escape.is_empty());
		}

		config
	}
}

impl StencilConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> StencilResult<Option<StencilConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Parse and validate config file content.
	pub fn parse(content: &str) -> StencilResult<StencilConfig> {
		let config: StencilConfig =
			toml::from_str(content).map_err(|e| StencilError::ConfigParse(e.to_string()))?;
		config.template_config()?;

		Ok(config)
	}

	/// The marker configuration with overrides applied to the defaults.
	pub fn template_config(&self) -> StencilResult<TemplateConfig> {
		let config = TemplateConfig {
			require: self.markers.require.apply(TokenParserConfig::require()),
			inject: self.markers.inject.apply(TokenParserConfig::inject()),
		};
		config.validate()?;

		Ok(config)
	}

	/// Collect the default parameters: inline values first, then each
	/// parameter file in order, later entries replacing earlier ones.
	pub fn load_parameters(&self, root: &Path) -> StencilResult<Parameters> {
		let mut parameters = Parameters::new();

		let mut names: Vec<_> = self.parameters.keys().collect();
		names.sort();
		for name in names {
			let value = toml_to_json(self.parameters[name].clone(), "stencil.toml")?;
			parameters.insert(name.clone(), value);
		}

		for relative in &self.parameter_files {
			parameters.extend(load_parameter_file(&root.join(relative))?);
		}

		Ok(parameters)
	}
}
