use std::path::Path;

use crate::Parameters;
use crate::StencilError;
use crate::StencilResult;

/// Load a parameter mapping from a JSON, TOML or YAML file. The format is
/// chosen from the file extension and the top level must be a table.
pub fn load_parameter_file(path: &Path) -> StencilResult<Parameters> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| {
		StencilError::ParameterFile {
			path: path_display.clone(),
			reason: e.to_string(),
		}
	})?;
	let format = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();

	let value = parse_parameter_content(&content, &format, &path_display)?;
	into_parameters(value, &path_display)
}

/// Parse parameter file content into a `serde_json::Value` based on its
/// format.
pub fn parse_parameter_content(
	content: &str,
	format: &str,
	path_display: &str,
) -> StencilResult<serde_json::Value> {
	match format {
		"json" => {
			serde_json::from_str(content).map_err(|e| {
				StencilError::ParameterFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})
		}
		"toml" => {
			let toml_value: toml::Value = toml::from_str(content).map_err(|e| {
				StencilError::ParameterFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})?;
			toml_to_json(toml_value, path_display)
		}
		"yaml" | "yml" => {
			serde_yaml_ng::from_str(content).map_err(|e| {
				StencilError::ParameterFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})
		}
		other => Err(StencilError::UnsupportedParameterFormat(other.to_string())),
	}
}

fn into_parameters(value: serde_json::Value, path_display: &str) -> StencilResult<Parameters> {
	match value {
		serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
		serde_json::Value::Null => Ok(Parameters::new()),
		other => {
			Err(StencilError::ParameterFile {
				path: path_display.to_string(),
				reason: format!("expected a table of named values, found `{other}`"),
			})
		}
	}
}

/// Convert a `toml::Value` to a `serde_json::Value`.
pub(crate) fn toml_to_json(
	value: toml::Value,
	path_display: &str,
) -> StencilResult<serde_json::Value> {
	let json = match value {
		toml::Value::String(s) => serde_json::Value::String(s),
		toml::Value::Integer(i) => serde_json::Value::from(i),
		toml::Value::Float(f) => {
			serde_json::Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				StencilError::ParameterFile {
					path: path_display.to_string(),
					reason: format!("`{f}` is not a finite number"),
				}
			})?)
		}
		toml::Value::Boolean(b) => serde_json::Value::Bool(b),
		toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			let items: StencilResult<Vec<serde_json::Value>> = arr
				.into_iter()
				.map(|v| toml_to_json(v, path_display))
				.collect();
			serde_json::Value::Array(items?)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k, toml_to_json(v, path_display)?);
			}
			serde_json::Value::Object(map)
		}
	};

	Ok(json)
}

/// Split a `name=value` assignment. The value keeps any further `=`.
pub fn parse_parameter_assignment(assignment: &str) -> StencilResult<(String, String)> {
	let Some((name, value)) = assignment.split_once('=') else {
		return Err(StencilError::InvalidParameter {
			name: assignment.to_string(),
			reason: "expected `name=value`".to_string(),
		});
	};

	let name = name.trim();
	if name.is_empty() {
		return Err(StencilError::InvalidParameter {
			name: assignment.to_string(),
			reason: "parameter name is empty".to_string(),
		});
	}

	Ok((name.to_string(), value.to_string()))
}

/// Copy every entry of `overlay` into `base`, replacing existing names.
pub fn merge_parameters(base: &mut Parameters, overlay: Parameters) {
	base.extend(overlay);
}
