use std::path::Path;
use std::path::PathBuf;

use ignore::Walk;
use ignore::WalkBuilder;
use serde::Serialize;

use crate::Parameters;
use crate::StencilError;
use crate::StencilResult;
use crate::engine::TemplateLogger;
use crate::engine::evaluate;
use crate::requirements::TemplateRequirement;
use crate::requirements::extract_template_requirements;
use crate::tokens::TemplateConfig;

/// A template file together with the requirements it declares.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
	/// Path relative to the scanned directory, with `/` separators.
	pub name: String,
	pub path: PathBuf,
	pub content: String,
	/// Derived from `content`; never stored separately.
	pub requirements: Vec<TemplateRequirement>,
}

impl Template {
	/// Build a template from text, extracting its requirements.
	pub fn from_content(
		name: impl Into<String>,
		path: impl Into<PathBuf>,
		content: impl Into<String>,
		config: &TemplateConfig,
	) -> StencilResult<Self> {
		let content = content.into();
		let requirements = extract_template_requirements(&content, config)?;

		Ok(Self {
			name: name.into(),
			path: path.into(),
			content,
			requirements,
		})
	}

	/// Read and parse a single template file. The name is the file name.
	pub fn from_file(path: &Path, config: &TemplateConfig) -> StencilResult<Self> {
		let content = read_template_text(path)?;
		let name = path
			.file_name()
			.map(|name| name.to_string_lossy().to_string())
			.unwrap_or_default();

		Self::from_content(name, path, content, config)
	}

	/// Requirements whose names are absent from `parameters`, in declaration
	/// order.
	pub fn missing_requirements(&self, parameters: &Parameters) -> Vec<&TemplateRequirement> {
		self.requirements
			.iter()
			.filter(|requirement| !parameters.contains_key(&requirement.name))
			.collect()
	}

	/// Render this template. See [`evaluate`].
	pub fn render(
		&self,
		config: &TemplateConfig,
		parameters: &mut Parameters,
		logger: Option<&dyn TemplateLogger>,
	) -> StencilResult<String> {
		evaluate(&self.content, config, parameters, logger)
	}
}

/// Lazy iterator over the templates found in a directory.
pub struct TemplateScan {
	root: PathBuf,
	walker: Walk,
	config: TemplateConfig,
}

impl Iterator for TemplateScan {
	type Item = StencilResult<Template>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let entry = match self.walker.next()? {
				Ok(entry) => entry,
				Err(e) => return Some(Err(walk_error(e))),
			};

			if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
				continue;
			}

			let path = entry.path();
			let content = match read_template_text(path) {
				Ok(content) => content,
				Err(e) => return Some(Err(e)),
			};

			if content.trim().is_empty() {
				tracing::debug!(path = %path.display(), "skipping empty template");
				continue;
			}

			let name = template_name(&self.root, path);
			tracing::debug!(%name, "discovered template");

			return Some(Template::from_content(name, path, content, &self.config));
		}
	}
}

/// Enumerate the templates in `dir`. Only the top level is read unless
/// `recursive` is set. Files are visited in file-name order and read one at
/// a time as the iterator advances; empty or whitespace-only files are
/// skipped.
pub fn scan_templates(
	dir: &Path,
	recursive: bool,
	config: &TemplateConfig,
) -> StencilResult<TemplateScan> {
	scan_templates_excluding(dir, recursive, config, None)
}

/// Like [`scan_templates`], but never descends into `excluded`. Pass the
/// output directory here when rendering into a folder below `dir`, so
/// rendered files are not read back as templates. `excluded` must exist
/// before the scan starts to be recognised.
pub fn scan_templates_excluding(
	dir: &Path,
	recursive: bool,
	config: &TemplateConfig,
	excluded: Option<&Path>,
) -> StencilResult<TemplateScan> {
	if !dir.is_dir() {
		return Err(StencilError::DirectoryNotFound(dir.display().to_string()));
	}

	let excluded = excluded.and_then(|path| path.canonicalize().ok());
	let mut builder = WalkBuilder::new(dir);
	builder
		.standard_filters(false)
		.follow_links(false)
		.max_depth(if recursive { None } else { Some(1) })
		.sort_by_file_name(|a, b| a.cmp(b));

	if let Some(excluded) = excluded {
		builder.filter_entry(move |entry| {
			let is_dir = entry.file_type().is_some_and(|file_type| file_type.is_dir());
			!(is_dir && entry.path().canonicalize().is_ok_and(|path| path == excluded))
		});
	}

	let walker = builder.build();

	Ok(TemplateScan {
		root: dir.to_path_buf(),
		walker,
		config: config.clone(),
	})
}

/// Derive a template name by stripping the scanned directory from `path`.
fn template_name(root: &Path, path: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.to_string_lossy()
		.replace('\\', "/")
}

/// Read a template as UTF-8 text, dropping a leading byte order mark.
fn read_template_text(path: &Path) -> StencilResult<String> {
	let content = std::fs::read_to_string(path)?;

	Ok(match content.strip_prefix('\u{feff}') {
		Some(stripped) => stripped.to_string(),
		None => content,
	})
}

fn walk_error(error: ignore::Error) -> StencilError {
	let message = error.to_string();
	let io_error = error
		.into_io_error()
		.unwrap_or_else(|| std::io::Error::other(message));

	StencilError::Io(io_error)
}
