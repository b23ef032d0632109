use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use stencil_cli::Commands;
use stencil_cli::OutputFormat;
use stencil_cli::ParameterArgs;
use stencil_cli::StencilCli;
use stencil_core::AnyEmptyResult;
use stencil_core::AnyResult;
use stencil_core::Parameters;
use stencil_core::StencilConfig;
use stencil_core::Template;
use stencil_core::TemplateConfig;
use stencil_core::TracingLogger;
use stencil_core::parameters::load_parameter_file;
use stencil_core::parameters::merge_parameters;
use stencil_core::parameters::parse_parameter_assignment;
use stencil_core::project::scan_templates;
use stencil_core::project::scan_templates_excluding;
use stencil_core::safe_file_name;
use stencil_core::scan_with_diagnostics;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = StencilCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Requirements {
			target,
			recursive,
			format,
		}) => run_requirements(&args, target, *recursive, *format),
		Some(Commands::Render {
			template,
			parameters,
			output,
			no_clobber,
			dump_parameters,
		}) => {
			run_render(
				&args,
				template,
				parameters,
				output.as_deref(),
				*no_clobber,
				*dump_parameters,
			)
		}
		Some(Commands::RenderDir {
			dir,
			out_dir,
			recursive,
			parameters,
		}) => run_render_dir(&args, dir, out_dir, *recursive, parameters),
		Some(Commands::Check {
			dir,
			recursive,
			parameters,
			format,
		}) => run_check(&args, dir, *recursive, parameters, *format),
		None => {
			eprintln!("No subcommand specified. Run `stencil --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<stencil_core::StencilError>() {
			Ok(stencil_err) => {
				let report: miette::Report = (*stencil_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Send diagnostics to stderr so rendered output on stdout stays clean.
/// `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_filter = if verbose {
		"debug"
	} else {
		"warn,stencil::template=info"
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(verbose)
		.without_time()
		.init();
}

fn resolve_root(args: &StencilCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &StencilCli) -> AnyResult<(PathBuf, StencilConfig)> {
	let root = resolve_root(args);
	let config = StencilConfig::load(&root)?;
	tracing::debug!(
		root = %root.display(),
		config_found = config.is_some(),
		"resolved project root"
	);

	Ok((root, config.unwrap_or_default()))
}

/// Parameters shared by every template: config values, then `--params`
/// files in order.
fn base_parameters(
	root: &Path,
	config: &StencilConfig,
	parameter_args: &ParameterArgs,
) -> AnyResult<Parameters> {
	let mut parameters = config.load_parameters(root)?;

	for path in &parameter_args.param_files {
		merge_parameters(&mut parameters, load_parameter_file(path)?);
	}

	Ok(parameters)
}

/// Apply `--param` assignments last, converting each value to the type the
/// template declares for that name. Undeclared names stay text.
fn apply_assignments(
	parameters: &mut Parameters,
	parameter_args: &ParameterArgs,
	template: &Template,
) -> AnyEmptyResult {
	for assignment in &parameter_args.params {
		let (name, raw) = parse_parameter_assignment(assignment)?;
		let value = match template
			.requirements
			.iter()
			.find(|requirement| requirement.name == name)
		{
			Some(requirement) => requirement.coerce(&raw)?,
			None => serde_json::Value::String(raw),
		};
		parameters.insert(name, value);
	}

	Ok(())
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn run_requirements(
	args: &StencilCli,
	target: &Path,
	recursive: bool,
	format: OutputFormat,
) -> AnyEmptyResult {
	let (_, config) = load_config(args)?;
	let template_config = config.template_config()?;

	let templates: Vec<Template> = if target.is_dir() {
		scan_templates(target, recursive || config.recursive, &template_config)?
			.collect::<Result<_, _>>()?
	} else {
		vec![Template::from_file(target, &template_config)?]
	};

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = templates
				.iter()
				.map(|template| {
					let requirements: Vec<serde_json::Value> = template
						.requirements
						.iter()
						.map(|requirement| {
							serde_json::json!({
								"name": requirement.name,
								"type": requirement.r#type,
								"parameter": requirement.parameter,
								"description": requirement.description,
							})
						})
						.collect();
					serde_json::json!({
						"template": template.name,
						"requirements": requirements,
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
		OutputFormat::Text => {
			if templates.is_empty() {
				println!("No templates found.");
				return Ok(());
			}

			for template in &templates {
				println!("{}", colored!(&template.name, bold));
				if template.requirements.is_empty() {
					println!("  (no requirements)");
				}
				for requirement in &template.requirements {
					let kind = match &requirement.parameter {
						Some(parameter) => format!("{}:{parameter}", requirement.r#type),
						None => requirement.r#type.to_string(),
					};
					println!(
						"  {:<24} {:<16} {}",
						requirement.name, kind, requirement.description
					);
				}
			}
		}
	}

	Ok(())
}

fn run_render(
	args: &StencilCli,
	template_path: &Path,
	parameter_args: &ParameterArgs,
	output: Option<&Path>,
	no_clobber: bool,
	dump_parameters: bool,
) -> AnyEmptyResult {
	let (root, config) = load_config(args)?;
	let template_config = config.template_config()?;
	let template = Template::from_file(template_path, &template_config)?;
	let mut parameters = base_parameters(&root, &config, parameter_args)?;
	apply_assignments(&mut parameters, parameter_args, &template)?;

	let rendered = template.render(&template_config, &mut parameters, Some(&TracingLogger))?;

	if dump_parameters {
		let sorted: BTreeMap<_, _> = parameters.iter().collect();
		eprintln!("{}", serde_json::to_string_pretty(&sorted)?);
	}

	let Some(output) = output else {
		print!("{rendered}");
		return Ok(());
	};

	let destination = if no_clobber {
		safe_file_name(output)
	} else {
		output.to_path_buf()
	};
	write_output(&destination, &rendered)?;
	println!(
		"{} {} -> {}",
		colored!("Rendered", green),
		template.name,
		destination.display()
	);

	Ok(())
}

fn run_render_dir(
	args: &StencilCli,
	dir: &Path,
	out_dir: &Path,
	recursive: bool,
	parameter_args: &ParameterArgs,
) -> AnyEmptyResult {
	let (root, config) = load_config(args)?;
	let template_config = config.template_config()?;
	let base = base_parameters(&root, &config, parameter_args)?;

	// The output directory must exist before scanning so it can be excluded
	// when it sits below `dir`.
	std::fs::create_dir_all(out_dir)?;
	let templates = scan_templates_excluding(
		dir,
		recursive || config.recursive,
		&template_config,
		Some(out_dir),
	)?;

	let mut rendered_count = 0usize;
	for template in templates {
		let template = template?;

		// `set(...)` in one template must not leak into the next.
		let mut parameters = base.clone();
		apply_assignments(&mut parameters, parameter_args, &template)?;
		let rendered = template.render(&template_config, &mut parameters, Some(&TracingLogger))?;

		let destination = safe_file_name(out_dir.join(&template.name));
		write_output(&destination, &rendered)?;
		println!(
			"  {} -> {}",
			template.name,
			make_relative(&destination, out_dir)
		);
		rendered_count += 1;
	}

	println!(
		"{}",
		colored!(
			format!(
				"Rendered {rendered_count} template(s) into {}.",
				out_dir.display()
			),
			green
		)
	);

	Ok(())
}

struct CheckEntry {
	name: String,
	missing: Vec<(String, String)>,
	unterminated: Vec<(&'static str, usize)>,
}

fn run_check(
	args: &StencilCli,
	dir: &Path,
	recursive: bool,
	parameter_args: &ParameterArgs,
	format: OutputFormat,
) -> AnyEmptyResult {
	let (root, config) = load_config(args)?;
	let template_config = config.template_config()?;
	let base = base_parameters(&root, &config, parameter_args)?;

	let mut entries = Vec::new();
	for template in scan_templates(dir, recursive || config.recursive, &template_config)? {
		let template = template?;
		let mut parameters = base.clone();
		apply_assignments(&mut parameters, parameter_args, &template)?;

		let missing = template
			.missing_requirements(&parameters)
			.into_iter()
			.map(|requirement| (requirement.name.clone(), requirement.description.clone()))
			.collect();

		entries.push(CheckEntry {
			name: template.name.clone(),
			missing,
			unterminated: unterminated_regions(&template, &template_config),
		});
	}

	let failing = entries
		.iter()
		.filter(|entry| !entry.missing.is_empty())
		.count();

	match format {
		OutputFormat::Json => {
			let templates: Vec<serde_json::Value> = entries
				.iter()
				.map(|entry| {
					let missing: Vec<serde_json::Value> = entry
						.missing
						.iter()
						.map(|(name, description)| {
							serde_json::json!({ "name": name, "description": description })
						})
						.collect();
					let unterminated: Vec<serde_json::Value> = entry
						.unterminated
						.iter()
						.map(|(kind, offset)| {
							serde_json::json!({ "kind": kind, "offset": offset })
						})
						.collect();
					serde_json::json!({
						"template": entry.name,
						"missing": missing,
						"unterminated": unterminated,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": failing == 0,
				"templates": templates,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			for entry in &entries {
				for (kind, offset) in &entry.unterminated {
					eprintln!(
						"{} {}: unterminated {kind} token at byte {offset}",
						colored!("warning:", yellow),
						entry.name
					);
				}
			}

			if failing == 0 {
				println!(
					"Check passed: {} template(s) have every required input.",
					entries.len()
				);
			} else {
				eprintln!("Check failed: {failing} template(s) are missing inputs.");
				for entry in entries.iter().filter(|entry| !entry.missing.is_empty()) {
					eprintln!();
					eprintln!("  {}", colored!(&entry.name, bold));
					for (name, description) in &entry.missing {
						eprintln!("    {} `{name}` - {description}", colored!("missing", red));
					}
				}
			}
		}
	}

	if failing > 0 {
		process::exit(1);
	}

	Ok(())
}

fn unterminated_regions(
	template: &Template,
	template_config: &TemplateConfig,
) -> Vec<(&'static str, usize)> {
	[
		("require", &template_config.require),
		("inject", &template_config.inject),
	]
	.into_iter()
	.filter_map(|(kind, markers)| {
		scan_with_diagnostics(&template.content, markers)
			.1
			.map(|offset| (kind, offset))
	})
	.collect()
}

fn write_output(path: &Path, content: &str) -> AnyEmptyResult {
	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;

	Ok(())
}
