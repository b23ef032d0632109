use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render text templates that declare their own inputs.",
	long_about = "stencil renders templates containing require tokens, which declare the inputs a \
	              template needs, and inject tokens, whose expressions produce the generated \
	              text.\n\nQuick start:\n  stencil requirements report.sql   List declared \
	              inputs\n  stencil render report.sql -P year=2024\n  stencil check templates/   \
	              Verify every template can be rendered"
)]
pub struct StencilCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Project root used to discover `stencil.toml`.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

/// Parameter sources shared by the rendering commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ParameterArgs {
	/// Set a parameter, e.g. `-P name=value`. Values are converted to the
	/// type the template declares for that name.
	#[arg(long = "param", short = 'P', value_name = "NAME=VALUE")]
	pub params: Vec<String>,

	/// Load parameters from a JSON, TOML or YAML file. Later files win.
	#[arg(long = "params", value_name = "FILE")]
	pub param_files: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// List the inputs declared by a template file or every template in a
	/// directory.
	Requirements {
		/// A template file or a directory of templates.
		target: PathBuf,

		/// Descend into subdirectories when `target` is a directory.
		#[arg(long, short, default_value_t = false)]
		recursive: bool,

		/// Output format.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Render a single template.
	///
	/// Every declared requirement must be supplied through `--param`,
	/// `--params` or the `[parameters]` section of `stencil.toml`.
	Render {
		/// The template file to render.
		template: PathBuf,

		#[command(flatten)]
		parameters: ParameterArgs,

		/// Write the output to this file instead of stdout.
		#[arg(long, short)]
		output: Option<PathBuf>,

		/// Never overwrite: pick `name-1.ext`, `name-2.ext`, ... when the
		/// output file already exists.
		#[arg(long, default_value_t = false)]
		no_clobber: bool,

		/// Print the final parameters as JSON to stderr, including values
		/// created by `set(...)`.
		#[arg(long, default_value_t = false)]
		dump_parameters: bool,
	},
	/// Render every template in a directory into an output directory.
	///
	/// Output files keep their relative names. Existing files are never
	/// overwritten; a numbered name is chosen instead.
	RenderDir {
		/// Directory containing the templates.
		dir: PathBuf,

		/// Directory the rendered files are written to.
		#[arg(long)]
		out_dir: PathBuf,

		/// Descend into subdirectories.
		#[arg(long, short, default_value_t = false)]
		recursive: bool,

		#[command(flatten)]
		parameters: ParameterArgs,
	},
	/// Check that every template parses and that all declared inputs are
	/// available.
	///
	/// Exits with status 1 when an input is missing.
	Check {
		/// Directory containing the templates.
		dir: PathBuf,

		/// Descend into subdirectories.
		#[arg(long, short, default_value_t = false)]
		recursive: bool,

		#[command(flatten)]
		parameters: ParameterArgs,

		/// Output format.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
