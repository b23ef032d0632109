use std::cell::RefCell;
use std::path::Path;

use rstest::rstest;
use serde_json::json;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::*;
use crate::parameters::load_parameter_file;
use crate::parameters::parse_parameter_assignment;
use crate::project::scan_templates;
use crate::project::scan_templates_excluding;

fn markers(start: &str, end: &str, escape: Option<&str>) -> TokenParserConfig {
	TokenParserConfig {
		start_token: start.to_string(),
		end_token: end.to_string(),
		escape_token: escape.map(ToString::to_string),
	}
}

fn contents(text: &str, config: &TokenParserConfig) -> Vec<String> {
	scan_tokens(text, config).map(|token| token.content).collect()
}

fn sample_token() -> Token {
	Token {
		content: String::new(),
		start_index: 0,
		length: 0,
		full_token: String::new(),
	}
}

#[derive(Default)]
struct RecordingLogger {
	messages: RefCell<Vec<String>>,
}

impl TemplateLogger for RecordingLogger {
	fn log(&self, message: &str) {
		self.messages.borrow_mut().push(message.to_string());
	}
}

// --- Token scanner ---

#[test]
fn scan_escaped_end_marker_is_literal() {
	let config = markers("<<", ">>", Some("\\"));
	let tokens: Vec<Token> = scan_tokens("<<a\\>>b>>", &config).collect();

	assert_eq!(
		tokens,
		vec![Token {
			content: "a>>b".to_string(),
			start_index: 0,
			length: 9,
			full_token: "<<a\\>>b>>".to_string(),
		}]
	);
}

#[test]
fn scan_tokens_in_order_without_overlap() {
	let config = markers("<<", ">>", None);
	let tokens: Vec<Token> = scan_tokens("x <<one>> y <<two>>", &config).collect();

	assert_eq!(tokens.len(), 2);
	assert_eq!(tokens[0].content, "one");
	assert_eq!(tokens[0].start_index, 2);
	assert_eq!(tokens[0].length, 7);
	assert_eq!(tokens[1].content, "two");
	assert_eq!(tokens[1].start_index, 12);
	assert_eq!(tokens[1].full_token, "<<two>>");
}

#[rstest]
#[case::empty_content("<<>>", vec![""])]
#[case::no_tokens("plain text", vec![])]
#[case::adjacent("<<a>><<b>>", vec!["a", "b"])]
#[case::only_adjacent_escape_counts("<<a\\\\>>>>", vec!["a\\>>"])]
#[case::nested_start_is_content("<<a<<b>>", vec!["a<<b"])]
fn scan_edge_cases(#[case] input: &str, #[case] expected: Vec<&str>) {
	let config = markers("<<", ">>", Some("\\"));
	assert_eq!(contents(input, &config), expected);
}

#[test]
fn scan_default_markers() {
	let config = TokenParserConfig::inject();
	let text = "int x = /*[INJECT] write(1) */; /* plain comment */";

	assert_eq!(contents(text, &config), vec![" write(1) "]);
}

#[test]
fn scan_default_escape_sequence() {
	let config = TokenParserConfig::inject();
	let text = "/*[INJECT] write('/* a [ESCAPE]*/') */";

	assert_eq!(contents(text, &config), vec![" write('/* a */') "]);
}

#[test]
#[traced_test]
fn scan_unterminated_region_is_dropped_and_reported() {
	let config = markers("<<", ">>", None);
	let (tokens, unterminated) = scan_with_diagnostics("<<a>> <<b", &config);

	assert_eq!(tokens.len(), 1);
	assert_eq!(tokens[0].content, "a");
	assert_eq!(unterminated, Some(6));
	assert!(logs_contain("unterminated token region"));
}

#[test]
fn scan_is_restartable() {
	let config = markers("<<", ">>", None);
	let text = "<<a>> <<b>>";
	let first: Vec<Token> = scan_tokens(text, &config).collect();
	let second: Vec<Token> = scan_tokens(text, &config).collect();

	assert_eq!(first, second);
	assert_eq!(first.len(), 2);
}

#[test]
fn cloned_scanner_resumes_from_current_position() {
	let config = markers("<<", ">>", None);
	let mut scanner = scan_tokens("<<a>> <<b>>", &config);
	let _ = scanner.next();
	let rest: Vec<String> = scanner.clone().map(|token| token.content).collect();

	assert_eq!(rest, vec!["b"]);
	assert_eq!(scanner.count(), 1);
}

#[rstest]
#[case::empty_start("", ">>", None)]
#[case::empty_end("<<", "", None)]
#[case::same_markers("<<", "<<", None)]
#[case::escape_is_end("<<", ">>", Some(">>"))]
fn invalid_marker_configs(#[case] start: &str, #[case] end: &str, #[case] escape: Option<&str>) {
	let result = TokenParserConfig::new(start, end, escape.map(ToString::to_string));
	assert!(matches!(result, Err(StencilError::InvalidMarkers(_))));
}

#[rstest]
#[case::with_escape(Some("\\"))]
#[case::without_escape(None)]
#[case::empty_escape(Some(""))]
fn valid_marker_configs(#[case] escape: Option<&str>) {
	let result = TokenParserConfig::new("<<", ">>", escape.map(ToString::to_string));
	assert!(result.is_ok());
}

// --- Requirement extractor ---

#[rstest]
#[case::decimal_with_parameter("number:2", RequirementType::Decimal, Some("2"))]
#[case::unknown("unknowntype", RequirementType::Unknown, Some("unknowntype:"))]
#[case::unknown_with_parameter("money:eur:2", RequirementType::Unknown, Some("money:eur:2"))]
#[case::case_insensitive("INT", RequirementType::Integer, None)]
#[case::float("float", RequirementType::Decimal, None)]
#[case::bit("bit", RequirementType::Boolean, None)]
#[case::boolean("Boolean", RequirementType::Boolean, None)]
#[case::file("file:*.csv", RequirementType::File, Some("*.csv"))]
#[case::trimmed_parameter("date : yyyy-MM-dd", RequirementType::Date, Some("yyyy-MM-dd"))]
#[case::time("time", RequirementType::Time, None)]
#[case::datetime("DateTime", RequirementType::DateTime, None)]
#[case::parameter_keeps_colons("text:a:b", RequirementType::Text, Some("a:b"))]
fn determine_requirement_type(
	#[case] declaration: &str,
	#[case] expected_type: RequirementType,
	#[case] expected_parameter: Option<&str>,
) {
	let (kind, parameter) = determine_type(declaration);
	assert_eq!(kind, expected_type);
	assert_eq!(parameter.as_deref(), expected_parameter);
}

#[test]
fn parse_typed_declaration_with_parameter() -> StencilResult<()> {
	let requirements = extract_requirements(
		"/*[REQUIRE] int:1-100 age - the age */",
		&TokenParserConfig::require(),
	)?;

	assert_eq!(requirements.len(), 1);
	let requirement = &requirements[0];
	assert_eq!(requirement.r#type, RequirementType::Integer);
	assert_eq!(requirement.parameter.as_deref(), Some("1-100"));
	assert_eq!(requirement.name, "age");
	assert_eq!(requirement.description, "the age");
	assert_eq!(
		requirement.source.full_token,
		"/*[REQUIRE] int:1-100 age - the age */"
	);

	Ok(())
}

#[test]
fn extract_requirements_in_source_order() -> StencilResult<()> {
	let text = "/*[REQUIRE]\r\ntext first - The first\n\n   \nbool second -\n*/\nbody\n/*[REQUIRE]\ndate third  -   spaced   out  words\n*/";
	let requirements = extract_template_requirements(text, &TemplateConfig::default())?;
	let names: Vec<&str> = requirements.iter().map(|r| r.name.as_str()).collect();

	assert_eq!(names, vec!["first", "second", "third"]);
	assert_eq!(requirements[1].description, "");
	assert_eq!(requirements[2].description, "spaced out words");
	assert_eq!(requirements[0].source, requirements[1].source);

	Ok(())
}

#[rstest]
#[case::too_few_parts("/*[REQUIRE]\ntext name\n*/", "expected at least 3 parts")]
#[case::missing_separator("/*[REQUIRE]\ntext name : description\n*/", "expected `-` separator")]
fn invalid_declarations_abort_extraction(#[case] text: &str, #[case] reason: &str) {
	let result = extract_template_requirements(text, &TemplateConfig::default());

	match result {
		Err(StencilError::InvalidDeclaration {
			line,
			reason: actual,
		}) => {
			assert!(text.contains(&line));
			assert!(actual.contains(reason), "{actual}");
		}
		other => panic!("expected an invalid declaration error, got {other:?}"),
	}
}

#[test]
fn whitespace_only_lines_are_ignored() -> StencilResult<()> {
	let text = "/*[REQUIRE]\n  text name - The name\n\t \n  */";
	let requirements = extract_template_requirements(text, &TemplateConfig::default())?;

	assert_eq!(requirements.len(), 1);
	assert_eq!(requirements[0].name, "name");
	assert_eq!(requirements[0].description, "The name");

	Ok(())
}

#[test]
fn bad_line_fails_the_whole_template() {
	let text = "/*[REQUIRE]\ntext ok - fine\n*/ /*[REQUIRE]\nbroken\n*/";
	let result = extract_template_requirements(text, &TemplateConfig::default());

	assert!(matches!(result, Err(StencilError::InvalidDeclaration { .. })));
}

#[test]
fn removing_require_tokens_leaves_no_requirements() -> StencilResult<()> {
	let config = TemplateConfig::default();
	let text = "a/*[REQUIRE]\ntext x - y\n*/b/*[REQUIRE]\nint z - w\n*/c";
	let requirements = extract_template_requirements(text, &config)?;
	assert_eq!(requirements.len(), 2);

	let mut stripped = text.to_string();
	for requirement in &requirements {
		stripped = stripped.replace(&requirement.source.full_token, "");
	}

	assert_eq!(stripped, "abc");
	assert!(extract_template_requirements(&stripped, &config)?.is_empty());

	Ok(())
}

#[rstest]
#[case::integer("int", "42", json!(42))]
#[case::decimal("number", "2.5", json!(2.5))]
#[case::boolean_yes("bool", "yes", json!(true))]
#[case::boolean_zero("bit", "0", json!(false))]
#[case::text("text", " padded ", json!(" padded "))]
#[case::date("date", "2024-01-31", json!("2024-01-31"))]
fn coerce_raw_values(
	#[case] kind: &str,
	#[case] raw: &str,
	#[case] expected: serde_json::Value,
) -> StencilResult<()> {
	let requirement = parse_declaration(&format!("{kind} value - test"), &sample_token())?;
	assert_eq!(requirement.coerce(raw)?, expected);

	Ok(())
}

#[rstest]
#[case::integer("int", "4.5")]
#[case::decimal("float", "abc")]
#[case::boolean("boolean", "maybe")]
fn coerce_rejects_invalid_values(#[case] kind: &str, #[case] raw: &str) -> StencilResult<()> {
	let requirement = parse_declaration(&format!("{kind} value - test"), &sample_token())?;
	let result = requirement.coerce(raw);

	assert!(matches!(
		result,
		Err(StencilError::InvalidParameter { ref name, .. }) if name == "value"
	));

	Ok(())
}

// --- Evaluator ---

#[test]
fn evaluate_strips_requirements_and_injects_output() -> StencilResult<()> {
	let text = "/*[REQUIRE]\ntext name - Who to greet\n*/\nHello /*[INJECT] write(name) */!\n";
	let mut parameters = Parameters::from([("name".to_string(), json!("world"))]);

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "\nHello world!\n");

	Ok(())
}

#[test]
fn evaluate_fails_on_first_missing_requirement() {
	let text = "/*[REQUIRE]\nint age - Age in years\ntext city - Home town\n*/";
	let mut parameters = Parameters::new();

	let result = evaluate(text, &TemplateConfig::default(), &mut parameters, None);
	match result {
		Err(StencilError::MissingRequirement { name, description }) => {
			assert_eq!(name, "age");
			assert_eq!(description, "Age in years");
		}
		other => panic!("expected a missing requirement error, got {other:?}"),
	}
}

#[test]
fn evaluate_checks_presence_not_value() -> StencilResult<()> {
	let text = "/*[REQUIRE]\ntext note - Optional note\n*/done";
	let mut parameters = Parameters::from([("note".to_string(), serde_json::Value::Null)]);

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "done");

	Ok(())
}

#[test]
fn evaluate_inject_only_template_with_no_parameters() -> StencilResult<()> {
	let text = "a/*[INJECT] write(1) */b/*[INJECT] write('two') */c";
	let mut parameters = Parameters::new();

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "a1btwoc");

	Ok(())
}

#[test]
fn set_is_visible_to_later_tokens_and_the_caller() -> StencilResult<()> {
	let text = "/*[INJECT] set('total', 2 * 3) */A/*[INJECT] write(total) */";
	let mut parameters = Parameters::new();

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "A6");
	assert_eq!(parameters.get("total"), Some(&json!(6)));

	Ok(())
}

#[test]
fn statements_split_on_semicolons_and_lines() -> StencilResult<()> {
	let text = "/*[INJECT]\n  set('x', 1)\n  write(x + 1); write(';')\n*/";
	let mut parameters = Parameters::new();

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "2;");

	Ok(())
}

#[test]
fn write_line_appends_newlines() -> StencilResult<()> {
	let text = "[/*[INJECT] writeLine('a'); writeLine() */]";
	let mut parameters = Parameters::new();

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "[a\n\n]");

	Ok(())
}

#[test]
fn log_forwards_to_the_logger() -> StencilResult<()> {
	let text = "/*[INJECT] log('hello ' ~ name) */";
	let mut parameters = Parameters::from([("name".to_string(), json!("world"))]);
	let logger = RecordingLogger::default();

	let output = evaluate(
		text,
		&TemplateConfig::default(),
		&mut parameters,
		Some(&logger),
	)?;
	assert_eq!(output, "");
	assert_eq!(*logger.messages.borrow(), vec!["hello world".to_string()]);

	Ok(())
}

#[test]
fn page_and_escape_helpers_are_available() -> StencilResult<()> {
	let text = "/*[INJECT] write(page(items, 1, 2) | join(',')) */|/*[INJECT] write(escape('Hello World-2!')) */";
	let mut parameters = Parameters::from([("items".to_string(), json!([1, 2, 3, 4, 5]))]);

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "3,4|HelloWorld2");

	Ok(())
}

#[rstest]
#[case::first_page(0, 2, vec![1, 2])]
#[case::last_partial_page(2, 2, vec![5])]
#[case::out_of_range(3, 2, vec![])]
#[case::zero_size(0, 0, vec![])]
fn page_slices_items(#[case] index: usize, #[case] size: usize, #[case] expected: Vec<i32>) {
	assert_eq!(page(&[1, 2, 3, 4, 5], index, size), expected);
}

#[test]
fn escape_keeps_identifier_characters() {
	assert_eq!(escape("Order #12 (draft) v_2"), "Order12draftv_2");
}

#[test]
fn interpreter_errors_propagate() {
	let text = "/*[INJECT] write( */";
	let mut parameters = Parameters::new();

	let result = evaluate(text, &TemplateConfig::default(), &mut parameters, None);
	assert!(matches!(result, Err(StencilError::Interpreter(_))));
}

#[test]
fn tokens_shared_by_require_and_inject_markers_are_not_evaluated() -> StencilResult<()> {
	let shared = markers("<<", ">>", None);
	let config = TemplateConfig {
		require: shared.clone(),
		inject: shared,
	};
	let mut parameters = Parameters::from([("name".to_string(), json!("x"))]);

	let output = evaluate("<<text name - a name>>Hi", &config, &mut parameters, None)?;
	assert_eq!(output, "Hi");

	Ok(())
}

#[test]
fn escaped_end_marker_inside_inject_body() -> StencilResult<()> {
	let text = "/*[INJECT] write('x[ESCAPE]*/y') */";
	let mut parameters = Parameters::new();

	let output = evaluate(text, &TemplateConfig::default(), &mut parameters, None)?;
	assert_eq!(output, "x*/y");

	Ok(())
}

struct ShoutEngine;

impl ExpressionEngine for ShoutEngine {
	fn execute(&self, body: &str, host: &mut HostContext<'_>) -> StencilResult<()> {
		let value = host
			.parameters()
			.get(body.trim())
			.and_then(serde_json::Value::as_str)
			.unwrap_or_default()
			.to_uppercase();
		host.write(&value);
		host.set("shouted", json!(true));

		Ok(())
	}
}

#[test]
fn custom_engines_plug_into_evaluation() -> StencilResult<()> {
	let mut parameters = Parameters::from([("name".to_string(), json!("quiet"))]);

	let output = evaluate_with_engine(
		&ShoutEngine,
		"say /*[INJECT] name */",
		&TemplateConfig::default(),
		&mut parameters,
		None,
	)?;
	assert_eq!(output, "say QUIET");
	assert_eq!(parameters.get("shouted"), Some(&json!(true)));

	Ok(())
}

// --- Safe file names ---

#[test]
fn safe_file_name_returns_unused_path_unchanged() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let path = tmp.path().join("out.txt");

	assert_eq!(safe_file_name(&path), path);

	Ok(())
}

#[test]
fn safe_file_name_counts_past_existing_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("out.txt"), "a")?;
	std::fs::write(tmp.path().join("out-1.txt"), "b")?;

	let path = safe_file_name(tmp.path().join("out.txt"));
	assert_eq!(path, tmp.path().join("out-2.txt"));
	assert_eq!(safe_file_name(tmp.path().join("out.txt")), path);

	Ok(())
}

#[test]
fn safe_file_name_without_extension() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("README"), "a")?;

	assert_eq!(
		safe_file_name(tmp.path().join("README")),
		tmp.path().join("README-1")
	);

	Ok(())
}

// --- Template directories ---

fn write_template_tree(root: &Path) -> AnyEmptyResult {
	std::fs::create_dir_all(root.join("sub"))?;
	std::fs::write(root.join("a.txt"), "hello")?;
	std::fs::write(root.join("empty.txt"), "  \n\t")?;
	std::fs::write(
		root.join("sub").join("b.txt"),
		"/*[REQUIRE]\ntext x - the x\n*/body",
	)?;

	Ok(())
}

#[test]
fn scan_top_level_templates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_template_tree(tmp.path())?;

	let templates = scan_templates(tmp.path(), false, &TemplateConfig::default())?
		.collect::<StencilResult<Vec<Template>>>()?;
	let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();

	assert_eq!(names, vec!["a.txt"]);

	Ok(())
}

#[test]
fn scan_templates_recursively() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_template_tree(tmp.path())?;

	let templates = scan_templates(tmp.path(), true, &TemplateConfig::default())?
		.collect::<StencilResult<Vec<Template>>>()?;
	let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();

	assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
	assert_eq!(templates[1].requirements.len(), 1);
	assert_eq!(templates[1].requirements[0].name, "x");

	Ok(())
}

#[test]
fn scan_skips_excluded_directory() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_template_tree(tmp.path())?;
	let out = tmp.path().join("out");
	std::fs::create_dir_all(&out)?;
	std::fs::write(out.join("a.txt"), "rendered")?;

	let templates = scan_templates_excluding(
		tmp.path(),
		true,
		&TemplateConfig::default(),
		Some(&out),
	)?
	.collect::<StencilResult<Vec<Template>>>()?;
	let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();

	assert_eq!(names, vec!["a.txt", "sub/b.txt"]);

	Ok(())
}

#[test]
fn scan_missing_directory_fails() {
	let result = scan_templates(
		Path::new("/definitely/not/here"),
		false,
		&TemplateConfig::default(),
	);

	assert!(matches!(result, Err(StencilError::DirectoryNotFound(_))));
}

#[test]
fn scan_reports_invalid_templates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("bad.txt"), "/*[REQUIRE] oops */")?;

	let mut scan = scan_templates(tmp.path(), false, &TemplateConfig::default())?;
	assert!(matches!(
		scan.next(),
		Some(Err(StencilError::InvalidDeclaration { .. }))
	));

	Ok(())
}

#[test]
fn template_lists_missing_requirements() -> StencilResult<()> {
	let template = Template::from_content(
		"t",
		"t.txt",
		"/*[REQUIRE]\ntext a - first\ntext b - second\n*/",
		&TemplateConfig::default(),
	)?;
	let parameters = Parameters::from([("a".to_string(), json!("x"))]);

	let missing: Vec<&str> = template
		.missing_requirements(&parameters)
		.iter()
		.map(|r| r.name.as_str())
		.collect();
	assert_eq!(missing, vec!["b"]);

	Ok(())
}

// --- Parameters and config ---

#[test]
fn parameter_files_load_the_same_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let json_path = tmp.path().join("p.json");
	let toml_path = tmp.path().join("p.toml");
	let yaml_path = tmp.path().join("p.yaml");
	std::fs::write(&json_path, r#"{"name": "x", "count": 2, "flags": [true]}"#)?;
	std::fs::write(&toml_path, "name = \"x\"\ncount = 2\nflags = [true]\n")?;
	std::fs::write(&yaml_path, "name: x\ncount: 2\nflags:\n  - true\n")?;

	let from_json = load_parameter_file(&json_path)?;
	assert_eq!(from_json.get("count"), Some(&json!(2)));
	assert_eq!(load_parameter_file(&toml_path)?, from_json);
	assert_eq!(load_parameter_file(&yaml_path)?, from_json);

	Ok(())
}

#[test]
fn parameter_files_must_hold_a_table() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let list_path = tmp.path().join("list.json");
	let ini_path = tmp.path().join("p.ini");
	std::fs::write(&list_path, "[1, 2]")?;
	std::fs::write(&ini_path, "a=1")?;

	assert!(matches!(
		load_parameter_file(&list_path),
		Err(StencilError::ParameterFile { .. })
	));
	assert!(matches!(
		load_parameter_file(&ini_path),
		Err(StencilError::UnsupportedParameterFormat(ref format)) if format == "ini"
	));

	Ok(())
}

#[rstest]
#[case::simple("name=value", "name", "value")]
#[case::keeps_equals("query=a=b", "query", "a=b")]
#[case::empty_value("blank=", "blank", "")]
fn parameter_assignments(
	#[case] input: &str,
	#[case] name: &str,
	#[case] value: &str,
) -> StencilResult<()> {
	assert_eq!(
		parse_parameter_assignment(input)?,
		(name.to_string(), value.to_string())
	);

	Ok(())
}

#[rstest]
#[case::no_equals("novalue")]
#[case::empty_name("=value")]
fn invalid_parameter_assignments(#[case] input: &str) {
	assert!(parse_parameter_assignment(input).is_err());
}

#[test]
fn config_overrides_markers_and_parameters() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(
		tmp.path().join(".config").join("stencil.toml"),
		"recursive = true\nparameter_files = [\"extra.json\"]\n\n[markers.inject]\nstart = \
		 \"{{\"\nend = \"}}\"\nescape = \"\"\n\n[parameters]\ncompany = \"Acme\"\ncount = 3\n",
	)?;
	std::fs::write(tmp.path().join("extra.json"), r#"{"count": 4, "extra": true}"#)?;

	let config = StencilConfig::load(tmp.path())?.ok_or("config not found")?;
	assert!(config.recursive);

	let markers = config.template_config()?;
	assert_eq!(markers.require, TokenParserConfig::require());
	assert_eq!(markers.inject.start_token, "{{");
	assert_eq!(markers.inject.end_token, "}}");
	assert_eq!(markers.inject.escape_token, None);

	let parameters = config.load_parameters(tmp.path())?;
	assert_eq!(parameters.get("company"), Some(&json!("Acme")));
	assert_eq!(parameters.get("count"), Some(&json!(4)));
	assert_eq!(parameters.get("extra"), Some(&json!(true)));

	Ok(())
}

#[test]
fn config_rejects_conflicting_markers() {
	let result = StencilConfig::parse("[markers.require]\nstart = \"*/\"\n");
	assert!(matches!(result, Err(StencilError::InvalidMarkers(_))));
}

#[test]
fn missing_config_is_none() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	assert!(StencilConfig::load(tmp.path())?.is_none());

	Ok(())
}
