use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use minijinja::Environment;
use minijinja::ErrorKind;
use minijinja::UndefinedBehavior;
use minijinja::Value;

use crate::StencilError;
use crate::StencilResult;
use crate::requirements::extract_template_requirements;
use crate::tokens::TemplateConfig;
use crate::tokens::scan_tokens;

/// Named input values for a template.
///
/// The mapping is shared with injected expressions by mutable reference:
/// `set(...)` calls made while evaluating a template write straight into it,
/// so later inject tokens and the caller both observe those values.
pub type Parameters = HashMap<String, serde_json::Value>;

/// Receives messages emitted by `log(...)` calls in injected expressions.
pub trait TemplateLogger {
	fn log(&self, message: &str);
}

/// Forwards template log messages to `tracing` under the
/// `stencil::template` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TemplateLogger for TracingLogger {
	fn log(&self, message: &str) {
		tracing::info!(target: "stencil::template", "{message}");
	}
}

/// The host side of one inject token evaluation.
///
/// Engines call back into this context to emit text, log, and read or
/// update parameters. The emitted text, not the value of the expression,
/// replaces the inject token in the rendered output.
pub struct HostContext<'a> {
	parameters: &'a mut Parameters,
	output: String,
	logger: Option<&'a dyn TemplateLogger>,
}

impl<'a> HostContext<'a> {
	pub fn new(parameters: &'a mut Parameters, logger: Option<&'a dyn TemplateLogger>) -> Self {
		Self {
			parameters,
			output: String::new(),
			logger,
		}
	}

	pub fn write(&mut self, text: &str) {
		self.output.push_str(text);
	}

	pub fn write_line(&mut self, text: &str) {
		self.output.push_str(text);
		self.output.push('\n');
	}

	/// Forward a message to the caller's logger. Dropped when no logger was
	/// supplied.
	pub fn log(&self, message: &str) {
		if let Some(logger) = self.logger {
			logger.log(message);
		}
	}

	/// Insert or overwrite a parameter. The change is visible for the rest of
	/// the evaluation and to the caller afterwards.
	pub fn set(&mut self, name: impl Into<String>, value: serde_json::Value) {
		self.parameters.insert(name.into(), value);
	}

	pub fn parameters(&self) -> &Parameters {
		self.parameters
	}

	pub fn parameters_mut(&mut self) -> &mut Parameters {
		self.parameters
	}

	pub fn output(&self) -> &str {
		&self.output
	}

	pub fn into_output(self) -> String {
		self.output
	}
}

/// Evaluates the body of an inject token against a [`HostContext`].
///
/// Implementations decide what an expression body looks like. They must
/// expose `write`, `writeLine`, `log`, `set`, `page` and `escape` to the
/// body, plus every parameter bound by name.
pub trait ExpressionEngine {
	fn execute(&self, body: &str, host: &mut HostContext<'_>) -> StencilResult<()>;
}

/// Return page `index` (zero based) of `items`, holding at most `size`
/// entries. Out of range pages and a zero `size` give an empty page.
pub fn page<T: Clone>(items: &[T], index: usize, size: usize) -> Vec<T> {
	if size == 0 {
		return Vec::new();
	}

	let Some(start) = index.checked_mul(size).filter(|start| *start < items.len()) else {
		return Vec::new();
	};
	let end = start.saturating_add(size).min(items.len());

	items[start..end].to_vec()
}

/// Keep only `[A-Za-z0-9_]` characters, producing an identifier-safe string.
pub fn escape(text: &str) -> String {
	text.chars()
		.filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
		.collect()
}

/// Render `text`: check every declared requirement is present in
/// `parameters`, strip the require tokens and replace each inject token with
/// the output of its expression body. Uses [`MinijinjaEngine`].
pub fn evaluate(
	text: &str,
	config: &TemplateConfig,
	parameters: &mut Parameters,
	logger: Option<&dyn TemplateLogger>,
) -> StencilResult<String> {
	evaluate_with_engine(&MinijinjaEngine, text, config, parameters, logger)
}

/// Like [`evaluate`], with a caller-chosen expression engine.
pub fn evaluate_with_engine(
	engine: &dyn ExpressionEngine,
	text: &str,
	config: &TemplateConfig,
	parameters: &mut Parameters,
	logger: Option<&dyn TemplateLogger>,
) -> StencilResult<String> {
	let requirements = extract_template_requirements(text, config)?;
	let mut scheduled: HashSet<String> = HashSet::new();
	let mut replacements: Vec<(String, String)> = Vec::new();

	for requirement in &requirements {
		if !parameters.contains_key(&requirement.name) {
			return Err(StencilError::MissingRequirement {
				name: requirement.name.clone(),
				description: requirement.description.clone(),
			});
		}

		if scheduled.insert(requirement.source.full_token.clone()) {
			replacements.push((requirement.source.full_token.clone(), String::new()));
		}
	}

	// Evaluation order is left to right: `set` calls in one token are visible
	// to every token after it.
	for token in scan_tokens(text, &config.inject) {
		if scheduled.contains(&token.full_token) {
			continue;
		}

		tracing::debug!(offset = token.start_index, "evaluating inject token");
		let mut host = HostContext::new(parameters, logger);
		engine.execute(&token.content, &mut host)?;
		let output = host.into_output();

		scheduled.insert(token.full_token.clone());
		replacements.push((token.full_token, output));
	}

	let mut result = text.to_string();
	for (literal, replacement) in &replacements {
		result = result.replace(literal.as_str(), replacement);
	}

	Ok(result)
}

/// The default expression engine, backed by `minijinja` expressions.
///
/// A body is a list of expressions separated by `;` or line breaks. Each is
/// evaluated in order against the current parameters, so a `set(...)` in one
/// expression is visible to the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinijinjaEngine;

#[derive(Debug, Default)]
struct SharedState {
	parameters: Parameters,
	output: String,
	logs: Vec<String>,
}

fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
	state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExpressionEngine for MinijinjaEngine {
	fn execute(&self, body: &str, host: &mut HostContext<'_>) -> StencilResult<()> {
		let statements = split_statements(body);
		if statements.is_empty() {
			return Ok(());
		}

		let state = Arc::new(Mutex::new(SharedState {
			parameters: std::mem::take(host.parameters_mut()),
			..SharedState::default()
		}));
		let env = build_environment(&state);
		let result = run_statements(&env, &statements, &state, host);

		// Hand the parameters back even when a statement failed, so values set
		// before the failure are not lost.
		let mut shared = lock(&state);
		*host.parameters_mut() = std::mem::take(&mut shared.parameters);
		let output = std::mem::take(&mut shared.output);
		drop(shared);
		host.write(&output);

		result
	}
}

fn run_statements<'source>(
	env: &Environment<'source>,
	statements: &'source [String],
	state: &Arc<Mutex<SharedState>>,
	host: &HostContext<'_>,
) -> StencilResult<()> {
	for statement in statements {
		let expression = env.compile_expression(statement)?;
		let context = Value::from_serialize(&lock(state).parameters);
		let outcome = expression.eval(context);

		let logs = std::mem::take(&mut lock(state).logs);
		for message in &logs {
			host.log(message);
		}

		outcome?;
	}

	Ok(())
}

fn build_environment<'source>(state: &Arc<Mutex<SharedState>>) -> Environment<'source> {
	let mut env = Environment::new();
	env.set_undefined_behavior(UndefinedBehavior::Strict);

	let shared = Arc::clone(state);
	env.add_function("write", move |value: Value| -> Value {
		lock(&shared).output.push_str(&value.to_string());
		Value::from(())
	});

	let shared = Arc::clone(state);
	env.add_function("writeLine", move |value: Option<Value>| -> Value {
		let mut guard = lock(&shared);
		if let Some(value) = value {
			guard.output.push_str(&value.to_string());
		}
		guard.output.push('\n');
		Value::from(())
	});

	let shared = Arc::clone(state);
	env.add_function("log", move |value: Value| -> Value {
		lock(&shared).logs.push(value.to_string());
		Value::from(())
	});

	let shared = Arc::clone(state);
	env.add_function(
		"set",
		move |name: Value, value: Value| -> Result<Value, minijinja::Error> {
			let json = serde_json::to_value(&value).map_err(|e| {
				minijinja::Error::new(
					ErrorKind::InvalidOperation,
					format!("cannot store value for `{name}`: {e}"),
				)
			})?;
			lock(&shared).parameters.insert(name.to_string(), json);
			Ok(Value::from(()))
		},
	);

	env.add_function(
		"page",
		|items: Value, index: usize, size: usize| -> Result<Value, minijinja::Error> {
			let items: Vec<Value> = items.try_iter()?.collect();
			Ok(Value::from(page(&items, index, size)))
		},
	);

	env.add_function("escape", |text: Value| -> Value {
		Value::from(escape(&text.to_string()))
	});

	env
}

/// Split an expression body on `;` and line breaks that sit outside string
/// literals and brackets. Blank statements are dropped.
fn split_statements(body: &str) -> Vec<String> {
	let mut statements = Vec::new();
	let mut current = String::new();
	let mut quote: Option<char> = None;
	let mut escaped = false;
	let mut depth: usize = 0;

	for ch in body.chars() {
		if let Some(open) = quote {
			current.push(ch);
			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == open {
				quote = None;
			}
			continue;
		}

		match ch {
			'"' | '\'' => {
				quote = Some(ch);
				current.push(ch);
			}
			'(' | '[' | '{' => {
				depth += 1;
				current.push(ch);
			}
			')' | ']' | '}' => {
				depth = depth.saturating_sub(1);
				current.push(ch);
			}
			';' | '\n' | '\r' if depth == 0 => {
				push_statement(&mut statements, &mut current);
			}
			_ => current.push(ch),
		}
	}

	push_statement(&mut statements, &mut current);
	statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
	let statement = current.trim();
	if !statement.is_empty() {
		statements.push(statement.to_string());
	}
	current.clear();
}
