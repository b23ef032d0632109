use assert_cmd::Command;

#[allow(dead_code)]
pub fn stencil_cmd() -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_stencil"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

#[allow(dead_code)]
pub const GREETING: &str = "/*[REQUIRE]\ntext name - Who to greet\n*/Hello /*[INJECT] write(name) */!";
