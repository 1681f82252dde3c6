use buildpack_commons::command::{run_command_and_stream_output, StreamedCommandError};
use libcnb::Env;
use std::path::Path;
use std::process::Command;

/// Public module proxy used when the platform doesn't configure one.
const DEFAULT_GOPROXY: &str = "https://proxy.golang.org,direct";

/// Downloads all modules into `GOPATH`.
///
/// The layer env turns the proxy off for everything that runs after this buildpack, so the
/// proxy configured before that is restored for the download itself.
pub(crate) fn download_modules(
    go_binary: &Path,
    app_dir: &Path,
    env: &Env,
    goproxy: Option<&str>,
) -> Result<(), StreamedCommandError> {
    run_command_and_stream_output(
        Command::new(go_binary)
            .args(["mod", "download"])
            .current_dir(app_dir)
            .env_clear()
            .envs(env)
            .env("GOPROXY", goproxy.unwrap_or(DEFAULT_GOPROXY)),
    )
    .map(|_| ())
}

/// Compiles the main package in the app root to `output`.
pub(crate) fn build_binary(
    go_binary: &Path,
    app_dir: &Path,
    env: &Env,
    output: &Path,
    vendor_flag: bool,
) -> Result<(), StreamedCommandError> {
    run_command_and_stream_output(
        Command::new(go_binary)
            .args(build_args(output, vendor_flag))
            .current_dir(app_dir)
            .env_clear()
            .envs(env),
    )
    .map(|_| ())
}

fn build_args(output: &Path, vendor_flag: bool) -> Vec<String> {
    let mut args = vec![
        String::from("build"),
        String::from("-o"),
        output.to_string_lossy().to_string(),
    ];
    if vendor_flag {
        args.push(String::from("-mod=vendor"));
    }
    args.push(String::from("."));
    args
}
