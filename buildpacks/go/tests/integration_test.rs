//! All integration tests are skipped by default (using the `ignore` attribute)
//! since performing builds is slow. To run them use: `cargo test -- --ignored`.

// Required due to: https://github.com/rust-lang/rust/issues/95513
#![allow(unused_crate_dependencies)]

use libcnb_test::{assert_contains, assert_not_contains, BuildConfig, PackResult, TestRunner};

#[test]
#[ignore = "integration test"]
fn basic() {
    let build_config = BuildConfig::new("heroku/builder:22", "tests/fixtures/basic-app");

    TestRunner::default().build(&build_config, |context| {
        assert_contains!(context.pack_stdout, "Downloading Go");
        assert_contains!(context.pack_stdout, "Downloading modules");
        assert_contains!(context.pack_stdout, "Application binary written to");

        let command_output = context.run_shell_command("ls /layers/buildpacks_go/bin");
        assert_contains!(command_output.stdout, "main");

        context.rebuild(&build_config, |context| {
            assert_contains!(context.pack_stdout, "Using cached Go");
            assert_not_contains!(context.pack_stdout, "Downloading Go");
        });
    });
}

#[test]
#[ignore = "integration test"]
fn requested_version() {
    TestRunner::default().build(
        BuildConfig::new("heroku/builder:22", "tests/fixtures/basic-app")
            .env("GO_VERSION", "1.21.13"),
        |context| {
            assert_contains!(context.pack_stdout, "Resolved Go version: 1.21.13");
            assert_contains!(context.pack_stdout, "Installed Go 1.21.13");
        },
    );
}

#[test]
#[ignore = "integration test"]
fn vendored_dependencies() {
    TestRunner::default().build(
        BuildConfig::new("heroku/builder:22", "tests/fixtures/vendored-app"),
        |context| {
            assert_not_contains!(context.pack_stdout, "Downloading modules");
            assert_contains!(context.pack_stdout, "Application binary written to");
        },
    );
}

#[test]
#[ignore = "integration test"]
fn workspace() {
    TestRunner::default().build(
        BuildConfig::new("heroku/builder:22", "tests/fixtures/workspace-app"),
        |context| {
            assert_contains!(context.pack_stdout, "Application binary written to");
        },
    );
}

#[test]
#[ignore = "integration test"]
fn toolchain_older_than_declared_version() {
    TestRunner::default().build(
        BuildConfig::new("heroku/builder:22", "tests/fixtures/unsupported-go-version")
            .env("GO_VERSION", "1.21.13")
            .expected_pack_result(PackResult::Failure),
        |context| {
            assert_contains!(context.pack_stderr, "Unsupported Go version");
        },
    );
}
