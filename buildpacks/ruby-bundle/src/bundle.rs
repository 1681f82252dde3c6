use buildpack_commons::command::{run_command_and_stream_output, StreamedCommandError};
use std::path::Path;
use std::process::Command;

/// Configures Bundler for a production install into `gems_dir` and installs the bundle.
///
/// Stops at the first command that fails.
pub(crate) fn install(
    app_dir: &Path,
    gems_dir: &Path,
    has_lockfile: bool,
) -> Result<(), StreamedCommandError> {
    for args in bundle_invocations(gems_dir, has_lockfile) {
        run_command_and_stream_output(Command::new("bundle").args(&args).current_dir(app_dir))?;
    }

    Ok(())
}

fn bundle_invocations(gems_dir: &Path, has_lockfile: bool) -> Vec<Vec<String>> {
    let gems_dir = gems_dir.to_string_lossy();

    let mut invocations = vec![
        vec!["config", "--local", "without", "development test"],
        vec!["config", "--local", "path", &*gems_dir],
    ];
    if has_lockfile {
        invocations.push(vec!["lock", "--add-platform", "x86_64-linux"]);
        invocations.push(vec!["lock", "--add-platform", "ruby"]);
    }
    invocations.extend([
        vec!["config", "--local", "deployment", "true"],
        vec!["config", "--local", "frozen", "true"],
        vec!["install"],
    ]);

    invocations
        .into_iter()
        .map(|args| args.into_iter().map(String::from).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocations_with_lockfile() {
        assert_eq!(
            bundle_invocations(Path::new("/layers/buildpacks_ruby-bundle/gems"), true),
            [
                vec!["config", "--local", "without", "development test"],
                vec!["config", "--local", "path", "/layers/buildpacks_ruby-bundle/gems"],
                vec!["lock", "--add-platform", "x86_64-linux"],
                vec!["lock", "--add-platform", "ruby"],
                vec!["config", "--local", "deployment", "true"],
                vec!["config", "--local", "frozen", "true"],
                vec!["install"],
            ]
        );
    }

    #[test]
    fn invocations_without_lockfile_skip_platform_locking() {
        let invocations = bundle_invocations(Path::new("/gems"), false);

        assert!(!invocations.iter().any(|args| args[0] == "lock"));
        assert_eq!(invocations.last().unwrap(), &["install"]);
    }
}
