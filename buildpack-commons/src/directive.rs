//! Extraction of raw version text from manifests and lock files.
//!
//! Two manifest styles are supported:
//!
//! - Block style, where a header line is followed by the value on its own line. Bundler lock
//!   files use this for `RUBY VERSION` and `BUNDLED WITH`. See [`line_after`].
//! - Single-line directives, where a keyword is followed by a version literal on the same line,
//!   like `go 1.22` in `go.mod`. See [`find_directive`].
//!
//! In both styles a missing value is `None` and not an error. Directive syntax varies across
//! toolchain versions, so a directive with a malformed literal is treated as missing.

use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// Returns the line following the first line whose trimmed content equals `token`.
///
/// Returns `None` if the token never appears or is on the last line.
///
/// # Examples
/// ```
/// use buildpack_commons::directive::line_after;
///
/// let lockfile = "GEM\n  specs:\n\nRUBY VERSION\n   ruby 3.4.1p0\n\nBUNDLED WITH\n   2.6.2\n";
///
/// assert_eq!(line_after(lockfile, "BUNDLED WITH"), Some("   2.6.2"));
/// assert_eq!(line_after(lockfile, "PLATFORMS"), None);
/// ```
#[must_use]
pub fn line_after<'a>(contents: &'a str, token: &str) -> Option<&'a str> {
    let mut lines = contents.lines();

    lines
        .by_ref()
        .find(|line| line.trim() == token)
        .and_then(|_| lines.next())
}

/// Same as [`line_after`], but streams the file at the given path instead of reading it into
/// memory first.
pub fn read_line_after(path: impl AsRef<Path>, token: &str) -> Result<Option<String>, io::Error> {
    let mut lines = BufReader::new(File::open(path.as_ref())?).lines();

    while let Some(line) = lines.next().transpose()? {
        if line.trim() == token {
            return lines.next().transpose();
        }
    }

    Ok(None)
}

/// Returns the version literal of the first `<keyword> <version>` directive line.
///
/// The literal has to match `\d+(\.\d+){0,2}`, optionally followed by an `rcN` or `betaN`
/// pre-release suffix. Leading and trailing whitespace around the directive is ignored. If
/// several lines match, the first one wins.
///
/// # Examples
/// ```
/// use buildpack_commons::directive::find_directive;
///
/// let go_mod = "module example.com/app\n\ngo 1.22.1\n\ntoolchain go1.22.4\n";
///
/// assert_eq!(find_directive(go_mod, "go"), Some("1.22.1"));
/// assert_eq!(find_directive(go_mod, "toolchain"), None);
/// ```
#[must_use]
pub fn find_directive<'a>(contents: &'a str, keyword: &str) -> Option<&'a str> {
    contents.lines().find_map(|line| {
        line.trim()
            .strip_prefix(keyword)
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .map(str::trim)
            .filter(|literal| directive_literal_regex().is_match(literal))
    })
}

fn directive_literal_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();

    REGEX.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+){0,2}((rc|beta)\d+)?$")
            .expect("directive literal regex should be valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::fs;
    use tempfile::tempdir;

    const GEMFILE_LOCK: &str = indoc! {"
        GEM
          remote: https://rubygems.org/
          specs:
            rack (3.1.8)

        PLATFORMS
          ruby

        RUBY VERSION
           ruby 3.4.1p0

        BUNDLED WITH
           2.6.2
    "};

    #[test]
    fn line_after_returns_the_following_line_verbatim() {
        assert_eq!(line_after(GEMFILE_LOCK, "RUBY VERSION"), Some("   ruby 3.4.1p0"));
        assert_eq!(line_after(GEMFILE_LOCK, "BUNDLED WITH"), Some("   2.6.2"));
    }

    #[test]
    fn line_after_requires_an_exact_token_match() {
        assert_eq!(line_after(GEMFILE_LOCK, "RUBY"), None);
        assert_eq!(line_after(GEMFILE_LOCK, "ruby 3.4.1p0"), Some(""));
    }

    #[test]
    fn line_after_token_on_last_line_is_absent() {
        assert_eq!(line_after("GEM\nBUNDLED WITH", "BUNDLED WITH"), None);
        assert_eq!(line_after("", "BUNDLED WITH"), None);
    }

    #[test]
    fn read_line_after_streams_files() {
        let temp_dir = tempdir().unwrap();
        let lockfile = temp_dir.path().join("Gemfile.lock");
        fs::write(&lockfile, GEMFILE_LOCK).unwrap();

        assert_eq!(
            read_line_after(&lockfile, "BUNDLED WITH").unwrap(),
            Some(String::from("   2.6.2"))
        );
        assert_eq!(read_line_after(&lockfile, "DEPENDENCIES").unwrap(), None);
        assert!(read_line_after(temp_dir.path().join("missing"), "GEM").is_err());
    }

    #[test]
    fn find_directive_accepts_partial_versions() {
        assert_eq!(find_directive("module dir\n\ngo 1\n", "go"), Some("1"));
        assert_eq!(find_directive("module dir\n\ngo 1.13\n", "go"), Some("1.13"));
        assert_eq!(find_directive("module dir\n\ngo 1.13.1\n", "go"), Some("1.13.1"));
        assert_eq!(find_directive("go 1.21rc2\n", "go"), Some("1.21rc2"));
        assert_eq!(find_directive("go 1.22beta1\n", "go"), Some("1.22beta1"));
    }

    #[test]
    fn find_directive_ignores_surrounding_whitespace() {
        assert_eq!(find_directive("\n   go    1.13   \n", "go"), Some("1.13"));
        assert_eq!(find_directive("\n  go   1.13.1  \n", "go"), Some("1.13.1"));
        assert_eq!(find_directive("\tgo\t1.13.1\n", "go"), Some("1.13.1"));
    }

    #[test]
    fn find_directive_first_occurrence_wins() {
        let go_mod = indoc! {"
            module dir

            go 1.13.1
            go 1.12.1

            require (
                golang.org/x/textgo 0.3.0 // indirect
            )
        "};

        assert_eq!(find_directive(go_mod, "go"), Some("1.13.1"));
    }

    #[test]
    fn find_directive_treats_malformed_literals_as_absent() {
        for go_mod in [
            "go 1.13.\n",
            "go 1.\n",
            "go .13.1\n",
            "go .13.\n",
            "go .13\n",
            "go .\n",
            "go \n",
            "go\n",
            "go 1.1.1.1\n",
            "go1.13.1\n",
            "1.13\n",
            "go 1.13rc\n",
        ] {
            assert_eq!(find_directive(go_mod, "go"), None, "{go_mod:?}");
        }
    }

    #[test]
    fn find_directive_does_not_match_other_keywords() {
        let go_mod = indoc! {"
            module dir

            require (
                golang.org/x/textgo 0.3.0 // indirect
            )
        "};

        assert_eq!(find_directive(go_mod, "go"), None);
    }
}
