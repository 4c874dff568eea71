//! Parses the subset of the requirements file format that applies to downloads.
//!
//! <https://pip.pypa.io/en/stable/reference/requirements-file-format/>
//!
//! Supported:
//!  * PEP 508 requirements, and paths or URLs of distribution archives
//!  * `-r`/`--requirement`, resolved relative to the including file
//!  * `-f`/`--find-links`, `-i`/`--index-url`, `--extra-index-url`, `--no-index`
//!  * `--only-binary`, `--no-binary`, `--prefer-binary`, `--pre`
//!  * `#` comments and `\` line continuations
//!
//! Per-requirement `--hash` options are accepted and ignored. Any other option is an error.

use std::path::{Path, PathBuf};

use tracing::debug;
use unscanny::Scanner;
use url::Url;

use wheelhouse_client::{FlatIndexLocation, parse_index_url};
use wheelhouse_configuration::{PackageNameSpecifier, parse_specifier_list};
use wheelhouse_resolver::DownloadRequest;

use crate::requirements::{RequirementError, parse_request};

/// A single logical line of a requirements file.
#[derive(Debug, PartialEq, Eq)]
enum RequirementsTxtStatement {
    /// `-r` inclusion filename
    Requirements(String),
    FindLinks(String),
    IndexUrl(String),
    ExtraIndexUrl(String),
    NoIndex,
    OnlyBinary(String),
    NoBinary(String),
    PreferBinary,
    Pre,
    /// A PEP 508 requirement, or an archive path or URL.
    Requirement(String),
}

/// The parsed contents of a requirements file, including everything it includes.
#[derive(Debug, Default)]
pub(crate) struct RequirementsTxt {
    pub(crate) requirements: Vec<DownloadRequest>,
    pub(crate) index_url: Option<Url>,
    pub(crate) extra_index_urls: Vec<Url>,
    pub(crate) find_links: Vec<FlatIndexLocation>,
    pub(crate) no_index: bool,
    pub(crate) only_binary: Vec<PackageNameSpecifier>,
    pub(crate) no_binary: Vec<PackageNameSpecifier>,
    pub(crate) prefer_binary: bool,
    pub(crate) pre: bool,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RequirementsTxtError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse `{}` at line {line}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        #[source]
        kind: ParseErrorKind,
    },

    #[error("`{}` includes itself", _0.display())]
    Cycle(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ParseErrorKind {
    #[error("Unsupported option `{0}`")]
    UnsupportedOption(String),

    #[error("Option `{0}` requires a value")]
    MissingValue(String),

    #[error("Option `{0}` does not take a value")]
    UnexpectedValue(String),

    #[error("Invalid package name in `{0}`: {1}")]
    Specifier(String, String),

    #[error(transparent)]
    Location(#[from] wheelhouse_client::ErrorKind),

    #[error(transparent)]
    Requirement(#[from] RequirementError),
}

impl RequirementsTxt {
    /// Parse a requirements file, along with any files it includes.
    pub(crate) fn parse(path: &Path) -> Result<Self, RequirementsTxtError> {
        let mut data = Self::default();
        let mut stack = Vec::new();
        data.parse_file(path, &mut stack)?;
        Ok(data)
    }

    fn parse_file(
        &mut self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<(), RequirementsTxtError> {
        let path = std::path::absolute(path)?;
        if stack.contains(&path) {
            return Err(RequirementsTxtError::Cycle(path));
        }

        let content = fs_err::read_to_string(&path)?;
        let working_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        debug!("Reading requirements from: `{}`", path.display());

        stack.push(path.clone());
        for (line, statement) in parse_statements(&content) {
            let error = |kind: ParseErrorKind| RequirementsTxtError::Parse {
                file: path.clone(),
                line,
                kind,
            };
            match statement.map_err(error)? {
                RequirementsTxtStatement::Requirements(filename) => {
                    self.parse_file(&working_dir.join(filename), stack)?;
                }
                RequirementsTxtStatement::FindLinks(location) => {
                    let location = FlatIndexLocation::parse(&location, &working_dir)
                        .map_err(|err| error(err.into()))?;
                    self.find_links.push(location);
                }
                RequirementsTxtStatement::IndexUrl(url) => {
                    self.index_url = Some(parse_index_url(&url).map_err(|err| error(err.into()))?);
                }
                RequirementsTxtStatement::ExtraIndexUrl(url) => {
                    let url = parse_index_url(&url).map_err(|err| error(err.into()))?;
                    self.extra_index_urls.push(url);
                }
                RequirementsTxtStatement::NoIndex => self.no_index = true,
                RequirementsTxtStatement::OnlyBinary(value) => {
                    let specifiers = parse_specifier_list(&value)
                        .map_err(|err| error(ParseErrorKind::Specifier(value, err)))?;
                    self.only_binary.extend(specifiers);
                }
                RequirementsTxtStatement::NoBinary(value) => {
                    let specifiers = parse_specifier_list(&value)
                        .map_err(|err| error(ParseErrorKind::Specifier(value, err)))?;
                    self.no_binary.extend(specifiers);
                }
                RequirementsTxtStatement::PreferBinary => self.prefer_binary = true,
                RequirementsTxtStatement::Pre => self.pre = true,
                RequirementsTxtStatement::Requirement(given) => {
                    let request =
                        parse_request(&given, &working_dir).map_err(|err| error(err.into()))?;
                    self.requirements.push(request);
                }
            }
        }
        stack.pop();

        Ok(())
    }
}

/// Split the file into statements, each with the line number it starts on.
fn parse_statements(
    content: &str,
) -> Vec<(usize, Result<RequirementsTxtStatement, ParseErrorKind>)> {
    let mut s = Scanner::new(content);
    let mut statements = Vec::new();
    let mut line = 1;

    while !s.done() {
        let start = s.cursor();
        let logical = eat_logical_line(&mut s);
        let statement = parse_statement(strip_comment(&logical)).transpose();
        if let Some(statement) = statement {
            statements.push((line, statement));
        }
        line += s.from(start).matches('\n').count();
        // A trailing `\r` without `\n` still ends a line.
        if s.from(start).ends_with('\r') {
            line += 1;
        }
    }

    statements
}

/// Eat a line, joining lines that end with a backslash, and consume the line terminator.
fn eat_logical_line(s: &mut Scanner) -> String {
    let mut logical = String::new();
    loop {
        logical.push_str(s.eat_until(['\\', '\n', '\r']));
        // With the order we support `\n`, `\r`, `\r\n` without accidentally eating a `\n\r`
        if s.eat_if("\\\r\n") || s.eat_if("\\\n") || s.eat_if("\\\r") {
            continue;
        }
        if s.eat_if('\\') {
            // A backslash that doesn't end the line (e.g., in a Windows path).
            logical.push('\\');
            continue;
        }
        if !s.eat_if("\r\n") {
            s.eat_if(['\n', '\r']);
        }
        return logical;
    }
}

/// Strip a `#` comment, which starts at the beginning of the line or after whitespace.
fn strip_comment(line: &str) -> &str {
    let mut after_whitespace = true;
    for (index, c) in line.char_indices() {
        if c == '#' && after_whitespace {
            return &line[..index];
        }
        after_whitespace = c.is_whitespace();
    }
    line
}

fn parse_statement(line: &str) -> Result<Option<RequirementsTxtStatement>, ParseErrorKind> {
    let mut s = Scanner::new(line.trim());
    if s.done() {
        return Ok(None);
    }

    if !s.at('-') {
        return Ok(Some(RequirementsTxtStatement::Requirement(
            strip_hashes(s.after()).to_string(),
        )));
    }

    let option = s.eat_while(|c: char| c == '-' || c == '_' || c.is_ascii_alphanumeric());
    // The value follows an `=` or whitespace.
    if !s.eat_if('=') {
        s.eat_whitespace();
    }
    let value = s.after().trim();

    let with_value = |statement: fn(String) -> RequirementsTxtStatement| {
        if value.is_empty() {
            Err(ParseErrorKind::MissingValue(option.to_string()))
        } else {
            Ok(Some(statement(value.to_string())))
        }
    };
    let flag = |statement: RequirementsTxtStatement| {
        if value.is_empty() {
            Ok(Some(statement))
        } else {
            Err(ParseErrorKind::UnexpectedValue(option.to_string()))
        }
    };

    match option {
        "-r" | "--requirement" => with_value(RequirementsTxtStatement::Requirements),
        "-f" | "--find-links" => with_value(RequirementsTxtStatement::FindLinks),
        "-i" | "--index-url" => with_value(RequirementsTxtStatement::IndexUrl),
        "--extra-index-url" => with_value(RequirementsTxtStatement::ExtraIndexUrl),
        "--only-binary" => with_value(RequirementsTxtStatement::OnlyBinary),
        "--no-binary" => with_value(RequirementsTxtStatement::NoBinary),
        "--no-index" => flag(RequirementsTxtStatement::NoIndex),
        "--prefer-binary" => flag(RequirementsTxtStatement::PreferBinary),
        "--pre" => flag(RequirementsTxtStatement::Pre),
        _ => Err(ParseErrorKind::UnsupportedOption(option.to_string())),
    }
}

/// Drop trailing `--hash` options from a requirement.
fn strip_hashes(requirement: &str) -> &str {
    match requirement.find("--hash") {
        Some(index) => {
            debug!("Ignoring hashes for: `{}`", requirement[..index].trim());
            requirement[..index].trim_end()
        }
        None => requirement,
    }
}
