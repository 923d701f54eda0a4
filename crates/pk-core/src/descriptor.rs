//! Package descriptor (`package.py`) reading and writing.
//!
//! Every package version carries a rez-style descriptor at its root:
//! top-level assignments (`name='...'`, `version='...'`, `authors=[...]`,
//! `requires=[...]`, `description="""..."""`) followed by a `commands()`
//! block of environment directives for the consuming runtime.
//!
//! The reader recognizes only literal assignments; it never executes or
//! syntactically parses the file as a language. Everything past the first
//! unrecognized line (in practice the `commands()` block) is carried
//! verbatim and written back untouched.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The descriptor filename inside a package version directory.
pub const DESCRIPTOR_FILE: &str = "package.py";

/// Errors that can occur when reading or writing descriptors.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("failed to read or write descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("descriptor is missing required field: {0}")]
    MissingField(&'static str),

    #[error("unterminated {0} literal in descriptor")]
    Unterminated(&'static str),

    /// The scoped substitution found no `version='...'` assignment to edit.
    #[error("no version='{version}' assignment found in {path}")]
    VersionNotFound { version: String, path: PathBuf },
}

/// In-memory form of a package descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Package name.
    pub name: String,

    /// Version string, always equal to the containing directory name.
    pub version: String,

    /// Build command invoked by the external build system.
    pub build_command: String,

    /// Package authors.
    pub authors: Vec<String>,

    /// Dependency specifiers, order preserved.
    pub requires: Vec<String>,

    /// Free-text description; may embed changelog notes.
    pub description: String,

    /// Verbatim remainder of the file: the `commands()` block and anything
    /// else the reader does not recognize. Opaque to this crate.
    pub commands: String,
}

impl Descriptor {
    /// Build the initial descriptor written by `create`.
    ///
    /// `bin_path` and `python_path` are the install-relative entries the
    /// consuming runtime appends to its search paths (normally `{root}/bin`
    /// and `{root}/python`).
    #[must_use]
    pub fn new(name: &str, version: &str, author: &str, bin_path: &str, python_path: &str) -> Self {
        let commands = format!(
            "def commands():\n\
             \timport os\n\
             \tglobal getenv, env\n\
             \tenv.PATH.append('{bin_path}')\n\
             \tenv.PYTHONPATH.append('{python_path}')\n"
        );

        Self {
            name: name.to_string(),
            version: version.to_string(),
            build_command: String::from("build"),
            authors: vec![author.to_string()],
            requires: vec![String::from("rezbuild>=1.0.0")],
            description: format!("{name} rez package"),
            commands,
        }
    }

    /// Read and parse a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is missing a required
    /// field.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse descriptor text.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or `version` is absent, or a list or
    /// string literal is left unterminated.
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let lines: Vec<&str> = text.lines().collect();

        let mut name = None;
        let mut version = None;
        let mut build_command = None;
        let mut authors = Vec::new();
        let mut requires = Vec::new();
        let mut description = None;
        let mut commands = String::new();

        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed.is_empty() {
                i += 1;
                continue;
            }

            let recognized = match split_assignment(trimmed) {
                Some(("name", rest)) => {
                    name = string_literal(rest);
                    name.is_some()
                }
                Some(("version", rest)) => {
                    version = string_literal(rest);
                    version.is_some()
                }
                Some(("build_command", rest)) => {
                    build_command = string_literal(rest);
                    build_command.is_some()
                }
                Some(("authors", rest)) if rest.starts_with('[') => {
                    let (items, next) = parse_list(&lines, i, rest, "authors")?;
                    authors = items;
                    i = next;
                    continue;
                }
                Some(("requires", rest)) if rest.starts_with('[') => {
                    let (items, next) = parse_list(&lines, i, rest, "requires")?;
                    requires = items;
                    i = next;
                    continue;
                }
                Some(("description", rest)) => {
                    if let Some(block) = rest.strip_prefix("\"\"\"") {
                        let (body, next) = parse_block_string(&lines, i, block)?;
                        description = Some(body);
                        i = next;
                        continue;
                    }
                    description = string_literal(rest);
                    description.is_some()
                }
                _ => false,
            };

            if recognized {
                i += 1;
                continue;
            }

            // First unrecognized line: keep the remainder verbatim.
            commands = lines[i..].join("\n");
            if text.ends_with('\n') {
                commands.push('\n');
            }
            break;
        }

        Ok(Self {
            name: name.ok_or(DescriptorError::MissingField("name"))?,
            version: version.ok_or(DescriptorError::MissingField("version"))?,
            build_command: build_command.unwrap_or_else(|| String::from("build")),
            authors,
            requires,
            description: description.unwrap_or_default(),
            commands,
        })
    }

    /// Render the descriptor to the fixed on-disk template.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("name='{}'\n", self.name));
        out.push_str(&format!("version='{}'\n", self.version));
        out.push_str(&format!("build_command='{}'\n", self.build_command));

        out.push('\n');
        let authors = self
            .authors
            .iter()
            .map(|a| format!("'{a}'"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("authors=[{authors}]\n"));

        out.push_str("\nrequires = [\n");
        for entry in &self.requires {
            out.push_str(&format!("\t\"{entry}\",\n"));
        }
        out.push_str("]\n");

        out.push('\n');
        if self.description.contains('\n') {
            out.push_str(&format!("description = \"\"\"\n{}\n\"\"\"\n", self.description));
        } else {
            out.push_str(&format!("description = \"{}\"\n", self.description));
        }

        if !self.commands.is_empty() {
            out.push('\n');
            out.push_str(&self.commands);
            if !self.commands.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }

    /// Render and write the descriptor to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is unwritable.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), DescriptorError> {
        fs::write(path, self.render())?;
        Ok(())
    }
}

/// Rewrite the `version='<old>'` assignment in a descriptor file to
/// `version='<new>'`.
///
/// The substitution is anchored to the assignment, never a global text
/// replace: `requires` entries that happen to contain the same digits
/// (e.g. `logger==0.0.1`) are left untouched.
///
/// # Errors
///
/// Returns [`DescriptorError::VersionNotFound`] if no such assignment
/// exists in the file.
pub fn replace_version(path: &Path, old: &str, new: &str) -> Result<(), DescriptorError> {
    let content = fs::read_to_string(path)?;

    let needle = format!("version='{old}'");
    if !content.contains(&needle) {
        return Err(DescriptorError::VersionNotFound {
            version: old.to_string(),
            path: path.to_path_buf(),
        });
    }

    let replacement = format!("version='{new}'");
    fs::write(path, content.replacen(&needle, &replacement, 1))?;
    Ok(())
}

/// Split `key = rest` where `key` is a bare identifier. Returns `None` for
/// anything else, including comparison operators and code.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=')?;
    if line.as_bytes().get(eq + 1) == Some(&b'=') {
        return None;
    }

    let key = line[..eq].trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some((key, line[eq + 1..].trim()))
}

/// Strip a matched pair of single or double quotes.
fn string_literal(rest: &str) -> Option<String> {
    let bytes = rest.as_bytes();
    if rest.len() >= 2 && (bytes[0] == b'\'' || bytes[0] == b'"') && bytes[rest.len() - 1] == bytes[0]
    {
        return Some(rest[1..rest.len() - 1].to_string());
    }
    None
}

/// Parse a `[...]` list that may span lines, starting at line `i` with
/// `after_eq` being the text after the `=`. Returns the quoted elements and
/// the index of the line after the list.
fn parse_list(
    lines: &[&str],
    start: usize,
    after_eq: &str,
    field: &'static str,
) -> Result<(Vec<String>, usize), DescriptorError> {
    let mut i = start;
    let mut buf = String::new();
    let mut rest = after_eq[1..].to_string();

    loop {
        if let Some(end) = rest.find(']') {
            buf.push_str(&rest[..end]);
            return Ok((quoted_items(&buf), i + 1));
        }

        buf.push_str(&rest);
        buf.push('\n');
        i += 1;
        match lines.get(i) {
            Some(line) => rest = (*line).to_string(),
            None => return Err(DescriptorError::Unterminated(field)),
        }
    }
}

/// Parse a `"""..."""` block, starting at line `i` with `after_quotes`
/// being the text following the opening quotes. Returns the body and the
/// index of the line after the closing quotes.
fn parse_block_string(
    lines: &[&str],
    start: usize,
    after_quotes: &str,
) -> Result<(String, usize), DescriptorError> {
    if let Some(end) = after_quotes.find("\"\"\"") {
        return Ok((after_quotes[..end].to_string(), start + 1));
    }

    let mut body = Vec::new();
    if !after_quotes.is_empty() {
        body.push(after_quotes.to_string());
    }

    let mut i = start + 1;
    loop {
        match lines.get(i) {
            Some(line) => {
                if let Some(end) = line.find("\"\"\"") {
                    if !line[..end].is_empty() {
                        body.push(line[..end].to_string());
                    }
                    return Ok((body.join("\n"), i + 1));
                }
                body.push((*line).to_string());
                i += 1;
            }
            None => return Err(DescriptorError::Unterminated("description")),
        }
    }
}

/// Extract every quoted element from list-interior text.
fn quoted_items(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            let quote = c;
            let mut item = String::new();
            for d in chars.by_ref() {
                if d == quote {
                    break;
                }
                item.push(d);
            }
            items.push(item);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "name='logger'\n\
        version='0.0.1'\n\
        build_command='build'\n\
        \n\
        authors=['saichaitanya']\n\
        \n\
        requires = [\n\
        \t\"rezbuild>=1.0.0\",\n\
        \t\"logger==0.0.1\",\n\
        ]\n\
        \n\
        description = \"\"\"\n\
        logger to provide for standard stream redirection\n\
        \"\"\"\n\
        \n\
        def commands():\n\
        \tglobal env\n\
        \tenv.PATH.append('{root}/bin')\n\
        \tenv.PYTHONPATH.append('{root}/python')\n";

    #[test]
    fn parse_sample_descriptor() {
        let d = Descriptor::parse(SAMPLE).unwrap();
        assert_eq!(d.name, "logger");
        assert_eq!(d.version, "0.0.1");
        assert_eq!(d.authors, vec!["saichaitanya"]);
        assert_eq!(d.requires, vec!["rezbuild>=1.0.0", "logger==0.0.1"]);
        assert_eq!(
            d.description,
            "logger to provide for standard stream redirection"
        );
        assert!(d.commands.starts_with("def commands():"));
        assert!(d.commands.contains("env.PYTHONPATH.append('{root}/python')"));
    }

    #[test]
    fn commands_block_is_never_interpreted() {
        let d = Descriptor::parse(SAMPLE).unwrap();
        // The block may contain assignment-shaped text without it leaking
        // into the recognized fields.
        let with_noise = format!("{SAMPLE}\tversion_hint='9.9.9'\n");
        let noisy = Descriptor::parse(&with_noise).unwrap();
        assert_eq!(noisy.version, d.version);
        assert!(noisy.commands.contains("version_hint='9.9.9'"));
    }

    #[test]
    fn parse_single_line_description() {
        let text = "name='nuke'\nversion='13.2v5'\ndescription = \"nuke rez package\"\n";
        let d = Descriptor::parse(text).unwrap();
        assert_eq!(d.description, "nuke rez package");
    }

    #[test]
    fn missing_version_is_an_error() {
        let err = Descriptor::parse("name='nuke'\n").unwrap_err();
        assert!(matches!(err, DescriptorError::MissingField("version")));
    }

    #[test]
    fn unterminated_requires_is_an_error() {
        let err = Descriptor::parse("name='a'\nversion='0.0.1'\nrequires = [\n\t\"x\",\n").unwrap_err();
        assert!(matches!(err, DescriptorError::Unterminated("requires")));
    }

    #[test]
    fn render_round_trips_fields() {
        let d = Descriptor::new("widget", "0.0.1", "operator", "{root}/bin", "{root}/python");
        let reparsed = Descriptor::parse(&d.render()).unwrap();
        assert_eq!(reparsed, d);
    }

    #[test]
    fn replace_version_is_scoped_to_the_assignment() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DESCRIPTOR_FILE);
        std::fs::write(&path, SAMPLE).unwrap();

        replace_version(&path, "0.0.1", "0.0.2").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("version='0.0.2'"));
        // Same digits inside requires stay untouched.
        assert!(content.contains("\"logger==0.0.1\""));
        assert!(!content.contains("logger==0.0.2"));
    }

    #[test]
    fn replace_version_fails_without_the_assignment() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DESCRIPTOR_FILE);
        std::fs::write(&path, "name='x'\n").unwrap();

        let err = replace_version(&path, "0.0.1", "0.0.2").unwrap_err();
        assert!(matches!(err, DescriptorError::VersionNotFound { .. }));
    }
}
