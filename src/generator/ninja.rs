//! Ninja build-file syntax writer.
//!
//! Emits `variable`, `rule` and `build` statements with `$`-escaping and
//! 78-column line wrapping. Wrapping never splits inside an escape: a
//! break point is only taken when preceded by an even number of `$`.

use std::io::{self, Write};

/// Dependency-processing mode for a compile rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deps {
    /// GCC-style `-MMD` depfiles
    Gcc,
    /// MSVC `/showIncludes` parsing
    Msvc,
}

impl Deps {
    fn as_str(&self) -> &'static str {
        match self {
            Deps::Gcc => "gcc",
            Deps::Msvc => "msvc",
        }
    }
}

/// Options for a `rule` statement.
#[derive(Debug, Clone, Default)]
pub struct Rule<'a> {
    pub command: &'a str,
    pub description: Option<&'a str>,
    pub depfile: Option<&'a str>,
    pub deps: Option<Deps>,
}

/// A `build` statement, assembled by the caller and written atomically.
#[derive(Debug, Clone, Default)]
pub struct Build {
    pub outputs: Vec<String>,
    pub rule: String,
    pub inputs: Vec<String>,
    pub implicit: Vec<String>,
    pub order_only: Vec<String>,
    pub variables: Vec<(String, String)>,
}

impl Build {
    /// Shorthand for a single-output, single-input edge.
    pub fn new(output: impl Into<String>, rule: impl Into<String>) -> Build {
        Build {
            outputs: vec![output.into()],
            rule: rule.into(),
            ..Build::default()
        }
    }

    pub fn input(mut self, input: impl Into<String>) -> Build {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Build {
        self.inputs.extend(inputs.into_iter().map(|i| i.into()));
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Build {
        self.outputs.push(output.into());
        self
    }

    pub fn implicit(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Build {
        self.implicit.extend(deps.into_iter().map(|d| d.into()));
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Build {
        self.variables.push((key.into(), value.into()));
        self
    }
}

/// Streaming writer for a Ninja build file.
pub struct NinjaWriter<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> NinjaWriter<W> {
    /// Create a writer emitting to `out`.
    pub fn new(out: W) -> Self {
        NinjaWriter { out, width: 78 }
    }

    /// Consume the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn newline(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "# {}", text)
    }

    /// Write a `key = value` variable statement. Empty values are skipped.
    pub fn variable(&mut self, key: &str, value: &str) -> io::Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.line(&format!("{} = {}", key, value), 0)
    }

    fn indented_variable(&mut self, key: &str, value: &str) -> io::Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.line(&format!("{} = {}", key, value), 1)
    }

    /// Write a `rule` statement.
    pub fn rule(&mut self, name: &str, rule: &Rule<'_>) -> io::Result<()> {
        self.line(&format!("rule {}", name), 0)?;
        self.indented_variable("command", rule.command)?;
        if let Some(description) = rule.description {
            self.indented_variable("description", description)?;
        }
        if let Some(depfile) = rule.depfile {
            self.indented_variable("depfile", depfile)?;
        }
        if let Some(deps) = rule.deps {
            self.indented_variable("deps", deps.as_str())?;
        }
        Ok(())
    }

    /// Write a `build` statement, returning the declared outputs.
    pub fn build(&mut self, build: &Build) -> io::Result<Vec<String>> {
        let mut line = String::from("build ");
        line.push_str(
            &build
                .outputs
                .iter()
                .map(|o| escape_path(o))
                .collect::<Vec<_>>()
                .join(" "),
        );
        line.push_str(": ");
        line.push_str(&build.rule);

        for input in &build.inputs {
            line.push(' ');
            line.push_str(&escape_path(input));
        }
        if !build.implicit.is_empty() {
            line.push_str(" |");
            for dep in &build.implicit {
                line.push(' ');
                line.push_str(&escape_path(dep));
            }
        }
        if !build.order_only.is_empty() {
            line.push_str(" ||");
            for dep in &build.order_only {
                line.push(' ');
                line.push_str(&escape_path(dep));
            }
        }

        self.line(&line, 0)?;

        for (key, value) in &build.variables {
            self.indented_variable(key, value)?;
        }

        Ok(build.outputs.clone())
    }

    /// Write `text`, wrapping at the configured width with `$` continuations.
    fn line(&mut self, text: &str, indent: usize) -> io::Result<()> {
        let mut text = text.to_string();
        let mut leading = "  ".repeat(indent);

        while leading.len() + text.len() > self.width {
            // Width of the wrapped line, leaving room for the ` $`
            let available = match self.width.checked_sub(leading.len() + 2) {
                Some(available) => available,
                None => break,
            };

            // Find the rightmost unescaped space within the available width
            let mut space = rfind_space(&text, available);
            while let Some(at) = space {
                if dollars_before(&text, at) % 2 == 0 {
                    break;
                }
                space = rfind_space(&text, at);
            }

            if space.is_none() {
                // No usable break before the width; take the first one after
                let mut after = find_space(&text, available);
                while let Some(at) = after {
                    if dollars_before(&text, at) % 2 == 0 {
                        break;
                    }
                    after = find_space(&text, at + 1);
                }
                space = after;
            }

            let Some(at) = space else { break };

            writeln!(self.out, "{}{} $", leading, &text[..at])?;
            text = text[at + 1..].to_string();
            leading = "  ".repeat(indent + 2);
        }

        writeln!(self.out, "{}{}", leading, text)
    }
}

/// Escape a path for use in a build statement.
pub fn escape_path(path: &str) -> String {
    path.replace('$', "$$").replace(' ', "$ ").replace(':', "$:")
}

fn rfind_space(text: &str, before: usize) -> Option<usize> {
    text[..before.min(text.len())].rfind(' ')
}

fn find_space(text: &str, from: usize) -> Option<usize> {
    if from >= text.len() {
        return None;
    }
    text[from..].find(' ').map(|at| at + from)
}

fn dollars_before(text: &str, index: usize) -> usize {
    text[..index].chars().rev().take_while(|c| *c == '$').count()
}
