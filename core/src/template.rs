//! Command-line templates with a fixed set of `${NAME}` placeholders.

use std::{fmt, path::Path, str::FromStr};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder '${{{0}}}' at {}", .1+1)]
    UnknownPlaceholder(String, usize),

    #[error("Unclosed placeholder (found '${{' at {})", .0+1)]
    UnclosedBrace(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::IntoStaticStr)]
pub enum Placeholder {
    #[strum(serialize = "LANG_LOCATION")]
    LangLocation,
    #[strum(serialize = "FILE_LOCATION")]
    FileLocation,
    #[strum(serialize = "OUTPUT_LOCATION")]
    OutputLocation,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name: &'static str = self.into();
        write!(f, "${{{}}}", name)
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct Locations<'a> {
    pub lang: &'a Path,
    pub file: &'a Path,
    pub output: &'a Path,
}

impl Locations<'_> {
    fn get(&self, p: Placeholder) -> &Path {
        match p {
            Placeholder::LangLocation => self.lang,
            Placeholder::FileLocation => self.file,
            Placeholder::OutputLocation => self.output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Placeholder),
}

/// One argument of a command line, parsed once and rendered per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    segments: Vec<Segment>,
}

impl FromStr for ArgTemplate {
    type Err = TemplateError;

    fn from_str(fmt: &str) -> Result<Self, Self::Err> {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum State {
            Normal,
            Dollar,
            InsideBrace,
        }
        use State::*;

        let mut state = Normal;
        let mut pos_open_brace = 0;
        let mut segments = Vec::new();
        let mut literal = String::with_capacity(fmt.len());
        let mut var_name = String::with_capacity(32);

        for (i, c) in fmt.chars().enumerate() {
            match (c, state) {
                ('$', Normal) => {
                    state = Dollar;
                    literal.push(c);
                }
                ('{', Dollar) => {
                    state = InsideBrace;
                    pos_open_brace = i - 1;
                    var_name.clear();
                    literal.pop(); // remove '$'
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                }
                ('}', InsideBrace) => {
                    state = Normal;
                    let Ok(p) = var_name.parse::<Placeholder>() else {
                        return Err(TemplateError::UnknownPlaceholder(var_name, pos_open_brace));
                    };
                    segments.push(Segment::Var(p));
                }
                (_, InsideBrace) => {
                    var_name.push(c);
                }
                ('$', Dollar) => {
                    literal.push(c);
                }
                _ => {
                    state = Normal;
                    literal.push(c);
                }
            }
        }

        if state == InsideBrace {
            return Err(TemplateError::UnclosedBrace(pos_open_brace));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

impl ArgTemplate {
    pub fn render(&self, loc: &Locations) -> String {
        let mut res = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => res += s,
                Segment::Var(p) => res += loc.get(*p).to_string_lossy().as_ref(),
            }
        }
        res
    }

    pub fn uses(&self, p: Placeholder) -> bool {
        self.segments.contains(&Segment::Var(p))
    }
}

/// A whole command line (`argv`) template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<ArgTemplate>,
}

impl CommandTemplate {
    pub fn parse<S: AsRef<str>>(argv: &[S]) -> Result<Self, TemplateError> {
        let args = argv
            .iter()
            .map(|a| a.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { args })
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn render(&self, loc: &Locations) -> Vec<String> {
        self.args.iter().map(|a| a.render(loc)).collect()
    }

    pub fn uses(&self, p: Placeholder) -> bool {
        self.args.iter().any(|a| a.uses(p))
    }
}
