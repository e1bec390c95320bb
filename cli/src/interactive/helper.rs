use std::borrow::Cow;
use std::collections::BTreeSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Context;
use rustyline_derive::Helper;

/// Rustyline helper, completing and hinting commands, registers and labels
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    /// Labels of the program, already prefixed by a colon
    labels: Vec<String>,
    app: PhantomData<T>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a String>) -> Self {
        RunHelper {
            labels: labels.into_iter().map(|label| format!(":{label}")).collect(),
            app: PhantomData,
        }
    }

    /// Values that make sense for a positional argument
    fn values_for(&self, argument: &str) -> Vec<String> {
        match argument {
            "register" => vec!["a".into(), "b".into(), "pc".into()],
            "address" | "target" | "value" => ["a", "b", "pc"]
                .into_iter()
                .map(String::from)
                .chain(self.labels.iter().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Find the candidates for the last word of `input`, along with the
    /// length of what was already typed
    fn suggest(&self, command: &Command, input: &[String]) -> (usize, BTreeSet<String>) {
        match input {
            [] => (0, BTreeSet::new()),

            [last] => {
                let subcommands = command.get_subcommands().flat_map(|cmd| {
                    std::iter::once(cmd.get_name().to_string())
                        .chain(cmd.get_visible_aliases().map(ToString::to_string))
                });

                let mut suggestions: BTreeSet<_> = subcommands.collect();
                if command.has_subcommands() {
                    suggestions.insert("help".to_string());
                }

                (
                    last.len(),
                    suggestions
                        .into_iter()
                        .filter(|candidate| candidate.starts_with(last.as_str()))
                        .collect(),
                )
            }

            [head, tail @ ..] => match command.find_subcommand(head) {
                Some(sub) if sub.has_subcommands() => self.suggest(sub, tail),
                Some(sub) => {
                    // Only positional arguments are completed
                    let Some(argument) = sub.get_positionals().nth(tail.len() - 1) else {
                        return (0, BTreeSet::new());
                    };
                    let last = tail.last().map_or("", String::as_str);
                    let candidates = self
                        .values_for(argument.get_id().as_str())
                        .into_iter()
                        .filter(|candidate| candidate.starts_with(last))
                        .collect();
                    (last.len(), candidates)
                }
                None => (0, BTreeSet::new()),
            },
        }
    }

    fn candidates(&self, line: &str) -> Option<(usize, BTreeSet<String>)> {
        let mut words = shell_words::split(line).ok()?;

        // A trailing space means the next word is being completed
        if line.ends_with([' ', '\t']) {
            words.push(String::new());
        }

        Some(self.suggest(&T::command(), &words))
    }
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(self
            .candidates(&line[..pos])
            .map_or((0, Vec::new()), |(offset, candidates)| {
                (pos - offset, candidates.into_iter().collect())
            }))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().dimmed();
        Cow::Owned(format!("{}{hint}{}", style.render(), style.render_reset()))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{}{prompt}{}", style.render(), style.render_reset()))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let (offset, candidates) = self.candidates(&line[..pos])?;

        // Only hint when there is no ambiguity
        if candidates.len() == 1 {
            candidates
                .into_iter()
                .next()
                .map(|candidate| candidate[offset..].to_string())
        } else {
            None
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        // Unbalanced quotes continue on the next line
        if shell_words::split(ctx.input()).is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
