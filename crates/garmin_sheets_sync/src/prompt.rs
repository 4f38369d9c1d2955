//! Interactive questions: free text, yes/no and pick-one-of-many.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;

#[async_trait]
pub trait Prompter: Send {
    /// Ask for a line of text; an empty answer takes `default` when given.
    async fn input(&mut self, message: &str, default: Option<&str>) -> SyncResult<String>;

    async fn confirm(&mut self, message: &str, default: bool) -> SyncResult<bool>;

    /// Returns the index of the chosen option.
    async fn select(&mut self, message: &str, options: &[String], default: usize)
    -> SyncResult<usize>;
}

/// Reads answers from stdin. Reads happen on the blocking pool so Ctrl-C
/// stays responsive while waiting.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    async fn ask(&self, question: String) -> SyncResult<Option<String>> {
        tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
            let mut out = std::io::stdout().lock();
            write!(out, "{question}")?;
            out.flush()?;
            drop(out);

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim().to_string()))
        })
        .await
        .map_err(|e| SyncError::Prompt(e.to_string()))?
        .map_err(SyncError::from)
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn input(&mut self, message: &str, default: Option<&str>) -> SyncResult<String> {
        let question = match default {
            Some(d) => format!("{message} [{d}]: "),
            None => format!("{message}: "),
        };
        loop {
            let answer = self.ask(question.clone()).await?;
            match (answer, default) {
                (Some(a), _) if !a.is_empty() => return Ok(a),
                (_, Some(d)) => return Ok(d.to_string()),
                (None, None) => {
                    return Err(SyncError::Prompt(format!("no answer for {message:?}")));
                }
                (Some(_), None) => continue,
            }
        }
    }

    async fn confirm(&mut self, message: &str, default: bool) -> SyncResult<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.ask(format!("{message} {hint}: ")).await? else {
                tracing::warn!("no terminal input; answering {:?} with {}", message, default);
                return Ok(default);
            };
            match parse_yes_no(&answer) {
                Some(yes) => return Ok(yes),
                None if answer.is_empty() => return Ok(default),
                None => println!("Please answer y or n."),
            }
        }
    }

    async fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> SyncResult<usize> {
        if options.is_empty() {
            return Err(SyncError::Prompt(format!("nothing to choose for {message:?}")));
        }
        let default = default.min(options.len() - 1);
        println!("{message}");
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {option}", i + 1);
        }
        loop {
            let answer = self
                .input("Choose a number", Some(&(default + 1).to_string()))
                .await?;
            match parse_choice(&answer, options) {
                Some(i) => return Ok(i),
                None => println!("Please enter a number between 1 and {}.", options.len()),
            }
        }
    }
}

pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts a 1-based number or an option's exact text (case-insensitive).
pub fn parse_choice(answer: &str, options: &[String]) -> Option<usize> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<usize>() {
        return (1..=options.len()).contains(&n).then(|| n - 1);
    }
    options.iter().position(|o| o.eq_ignore_ascii_case(answer))
}

/// Answers every `confirm` with yes and forwards everything else.
pub struct AssumeYes<'a> {
    inner: &'a mut dyn Prompter,
}

impl<'a> AssumeYes<'a> {
    pub fn new(inner: &'a mut dyn Prompter) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Prompter for AssumeYes<'_> {
    async fn input(&mut self, message: &str, default: Option<&str>) -> SyncResult<String> {
        self.inner.input(message, default).await
    }

    async fn confirm(&mut self, message: &str, _default: bool) -> SyncResult<bool> {
        tracing::info!("{message} (assumed yes)");
        Ok(true)
    }

    async fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> SyncResult<usize> {
        self.inner.select(message, options, default).await
    }
}

/// Pre-recorded answers, consumed in order. Running out is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Every question asked, in order.
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> SyncResult<String> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| SyncError::Prompt(format!("no scripted answer for {message:?}")))
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&mut self, message: &str, default: Option<&str>) -> SyncResult<String> {
        let answer = self.next(message)?;
        match default {
            Some(d) if answer.is_empty() => Ok(d.to_string()),
            _ => Ok(answer),
        }
    }

    async fn confirm(&mut self, message: &str, default: bool) -> SyncResult<bool> {
        let answer = self.next(message)?;
        Ok(parse_yes_no(&answer).unwrap_or(default))
    }

    async fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> SyncResult<usize> {
        let answer = self.next(message)?;
        if answer.is_empty() {
            return Ok(default);
        }
        parse_choice(&answer, options)
            .ok_or_else(|| SyncError::Prompt(format!("{answer:?} is not one of {options:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_parsing() {
        assert_eq!(parse_yes_no("Y"), Some(true));
        assert_eq!(parse_yes_no(" no "), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
    }

    #[test]
    fn choice_by_number_or_name() {
        let options = vec!["USER1".to_string(), "USER2".to_string()];
        assert_eq!(parse_choice("2", &options), Some(1));
        assert_eq!(parse_choice("user1", &options), Some(0));
        assert_eq!(parse_choice("0", &options), None);
        assert_eq!(parse_choice("3", &options), None);
    }

    #[tokio::test]
    async fn scripted_answers_in_order() {
        let mut p = ScriptedPrompter::new(["", "yes", "csv"]);
        assert_eq!(p.input("Start date", Some("2025-01-01")).await.expect("input"), "2025-01-01");
        assert!(p.confirm("Overwrite?", false).await.expect("confirm"));
        let options = vec!["sheets".to_string(), "csv".to_string()];
        assert_eq!(p.select("Output", &options, 0).await.expect("select"), 1);
        assert_eq!(p.asked, vec!["Start date", "Overwrite?", "Output"]);
        assert!(p.confirm("again?", false).await.is_err());
    }

    #[tokio::test]
    async fn assume_yes_skips_confirm_only() {
        let mut inner = ScriptedPrompter::new(["typed"]);
        let mut p = AssumeYes::new(&mut inner);
        assert!(p.confirm("Overwrite?", false).await.expect("confirm"));
        assert_eq!(p.input("Name", None).await.expect("input"), "typed");
        drop(p);
        assert_eq!(inner.asked, vec!["Name"]);
    }
}
