//! Interactive REPL (Read-Eval-Print-Loop) for SmallQuery.
//!
//! Each line is one query: it is resolved, submitted with the maximum row
//! limit and rendered as a table before the next line is read.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error};

use smallquery_client::Client;
use smallquery_common::MAX_ROWS;

use crate::commands;
use crate::config::CliConfig;

/// The REPL prompt shown when waiting for input.
const PROMPT: &str = "> ";

/// Printed when the REPL exits.
const GOODBYE: &str = "Goodbye!";

/// SQL keywords offered for completion.
const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "BY", "ORDER", "HAVING", "LIMIT", "OFFSET", "AS", "AND",
    "OR", "NOT", "NULL", "IS", "IN", "LIKE", "BETWEEN", "DISTINCT", "JOIN", "LEFT", "INNER", "ON",
    "CASE", "WHEN", "THEN", "ELSE", "END", "COUNT", "SUM", "AVG", "MIN", "MAX", "ASC", "DESC",
];

/// REPL helper for rustyline.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(complete_keyword(line, pos))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// Completes the keyword being typed at `pos`.
fn complete_keyword(line: &str, pos: usize) -> (usize, Vec<Pair>) {
    let start = line[..pos]
        .rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
        .map(|i| i + 1)
        .unwrap_or(0);

    let word = line[start..pos].to_uppercase();
    if word.is_empty() {
        return (start, Vec::new());
    }

    let matches = KEYWORDS
        .iter()
        .filter(|kw| kw.starts_with(&word))
        .map(|kw| Pair {
            display: kw.to_string(),
            replacement: kw.to_string(),
        })
        .collect();

    (start, matches)
}

/// Where the REPL reads its lines from.
trait LineSource {
    /// Reads one line, showing `prompt`.
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String>;

    /// Records a submitted line in history.
    fn remember(&mut self, line: &str);
}

impl LineSource for Editor<ReplHelper, DefaultHistory> {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String> {
        self.readline(prompt)
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.add_history_entry(line) {
            debug!("Failed to record history: {}", e);
        }
    }
}

/// Reads until a non-blank line arrives and returns it trimmed.
///
/// Ctrl-C drops the current line and prompts again. End of input (Ctrl-D)
/// or a read failure returns `None`.
fn next_query(source: &mut impl LineSource) -> Option<String> {
    loop {
        match source.read_line(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                source.remember(line);
                return Some(line.to_string());
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return None,
            Err(e) => {
                error!("Readline error: {}", e);
                return None;
            }
        }
    }
}

/// Submits every line from `source` as a query until input ends.
///
/// Returns the number of queries submitted.
async fn drive(client: &Client, source: &mut impl LineSource) -> usize {
    let mut submitted = 0;
    while let Some(line) = next_query(source) {
        commands::run_query(client, &line, MAX_ROWS as i64, None).await;
        submitted += 1;
    }
    submitted
}

/// Interactive REPL for SmallQuery.
pub struct Repl {
    /// The SmallQuery client.
    client: Client,
    /// The rustyline editor.
    editor: Editor<ReplHelper, DefaultHistory>,
    /// History file path.
    history_file: Option<PathBuf>,
}

impl Repl {
    /// Creates a new REPL instance.
    pub fn new(config: &CliConfig, client: Client) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(config.history_size)?
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        // Try to load history
        let history_file = config.history_path();
        if let Some(ref path) = history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!("Failed to load history: {}", e);
                }
            }
        }

        Ok(Self {
            client,
            editor,
            history_file,
        })
    }

    /// Runs the main REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        let submitted = drive(&self.client, &mut self.editor).await;
        debug!("REPL submitted {} queries", submitted);

        self.save_history();

        println!("{}", GOODBYE);
        Ok(())
    }

    /// Saves command history.
    fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    debug!("Failed to create history directory: {}", e);
                    return;
                }
            }
            if let Err(e) = self.editor.save_history(path) {
                debug!("Failed to save history: {}", e);
            }
        }
    }
}
