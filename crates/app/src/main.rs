use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use drill_core::model::{Category, ContentCatalog, ExerciseId, LearnerId, ScoreSlot, Tense, UnitId};
use drill_core::UnlockEngine;
use services::{
    Advance, AppConfig, AppServices, Answer, ExamSession, Feedback, ProfileManager, QuizSession,
    QuizSpec, SessionSnapshot,
};
use storage::DEFAULT_PROFILES_KEY;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://drill.sqlite3?mode=rwc";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    MissingCommand,
    UnknownCommand(String),
    MissingOperand { command: &'static str, operand: &'static str },
    InvalidOperand { operand: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingOperand { command, operand } => {
                write!(f, "{command} requires <{operand}>")
            }
            ArgsError::InvalidOperand { operand, raw } => write!(f, "invalid {operand}: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  drill [--db <sqlite_url>] [--catalog <path>] [--key <storage_key>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  profiles                          list learners, most recent first");
    eprintln!("  create <nickname>                 create a learner and make it active");
    eprintln!("  select <learner-id>               switch the active learner");
    eprintln!("  progress [<unit> <category>]      unit overview, or one category's slots");
    eprintln!("  quiz <unit> <category> <slot>     e.g. quiz unidad_1 verbos easy10");
    eprintln!("  grammar <unit> <exercise>         drill one grammar exercise");
    eprintln!("  exam <unit>                       timed exam over a unit");
    eprintln!("  verbs <unit> <presente|preterito> conjugation practice");
    eprintln!("  dev unlock-all | dev fill-progress");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --catalog data/catalog.json");
    eprintln!("  --key {DEFAULT_PROFILES_KEY}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRILL_DB_URL, DRILL_CATALOG, DRILL_STORAGE_KEY, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Profiles,
    Create { nickname: String },
    Select { learner: LearnerId },
    Progress { detail: Option<(UnitId, Category)> },
    Quiz(QuizSpec),
    Exam { unit: UnitId },
    Verbs { unit: UnitId, tense: Tense },
    UnlockAll,
    FillProgress,
}

impl Command {
    fn parse(words: &[String]) -> Result<Self, ArgsError> {
        let (first, rest) = words.split_first().ok_or(ArgsError::MissingCommand)?;
        let operand = |idx: usize, command: &'static str, operand: &'static str| {
            rest.get(idx)
                .map(String::as_str)
                .ok_or(ArgsError::MissingOperand { command, operand })
        };
        match first.as_str() {
            "profiles" => Ok(Self::Profiles),
            "create" => {
                if rest.is_empty() {
                    return Err(ArgsError::MissingOperand {
                        command: "create",
                        operand: "nickname",
                    });
                }
                Ok(Self::Create {
                    nickname: rest.join(" "),
                })
            }
            "select" => {
                let raw = operand(0, "select", "learner-id")?;
                let learner = raw.parse().map_err(|_| invalid("learner id", raw))?;
                Ok(Self::Select { learner })
            }
            "progress" => {
                let detail = match rest {
                    [] => None,
                    [unit, category, ..] => Some((parse_unit(unit)?, parse_category(category)?)),
                    [_] => {
                        return Err(ArgsError::MissingOperand {
                            command: "progress",
                            operand: "category",
                        });
                    }
                };
                Ok(Self::Progress { detail })
            }
            "quiz" => {
                let unit = parse_unit(operand(0, "quiz", "unit")?)?;
                let category = parse_category(operand(1, "quiz", "category")?)?;
                let raw = operand(2, "quiz", "slot")?;
                let slot: ScoreSlot = raw.parse().map_err(|_| invalid("slot", raw))?;
                Ok(Self::Quiz(QuizSpec::vocabulary(unit, category, slot)))
            }
            "grammar" => {
                let unit = parse_unit(operand(0, "grammar", "unit")?)?;
                let raw = operand(1, "grammar", "exercise")?;
                let exercise: ExerciseId = raw.parse().map_err(|_| invalid("exercise", raw))?;
                Ok(Self::Quiz(QuizSpec::grammar(unit, exercise)))
            }
            "exam" => Ok(Self::Exam {
                unit: parse_unit(operand(0, "exam", "unit")?)?,
            }),
            "verbs" => {
                let unit = parse_unit(operand(0, "verbs", "unit")?)?;
                let tense = match operand(1, "verbs", "tense")? {
                    "presente" => Tense::Presente,
                    "preterito" | "pretérito" => Tense::Preterito,
                    other => return Err(invalid("tense", other)),
                };
                Ok(Self::Verbs { unit, tense })
            }
            "dev" => match operand(0, "dev", "tool")? {
                "unlock-all" => Ok(Self::UnlockAll),
                "fill-progress" => Ok(Self::FillProgress),
                other => Err(invalid("dev tool", other)),
            },
            other => Err(ArgsError::UnknownCommand(other.to_owned())),
        }
    }
}

fn invalid(operand: &'static str, raw: &str) -> ArgsError {
    ArgsError::InvalidOperand {
        operand,
        raw: raw.to_owned(),
    }
}

fn parse_unit(raw: &str) -> Result<UnitId, ArgsError> {
    raw.parse().map_err(|_| invalid("unit", raw))
}

fn parse_category(raw: &str) -> Result<Category, ArgsError> {
    raw.parse().map_err(|_| invalid("category", raw))
}

struct Args {
    db_url: String,
    catalog_path: String,
    storage_key: String,
    command: Command,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("DRILL_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut catalog_path =
            std::env::var("DRILL_CATALOG").unwrap_or_else(|_| "data/catalog.json".into());
        let mut storage_key =
            std::env::var("DRILL_STORAGE_KEY").unwrap_or_else(|_| DEFAULT_PROFILES_KEY.into());
        let mut words = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => catalog_path = require_value(args, "--catalog")?,
                "--key" => storage_key = require_value(args, "--key")?,
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => words.push(arg),
            }
        }

        Ok(Some(Self {
            db_url,
            catalog_path,
            storage_key,
            command: Command::parse(&words)?,
        }))
    }
}

/// Turns a bare path or `sqlite:` path into an absolute `sqlite://` URL that
/// creates the file on first use.
fn normalize_sqlite_url(raw: String) -> String {
    let raw = raw.trim();
    if raw.starts_with("sqlite::memory:") || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }
    let path = Path::new(raw.strip_prefix("sqlite:").unwrap_or(raw));
    let absolute = std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf());
    format!("sqlite://{}?mode=rwc", absolute.display())
}

//
// ─── INTERACTION ───────────────────────────────────────────────────────────────
//

/// The shared surface of quizzes and exams, as far as the terminal cares.
trait Drill {
    fn snapshot(&self, manager: &ProfileManager) -> SessionSnapshot;
    fn submit(&mut self, answer: Answer, manager: &ProfileManager) -> Option<Feedback>;
    fn advance(&mut self, manager: &ProfileManager) -> Option<Advance>;
    fn resume(&mut self, manager: &ProfileManager) -> bool;
    fn abort(&mut self) -> bool;
}

impl Drill for QuizSession {
    fn snapshot(&self, manager: &ProfileManager) -> SessionSnapshot {
        QuizSession::snapshot(self, manager.clock().now())
    }

    fn submit(&mut self, answer: Answer, manager: &ProfileManager) -> Option<Feedback> {
        self.submit_answer(answer, manager.clock().now())
    }

    fn advance(&mut self, manager: &ProfileManager) -> Option<Advance> {
        QuizSession::advance(self, manager.clock().now())
    }

    fn resume(&mut self, _manager: &ProfileManager) -> bool {
        false
    }

    fn abort(&mut self) -> bool {
        QuizSession::abort(self)
    }
}

impl Drill for ExamSession {
    fn snapshot(&self, manager: &ProfileManager) -> SessionSnapshot {
        ExamSession::snapshot(self, manager.clock().now())
    }

    fn submit(&mut self, answer: Answer, manager: &ProfileManager) -> Option<Feedback> {
        self.submit_answer(answer, manager.clock().now())
    }

    fn advance(&mut self, manager: &ProfileManager) -> Option<Advance> {
        ExamSession::advance(self, manager.clock().now())
    }

    fn resume(&mut self, manager: &ProfileManager) -> bool {
        ExamSession::resume(self, manager.clock().now())
    }

    fn abort(&mut self) -> bool {
        ExamSession::abort(self)
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

/// Runs the session to completion. Returns false if the learner quit.
fn drive(session: &mut impl Drill, manager: &ProfileManager, input: &mut impl BufRead) -> io::Result<bool> {
    loop {
        let snapshot = session.snapshot(manager);
        let Some(question) = snapshot.question else {
            return Ok(true);
        };
        let remaining = snapshot.time_remaining.map_or(0, |left| left.num_seconds());
        println!();
        println!(
            "[{}/{}] {}  ({remaining}s)",
            snapshot.index + 1,
            snapshot.total,
            question.prompt
        );
        if let Some(context) = &question.context {
            println!("    {context}");
        }
        for (idx, option) in question.options.iter().enumerate() {
            println!("  {}. {option}", idx + 1);
        }

        let Some(line) = read_line(input)? else {
            session.abort();
            return Ok(false);
        };
        if line == ":q" {
            session.abort();
            return Ok(false);
        }
        let answer = match line.parse::<usize>() {
            Ok(choice) if (1..=question.options.len()).contains(&choice) => Answer::Choice(choice - 1),
            _ => Answer::Text(line),
        };
        let Some(feedback) = session.submit(answer, manager) else {
            continue;
        };
        if feedback.timed_out {
            println!("time is up. answer: {}", feedback.expected);
        } else if feedback.correct {
            println!("correct");
        } else {
            println!("wrong. answer: {}", feedback.expected);
        }

        if let Some(Advance::Checkpoint(block)) = session.advance(manager) {
            println!();
            println!("rest stop {block}. press enter to continue");
            if read_line(input)?.is_none() {
                session.abort();
                return Ok(false);
            }
            session.resume(manager);
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn execute(
    manager: &mut ProfileManager,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    match command {
        Command::Profiles => {
            let active = manager.active().map(|profile| profile.id());
            for profile in manager.profiles() {
                let marker = if Some(profile.id()) == active { "*" } else { " " };
                println!(
                    "{marker} {}  {}  last active {}",
                    profile.id(),
                    profile.display_name(),
                    profile.last_active_at().format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Create { nickname } => {
            let id = manager.create_profile(&nickname).await?;
            println!("created {id}");
        }
        Command::Select { learner } => {
            manager.select_profile(learner).await?;
            println!("active learner is now {learner}");
        }
        Command::Progress { detail: None } => {
            for unit in manager.unit_overview()? {
                let lock = if unit.unlocked { "open  " } else { "locked" };
                println!("{lock} {:<12} {:>3}%", unit.unit, unit.progress);
            }
            println!("exam available: {}", manager.exam_eligible()?);
        }
        Command::Progress {
            detail: Some((unit, category)),
        } => {
            let overview = manager.category_overview(&unit, category)?;
            for slot in &overview.slots {
                let lock = if slot.unlocked { "open  " } else { "locked" };
                println!("{lock} {:<8} {:>3}%", slot.slot, slot.best);
            }
            println!("{category}: {}%", overview.progress);
        }
        Command::Quiz(spec) => {
            let mut session = manager.start_quiz(spec)?;
            if drive(&mut session, manager, &mut input)? {
                if let Some(result) = session.take_result() {
                    println!();
                    println!(
                        "{}/{} correct, {}% ({:?})",
                        result.correct,
                        result.total,
                        result.percentage,
                        result.band()
                    );
                    manager.complete_quiz(result).await?;
                }
            }
        }
        Command::Exam { unit } => {
            let mut session = manager.start_exam(&unit)?;
            if drive(&mut session, manager, &mut input)? {
                if let Some(result) = session.take_result() {
                    println!();
                    println!("exam {}: {}%", result.unit, result.percentage);
                    for page in 0..result.page_count() {
                        println!("-- page {} --", page + 1);
                        for entry in result.page(page) {
                            let mark = if entry.correct { "ok " } else { "xx " };
                            let given = entry.given.as_deref().unwrap_or("(no answer)");
                            println!(
                                "{mark}{}  {} -> {} [{}]",
                                entry.index + 1,
                                entry.prompt,
                                given,
                                entry.expected
                            );
                        }
                    }
                    manager.complete_exam(result).await?;
                }
            }
        }
        Command::Verbs { unit, tense } => {
            let drill = manager.conjugation_drill(&unit, tense)?;
            println!("{} ({tense:?})", drill.infinitive());
            let mut answers = Vec::new();
            for pronoun in drill.pronouns() {
                println!("{pronoun}");
                answers.push(read_line(&mut input)?.unwrap_or_default());
            }
            let result = drill.check(&answers);
            for row in &result.rows {
                let mark = if row.correct { "ok" } else { "xx" };
                println!("{mark} {:<12} {}", row.pronoun, row.expected);
            }
            println!("{}/{}", result.correct, result.total());
        }
        Command::UnlockAll => manager.unlock_all().await?,
        Command::FillProgress => manager.fill_progress().await?,
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = match Args::parse(&mut argv) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    let raw = std::fs::read_to_string(&parsed.catalog_path)?;
    let catalog = Arc::new(ContentCatalog::from_json(&raw)?);
    info!(units = catalog.units().len(), path = %parsed.catalog_path, "catalog loaded");

    let config = AppConfig::new(catalog, UnlockEngine::default(), parsed.storage_key);
    let mut manager = AppServices::new_sqlite(&parsed.db_url, config).await?;

    execute(&mut manager, parsed.command).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
