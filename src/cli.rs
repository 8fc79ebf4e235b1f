use crate::answers::{AnswerDocument, AnswerStrategy};
use crate::catalog::WeightTable;
use crate::config::{Config, SamplingMode};
use crate::prompt::Prompter;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use url::Url;

const DEFAULT_SLOWMO_MS: u64 = 150;

#[derive(Parser, Debug)]
#[command(name = "form_autofill", about = "Fills and submits the virtualization survey form")]
pub struct Cli {
    /// Form URL (the viewform link)
    #[arg(long)]
    pub url: Option<String>,

    /// Answers file used when not generating random answers
    #[arg(long, default_value = "answers.json")]
    pub answers: PathBuf,

    /// Generate uniformly random answers instead of reading the answers file
    #[arg(long)]
    pub random: bool,

    /// Generate random answers biased by the weight table
    #[arg(long)]
    pub weighted: bool,

    /// Seed for reproducible random answers and matrix permutations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the generated answers before filling
    #[arg(long)]
    pub print_answers: bool,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Delay in milliseconds before every click
    #[arg(long)]
    pub slowmo: Option<u64>,

    /// Skip checkpoint screenshots
    #[arg(long)]
    pub no_screenshots: bool,

    /// Path to config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Never prompt; missing values fall back to flags and config
    #[arg(long)]
    pub non_interactive: bool,
}

/// Everything a run needs once flags, prompts and config are reconciled.
#[derive(Debug)]
pub struct RunPlan {
    pub url: Url,
    pub strategy: AnswerStrategy,
    pub seed: Option<u64>,
    pub print_answers: bool,
}

/// Resolves the run from flags, falling back to prompts. Browser, timing and
/// output overrides are written into `config`. `Ok(None)` means the user
/// gave us nothing to work with and the run should end quietly.
pub fn resolve<R: BufRead, W: Write>(
    cli: Cli,
    config: &mut Config,
    prompter: &mut Prompter<R, W>,
) -> Result<Option<RunPlan>> {
    let raw_url = match cli.url {
        Some(url) => url,
        None => prompter.ask("Form URL (viewform): ")?.unwrap_or_default(),
    };
    let raw_url = raw_url.trim();
    if raw_url.is_empty() {
        eprintln!("[!] No URL given. Exiting.");
        return Ok(None);
    }
    let url = Url::parse(raw_url).context(format!("Invalid form URL: {}", raw_url))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Form URL must be http(s): {}", url);
    }

    let seed = match cli.seed {
        Some(seed) => Some(seed),
        None => match prompter.ask("Seed (optional, Enter to skip): ")? {
            Some(s) if !s.is_empty() => match s.parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    log::warn!("[Config] Ignoring non-numeric seed '{}'", s);
                    None
                }
            },
            _ => None,
        },
    };

    let use_random = cli.random
        || cli.weighted
        || prompter.confirm("Use random answers (no free-text 'Other')? [S/n]: ", true)?;

    let headful = cli.headful
        || (prompter.is_enabled() && prompter.confirm("Show the browser (headful)? [S/n]: ", true)?);
    if headful {
        config.browser.headless = false;
    }

    if let Some(ms) = cli.slowmo {
        config.timing.action_delay_ms = ms;
    } else if !config.browser.headless && config.timing.action_delay_ms == 0 {
        config.timing.action_delay_ms = match prompter.ask("Slowmo ms (Enter for 150): ")? {
            Some(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
                log::warn!("[Config] Invalid slowmo '{}', using {}", s, DEFAULT_SLOWMO_MS);
                DEFAULT_SLOWMO_MS
            }),
            _ => DEFAULT_SLOWMO_MS,
        };
    }

    if cli.no_screenshots {
        config.output.screenshots = false;
    }

    let (strategy, print_answers) = if use_random {
        let print = cli.print_answers
            || prompter.confirm("Print the answers (except matrices) before submitting? [s/N]: ", false)?;
        let weighted = cli.weighted || config.sampling.strategy == SamplingMode::Weighted;
        let strategy = if weighted {
            let mut table = WeightTable::survey_defaults();
            table.merge_overrides(&config.weights)?;
            AnswerStrategy::Weighted(table)
        } else {
            AnswerStrategy::Uniform
        };
        (strategy, print)
    } else {
        let Some(path) = locate_answers(cli.answers, prompter)? else {
            eprintln!("[!] No answers file. Exiting.");
            return Ok(None);
        };
        (AnswerStrategy::Fixed(AnswerDocument::load(&path)?), cli.print_answers)
    };

    Ok(Some(RunPlan {
        url,
        strategy,
        seed,
        print_answers,
    }))
}

fn locate_answers<R: BufRead, W: Write>(path: PathBuf, prompter: &mut Prompter<R, W>) -> Result<Option<PathBuf>> {
    if path.exists() {
        return Ok(Some(path));
    }
    let question = format!("'{}' not found. Alternative path (Enter to cancel): ", path.display());
    match prompter.ask(&question)? {
        Some(alt) if !alt.is_empty() => {
            let alt = PathBuf::from(alt);
            if alt.exists() {
                Ok(Some(alt))
            } else {
                log::error!("[Answers] {:?} does not exist either", alt);
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}
