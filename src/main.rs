mod answers;
mod browser;
mod catalog;
mod cli;
mod config;
mod error;
mod filler;
mod logger;
mod prompt;
mod sampling;
mod sequencer;

use crate::answers::AnswerDocument;
use crate::browser::chrome::ChromeSession;
use crate::cli::Cli;
use crate::config::Config;
use crate::filler::FieldFiller;
use crate::prompt::Prompter;
use crate::sequencer::{RunOutcome, Sequencer};
use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let mut config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[!] Configuration Error: {:#}", e);
            return Err(e);
        }
    };
    logger::init(&config.logging)?;

    // 2. Flags and prompts
    let mut prompter = Prompter::stdio(!cli.non_interactive);
    let Some(plan) = cli::resolve(cli, &mut config, &mut prompter)? else {
        return Ok(());
    };
    drop(prompter);

    // 3. Answers
    let mut rng = match plan.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    log::info!("[Answers] Strategy: {}", plan.strategy.name());
    let answers = plan.strategy.resolve(&mut rng);
    if plan.print_answers {
        println!("{}", answers.to_pretty_json()?);
    }

    // 4. Browser
    let ws_url = match config.browser.debug_port {
        Some(port) => {
            let found = browser::discover_debugger(port).await;
            if found.is_none() {
                log::warn!("[Browser] No debugger on port {}, launching a new Chrome", port);
            }
            found
        }
        None => None,
    };

    let url = plan.url;
    let outcome = tokio::task::spawn_blocking(move || run_session(&config, ws_url, &url, &answers, &mut rng)).await??;

    match outcome.screenshots.last() {
        Some(path) => println!("[*] Form submitted. Check {} to confirm.", path.display()),
        None => println!("[*] Form submitted."),
    }
    Ok(())
}

fn run_session(
    config: &Config,
    ws_url: Option<String>,
    url: &Url,
    answers: &AnswerDocument,
    rng: &mut StdRng,
) -> Result<RunOutcome> {
    let session = match ws_url {
        Some(ws) => ChromeSession::attach(ws, &config.timing)?,
        None => ChromeSession::launch(&config.browser, &config.timing)?,
    };
    session.open(url.as_str())?;

    let title = session.title();
    log::info!("[Browser] Opened '{}'", title);
    let lowered = title.to_lowercase();
    if lowered.contains("sign in") || lowered.contains("iniciar sesión") {
        bail!("The form asks for a sign-in; open it in a logged-in Chrome and use debug_port");
    }

    let screenshot_dir = config.output.screenshots.then(|| {
        config
            .output
            .screenshot_dir
            .join(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    });

    let page = session.page();
    let filler = FieldFiller::new(&page, &config.timing);
    Sequencer::new(filler, screenshot_dir).run(answers, rng)
}
