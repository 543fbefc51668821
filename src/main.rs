use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ias::bus::{EventContext, Signal};
use ias::config::Config;
use ias::controller::{Controller, LifecycleState};
use ias::dom::{Dom, MemoryDom};
use ias::error::{LoaderError, LoaderResult};
use ias::event::{EventKind, EventPayload};
use ias::extension::PagingExtension;
use ias::fetch::{DirectoryFetcher, Fetcher};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Replays a directory of JSON pages as an infinitely scrolling listing.
#[derive(Debug, Parser)]
#[command(name = "ias", version)]
struct Cli {
    /// Directory holding the page files.
    site_dir: PathBuf,
    /// Page reference of the initial document.
    #[arg(long, default_value = "index")]
    start: String,
    /// Config file; defaults to the usual lookup.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 600.0)]
    viewport: f64,
    /// Pixels scrolled per step.
    #[arg(long, default_value_t = 200.0)]
    step: f64,
    #[arg(long, default_value_t = 500)]
    max_steps: usize,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> LoaderResult<()> {
    validate(&cli)?;
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let fetcher = Arc::new(DirectoryFetcher::new(&cli.site_dir));
    let first = fetcher.get_text(&cli.start).await?;
    let dom = MemoryDom::from_markup(&first, cli.viewport)?;
    let mut controller = Controller::new(&config, Box::new(dom), fetcher);

    for kind in EventKind::ALL {
        controller.on(kind, |ctx: &EventContext<'_>| {
            println!("{}", describe(&ctx.payload));
            Signal::Proceed
        })?;
    }
    let paging = PagingExtension::new();
    let pages = paging.tracker();
    controller.extension(paging)?;

    controller.initialize();
    let steps = replay(&mut controller, cli.step, cli.max_steps).await;

    let stats = controller.stats();
    let log = pages.snapshot();
    println!(
        "{} after {steps} step(s): {} page(s), {} item(s), {} failure(s)",
        controller.state(),
        stats.pages_loaded,
        stats.items_rendered,
        stats.fetch_failures
    );
    if let Some(current) = log.current() {
        println!("last page {current} (page {})", log.page_number());
    }
    controller.destroy();
    Ok(())
}

fn validate(cli: &Cli) -> LoaderResult<()> {
    if !(cli.viewport.is_finite() && cli.viewport > 0.0) {
        return Err(LoaderError::invalid_argument(
            "--viewport must be a positive number of pixels",
        ));
    }
    if !(cli.step.is_finite() && cli.step > 0.0) {
        return Err(LoaderError::invalid_argument(
            "--step must be a positive number of pixels",
        ));
    }
    Ok(())
}

/// Scrolls step by step until the pages run out, the document stops
/// growing at the bottom, or `max_steps` is reached.
async fn replay(controller: &mut Controller, step: f64, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && controller.state() != LifecycleState::Exhausted {
        let before = controller.dom().scroll_position();
        let pages_before = controller.stats().pages_loaded;
        let dom = controller.dom_mut();
        dom.scroll_to(before + step);
        let moved = dom.scroll_position() != before;

        controller.scroll();
        controller.run_until_idle().await;
        steps += 1;

        let grew = controller.stats().pages_loaded != pages_before;
        if !moved && !grew && controller.state() == LifecycleState::Idle {
            warn!("stalled at {before}px without reaching the last page");
            break;
        }
    }
    steps
}

fn describe(payload: &EventPayload<'_>) -> String {
    let kind = payload.kind();
    match payload {
        EventPayload::Next { url } => format!("{kind:<9}{url}"),
        EventPayload::Load { body, items } => {
            format!("{kind:<9}{} item(s), {} byte(s)", items.len(), body.len())
        }
        EventPayload::DidLoad { items, .. } | EventPayload::Render { items } => {
            format!("{kind:<9}{} item(s)", items.len())
        }
        EventPayload::Scroll { offset, threshold } => {
            format!("{kind:<9}{offset:.0}px / {threshold:.0}px")
        }
        EventPayload::NoneLeft { .. } => format!("{kind:<9}no more pages"),
    }
}
