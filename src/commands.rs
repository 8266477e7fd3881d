use std::sync::Arc;

use crate::cli::Cli;
use crate::error::Result;
use crate::message::FetchWindow;
use crate::orchestrator::{FetchOptions, RunReport, format_start, render_summary, run};
use crate::settings::Settings;
use crate::slack::SlackConversationsApi;
use crate::{default_end_date, load_token, parse_date};

pub async fn run_fetch_threads(cli: Cli) -> Result<()> {
    let token = load_token()?;

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    let end_date = match &cli.end_date {
        Some(s) => parse_date(s)?,
        None => default_end_date(),
    };
    let duration = cli.duration.unwrap_or(settings.fetch.duration_days);
    let window = FetchWindow::ending_on(end_date, duration)?;

    let mut options = FetchOptions::from(&settings.fetch);
    if let Some(max) = cli.max_concurrency {
        options.max_concurrency = max.max(1);
    }

    println!(
        "Fetching {} channel(s) from {}...",
        cli.channels.len(),
        window
    );

    let api = Arc::new(SlackConversationsApi::new(&token)?);
    let report = run(api, &cli.channels, window, &options).await;

    print_status(&report);

    if cli.verbose {
        println!();
        print!("{}", render_summary(&report));
    } else {
        print_overview(&report);
    }

    Ok(())
}

fn print_status(report: &RunReport) {
    for channel in &report.channels {
        for diagnostic in &channel.diagnostics {
            eprintln!("{}", diagnostic);
        }

        match &channel.outcome {
            Ok(messages) => println!(
                "Retrieved {} messages from channel {}",
                messages.len(),
                channel.name
            ),
            Err(e) => eprintln!("Error processing channel {}: {}", channel.name, e),
        }
    }
}

fn print_overview(report: &RunReport) {
    let threads = match report.overview() {
        Ok(threads) => threads,
        Err(e) => {
            eprintln!("Error organizing messages by thread: {}", e);
            return;
        }
    };

    println!("\nMessages organized by thread:");
    for thread in &threads {
        println!(
            "Thread from {}: {} messages",
            format_start(thread.start()),
            thread.len()
        );
    }
}
