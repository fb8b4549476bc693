use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::style;
use ghcrawl::crawl::{CrawlOptions, CrawlSummary, Crawler};
use ghcrawl::{GraphqlClient, RetryConfig, TokenPool, connect_and_migrate};

use crate::CrawlArgs;
use crate::config::Config;
use crate::progress::ProgressReporter;

pub(crate) async fn handle_crawl(
    args: CrawlArgs,
    config: &Config,
    database_url: &str,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tokens = if args.token.is_empty() {
        config.github.tokens.clone()
    } else {
        args.token
    };
    if tokens.is_empty() {
        return Err(
            "no GitHub token configured; pass --token, set GHCRAWL_GITHUB_TOKENS, \
             or add [github] tokens to the config file"
                .into(),
        );
    }

    let options = CrawlOptions {
        batch_size: args.batch_size.unwrap_or(config.crawler.batch_size),
        total_num_repo: args.total_repos.unwrap_or(config.crawler.total_num_repo),
        min_stars: args.min_stars.unwrap_or(config.crawler.min_stars),
        partition_threshold: args
            .partition_threshold
            .unwrap_or(config.crawler.partition_threshold),
        start_year: args.start_year.unwrap_or(config.crawler.start_year),
        start_month: args.start_month.unwrap_or(config.crawler.start_month),
        concurrency: args.concurrency.or(config.crawler.concurrency),
    };

    let pool = Arc::new(TokenPool::new(tokens));
    let retry = RetryConfig::with_max_retries(args.max_retries.unwrap_or(config.crawler.max_retries));
    let client = Arc::new(GraphqlClient::new(
        config.github.api_url.clone(),
        pool,
        retry,
    )?);

    let db = Arc::new(connect_and_migrate(database_url).await?);

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();

    let summary = Crawler::new(client, db, options)
        .run(shutdown, Some(callback))
        .await;

    reporter.finish();
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    let is_tty = console::Term::stdout().is_term();

    if is_tty {
        println!();
        println!(
            "{} {} repositories crawled, {} failed",
            style("done:").green().bold(),
            summary.crawled,
            summary.failed.len(),
        );
        println!(
            "      {} partitions traversed, {} skipped, {} malformed records dropped",
            summary.partitions, summary.skipped_partitions, summary.malformed_records,
        );
        if summary.interrupted {
            println!(
                "{}",
                style("      run interrupted; re-run to pick up where it left off").yellow()
            );
        }
        for failed in &summary.failed {
            println!(
                "  {} {}: {}",
                style("failed").red(),
                failed.name,
                failed.error
            );
        }
    } else {
        tracing::info!(
            crawled = summary.crawled,
            failed = summary.failed.len(),
            partitions = summary.partitions,
            skipped_partitions = summary.skipped_partitions,
            malformed = summary.malformed_records,
            interrupted = summary.interrupted,
            "crawl summary"
        );
        for failed in &summary.failed {
            tracing::warn!(repo = %failed.name, error = %failed.error, "failed repository");
        }
    }
}
