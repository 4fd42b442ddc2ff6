use quarry_core::report::{CrawlEvent, CrawlReport, CrawlReporter, TracingCrawlReporter};

/// Where crawl progress goes.
pub enum Progress {
    /// Plain lines on stdout.
    Console(ConsoleReporter),
    /// Structured log records on stderr.
    Log(TracingCrawlReporter),
}

impl CrawlReporter for Progress {
    fn report(&self, event: CrawlEvent<'_>) {
        match self {
            Progress::Console(r) => r.report(event),
            Progress::Log(r) => r.report(event),
        }
    }
}

/// Prints one human-readable line per pipeline event.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl CrawlReporter for ConsoleReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        println!("{}", render(&event));
    }
}

fn render(event: &CrawlEvent<'_>) -> String {
    match event {
        CrawlEvent::DiscoveryStarted { site } => format!("Discovering articles on {site}"),
        CrawlEvent::Discovered { count } => format!("Found {count} articles to process"),
        CrawlEvent::ArticleStarted { url, index, total } => {
            format!("\nProcessing article {}/{total}: {url}", index + 1)
        }
        CrawlEvent::FetchFailed { url, error } => format!("Failed to fetch {url}: {error}"),
        CrawlEvent::RawSaved { path, .. } => format!("Saved raw content to {}", path.display()),
        CrawlEvent::ExtractionFailed {
            reason, payload, ..
        } => match payload {
            Some(payload) => {
                format!("Error parsing extracted content: {reason}\nRaw content: {payload}")
            }
            None => format!("No content extracted: {reason}"),
        },
        CrawlEvent::ProcessedSaved { path, .. } => {
            format!("Saved processed content to {}", path.display())
        }
        CrawlEvent::PersistFailed { url, error } => format!("Error processing {url}: {error}"),
        CrawlEvent::Waiting { delay } => {
            format!("Waiting {:.2} seconds before next request...", delay.as_secs_f64())
        }
        CrawlEvent::Finished { report } => format!("\nCrawling completed! {}", summary(report)),
    }
}

/// One-line tally of a finished run.
pub fn summary(report: &CrawlReport) -> String {
    format!(
        "{} articles: {} extracted, {} fetched without extraction, {} fetch failures, {} write failures",
        report.total(),
        report.extracted(),
        report.extraction_failed(),
        report.fetch_failed(),
        report.persist_failed(),
    )
}
