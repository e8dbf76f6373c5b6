//! The Check Dispatcher: composes the crawl/visual/blur/performance phases,
//! owns the snapshot filesystem layout, classifies and emits reports, and
//! defines the collaborator traits (with default adapters) the phases run
//! against (spec §4.4, §6).

mod adapters;
mod dispatcher;
mod report;
mod snapshot;
mod traits;

pub use adapters::{ImageBlurAnalyzer, LettreEmailTransport, NullPerformanceAnalyzer, NullScreenshotCapture, ReqwestCrawler};
pub use dispatcher::Dispatcher;
pub use report::{Report, ReportKind, SinglePhase};
pub use snapshot::{host_of, SnapshotLayout};
pub use traits::{BlurAnalyzer, BlurVerdict, CrawlOutcome, EmailTransport, PageCrawler, PerformanceAnalyzer, PerformanceScore, ScreenshotCapture};
