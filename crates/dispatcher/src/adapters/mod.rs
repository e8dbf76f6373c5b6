mod blur;
mod crawler;
mod email;
mod performance;
mod screenshot;

pub use blur::ImageBlurAnalyzer;
pub use crawler::ReqwestCrawler;
pub use email::LettreEmailTransport;
pub use performance::NullPerformanceAnalyzer;
pub use screenshot::NullScreenshotCapture;
