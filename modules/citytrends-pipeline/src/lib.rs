pub mod collector;
pub mod extractor;
pub mod normalize;
pub mod processor;
pub mod reader;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use collector::{CollectReport, InstagramCollector, TargetReport, TikTokCollector};
pub use extractor::{parse_extraction, ClaudeTrendExtractor, ExtractedTrends, TrendMention};
pub use processor::{build_trend_rows, ProcessReport, TrendProcessor};
pub use reader::{city_trends, CityTrendsResponse};
pub use traits::{PostScraper, TrendExtractor};
