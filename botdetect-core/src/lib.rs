//! botdetect-core: domain types for the bot detector service
//!
//! Everything in here is pure: payload types, validation, and the
//! reshaping logic the HTTP handlers apply to database rows. No I/O.

pub mod contributions;
pub mod detection;
pub mod feedback;
pub mod hiscore;
pub mod names;
pub mod prediction;
pub mod validation;

pub use contributions::{ContributionRow, Contributions, ContributionsResponse};
pub use detection::{BatchRejection, Detection, DetectionBatch, Equipment, ReportRow};
pub use feedback::{Confidence, DiscordFeedback, FeedbackEmbed, FeedbackFilter, FeedbackSubmission, Vote};
pub use hiscore::{Hiscore, PlayerUpdate, ScrapedPlayer, ScraperRecord};
pub use names::{is_valid_rsn, to_jagex_name, PlayerName};
pub use prediction::{Prediction, PredictionResponse};
pub use validation::ValidationError;
