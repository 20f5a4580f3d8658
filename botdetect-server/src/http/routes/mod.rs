//! Route handlers organized by resource

pub mod contributions;
pub mod detect;
pub mod feedback;
pub mod health;
pub mod predictions;
pub mod scraper;
