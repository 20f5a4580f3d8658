//! Prediction feedback: votes on whether a prediction looks right

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A vote on a prediction: -1 wrong, 0 unsure, 1 correct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Vote(i8);

impl Vote {
    pub const WRONG: Vote = Vote(-1);
    pub const UNSURE: Vote = Vote(0);
    pub const CORRECT: Vote = Vote(1);

    pub fn value(self) -> i8 {
        self.0
    }

    /// Display name used in the Discord broadcast.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Looks good!",
            0 => "Not sure..",
            _ => "Looks wrong.",
        }
    }

    /// Embed colour used in the Discord broadcast.
    pub fn color(self) -> u32 {
        match self.0 {
            1 => 0x009302,
            0 => 0x6A6A6A,
            _ => 0xFF0000,
        }
    }
}

impl TryFrom<i64> for Vote {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1..=1 => Ok(Vote(value as i8)),
            _ => Err(ValidationError::OutOfRange {
                field: "vote",
                value: value.to_string(),
                range: "-1..=1",
            }),
        }
    }
}

impl From<Vote> for i64 {
    fn from(vote: Vote) -> Self {
        i64::from(vote.0)
    }
}

/// Model confidence in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Confidence(value))
        } else {
            Err(ValidationError::OutOfRange {
                field: "confidence",
                value: value.to_string(),
                range: "0.0..=1.0",
            })
        }
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Feedback submitted from the plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub player_name: String,
    pub vote: Vote,
    pub prediction: String,
    pub confidence: Confidence,
    pub subject_id: i64,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub proposed_label: Option<String>,
}

/// Feedback submitted through the Discord bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordFeedback {
    pub discord_id: i64,
    /// Name of the player the vote is about
    pub name: String,
    pub vote: Vote,
    pub prediction: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub proposed_label: Option<String>,
}

/// Filters for the feedback listing; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedbackFilter {
    pub voter_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub vote: Option<Vote>,
    pub prediction: Option<String>,
    pub confidence: Option<Confidence>,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Discord embed announcing a feedback submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackEmbed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

impl FeedbackEmbed {
    pub fn new(
        feedback: &FeedbackSubmission,
        subject_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let mut fields = vec![
            field("Voter Name", &feedback.player_name, false),
            field("Subject Name", subject_name, false),
            field("Prediction", &feedback.prediction.replace('_', " "), true),
            field(
                "Confidence",
                &format!("{:.2}%", feedback.confidence.value() * 100.0),
                true,
            ),
            field("Vote", feedback.vote.label(), false),
            field(
                "Explanation",
                feedback.feedback_text.as_deref().unwrap_or_default(),
                false,
            ),
        ];

        if feedback.vote == Vote::WRONG {
            if let Some(label) = feedback.proposed_label.as_deref().filter(|l| !l.is_empty()) {
                fields.push(field("Proposed Label", &label.replace('_', " "), true));
            }
        }

        Self {
            title: "New Feedback Submission".to_owned(),
            color: feedback.vote.color(),
            fields,
            footer: EmbedFooter {
                text: now.format("%a %B %d %Y  %I:%M:%S %p").to_string(),
            },
        }
    }
}

fn field(name: &str, value: &str, inline: bool) -> EmbedField {
    EmbedField {
        name: name.to_owned(),
        value: value.to_owned(),
        inline,
    }
}
