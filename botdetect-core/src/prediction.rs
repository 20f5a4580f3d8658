//! Ban-likelihood prediction responses

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::names::PlayerName;

/// Output of the prediction model for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub player_id: i64,
    pub player_name: String,
    /// Most likely label
    pub prediction_label: String,
    pub prediction_confidence: f64,
    /// Probability per label
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
}

/// Body returned by the prediction route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub player_id: i64,
    pub player_name: String,
    pub prediction_label: String,
    pub prediction_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_predictions: Option<Vec<(String, f64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions_breakdown: Option<BTreeMap<String, f64>>,
}

impl PredictionResponse {
    /// Answer without consulting the model, when the name allows it.
    ///
    /// The game's lead moderator gets a fixed answer; names failing the
    /// legacy check get an "Invalid player name" response.
    pub fn canned(name: &str) -> Option<Self> {
        let (name, bad_name) = PlayerName::legacy_check(name);

        if name.to_lowercase() == "mod ash" {
            return Some(Self::fixed(957580, name, "Big Daddy", 1.0));
        }

        if bad_name {
            return Some(Self::fixed(-1, name, "Invalid player name", 0.0));
        }

        None
    }

    /// Shape a model prediction.
    ///
    /// Versioned clients get the raw breakdown map. Unversioned clients get
    /// `secondary_predictions`: positive entries only, highest first.
    pub fn from_prediction(prediction: Prediction, versioned: bool) -> Self {
        let (secondary_predictions, predictions_breakdown) = if versioned {
            (None, Some(prediction.breakdown))
        } else {
            (Some(sort_breakdown(prediction.breakdown)), None)
        };

        Self {
            player_id: prediction.player_id,
            player_name: prediction.player_name,
            prediction_label: prediction.prediction_label,
            prediction_confidence: prediction.prediction_confidence,
            secondary_predictions,
            predictions_breakdown,
        }
    }

    fn fixed(player_id: i64, player_name: String, label: &str, confidence: f64) -> Self {
        Self {
            player_id,
            player_name,
            prediction_label: label.to_owned(),
            prediction_confidence: confidence,
            secondary_predictions: None,
            predictions_breakdown: None,
        }
    }
}

fn sort_breakdown(breakdown: BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = breakdown.into_iter().filter(|(_, v)| *v > 0.0).collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    entries
}
