//! Detection payloads and batch shaping
//!
//! A detection is one plugin report: who saw whom, where, and what they
//! were wearing. The plugin sends them in batches from a single reporter.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::names::{is_valid_rsn, to_jagex_name};

/// Upper bound on detections accepted in one batch (after de-duplication)
pub const MAX_DETECTIONS_PER_BATCH: usize = 5000;

/// Highest valid map region id
pub const MAX_REGION_ID: i64 = 15522;

/// Worn equipment item ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub equip_head_id: Option<i64>,
    pub equip_amulet_id: Option<i64>,
    pub equip_torso_id: Option<i64>,
    pub equip_legs_id: Option<i64>,
    pub equip_boots_id: Option<i64>,
    pub equip_cape_id: Option<i64>,
    pub equip_hands_id: Option<i64>,
    pub equip_weapon_id: Option<i64>,
    pub equip_shield_id: Option<i64>,
}

/// One submitted detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub reporter: String,
    pub reported: String,
    pub region_id: i64,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Unix timestamp in seconds
    pub ts: i64,
    #[serde(default)]
    pub manual_detect: Option<i64>,
    pub on_members_world: i64,
    pub on_pvp_world: i64,
    pub world_number: i64,
    #[serde(default)]
    pub equipment: Option<Equipment>,
    #[serde(default)]
    pub equip_ge_value: Option<i64>,
}

/// Why a whole batch was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchRejection {
    #[error("too many detections: {count} (max {max})", max = MAX_DETECTIONS_PER_BATCH)]
    TooMany { count: usize },

    #[error("detections from {count} reporters in one batch")]
    MultipleReporters { count: usize },

    #[error("empty detection batch")]
    Empty,
}

/// Row destined for the `reports` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub reported_id: i64,
    pub reporting_id: i64,
    pub region_id: i64,
    pub x_coord: i64,
    pub y_coord: i64,
    pub z_coord: i64,
    pub timestamp: DateTime<Utc>,
    pub manual_detect: i64,
    pub on_members_world: i64,
    pub on_pvp_world: i64,
    pub world_number: i64,
    pub equipment: Equipment,
    pub equip_ge_value: Option<i64>,
}

/// A de-duplicated batch from a single reporter, ready to queue
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    detections: Vec<Detection>,
    reporter: String,
    manual_detect: bool,
}

impl DetectionBatch {
    /// Build a batch from a raw submission.
    ///
    /// Duplicates on (reporter, reported, region_id) are dropped, first one
    /// wins. The remaining batch must hold at most 5000 detections from
    /// exactly one reporter. Any non-zero `manual_detect` means manual.
    pub fn new(detections: Vec<Detection>, manual_detect: i64) -> Result<Self, BatchRejection> {
        let mut seen = HashSet::new();
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| seen.insert((d.reporter.clone(), d.reported.clone(), d.region_id)))
            .collect();

        if detections.is_empty() {
            return Err(BatchRejection::Empty);
        }

        if detections.len() > MAX_DETECTIONS_PER_BATCH {
            return Err(BatchRejection::TooMany {
                count: detections.len(),
            });
        }

        let reporters: HashSet<&str> = detections.iter().map(|d| d.reporter.as_str()).collect();
        if reporters.len() > 1 {
            return Err(BatchRejection::MultipleReporters {
                count: reporters.len(),
            });
        }

        let reporter = detections[0].reporter.clone();
        Ok(Self {
            detections,
            reporter,
            manual_detect: manual_detect != 0,
        })
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn manual_detect(&self) -> bool {
        self.manual_detect
    }

    /// The single reporter of this batch.
    pub fn reporter(&self) -> &str {
        &self.reporter
    }

    /// Drop detections whose region id is outside `0..=MAX_REGION_ID`.
    /// Returns how many were dropped; the batch may end up empty.
    pub fn retain_valid_regions(&mut self) -> usize {
        let before = self.detections.len();
        self.detections
            .retain(|d| (0..=MAX_REGION_ID).contains(&d.region_id));
        before - self.detections.len()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Unique normalised names (reported players plus the reporter) that
    /// pass name validation, sorted. Empty for an empty batch.
    pub fn player_names(&self) -> Vec<String> {
        if self.detections.is_empty() {
            return Vec::new();
        }
        let names: BTreeSet<String> = self
            .detections
            .iter()
            .map(|d| d.reported.as_str())
            .chain(std::iter::once(self.reporter()))
            .filter(|name| is_valid_rsn(name))
            .map(to_jagex_name)
            .collect();
        names.into_iter().collect()
    }

    /// Resolve names to player ids and build report rows.
    ///
    /// `ids` maps normalised names to player ids. Detections with an
    /// out-of-range region or an unrepresentable timestamp are skipped, as
    /// are those whose players could not be resolved. No rows come back when the
    /// reporter itself is unknown.
    pub fn into_reports(self, ids: &HashMap<String, i64>) -> Vec<ReportRow> {
        let Some(reporting_id) = resolve(ids, self.reporter()) else {
            tracing::debug!(reporter = %self.reporter(), "reporter could not be resolved");
            return Vec::new();
        };
        let manual_detect = i64::from(self.manual_detect);

        self.detections
            .into_iter()
            .filter(|d| (0..=MAX_REGION_ID).contains(&d.region_id))
            .filter_map(|d| {
                let reported_id = resolve(ids, &d.reported)?;
                let timestamp = DateTime::<Utc>::from_timestamp(d.ts, 0)?;
                Some(ReportRow {
                    reported_id,
                    reporting_id,
                    region_id: d.region_id,
                    x_coord: d.x,
                    y_coord: d.y,
                    z_coord: d.z,
                    timestamp,
                    manual_detect,
                    on_members_world: d.on_members_world,
                    on_pvp_world: d.on_pvp_world,
                    world_number: d.world_number,
                    equipment: d.equipment.unwrap_or_default(),
                    equip_ge_value: d.equip_ge_value,
                })
            })
            .collect()
    }
}

fn resolve(ids: &HashMap<String, i64>, name: &str) -> Option<i64> {
    if !is_valid_rsn(name) {
        return None;
    }
    ids.get(&to_jagex_name(name)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(reporter: &str, reported: &str, region_id: i64) -> Detection {
        Detection {
            reporter: reporter.into(),
            reported: reported.into(),
            region_id,
            x: 3200,
            y: 3200,
            z: 0,
            ts: 1_640_000_000,
            manual_detect: None,
            on_members_world: 1,
            on_pvp_world: 0,
            world_number: 330,
            equipment: None,
            equip_ge_value: None,
        }
    }

    #[test]
    fn drops_duplicates_keeping_first() {
        let mut second = detection("Reporter", "Bot_1", 100);
        second.x = 1;
        let batch = DetectionBatch::new(
            vec![
                detection("Reporter", "Bot_1", 100),
                second,
                detection("Reporter", "Bot_1", 101),
            ],
            0,
        )
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.detections()[0].x, 3200);
        assert!(!batch.manual_detect());
    }

    #[test]
    fn manual_flag_is_normalised() {
        let batch = DetectionBatch::new(vec![detection("r", "b", 1)], 7).unwrap();
        assert!(batch.manual_detect());
    }

    #[test]
    fn rejects_multiple_reporters() {
        let err = DetectionBatch::new(
            vec![detection("one", "bot", 1), detection("two", "bot", 1)],
            0,
        )
        .unwrap_err();
        assert_eq!(err, BatchRejection::MultipleReporters { count: 2 });
    }

    #[test]
    fn rejects_oversized_batches() {
        let detections = (0..=MAX_DETECTIONS_PER_BATCH as i64)
            .map(|i| detection("r", "bot", i))
            .collect();
        let err = DetectionBatch::new(detections, 1).unwrap_err();
        assert_eq!(err, BatchRejection::TooMany { count: 5001 });
    }

    #[test]
    fn duplicates_do_not_count_towards_limit() {
        let detections = (0..6000).map(|_| detection("r", "bot", 5)).collect();
        let batch = DetectionBatch::new(detections, 0).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn player_names_are_unique_valid_and_normalised() {
        let batch = DetectionBatch::new(
            vec![
                detection("The_Reporter", "Bot-1", 1),
                detection("The_Reporter", "bot 1", 2),
                detection("The_Reporter", "bad!name", 3),
            ],
            0,
        )
        .unwrap();

        assert_eq!(batch.player_names(), vec!["bot 1", "the reporter"]);
    }

    #[test]
    fn into_reports_resolves_ids_and_filters() {
        let batch = DetectionBatch::new(
            vec![
                detection("Reporter", "Bot_1", 10),
                detection("Reporter", "Bot_2", MAX_REGION_ID + 1),
                detection("Reporter", "Unknown", 11),
            ],
            1,
        )
        .unwrap();

        let ids = HashMap::from([
            ("reporter".to_string(), 1),
            ("bot 1".to_string(), 2),
            ("bot 2".to_string(), 3),
        ]);

        let rows = batch.into_reports(&ids);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reporting_id, 1);
        assert_eq!(rows[0].reported_id, 2);
        assert_eq!(rows[0].manual_detect, 1);
        assert_eq!(rows[0].timestamp.timestamp(), 1_640_000_000);
    }

    #[test]
    fn off_map_players_are_not_collected() {
        let mut batch = DetectionBatch::new(
            vec![
                detection("Reporter", "Off Map Bot", 99_999),
                detection("Reporter", "Negative", -1),
                detection("Reporter", "On Map", MAX_REGION_ID),
            ],
            0,
        )
        .unwrap();

        assert_eq!(batch.retain_valid_regions(), 2);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.player_names(), vec!["on map", "reporter"]);
    }

    #[test]
    fn fully_off_map_batch_names_nobody() {
        let mut batch =
            DetectionBatch::new(vec![detection("Reporter", "Off Map Bot", 99_999)], 0).unwrap();

        assert_eq!(batch.retain_valid_regions(), 1);
        assert!(batch.is_empty());
        assert_eq!(batch.reporter(), "Reporter");
        assert!(batch.player_names().is_empty());
    }

    #[test]
    fn unknown_reporter_yields_nothing() {
        let batch = DetectionBatch::new(vec![detection("Reporter", "Bot", 10)], 0).unwrap();
        let ids = HashMap::from([("bot".to_string(), 2)]);
        assert!(batch.into_reports(&ids).is_empty());
    }

    #[test]
    fn deserializes_plugin_payload() {
        let json = r#"{
            "reporter": "Reporter", "reported": "Bot", "region_id": 12850,
            "x": 3222, "y": 3218, "z": 0, "ts": 1640000000,
            "on_members_world": 0, "on_pvp_world": 0, "world_number": 301,
            "equipment": {"equip_head_id": 1153, "equip_weapon_id": null},
            "equip_ge_value": 5000
        }"#;
        let d: Detection = serde_json::from_str(json).unwrap();
        let equipment = d.equipment.unwrap();
        assert_eq!(equipment.equip_head_id, Some(1153));
        assert_eq!(equipment.equip_weapon_id, None);
        assert_eq!(equipment.equip_cape_id, None);
    }
}
