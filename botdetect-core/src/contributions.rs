//! Contributor statistics
//!
//! Reports filed by a set of contributors are joined with the current ban
//! state of the reported players and summed per detection mode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Plugin versions that only understand the flat total object
const TOTAL_ONLY_VERSIONS: &[&str] = &["1.3", "1.3.1"];

/// One report joined with the reported player's ban state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRow {
    /// 1 for manual reports, 0 for passive ones
    pub detect: i64,
    pub reported_id: i64,
    pub confirmed_ban: bool,
    pub possible_ban: bool,
    pub confirmed_player: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualStats {
    pub reports: i64,
    pub bans: i64,
    pub possible_bans: i64,
    pub incorrect_reports: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveStats {
    pub reports: i64,
    pub bans: i64,
    pub possible_bans: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalStats {
    pub reports: i64,
    pub bans: i64,
    pub possible_bans: i64,
    pub feedback: i64,
    /// Only present for patron requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_xp_removed: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    pub passive: PassiveStats,
    pub manual: ManualStats,
    pub total: TotalStats,
}

/// Response body, shaped by the requesting plugin version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContributionsResponse {
    Total(TotalStats),
    Full(Contributions),
}

impl Contributions {
    /// Aggregate contribution rows.
    ///
    /// Rows are de-duplicated on (reported_id, detect), the last one wins.
    /// `possible_bans` excludes players that are already confirmed bans.
    /// `feedback` is the number of prediction votes the contributors cast.
    pub fn aggregate(rows: &[ContributionRow], feedback: i64) -> Self {
        let unique = dedupe(rows);

        let mut manual = ManualStats::default();
        let mut passive = PassiveStats::default();

        for row in unique.values() {
            let (ban, possible, incorrect) = (
                i64::from(row.confirmed_ban),
                i64::from(row.possible_ban),
                i64::from(row.confirmed_player),
            );
            match row.detect {
                1 => {
                    manual.reports += 1;
                    manual.bans += ban;
                    manual.possible_bans += possible;
                    manual.incorrect_reports += incorrect;
                }
                0 => {
                    passive.reports += 1;
                    passive.bans += ban;
                    passive.possible_bans += possible;
                }
                other => tracing::debug!(detect = other, "ignoring unknown detect mode"),
            }
        }

        manual.possible_bans -= manual.bans;
        passive.possible_bans -= passive.bans;

        let total = TotalStats {
            reports: passive.reports + manual.reports,
            bans: passive.bans + manual.bans,
            possible_bans: passive.possible_bans + manual.possible_bans,
            feedback,
            total_xp_removed: None,
        };

        Self {
            passive,
            manual,
            total,
        }
    }

    /// Shape for the requesting plugin version.
    pub fn into_response(self, version: Option<&str>) -> ContributionsResponse {
        match version {
            Some(v) if TOTAL_ONLY_VERSIONS.contains(&v) => ContributionsResponse::Total(self.total),
            _ => ContributionsResponse::Full(self),
        }
    }
}

/// Reported player ids that are confirmed bans, after de-duplication.
pub fn banned_reported_ids(rows: &[ContributionRow]) -> Vec<i64> {
    let mut ids: Vec<i64> = dedupe(rows)
        .values()
        .filter(|row| row.confirmed_ban)
        .map(|row| row.reported_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn dedupe(rows: &[ContributionRow]) -> HashMap<(i64, i64), &ContributionRow> {
    rows.iter()
        .map(|row| ((row.reported_id, row.detect), row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(detect: i64, reported_id: i64, ban: bool, possible: bool, player: bool) -> ContributionRow {
        ContributionRow {
            detect,
            reported_id,
            confirmed_ban: ban,
            possible_ban: possible,
            confirmed_player: player,
        }
    }

    #[test]
    fn empty_rows_give_zeroes() {
        let stats = Contributions::aggregate(&[], 0);
        assert_eq!(stats, Contributions::default());
    }

    #[test]
    fn aggregates_by_mode() {
        let rows = vec![
            row(1, 10, true, true, false),
            row(1, 11, false, true, false),
            row(1, 12, false, false, true),
            row(0, 20, true, true, false),
            row(0, 21, false, false, false),
        ];
        let stats = Contributions::aggregate(&rows, 4);

        assert_eq!(
            stats.manual,
            ManualStats {
                reports: 3,
                bans: 1,
                possible_bans: 1,
                incorrect_reports: 1,
            }
        );
        assert_eq!(
            stats.passive,
            PassiveStats {
                reports: 2,
                bans: 1,
                possible_bans: 0,
            }
        );
        assert_eq!(stats.total.reports, 5);
        assert_eq!(stats.total.bans, 2);
        assert_eq!(stats.total.possible_bans, 1);
        assert_eq!(stats.total.feedback, 4);
    }

    #[test]
    fn duplicate_reports_keep_last() {
        let rows = vec![
            row(1, 10, false, false, false),
            row(1, 10, true, true, false),
            row(0, 10, false, false, false),
        ];
        let stats = Contributions::aggregate(&rows, 0);
        assert_eq!(stats.manual.reports, 1);
        assert_eq!(stats.manual.bans, 1);
        assert_eq!(stats.passive.reports, 1);
        assert_eq!(stats.total.reports, 2);
    }

    #[test]
    fn legacy_versions_get_total_only() {
        let stats = Contributions::aggregate(&[row(0, 1, true, true, false)], 0);

        let json = serde_json::to_value(stats.clone().into_response(Some("1.3.1"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"reports": 1, "bans": 1, "possible_bans": 0, "feedback": 0})
        );

        let json = serde_json::to_value(stats.into_response(Some("1.5.0"))).unwrap();
        assert!(json.get("passive").is_some());
        assert!(json.get("manual").is_some());
        assert!(json["total"].get("total_xp_removed").is_none());
    }

    #[test]
    fn banned_ids_are_unique() {
        let rows = vec![
            row(1, 10, true, true, false),
            row(0, 10, true, true, false),
            row(0, 11, false, true, false),
            row(0, 12, true, false, false),
        ];
        assert_eq!(banned_reported_ids(&rows), vec![10, 12]);
    }
}
