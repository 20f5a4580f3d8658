//! Report repository - bulk insert of resolved detections

use botdetect_core::ReportRow;
use sqlx::{PgPool, QueryBuilder, Postgres};

use super::DbError;

/// Rows per INSERT statement; 21 binds each keeps us under the 65535 limit
const INSERT_CHUNK: usize = 1000;

/// Report repository
pub struct ReportRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert report rows, ignoring ones already stored.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_batch(&self, rows: &[ReportRow]) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO reports (reported_id, reporting_id, region_id, \
                 x_coord, y_coord, z_coord, timestamp, manual_detect, \
                 on_members_world, on_pvp_world, world_number, \
                 equip_head_id, equip_amulet_id, equip_torso_id, equip_legs_id, \
                 equip_boots_id, equip_cape_id, equip_hands_id, equip_weapon_id, \
                 equip_shield_id, equip_ge_value) ",
            );
            builder.push_values(chunk, |mut b, row| {
                let eq = &row.equipment;
                b.push_bind(row.reported_id)
                    .push_bind(row.reporting_id)
                    .push_bind(row.region_id)
                    .push_bind(row.x_coord)
                    .push_bind(row.y_coord)
                    .push_bind(row.z_coord)
                    .push_bind(row.timestamp)
                    .push_bind(row.manual_detect)
                    .push_bind(row.on_members_world)
                    .push_bind(row.on_pvp_world)
                    .push_bind(row.world_number)
                    .push_bind(eq.equip_head_id)
                    .push_bind(eq.equip_amulet_id)
                    .push_bind(eq.equip_torso_id)
                    .push_bind(eq.equip_legs_id)
                    .push_bind(eq.equip_boots_id)
                    .push_bind(eq.equip_cape_id)
                    .push_bind(eq.equip_hands_id)
                    .push_bind(eq.equip_weapon_id)
                    .push_bind(eq.equip_shield_id)
                    .push_bind(row.equip_ge_value);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_fits_bind_limit() {
        assert!(INSERT_CHUNK * 21 <= u16::MAX as usize);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_reports_are_ignored() {
        use botdetect_core::{Detection, DetectionBatch};

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = PgPool::connect(&url).await.expect("pool creation failed");
        crate::db::run_migrations(&pool).await.expect("migrations failed");

        let detection = Detection {
            reporter: "report tester".into(),
            reported: "report target".into(),
            region_id: 12850,
            x: 3222,
            y: 3218,
            z: 0,
            ts: 1_700_000_000,
            manual_detect: None,
            on_members_world: 0,
            on_pvp_world: 0,
            world_number: 301,
            equipment: None,
            equip_ge_value: None,
        };
        let batch = DetectionBatch::new(vec![detection], 0).unwrap();
        let players = super::super::PlayerRepo::new(&pool)
            .resolve(&batch.player_names())
            .await
            .unwrap();
        let rows = batch.into_reports(&players.ids);

        let repo = ReportRepo::new(&pool);
        repo.insert_batch(&rows).await.unwrap();
        assert_eq!(repo.insert_batch(&rows).await.unwrap(), 0);
    }
}
