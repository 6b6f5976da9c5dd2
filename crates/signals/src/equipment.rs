use super::{ConsumptionWindow, EquipmentReader, FaultyUnit};
use anyhow::Context;
use chrono::{DateTime, Utc};

/// PgEquipment reads equipment status and consumption history from Postgres.
#[derive(Debug, Clone)]
pub struct PgEquipment {
    pool: sqlx::PgPool,
}

impl PgEquipment {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LatestStatusRow {
    module_id: i64,
    module_name: String,
    zone_name: String,
    last_seen: DateTime<Utc>,
}

fn window_start(now: DateTime<Utc>, window: std::time::Duration) -> anyhow::Result<DateTime<Utc>> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .with_context(|| format!("window {window:?} is out of range"))
}

impl EquipmentReader for PgEquipment {
    #[tracing::instrument(skip(self))]
    async fn faulty_units_since<'s>(
        &'s self,
        now: DateTime<Utc>,
        window: std::time::Duration,
        status_slug: &'s str,
    ) -> anyhow::Result<Vec<FaultyUnit>> {
        let since = window_start(now, window)?;

        // Pick the latest status record of each module within the window,
        // and keep only those modules whose latest status is the fault status.
        let rows: Vec<LatestStatusRow> = sqlx::query_as(
            r#"
            SELECT module_id, module_name, zone_name, last_seen
            FROM (
                SELECT DISTINCT ON (mh.module_id)
                    mh.module_id AS module_id,
                    m.name AS module_name,
                    z.name AS zone_name,
                    ms.slug AS status_slug,
                    mh.created_at AS last_seen
                FROM module_history mh
                JOIN modules m ON m.id = mh.module_id
                JOIN spaces s ON s.id = m.space_id
                JOIN zones z ON z.id = s.zone_id
                JOIN module_statuses ms ON ms.id = mh.status_id
                WHERE mh.created_at >= $1 AND mh.created_at <= $2
                ORDER BY mh.module_id, mh.created_at DESC
            ) latest
            WHERE latest.status_slug = $3
            ORDER BY module_id
            "#,
        )
        .bind(since)
        .bind(now)
        .bind(status_slug)
        .fetch_all(&self.pool)
        .await
        .context("querying latest module statuses")?;

        Ok(rows
            .into_iter()
            .map(|row| FaultyUnit {
                unit_id: models::Id(row.module_id),
                name: row.module_name,
                zone_name: row.zone_name,
                hours_since_last_fault: (now - row.last_seen).num_hours().max(0),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn consumption_window<'s>(
        &'s self,
        now: DateTime<Utc>,
        recent: std::time::Duration,
        baseline: std::time::Duration,
    ) -> anyhow::Result<ConsumptionWindow> {
        let recent_start = window_start(now, recent)?;
        let baseline_start = window_start(recent_start, baseline)?;
        let baseline_days = baseline.as_secs_f64() / 86_400.0;

        if baseline_days <= 0.0 {
            anyhow::bail!("consumption baseline window must be positive");
        }

        let last_24h = sum_consumption(&self.pool, recent_start, now)
            .await
            .context("summing recent consumption")?;
        let baseline_total = sum_consumption(&self.pool, baseline_start, recent_start)
            .await
            .context("summing baseline consumption")?;

        Ok(ConsumptionWindow {
            last_24h,
            avg_daily_30d: baseline_total / baseline_days,
        })
    }

    async fn units_in_category<'s>(&'s self, category: &'s str) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM modules m
            JOIN spaces s ON s.id = m.space_id
            JOIN zones z ON z.id = s.zone_id
            WHERE z.name ILIKE $1
            "#,
        )
        .bind(format!("%{category}%"))
        .fetch_one(&self.pool)
        .await
        .context("counting units in category")?;

        Ok(count as usize)
    }
}

async fn sum_consumption(
    pool: &sqlx::PgPool,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> sqlx::Result<f64> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(energy_consumption), 0)::FLOAT8
        FROM module_history
        WHERE created_at >= $1 AND created_at < $2
        AND energy_consumption IS NOT NULL
        "#,
    )
    .bind(from)
    .bind(until)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(
            window_start(now, Duration::from_secs(86_400)).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );

        let err = window_start(now, Duration::from_secs(300_000 * 365 * 86_400)).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
        assert!(window_start(now, Duration::MAX).is_err());
    }
}
