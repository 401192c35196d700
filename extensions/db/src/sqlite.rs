//! SQLite record store, used as the local cache and for single-node setups.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use packtrack_core::attendance::{AttendanceQuery, AttendanceRecord};
use packtrack_core::daily_log::{DailyLog, DailyLogQuery};
use packtrack_core::package::{SortField, SortOrder};
use packtrack_core::{PackageQuery, PackageRecord, PackageStatus};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    code TEXT PRIMARY KEY NOT NULL,
    status TEXT NOT NULL,
    weight TEXT,
    packer_name TEXT,
    shipping_location TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS packages_status_idx ON packages (status);
CREATE TABLE IF NOT EXISTS attendance (
    worker_name TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    check_in TEXT,
    check_out TEXT,
    notes TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (worker_name, date)
);
CREATE TABLE IF NOT EXISTS daily_logs (
    kind TEXT NOT NULL,
    date TEXT NOT NULL,
    area TEXT NOT NULL,
    photo_url TEXT NOT NULL,
    notes TEXT,
    result TEXT,
    recorded_by TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (kind, date, area)
);
"#;

const PACKAGE_COLUMNS: &str =
    "code, status, weight, packer_name, shipping_location, created_at, updated_at";

/// SQLite-backed `RecordStore`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema if needed.
    ///
    /// In-memory URLs get a single connection so every query sees the same
    /// database.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Get the underlying `sqlx::SqlitePool`.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn package_from_row(row: &SqliteRow) -> StoreResult<PackageRecord> {
    Ok(PackageRecord {
        code: row.try_get("code")?,
        status: PackageStatus::parse(&row.try_get::<String, _>("status")?),
        weight: row.try_get("weight")?,
        packer_name: row.try_get("packer_name")?,
        shipping_location: row.try_get("shipping_location")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn attendance_from_row(row: &SqliteRow) -> StoreResult<AttendanceRecord> {
    let status: String = row.try_get("status")?;
    Ok(AttendanceRecord {
        worker_name: row.try_get("worker_name")?,
        date: row.try_get::<NaiveDate, _>("date")?,
        status: status
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("{e}")))?,
        check_in: row.try_get::<Option<NaiveTime>, _>("check_in")?,
        check_out: row.try_get::<Option<NaiveTime>, _>("check_out")?,
        notes: row.try_get("notes")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn daily_log_from_row(row: &SqliteRow) -> StoreResult<DailyLog> {
    let kind: String = row.try_get("kind")?;
    Ok(DailyLog {
        kind: kind
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("{e}")))?,
        date: row.try_get::<NaiveDate, _>("date")?,
        area: row.try_get("area")?,
        photo_url: row.try_get("photo_url")?,
        notes: row.try_get("notes")?,
        result: row.try_get("result")?,
        recorded_by: row.try_get("recorded_by")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn push_prefix_filter(builder: &mut QueryBuilder<'_, Sqlite>, prefix: &str) {
    builder
        .push(" AND substr(code, 1, ")
        .push_bind(prefix.chars().count() as i64)
        .push(") = ")
        .push_bind(prefix.to_string());
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO packages (code, status, weight, packer_name, shipping_location, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.code)
        .bind(record.status.as_str())
        .bind(&record.weight)
        .bind(&record.packer_name)
        .bind(&record.shipping_location)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO packages (code, status, weight, packer_name, shipping_location, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (code) DO UPDATE SET \
                status = excluded.status, \
                weight = excluded.weight, \
                packer_name = excluded.packer_name, \
                shipping_location = excluded.shipping_location, \
                created_at = excluded.created_at, \
                updated_at = excluded.updated_at",
        )
        .bind(&record.code)
        .bind(record.status.as_str())
        .bind(&record.weight)
        .bind(&record.packer_name)
        .bind(&record.shipping_location)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_package(&self, code: &str) -> StoreResult<Option<PackageRecord>> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE code = ?");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(package_from_row).transpose()
    }

    async fn save_package(&self, record: &PackageRecord) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE packages SET status = ?, weight = ?, packer_name = ?, shipping_location = ?, updated_at = ? \
             WHERE code = ?",
        )
        .bind(record.status.as_str())
        .bind(&record.weight)
        .bind(&record.packer_name)
        .bind(&record.shipping_location)
        .bind(record.updated_at)
        .bind(&record.code)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.code.clone()));
        }
        Ok(())
    }

    async fn list_packages(&self, query: &PackageQuery) -> StoreResult<Vec<PackageRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE 1 = 1"
        ));
        if let Some(status) = &query.status {
            builder
                .push(" AND status = ")
                .push_bind(status.as_str().to_string());
        }
        if let Some(prefix) = &query.code_prefix {
            push_prefix_filter(&mut builder, prefix);
        }
        if let Some(from) = query.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = query.created_to {
            builder.push(" AND created_at <= ").push_bind(to);
        }
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let order_by = match query.sort {
            SortField::CreatedAt => format!(" ORDER BY created_at {direction}, code {direction}"),
            SortField::UpdatedAt => format!(" ORDER BY updated_at {direction}, code {direction}"),
            SortField::Code => format!(" ORDER BY code {direction}"),
        };
        builder
            .push(order_by)
            .push(" LIMIT ")
            .push_bind(i64::from(query.effective_limit()));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(package_from_row).collect()
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(PackageStatus, u64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM packages GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let n: i64 = row.try_get("n")?;
                Ok((PackageStatus::parse(&status), n.max(0) as u64))
            })
            .collect()
    }

    async fn count_codes_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM packages WHERE 1 = 1");
        push_prefix_filter(&mut builder, prefix);
        let row = builder.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        sqlx::query(
            "INSERT INTO attendance (worker_name, date, status, check_in, check_out, notes, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (worker_name, date) DO UPDATE SET \
                status = excluded.status, \
                check_in = excluded.check_in, \
                check_out = excluded.check_out, \
                notes = excluded.notes, \
                updated_at = excluded.updated_at",
        )
        .bind(&record.worker_name)
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(&record.notes)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(record.clone())
    }

    async fn list_attendance(&self, query: &AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT worker_name, date, status, check_in, check_out, notes, updated_at \
             FROM attendance WHERE 1 = 1",
        );
        if let Some(date) = query.date {
            builder.push(" AND date = ").push_bind(date);
        }
        if let Some(worker) = &query.worker {
            builder.push(" AND worker_name = ").push_bind(worker.clone());
        }
        builder.push(" ORDER BY date DESC, worker_name ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(attendance_from_row).collect()
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        sqlx::query(
            "INSERT INTO daily_logs (kind, date, area, photo_url, notes, result, recorded_by, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (kind, date, area) DO UPDATE SET \
                photo_url = excluded.photo_url, \
                notes = excluded.notes, \
                result = excluded.result, \
                recorded_by = excluded.recorded_by, \
                updated_at = excluded.updated_at",
        )
        .bind(log.kind.as_str())
        .bind(log.date)
        .bind(&log.area)
        .bind(&log.photo_url)
        .bind(&log.notes)
        .bind(&log.result)
        .bind(&log.recorded_by)
        .bind(log.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(log.clone())
    }

    async fn list_daily_logs(&self, query: &DailyLogQuery) -> StoreResult<Vec<DailyLog>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT kind, date, area, photo_url, notes, result, recorded_by, updated_at \
             FROM daily_logs WHERE 1 = 1",
        );
        if let Some(kind) = query.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(date) = query.date {
            builder.push(" AND date = ").push_bind(date);
        }
        builder.push(" ORDER BY date DESC, kind ASC, area ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(daily_log_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use packtrack_core::attendance::AttendanceStatus;
    use packtrack_core::daily_log::LogKind;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap() + Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn test_package_roundtrip_and_save() {
        let store = store().await;
        let mut record = PackageRecord::new("20261018-0001", at(0));
        store.insert_package(&record).await.unwrap();

        record.status = PackageStatus::Packed;
        record.weight = Some("1.5kg".into());
        record.updated_at = at(3);
        store.save_package(&record).await.unwrap();

        let loaded = store.get_package("20261018-0001").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(store.get_package("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_a_conflict() {
        let store = store().await;
        let record = PackageRecord::new("20261018-0001", at(0));
        store.insert_package(&record).await.unwrap();
        assert!(matches!(
            store.insert_package(&record).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_save_unknown_code_is_not_found() {
        let store = store().await;
        let record = PackageRecord::new("20261018-0009", at(0));
        assert_eq!(
            store.save_package(&record).await,
            Err(StoreError::NotFound("20261018-0009".into()))
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = store().await;
        for i in 0..4 {
            let mut record = PackageRecord::new(format!("20261018-000{}", i + 1), at(i));
            if i >= 2 {
                record.status = PackageStatus::Dispatched;
            }
            store.insert_package(&record).await.unwrap();
        }
        store
            .insert_package(&PackageRecord::new("20261019-0001", at(10)))
            .await
            .unwrap();

        let dispatched = store
            .list_packages(&PackageQuery::with_status(PackageStatus::Dispatched))
            .await
            .unwrap();
        let codes: Vec<&str> = dispatched.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["20261018-0004", "20261018-0003"]);

        let query = PackageQuery {
            code_prefix: Some("20261018-".into()),
            sort: SortField::Code,
            order: SortOrder::Asc,
            limit: Some(2),
            ..PackageQuery::default()
        };
        let codes: Vec<String> = store
            .list_packages(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, vec!["20261018-0001", "20261018-0002"]);

        assert_eq!(store.count_codes_with_prefix("20261018-").await.unwrap(), 4);

        let mut counts = store.count_by_status().await.unwrap();
        counts.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        assert_eq!(
            counts,
            vec![(PackageStatus::Dispatched, 2), (PackageStatus::Pending, 3)]
        );
    }

    #[tokio::test]
    async fn test_unknown_stored_status_is_preserved() {
        let store = store().await;
        let mut record = PackageRecord::new("LEGACY-1", at(0));
        record.status = PackageStatus::Other("ON_HOLD".into());
        store.insert_package(&record).await.unwrap();

        let loaded = store.get_package("LEGACY-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, PackageStatus::Other("ON_HOLD".into()));
    }

    #[tokio::test]
    async fn test_attendance_upsert_uses_conflict_key() {
        let store = store().await;
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut record = AttendanceRecord {
            worker_name: "Ravi".into(),
            date,
            status: AttendanceStatus::Present,
            check_in: NaiveTime::from_hms_opt(9, 0, 0),
            check_out: None,
            notes: None,
            updated_at: at(0),
        };
        store.upsert_attendance(&record).await.unwrap();
        record.check_out = NaiveTime::from_hms_opt(17, 0, 0);
        record.updated_at = at(480);
        store.upsert_attendance(&record).await.unwrap();

        let other_day = AttendanceRecord {
            date: date.pred_opt().unwrap(),
            ..record.clone()
        };
        store.upsert_attendance(&other_day).await.unwrap();

        let rows = store
            .list_attendance(&AttendanceQuery {
                date: Some(date),
                worker: None,
            })
            .await
            .unwrap();
        assert_eq!(rows, vec![record]);

        let all = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, date);
    }

    #[tokio::test]
    async fn test_daily_log_upsert_replaces_photo() {
        let store = store().await;
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut log = DailyLog {
            kind: LogKind::Hygiene,
            date,
            area: "Cold room".into(),
            photo_url: "https://cdn.example/a.jpg".into(),
            notes: None,
            result: None,
            recorded_by: Some("Meera".into()),
            updated_at: at(0),
        };
        store.upsert_daily_log(&log).await.unwrap();
        log.photo_url = "https://cdn.example/b.jpg".into();
        store.upsert_daily_log(&log).await.unwrap();

        let lab = DailyLog {
            kind: LogKind::LabTest,
            area: "Moisture".into(),
            result: Some("12%".into()),
            ..log.clone()
        };
        store.upsert_daily_log(&lab).await.unwrap();

        let hygiene = store
            .list_daily_logs(&DailyLogQuery {
                kind: Some(LogKind::Hygiene),
                date: None,
            })
            .await
            .unwrap();
        assert_eq!(hygiene, vec![log]);
        assert_eq!(
            store.list_daily_logs(&DailyLogQuery::default()).await.unwrap().len(),
            2
        );
    }
}
