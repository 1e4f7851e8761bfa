use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, Result};
use crate::schedule::{ScheduleOption, WeekId};

/// A manager option saved for a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOption {
    pub option_number: i64,
    pub is_selected: bool,
    pub schedule: ScheduleOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedSchedule {
    pub week: WeekId,
    pub schedule: ScheduleOption,
    pub updated_at: String,
}

#[derive(FromRow)]
struct OptionRow {
    option_number: i64,
    is_selected: bool,
    schedule_data: String,
}

#[derive(FromRow)]
struct PublishedRow {
    schedule_data: String,
    updated_at: String,
}

pub struct ScheduleStore {
    pool: SqlitePool,
}

impl ScheduleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn options_for_week(&self, week: WeekId) -> Result<Vec<StoredOption>> {
        let rows = sqlx::query_as::<_, OptionRow>(
            "SELECT option_number, is_selected, schedule_data
             FROM manager_schedules WHERE week = ?1 ORDER BY option_number",
        )
        .bind(week.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StoredOption> {
                Ok(StoredOption {
                    option_number: row.option_number,
                    is_selected: row.is_selected,
                    schedule: serde_json::from_str(&row.schedule_data)?,
                })
            })
            .collect()
    }

    /// Stores the manager's options as numbers 1..=n, flagging exactly one as selected.
    pub async fn save_options(
        &self,
        week: WeekId,
        options: &[ScheduleOption],
        selected_index: usize,
    ) -> Result<()> {
        if selected_index >= options.len() {
            return Err(AppError::Validation(format!(
                "Selected option {} out of range for {} options",
                selected_index,
                options.len()
            )));
        }

        let week_str = week.to_string();
        let mut tx = self.pool.begin().await?;

        for (index, option) in options.iter().enumerate() {
            let option_number = i64::try_from(index + 1)
                .map_err(|_| AppError::Validation("Too many options".to_string()))?;
            sqlx::query(
                "INSERT INTO manager_schedules
                    (week, year, iso_week, schedule_data, option_number, is_selected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (week, option_number)
                 DO UPDATE SET schedule_data = excluded.schedule_data,
                               is_selected = excluded.is_selected",
            )
            .bind(&week_str)
            .bind(i64::from(week.year()))
            .bind(i64::from(week.iso_week()))
            .bind(serde_json::to_string(option)?)
            .bind(option_number)
            .bind(index == selected_index)
            .execute(&mut *tx)
            .await?;
        }

        // Options left over from an earlier, longer save must not stay selected.
        sqlx::query("UPDATE manager_schedules SET is_selected = 0 WHERE week = ?1 AND option_number > ?2")
            .bind(&week_str)
            .bind(i64::try_from(options.len()).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(week = %week, options = options.len(), selected = selected_index + 1, "Manager schedules saved");

        Ok(())
    }

    /// The option flagged selected for a week, if any.
    pub async fn selected(&self, week: WeekId) -> Result<Option<ScheduleOption>> {
        let data = sqlx::query_scalar::<_, String>(
            "SELECT schedule_data FROM manager_schedules
             WHERE week = ?1 AND is_selected = 1
             ORDER BY option_number LIMIT 1",
        )
        .bind(week.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(data
            .map(|json| serde_json::from_str::<ScheduleOption>(&json))
            .transpose()?)
    }

    pub async fn publish(&self, week: WeekId, schedule: &ScheduleOption) -> Result<()> {
        sqlx::query(
            "INSERT INTO published_schedules (week, schedule_data)
             VALUES (?1, ?2)
             ON CONFLICT (week)
             DO UPDATE SET schedule_data = excluded.schedule_data,
                           updated_at = CURRENT_TIMESTAMP",
        )
        .bind(week.to_string())
        .bind(serde_json::to_string(schedule)?)
        .execute(&self.pool)
        .await?;

        tracing::info!(week = %week, filled = schedule.filled_count(), "Schedule published");
        Ok(())
    }

    pub async fn published(&self, week: WeekId) -> Result<Option<PublishedSchedule>> {
        let row = sqlx::query_as::<_, PublishedRow>(
            "SELECT schedule_data, updated_at FROM published_schedules WHERE week = ?1",
        )
        .bind(week.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<PublishedSchedule> {
            Ok(PublishedSchedule {
                week,
                schedule: serde_json::from_str(&row.schedule_data)?,
                updated_at: row.updated_at,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Day, Shift};
    use crate::store::memory_pool;

    fn week() -> WeekId {
        "2025-03-03".parse().unwrap()
    }

    fn option_with(employee_id: i64) -> ScheduleOption {
        let mut option = ScheduleOption::empty();
        option.set(Day::Monday, Shift::Early, Some(employee_id));
        option
    }

    #[tokio::test]
    async fn save_and_reload_options() {
        let store = ScheduleStore::new(memory_pool().await);
        store
            .save_options(week(), &[option_with(1), option_with(2)], 1)
            .await
            .unwrap();

        let stored = store.options_for_week(week()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].option_number, 1);
        assert!(!stored[0].is_selected);
        assert!(stored[1].is_selected);
        assert_eq!(stored[1].schedule, option_with(2));

        assert_eq!(store.selected(week()).await.unwrap(), Some(option_with(2)));
    }

    #[tokio::test]
    async fn resaving_updates_in_place() {
        let store = ScheduleStore::new(memory_pool().await);
        store.save_options(week(), &[option_with(1), option_with(2)], 0).await.unwrap();
        store.save_options(week(), &[option_with(3), option_with(4)], 1).await.unwrap();

        let stored = store.options_for_week(week()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].schedule, option_with(3));
        assert_eq!(stored.iter().filter(|o| o.is_selected).count(), 1);
        assert_eq!(store.selected(week()).await.unwrap(), Some(option_with(4)));
    }

    #[tokio::test]
    async fn shorter_resave_clears_stale_selection() {
        let store = ScheduleStore::new(memory_pool().await);
        store.save_options(week(), &[option_with(1), option_with(2)], 1).await.unwrap();
        store.save_options(week(), &[option_with(5)], 0).await.unwrap();

        let stored = store.options_for_week(week()).await.unwrap();
        assert_eq!(stored.iter().filter(|o| o.is_selected).count(), 1);
        assert_eq!(store.selected(week()).await.unwrap(), Some(option_with(5)));
    }

    #[tokio::test]
    async fn out_of_range_selection_is_rejected() {
        let store = ScheduleStore::new(memory_pool().await);
        let err = store.save_options(week(), &[option_with(1)], 1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.options_for_week(week()).await.unwrap().is_empty());
        assert_eq!(store.selected(week()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn publish_upserts_per_week() {
        let store = ScheduleStore::new(memory_pool().await);
        assert!(store.published(week()).await.unwrap().is_none());

        store.publish(week(), &option_with(7)).await.unwrap();
        store.publish(week(), &option_with(8)).await.unwrap();

        let published = store.published(week()).await.unwrap().unwrap();
        assert_eq!(published.week, week());
        assert_eq!(published.schedule, option_with(8));
    }
}
