use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;
use crate::schedule::{AvailabilityEntry, AvailabilityStatus, Day, Shift, WeekAvailability, WeekId};

/// One of a user's own saved cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRecord {
    pub day: Day,
    pub shift: Shift,
    pub status: AvailabilityStatus,
}

#[derive(FromRow)]
struct OwnRow {
    day_of_week: i64,
    start_time: String,
    end_time: String,
    status: i64,
}

#[derive(FromRow)]
struct WeekRow {
    user_id: i64,
    name: String,
    day_of_week: i64,
    start_time: String,
    end_time: String,
    status: i64,
}

/// Resolves the stored day and shift columns; rows outside the fixed grid are skipped.
fn resolve_cell(day_of_week: i64, start_time: &str, end_time: &str) -> Option<(Day, Shift)> {
    let cell = Day::from_number(day_of_week).zip(Shift::from_times(start_time, end_time));
    if cell.is_none() {
        tracing::warn!(day_of_week, start_time, end_time, "Skipping availability outside the shift grid");
    }
    cell
}

pub struct AvailabilityStore {
    pool: SqlitePool,
}

impl AvailabilityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts one user's cells for a week. Either every cell is written or none is.
    pub async fn save_week(
        &self,
        user_id: i64,
        week: WeekId,
        cells: &[(Day, Shift, AvailabilityStatus)],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let week_str = week.to_string();

        for (day, shift, status) in cells {
            sqlx::query(
                "INSERT INTO availability
                    (user_id, week, day_of_week, start_time, end_time, status, year, iso_week)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (user_id, week, day_of_week, start_time, end_time)
                 DO UPDATE SET status = excluded.status,
                               year = excluded.year,
                               iso_week = excluded.iso_week",
            )
            .bind(user_id)
            .bind(&week_str)
            .bind(day.number())
            .bind(shift.start_time())
            .bind(shift.end_time())
            .bind(i64::from(u8::from(*status)))
            .bind(i64::from(week.year()))
            .bind(i64::from(week.iso_week()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id, week = %week, cells = cells.len(), "Availability saved");

        Ok(cells.len())
    }

    /// The caller's own cells for a week, in day then shift order.
    pub async fn for_user(&self, user_id: i64, week: WeekId) -> Result<Vec<AvailabilityRecord>> {
        let rows = sqlx::query_as::<_, OwnRow>(
            "SELECT day_of_week, start_time, end_time, status
             FROM availability
             WHERE user_id = ?1 AND week = ?2
             ORDER BY day_of_week, start_time",
        )
        .bind(user_id)
        .bind(week.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some((day, shift)) = resolve_cell(row.day_of_week, &row.start_time, &row.end_time) {
                records.push(AvailabilityRecord {
                    day,
                    shift,
                    status: AvailabilityStatus::try_from(row.status)?,
                });
            }
        }
        Ok(records)
    }

    /// Every employee's availability for a week, ready for the generator.
    pub async fn week_availability(&self, week: WeekId) -> Result<WeekAvailability> {
        let rows = sqlx::query_as::<_, WeekRow>(
            "SELECT a.user_id,
                    COALESCE(u.name, u.username, u.email) AS name,
                    a.day_of_week, a.start_time, a.end_time, a.status
             FROM availability a
             JOIN users u ON a.user_id = u.id
             WHERE a.week = ?1 AND u.role = 'employee'
             ORDER BY name, a.user_id",
        )
        .bind(week.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut availability = WeekAvailability::new();
        for row in rows {
            let Some((day, shift)) = resolve_cell(row.day_of_week, &row.start_time, &row.end_time) else {
                continue;
            };
            availability.insert(
                day,
                shift,
                AvailabilityEntry {
                    employee_id: row.user_id,
                    employee_name: row.name,
                    status: AvailabilityStatus::try_from(row.status)?,
                },
            );
        }

        tracing::debug!(week = %week, "Loaded week availability");
        Ok(availability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory_pool, NewUser, Role, UserStore};

    async fn setup() -> (AvailabilityStore, UserStore) {
        let pool = memory_pool().await;
        (AvailabilityStore::new(pool.clone()), UserStore::new(pool, 4))
    }

    async fn add_user(users: &UserStore, email: &str, name: &str, role: Role) -> i64 {
        users
            .create(&NewUser {
                email: email.into(),
                password: Some("pw".into()),
                name: Some(name.into()),
                username: None,
                role,
            })
            .await
            .unwrap()
            .id
    }

    fn week() -> WeekId {
        "2024-11-04".parse().unwrap()
    }

    #[tokio::test]
    async fn save_then_resave_upserts_cells() {
        let (store, users) = setup().await;
        let id = add_user(&users, "e@example.com", "Eve", Role::Employee).await;

        store
            .save_week(
                id,
                week(),
                &[
                    (Day::Monday, Shift::Early, AvailabilityStatus::Available),
                    (Day::Monday, Shift::Late, AvailabilityStatus::CantWork),
                ],
            )
            .await
            .unwrap();
        store
            .save_week(id, week(), &[(Day::Monday, Shift::Early, AvailabilityStatus::Preferred)])
            .await
            .unwrap();

        let records = store.for_user(id, week()).await.unwrap();
        assert_eq!(
            records,
            vec![
                AvailabilityRecord {
                    day: Day::Monday,
                    shift: Shift::Early,
                    status: AvailabilityStatus::Preferred
                },
                AvailabilityRecord {
                    day: Day::Monday,
                    shift: Shift::Late,
                    status: AvailabilityStatus::CantWork
                },
            ]
        );
    }

    #[tokio::test]
    async fn weeks_are_kept_apart() {
        let (store, users) = setup().await;
        let id = add_user(&users, "f@example.com", "Finn", Role::Employee).await;
        store
            .save_week(id, week(), &[(Day::Sunday, Shift::Middle, AvailabilityStatus::Available)])
            .await
            .unwrap();

        let next: WeekId = "2024-11-11".parse().unwrap();
        assert!(store.for_user(id, next).await.unwrap().is_empty());
        assert!(store.week_availability(next).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn week_availability_only_includes_employees() {
        let (store, users) = setup().await;
        let employee = add_user(&users, "g@example.com", "Gus", Role::Employee).await;
        let manager = add_user(&users, "m@example.com", "Mona", Role::Manager).await;
        for user in [employee, manager] {
            store
                .save_week(user, week(), &[(Day::Friday, Shift::Late, AvailabilityStatus::Preferred)])
                .await
                .unwrap();
        }

        let availability = store.week_availability(week()).await.unwrap();
        let entries = availability.entries(Day::Friday, Shift::Late);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].employee_id, employee);
        assert_eq!(entries[0].employee_name, "Gus");
    }

    #[tokio::test]
    async fn failed_save_rolls_back_every_cell() {
        let pool = memory_pool().await;
        let store = AvailabilityStore::new(pool.clone());
        let users = UserStore::new(pool.clone(), 4);
        let id = add_user(&users, "h@example.com", "Hana", Role::Employee).await;

        store
            .save_week(id, week(), &[(Day::Monday, Shift::Early, AvailabilityStatus::CantWork)])
            .await
            .unwrap();

        // Wednesday rows fail after Monday and Tuesday were already written.
        sqlx::query(
            "CREATE TRIGGER reject_wednesday BEFORE INSERT ON availability
             WHEN NEW.day_of_week = 3
             BEGIN SELECT RAISE(ABORT, 'wednesday rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = store
            .save_week(
                id,
                week(),
                &[
                    (Day::Monday, Shift::Early, AvailabilityStatus::Preferred),
                    (Day::Tuesday, Shift::Middle, AvailabilityStatus::Available),
                    (Day::Wednesday, Shift::Late, AvailabilityStatus::Available),
                ],
            )
            .await;
        assert!(result.is_err());

        let records = store.for_user(id, week()).await.unwrap();
        assert_eq!(
            records,
            vec![AvailabilityRecord {
                day: Day::Monday,
                shift: Shift::Early,
                status: AvailabilityStatus::CantWork
            }]
        );
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let (store, _users) = setup().await;
        let result = store
            .save_week(999, week(), &[(Day::Monday, Shift::Early, AvailabilityStatus::Available)])
            .await;
        assert!(result.is_err());
        assert!(store.for_user(999, week()).await.unwrap().is_empty());
    }
}
