use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Lifecycle of a ticket. Declared in workflow order, but any target status
/// is accepted on update; transitions are not restricted to forward moves.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Closed,
}

/// Category of broken equipment, assigned once at creation by the classifier.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "issue_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssueType {
    Fan,
    Light,
    Furniture,
    Electronics,
    Electrical,
    #[default]
    Other,
}

/// Urgency tier derived from description keywords.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Ticket {
    pub id: i64,
    pub user_id: i64,
    pub student_name: String,
    pub location: String,
    pub issue_type: IssueType,
    pub description: String,
    pub image_path: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
}

/// Insert payload assembled by the ticket pipeline. Status always starts at
/// pending; classification fields are populated before the row exists.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub user_id: i64,
    pub student_name: String,
    pub location: String,
    pub issue_type: IssueType,
    pub description: String,
    pub image_path: String,
    pub priority: TicketPriority,
}

/// Partial edit of ticket fields. Status is deliberately absent: it moves
/// only through the status update operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTicketFields {
    pub student_name: Option<String>,
    pub location: Option<String>,
    pub issue_type: Option<IssueType>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
}

impl Ticket {
    pub async fn create(pool: &SqlitePool, data: &CreateTicket) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"INSERT INTO tickets (user_id, student_name, location, issue_type, description, image_path, priority)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, user_id, student_name, location, issue_type, description, image_path, status, priority, created_at"#,
        )
        .bind(data.user_id)
        .bind(&data.student_name)
        .bind(&data.location)
        .bind(&data.issue_type)
        .bind(&data.description)
        .bind(&data.image_path)
        .bind(&data.priority)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"SELECT id, user_id, student_name, location, issue_type, description, image_path, status, priority, created_at
               FROM tickets
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All tickets, newest first (id breaks created_at ties).
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"SELECT id, user_id, student_name, location, issue_type, description, image_path, status, priority, created_at
               FROM tickets
               ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_user_id(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"SELECT id, user_id, student_name, location, issue_type, description, image_path, status, priority, created_at
               FROM tickets
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Overwrite the status column only. Returns the number of rows touched
    /// so callers can distinguish a missing ticket.
    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: TicketStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_fields(
        pool: &SqlitePool,
        id: i64,
        fields: &UpdateTicketFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"UPDATE tickets
               SET student_name = COALESCE($2, student_name),
                   location     = COALESCE($3, location),
                   issue_type   = COALESCE($4, issue_type),
                   description  = COALESCE($5, description),
                   priority     = COALESCE($6, priority)
               WHERE id = $1
               RETURNING id, user_id, student_name, location, issue_type, description, image_path, status, priority, created_at"#,
        )
        .bind(id)
        .bind(&fields.student_name)
        .bind(&fields.location)
        .bind(&fields.issue_type)
        .bind(&fields.description)
        .bind(&fields.priority)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::user::{CreateUser, User, UserRole};

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::MIGRATOR.run(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, email: &str) -> User {
        User::create(
            pool,
            &CreateUser {
                email: email.to_string(),
                password_hash: "$argon2id$stub".to_string(),
                full_name: "Test Student".to_string(),
                role: UserRole::Student,
            },
        )
        .await
        .unwrap()
    }

    fn fan_ticket(user_id: i64) -> CreateTicket {
        CreateTicket {
            user_id,
            student_name: "Alice".to_string(),
            location: "Block A, Room 101".to_string(),
            issue_type: IssueType::Fan,
            description: "Ceiling fan blade is severely bent and broken.".to_string(),
            image_path: "uploads/fan.jpg".to_string(),
            priority: TicketPriority::High,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice@reva.edu.in").await;

        let created = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();
        assert_eq!(created.status, TicketStatus::Pending);
        assert_eq!(created.issue_type, IssueType::Fan);
        assert_eq!(created.priority, TicketPriority::High);

        let fetched = Ticket::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice@reva.edu.in").await;

        let first = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();
        let second = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();

        let all = Ticket::find_all(&pool).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn update_status_touches_only_status() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice@reva.edu.in").await;
        let created = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();

        let rows = Ticket::update_status(&pool, created.id, TicketStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let updated = Ticket::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.priority, created.priority);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_status_reports_missing_ticket() {
        let pool = test_pool().await;
        let rows = Ticket::update_status(&pool, 999, TicketStatus::Closed)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn update_fields_is_partial_and_never_moves_status() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice@reva.edu.in").await;
        let created = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();

        let updated = Ticket::update_fields(
            &pool,
            created.id,
            &UpdateTicketFields {
                location: Some("Block B, Lab 2".to_string()),
                priority: Some(TicketPriority::Low),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.location, "Block B, Lab 2");
        assert_eq!(updated.priority, TicketPriority::Low);
        assert_eq!(updated.student_name, created.student_name);
        assert_eq!(updated.status, created.status);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice@reva.edu.in").await;
        let created = Ticket::create(&pool, &fan_ticket(user.id)).await.unwrap();

        assert_eq!(Ticket::delete(&pool, created.id).await.unwrap(), 1);
        assert!(Ticket::find_by_id(&pool, created.id).await.unwrap().is_none());
        assert_eq!(Ticket::delete(&pool, created.id).await.unwrap(), 0);
    }

    #[test]
    fn status_strings_use_snake_case() {
        use std::str::FromStr;

        assert_eq!(TicketStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            TicketStatus::from_str("in_progress").unwrap(),
            TicketStatus::InProgress
        );
        assert!(TicketStatus::from_str("reopened").is_err());
    }
}
