//! Role-gated operations over existing tickets. Every permission decision
//! for reads, status moves, edits and deletes lives here, not in the routes.

use std::{path::Path, str::FromStr};

use db::models::{
    ticket::{Ticket, TicketStatus, UpdateTicketFields},
    user::UserRole,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use super::image_store::ImageStore;

#[derive(Debug, Error)]
pub enum TicketServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("ticket not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
}

/// Caller identity resolved from the bearer token by the request layer.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i64,
    pub role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

pub struct TicketService;

impl TicketService {
    /// Students see their own tickets; admins see everything.
    pub async fn list(pool: &SqlitePool, caller: &Caller) -> Result<Vec<Ticket>, TicketServiceError> {
        let tickets = if caller.is_admin() {
            Ticket::find_all(pool).await?
        } else {
            Ticket::find_by_user_id(pool, caller.user_id).await?
        };
        Ok(tickets)
    }

    /// Single-ticket reads follow the same visibility rule as listing: a
    /// ticket outside the caller's scope is indistinguishable from a
    /// missing one.
    pub async fn get(
        pool: &SqlitePool,
        caller: &Caller,
        id: i64,
    ) -> Result<Ticket, TicketServiceError> {
        let ticket = Ticket::find_by_id(pool, id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        if !caller.is_admin() && ticket.user_id != caller.user_id {
            return Err(TicketServiceError::NotFound);
        }
        Ok(ticket)
    }

    /// Admin-only status overwrite. Any of the four statuses is accepted as
    /// a target regardless of the current one.
    pub async fn update_status(
        pool: &SqlitePool,
        caller: &Caller,
        id: i64,
        status_raw: &str,
    ) -> Result<Ticket, TicketServiceError> {
        if !caller.is_admin() {
            return Err(TicketServiceError::Forbidden(
                "only admins can update ticket status".to_string(),
            ));
        }
        let status = TicketStatus::from_str(status_raw)
            .map_err(|_| TicketServiceError::InvalidStatus(status_raw.to_string()))?;

        let rows = Ticket::update_status(pool, id, status.clone()).await?;
        if rows == 0 {
            return Err(TicketServiceError::NotFound);
        }
        info!(ticket_id = id, status = %status, "ticket status updated");

        Ticket::find_by_id(pool, id)
            .await?
            .ok_or(TicketServiceError::NotFound)
    }

    /// Field edit by the ticket owner or an admin. Status is out of reach
    /// here by construction of `UpdateTicketFields`.
    pub async fn update_fields(
        pool: &SqlitePool,
        caller: &Caller,
        id: i64,
        fields: &UpdateTicketFields,
    ) -> Result<Ticket, TicketServiceError> {
        let ticket = Ticket::find_by_id(pool, id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        if !caller.is_admin() && ticket.user_id != caller.user_id {
            return Err(TicketServiceError::Forbidden(
                "only the ticket owner or an admin can edit a ticket".to_string(),
            ));
        }

        Ticket::update_fields(pool, id, fields)
            .await?
            .ok_or(TicketServiceError::NotFound)
    }

    /// Admin-only delete; removes the stored upload along with the row.
    pub async fn delete(
        pool: &SqlitePool,
        caller: &Caller,
        images: &ImageStore,
        id: i64,
    ) -> Result<(), TicketServiceError> {
        if !caller.is_admin() {
            return Err(TicketServiceError::Forbidden(
                "only admins can delete tickets".to_string(),
            ));
        }
        let ticket = Ticket::find_by_id(pool, id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;

        let rows = Ticket::delete(pool, id).await?;
        if rows == 0 {
            return Err(TicketServiceError::NotFound);
        }

        if let Err(e) = images.remove(Path::new(&ticket.image_path)).await {
            warn!(
                ticket_id = id,
                path = %ticket.image_path,
                error = %e,
                "ticket deleted but its upload could not be removed"
            );
        }
        info!(ticket_id = id, "ticket deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        ticket::{CreateTicket, IssueType, TicketPriority},
        user::{CreateUser, User, UserRole},
    };
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::MIGRATOR.run(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, email: &str, role: UserRole) -> Caller {
        let user = User::create(
            pool,
            &CreateUser {
                email: email.to_string(),
                password_hash: "$argon2id$stub".to_string(),
                full_name: email.to_string(),
                role: role.clone(),
            },
        )
        .await
        .unwrap();
        Caller {
            user_id: user.id,
            role,
        }
    }

    async fn seed_ticket(pool: &SqlitePool, owner: &Caller, image_path: &str) -> Ticket {
        Ticket::create(
            pool,
            &CreateTicket {
                user_id: owner.user_id,
                student_name: "Student".to_string(),
                location: "Block A".to_string(),
                issue_type: IssueType::Fan,
                description: "Ceiling fan blade is severely bent.".to_string(),
                image_path: image_path.to_string(),
                priority: TicketPriority::High,
            },
        )
        .await
        .unwrap()
    }

    /// Two users with two tickets each, plus an admin with none.
    async fn fixture(pool: &SqlitePool) -> (Caller, Caller, Caller, Vec<Ticket>) {
        let alice = seed_user(pool, "alice@reva.edu.in", UserRole::Student).await;
        let bob = seed_user(pool, "bob@reva.edu.in", UserRole::Student).await;
        let admin = seed_user(pool, "warden@reva.edu.in", UserRole::Admin).await;

        let mut tickets = Vec::new();
        for (owner, path) in [
            (&alice, "uploads/a1.jpg"),
            (&alice, "uploads/a2.jpg"),
            (&bob, "uploads/b1.jpg"),
            (&bob, "uploads/b2.jpg"),
        ] {
            tickets.push(seed_ticket(pool, owner, path).await);
        }
        (alice, bob, admin, tickets)
    }

    #[tokio::test]
    async fn students_only_see_their_own_tickets() {
        let pool = test_pool().await;
        let (alice, bob, admin, _) = fixture(&pool).await;

        let alice_view = TicketService::list(&pool, &alice).await.unwrap();
        assert_eq!(alice_view.len(), 2);
        assert!(alice_view.iter().all(|t| t.user_id == alice.user_id));
        assert!(alice_view.iter().all(|t| t.user_id != bob.user_id));

        let admin_view = TicketService::list(&pool, &admin).await.unwrap();
        assert_eq!(admin_view.len(), 4);
    }

    #[tokio::test]
    async fn get_hides_foreign_tickets_from_students() {
        let pool = test_pool().await;
        let (alice, _bob, admin, tickets) = fixture(&pool).await;
        let bobs_ticket = tickets.last().unwrap();

        let denied = TicketService::get(&pool, &alice, bobs_ticket.id).await;
        assert!(matches!(denied, Err(TicketServiceError::NotFound)));

        let allowed = TicketService::get(&pool, &admin, bobs_ticket.id).await.unwrap();
        assert_eq!(allowed.id, bobs_ticket.id);
    }

    #[tokio::test]
    async fn student_cannot_update_status() {
        let pool = test_pool().await;
        let (alice, _bob, _admin, tickets) = fixture(&pool).await;
        let own_ticket = &tickets[0];

        let denied =
            TicketService::update_status(&pool, &alice, own_ticket.id, "in_progress").await;
        assert!(matches!(denied, Err(TicketServiceError::Forbidden(_))));

        let unchanged = Ticket::find_by_id(&pool, own_ticket.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, own_ticket.status);
    }

    #[tokio::test]
    async fn admin_updates_status_to_any_target() {
        let pool = test_pool().await;
        let (_alice, _bob, admin, tickets) = fixture(&pool).await;
        let id = tickets[0].id;

        let closed = TicketService::update_status(&pool, &admin, id, "closed").await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);

        // Permissive lifecycle: moving a closed ticket back is allowed.
        let reopened = TicketService::update_status(&pool, &admin, id, "pending").await.unwrap();
        assert_eq!(reopened.status, TicketStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_validates_value_and_existence() {
        let pool = test_pool().await;
        let (_alice, _bob, admin, tickets) = fixture(&pool).await;

        let invalid =
            TicketService::update_status(&pool, &admin, tickets[0].id, "reopened").await;
        assert!(matches!(invalid, Err(TicketServiceError::InvalidStatus(_))));

        let missing = TicketService::update_status(&pool, &admin, 999, "closed").await;
        assert!(matches!(missing, Err(TicketServiceError::NotFound)));
    }

    #[tokio::test]
    async fn field_edit_requires_owner_or_admin() {
        let pool = test_pool().await;
        let (alice, bob, admin, tickets) = fixture(&pool).await;
        let alices_ticket = &tickets[0];

        let edit = UpdateTicketFields {
            location: Some("Block C".to_string()),
            ..Default::default()
        };

        let denied = TicketService::update_fields(&pool, &bob, alices_ticket.id, &edit).await;
        assert!(matches!(denied, Err(TicketServiceError::Forbidden(_))));

        let by_owner = TicketService::update_fields(&pool, &alice, alices_ticket.id, &edit)
            .await
            .unwrap();
        assert_eq!(by_owner.location, "Block C");
        assert_eq!(by_owner.status, alices_ticket.status);

        let by_admin = TicketService::update_fields(
            &pool,
            &admin,
            alices_ticket.id,
            &UpdateTicketFields {
                priority: Some(TicketPriority::Low),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_admin.priority, TicketPriority::Low);
    }

    #[tokio::test]
    async fn delete_is_admin_only_and_removes_upload() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        store.init().await.unwrap();

        let alice = seed_user(&pool, "alice@reva.edu.in", UserRole::Student).await;
        let admin = seed_user(&pool, "warden@reva.edu.in", UserRole::Admin).await;

        let image = store.save("fan.jpg", b"jpeg-bytes").await.unwrap();
        let ticket = seed_ticket(&pool, &alice, &image.to_string_lossy()).await;

        let denied = TicketService::delete(&pool, &alice, &store, ticket.id).await;
        assert!(matches!(denied, Err(TicketServiceError::Forbidden(_))));
        assert!(image.exists());

        TicketService::delete(&pool, &admin, &store, ticket.id).await.unwrap();
        assert!(Ticket::find_by_id(&pool, ticket.id).await.unwrap().is_none());
        assert!(!image.exists());
    }
}
