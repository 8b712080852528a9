use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::authz::resource::Method;

/// Named permission group, administrator-managed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// A protected action, unique per `(name, method)`. The method column holds
/// the literal strings GET/POST/PUT/DELETE/PATCH or `*`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub method: String,
    pub description: Option<String>,
}

/// Grant row joining a role to a resource. Absence of a row means deny.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub resource_id: Uuid,
    pub can_access: bool,
    pub created_at: OffsetDateTime,
}

/// Read side of the permission tables, as consumed by the evaluator.
#[async_trait]
pub trait AccessRepo: Send + Sync {
    /// Exact `(name, method)` lookup; `Any` rows are not folded in.
    async fn find_resource(&self, name: &str, method: Method) -> anyhow::Result<Option<Resource>>;

    async fn role_ids_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>>;

    /// EXISTS check: does any of `role_ids` hold a `can_access = true`
    /// permission on `resource_id`?
    async fn any_role_allows(&self, role_ids: &[Uuid], resource_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgAccessRepo {
    pool: PgPool,
}

impl PgAccessRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessRepo for PgAccessRepo {
    async fn find_resource(&self, name: &str, method: Method) -> anyhow::Result<Option<Resource>> {
        let resource = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources WHERE name = $1 AND method = $2",
        )
        .bind(name)
        .bind(method.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(resource)
    }

    async fn role_ids_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT role_id FROM user_roles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn any_role_allows(&self, role_ids: &[Uuid], resource_id: Uuid) -> anyhow::Result<bool> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM permissions
                WHERE resource_id = $1
                  AND role_id = ANY($2)
                  AND can_access = TRUE
            )
            "#,
        )
        .bind(resource_id)
        .bind(role_ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }
}
