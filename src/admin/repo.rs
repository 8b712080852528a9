use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::authz::repo::{Permission, Resource, Role};
use crate::authz::resource::Method;

/// Permission row joined with its role and resource names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PermissionView {
    pub id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub resource_method: String,
    pub can_access: bool,
}

pub async fn list_roles(db: &PgPool) -> anyhow::Result<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
        .fetch_all(db)
        .await?;
    Ok(roles)
}

pub async fn find_role(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(role)
}

/// Returns `None` when the role name is already taken.
pub async fn create_role(
    db: &PgPool,
    name: &str,
    description: Option<&str>,
) -> anyhow::Result<Option<Role>> {
    let inserted = sqlx::query_as::<_, Role>(
        "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(role) => Ok(Some(role)),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_role(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_resources(db: &PgPool) -> anyhow::Result<Vec<Resource>> {
    let resources = sqlx::query_as::<_, Resource>("SELECT * FROM resources ORDER BY name, method")
        .fetch_all(db)
        .await?;
    Ok(resources)
}

pub async fn find_resource_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Resource>> {
    let resource = sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(resource)
}

/// Returns `None` when the `(name, method)` pair already exists.
pub async fn create_resource(
    db: &PgPool,
    name: &str,
    method: Method,
    description: Option<&str>,
) -> anyhow::Result<Option<Resource>> {
    let inserted = sqlx::query_as::<_, Resource>(
        "INSERT INTO resources (name, method, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(method.as_str())
    .bind(description)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(resource) => Ok(Some(resource)),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_resource(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_permissions(db: &PgPool) -> anyhow::Result<Vec<PermissionView>> {
    let rows = sqlx::query_as::<_, PermissionView>(
        r#"
        SELECT p.id, p.role_id, r.name AS role_name,
               p.resource_id, s.name AS resource_name, s.method AS resource_method,
               p.can_access
        FROM permissions p
        JOIN roles r ON r.id = p.role_id
        JOIN resources s ON s.id = p.resource_id
        ORDER BY r.name, s.name, s.method
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Returns `None` when a permission row for `(role, resource)` already exists.
pub async fn create_permission(
    db: &PgPool,
    role_id: Uuid,
    resource_id: Uuid,
    can_access: bool,
) -> anyhow::Result<Option<Permission>> {
    let inserted = sqlx::query_as::<_, Permission>(
        r#"
        INSERT INTO permissions (role_id, resource_id, can_access)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(role_id)
    .bind(resource_id)
    .bind(can_access)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(permission) => Ok(Some(permission)),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_permission(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Grant a role to a user; granting twice is a no-op.
pub async fn grant_role(db: &PgPool, user_id: Uuid, role_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn revoke_role(db: &PgPool, user_id: Uuid, role_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
        .bind(user_id)
        .bind(role_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
