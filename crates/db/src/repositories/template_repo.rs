//! Repository for the `templates` table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use courier_core::template::Template;

use crate::error::DbError;
use crate::DbPool;

const COLUMNS: &str = "id, name, channel, content, variables, created_at, updated_at";

/// A raw row from the `templates` table. The variable list is stored as a
/// JSONB array of strings.
#[derive(Debug, FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    channel: String,
    content: String,
    variables: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = DbError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(Template {
            id: row.id,
            name: row.name,
            channel: row
                .channel
                .parse()
                .map_err(|_| DbError::Decode(format!("unknown channel: {}", row.channel)))?,
            content: row.content,
            variables: serde_json::from_value(row.variables)
                .map_err(|e| DbError::Decode(format!("invalid variables array: {e}")))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Provides CRUD operations for templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a new template. A duplicate name surfaces as
    /// [`DbError::DuplicateTemplateName`].
    pub async fn create(pool: &DbPool, template: &Template) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO templates (id, name, channel, content, variables, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(template.channel.as_str())
        .bind(&template.content)
        .bind(serde_json::json!(template.variables))
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &DbPool, id: Uuid) -> Result<Template, DbError> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        let row = sqlx::query_as::<_, TemplateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(DbError::NotFound)?;
        row.try_into()
    }

    /// Fetch a template by its unique name, if it exists.
    pub async fn get_by_name(pool: &DbPool, name: &str) -> Result<Option<Template>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE name = $1");
        let row = sqlx::query_as::<_, TemplateRow>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await?;
        row.map(Template::try_from).transpose()
    }

    pub async fn list(pool: &DbPool) -> Result<Vec<Template>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM templates ORDER BY name ASC");
        let rows = sqlx::query_as::<_, TemplateRow>(&query).fetch_all(pool).await?;
        rows.into_iter().map(Template::try_from).collect()
    }

    /// Write the full mutable row back (the variable list is re-derived by
    /// the caller before update).
    pub async fn update(pool: &DbPool, template: &Template) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE templates SET \
                 name = $2, channel = $3, content = $4, variables = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(template.channel.as_str())
        .bind(&template.content)
        .bind(serde_json::json!(template.variables))
        .bind(template.updated_at)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(pool: &DbPool, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
