use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::gallery::GalleryRepo,
    domain::entities::gallery_item::GalleryItem,
};

fn row_to_item(row: sqlx::postgres::PgRow) -> GalleryItem {
    GalleryItem {
        id: row.get("id"),
        user_id: row.get("user_id"),
        room_type: row.get::<Option<String>, _>("room_type").unwrap_or_default(),
        style: row.get::<Option<String>, _>("style").unwrap_or_default(),
        prompt: row.get::<Option<String>, _>("prompt").unwrap_or_default(),
        image_url: row.get("image_url"),
        thumb_url: row.get("thumb_url"),
        is_favorite: row.get::<Option<bool>, _>("is_favorite").unwrap_or(false),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, room_type, style, prompt, image_url, thumb_url, is_favorite, created_at
"#;

#[async_trait]
impl GalleryRepo for PostgresPersistence {
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<GalleryItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM gallery_items WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_item).collect())
    }

    async fn insert(&self, item: &GalleryItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO gallery_items
                (id, user_id, room_type, style, prompt, image_url, thumb_url, is_favorite, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, now()))
            "#,
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(&item.room_type)
        .bind(&item.style)
        .bind(&item.prompt)
        .bind(&item.image_url)
        .bind(&item.thumb_url)
        .bind(item.is_favorite)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE gallery_items SET is_favorite = $3 WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .bind(is_favorite)
                .execute(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<GalleryItem>> {
        let row = sqlx::query(&format!(
            "DELETE FROM gallery_items WHERE id = $1 AND user_id = $2 RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_item))
    }
}
