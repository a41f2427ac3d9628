use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Car {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Car {
    pub async fn insert(
        db: &PgPool,
        owner_id: Uuid,
        title: &str,
        description: &str,
        tags: &[String],
        images: &[String],
    ) -> anyhow::Result<Car> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (owner_id, title, description, tags, images)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, title, description, tags, images, created_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(tags)
        .bind(images)
        .fetch_one(db)
        .await?;
        Ok(car)
    }

    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Car>> {
        let rows = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, owner_id, title, description, tags, images, created_at
            FROM cars
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Car>> {
        let rows = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, owner_id, title, description, tags, images, created_at
            FROM cars
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Car>> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, owner_id, title, description, tags, images, created_at
            FROM cars
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Lookup filtered by `(id, owner)`. `None` covers both "no such car"
    /// and "not yours" so callers cannot tell the two apart.
    pub async fn find_owned(db: &PgPool, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<Car>> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, owner_id, title, description, tags, images, created_at
            FROM cars
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Single-statement partial update: a `None` field keeps the stored
    /// value via COALESCE. The `(id, owner)` filter makes this the atomic
    /// ownership check, same contract as `find_owned`.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        tags: Option<&[String]>,
        images: Option<&[String]>,
    ) -> anyhow::Result<Option<Car>> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                tags = COALESCE($5, tags),
                images = COALESCE($6, images)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, description, tags, images, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(tags)
        .bind(images)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Delete filtered by `(id, owner)`, returning the removed row so the
    /// caller can clean up its images afterwards.
    pub async fn delete_owned(db: &PgPool, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<Car>> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            DELETE FROM cars
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, description, tags, images, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Case-insensitive substring match over title, description and every
    /// tag, restricted to the caller's own listings. `pattern` is a
    /// ready-made `%...%` LIKE pattern with metacharacters escaped.
    pub async fn search_owned(
        db: &PgPool,
        owner_id: Uuid,
        pattern: &str,
    ) -> anyhow::Result<Vec<Car>> {
        let rows = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, owner_id, title, description, tags, images, created_at
            FROM cars
            WHERE owner_id = $1
              AND (title ILIKE $2
                OR description ILIKE $2
                OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $2))
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(pattern)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_serializes_with_rfc3339_timestamp() {
        let car = Car {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Civic".into(),
            description: "clean".into(),
            tags: vec!["sedan".into(), "compact".into()],
            images: vec!["https://media.local/car-images/cars/a.jpg".into()],
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        };

        let json = serde_json::to_value(&car).unwrap();
        assert_eq!(json["title"], "Civic");
        assert_eq!(json["tags"][1], "compact");
        assert_eq!(json["created_at"], "2023-11-14T22:13:20Z");
    }
}
