//! Relational store adapters for reviews and uploaded file metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

/// A persisted customer review. `created_at` is the only recency field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Review {
    pub id: i64,
    pub review_text: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct UploadedFile {
    pub id: i64,
    pub filename: String,
    pub storage_path: String,
    pub file_url: String,
    pub business_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    pub filename: String,
    pub storage_path: String,
    pub file_url: String,
    pub business_name: String,
    pub file_size: i64,
    pub file_type: String,
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert_review(&self, review_text: &str, rating: i32) -> Result<Review, sqlx::Error>;

    /// Newest first. `None` returns every review.
    async fn list_reviews(&self, limit: Option<i64>) -> Result<Vec<Review>, sqlx::Error>;

    async fn ping(&self) -> bool {
        self.list_reviews(Some(1)).await.is_ok()
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert_file(&self, file: NewUploadedFile) -> Result<UploadedFile, sqlx::Error>;
    async fn list_files(&self, business_name: &str) -> Result<Vec<UploadedFile>, sqlx::Error>;
    async fn get_file(&self, id: i64) -> Result<Option<UploadedFile>, sqlx::Error>;
    async fn delete_file(&self, id: i64) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, review_text: &str, rating: i32) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (review_text, rating) VALUES ($1, $2)
               RETURNING id, review_text, rating, created_at"#,
        )
        .bind(review_text)
        .bind(rating)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_reviews(&self, limit: Option<i64>) -> Result<Vec<Review>, sqlx::Error> {
        // LIMIT NULL means no limit in Postgres.
        sqlx::query_as::<_, Review>(
            r#"SELECT id, review_text, rating, created_at
               FROM reviews ORDER BY created_at DESC, id DESC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn insert_file(&self, file: NewUploadedFile) -> Result<UploadedFile, sqlx::Error> {
        sqlx::query_as::<_, UploadedFile>(
            r#"INSERT INTO uploaded_files
                 (filename, storage_path, file_url, business_name, file_size, file_type)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, filename, storage_path, file_url, business_name,
                         file_size, file_type, uploaded_at"#,
        )
        .bind(&file.filename)
        .bind(&file.storage_path)
        .bind(&file.file_url)
        .bind(&file.business_name)
        .bind(file.file_size)
        .bind(&file.file_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_files(&self, business_name: &str) -> Result<Vec<UploadedFile>, sqlx::Error> {
        sqlx::query_as::<_, UploadedFile>(
            r#"SELECT id, filename, storage_path, file_url, business_name,
                      file_size, file_type, uploaded_at
               FROM uploaded_files WHERE business_name = $1
               ORDER BY uploaded_at DESC, id DESC"#,
        )
        .bind(business_name)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_file(&self, id: i64) -> Result<Option<UploadedFile>, sqlx::Error> {
        sqlx::query_as::<_, UploadedFile>(
            r#"SELECT id, filename, storage_path, file_url, business_name,
                      file_size, file_type, uploaded_at
               FROM uploaded_files WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_file(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub mod memory {
    //! In-process stores for handler and pipeline tests.

    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    pub fn review(id: i64, text: &str, rating: i32) -> Review {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Review {
            id,
            review_text: text.to_string(),
            rating,
            created_at: base + Duration::minutes(id),
        }
    }

    #[derive(Default)]
    pub struct MemoryStore {
        reviews: Mutex<Vec<Review>>,
        files: Mutex<Vec<UploadedFile>>,
    }

    impl MemoryStore {
        pub fn with_reviews(reviews: Vec<Review>) -> Self {
            Self {
                reviews: Mutex::new(reviews),
                files: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl ReviewStore for MemoryStore {
        async fn insert_review(&self, review_text: &str, rating: i32) -> Result<Review, sqlx::Error> {
            let mut reviews = self.reviews.lock().unwrap();
            let created = review(reviews.len() as i64 + 1, review_text, rating);
            reviews.push(created.clone());
            Ok(created)
        }

        async fn list_reviews(&self, limit: Option<i64>) -> Result<Vec<Review>, sqlx::Error> {
            let mut reviews = self.reviews.lock().unwrap().clone();
            reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            if let Some(limit) = limit {
                reviews.truncate(limit.max(0) as usize);
            }
            Ok(reviews)
        }
    }

    #[async_trait]
    impl FileStore for MemoryStore {
        async fn insert_file(&self, file: NewUploadedFile) -> Result<UploadedFile, sqlx::Error> {
            let mut files = self.files.lock().unwrap();
            let id = files.iter().map(|f| f.id).max().unwrap_or(0) + 1;
            let stored = UploadedFile {
                id,
                filename: file.filename,
                storage_path: file.storage_path,
                file_url: file.file_url,
                business_name: file.business_name,
                file_size: file.file_size,
                file_type: file.file_type,
                uploaded_at: Utc::now(),
            };
            files.push(stored.clone());
            Ok(stored)
        }

        async fn list_files(&self, business_name: &str) -> Result<Vec<UploadedFile>, sqlx::Error> {
            let mut files: Vec<UploadedFile> = self
                .files
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.business_name == business_name)
                .cloned()
                .collect();
            files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
            Ok(files)
        }

        async fn get_file(&self, id: i64) -> Result<Option<UploadedFile>, sqlx::Error> {
            Ok(self.files.lock().unwrap().iter().find(|f| f.id == id).cloned())
        }

        async fn delete_file(&self, id: i64) -> Result<bool, sqlx::Error> {
            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|f| f.id != id);
            Ok(files.len() != before)
        }
    }

    /// Store whose every call fails, as when the database is unreachable.
    pub struct UnavailableStore;

    #[async_trait]
    impl ReviewStore for UnavailableStore {
        async fn insert_review(&self, _: &str, _: i32) -> Result<Review, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn list_reviews(&self, _: Option<i64>) -> Result<Vec<Review>, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
