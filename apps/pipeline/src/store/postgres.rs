use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use crate::models::job::{Dimension, NewJob, StoredJob};
use crate::store::{dimension_name, JobStore, StoreError};

/// A recorded rejection is replaced by an accepted job; any other conflict
/// returns no row.
const INSERT_JOB: &str = r#"
INSERT INTO jobs.jobs AS existing (
    external_id, source, title, description, source_url,
    company_id, location_id, category_id, industry_id,
    job_type, experience_months, salary_min, salary_max, salary_currency,
    is_remote, is_relevant, is_filtered,
    must_have_skills, nice_to_have_skills, posted_at, expires_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
ON CONFLICT (external_id, source) DO UPDATE SET
    title = EXCLUDED.title,
    description = EXCLUDED.description,
    source_url = EXCLUDED.source_url,
    company_id = EXCLUDED.company_id,
    location_id = EXCLUDED.location_id,
    category_id = EXCLUDED.category_id,
    industry_id = EXCLUDED.industry_id,
    job_type = EXCLUDED.job_type,
    experience_months = EXCLUDED.experience_months,
    salary_min = EXCLUDED.salary_min,
    salary_max = EXCLUDED.salary_max,
    salary_currency = EXCLUDED.salary_currency,
    is_remote = EXCLUDED.is_remote,
    is_relevant = EXCLUDED.is_relevant,
    is_filtered = EXCLUDED.is_filtered,
    must_have_skills = EXCLUDED.must_have_skills,
    nice_to_have_skills = EXCLUDED.nice_to_have_skills,
    posted_at = EXCLUDED.posted_at,
    expires_at = EXCLUDED.expires_at,
    updated_at = NOW()
WHERE existing.is_relevant = FALSE AND EXCLUDED.is_relevant = TRUE
RETURNING *
"#;

/// Postgres-backed store over the `jobs` schema.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &NewJob) -> Result<StoredJob, StoreError> {
        let posting = &job.posting;
        let mut tx = self.pool.begin().await?;

        let company_id = match dimension_name(&posting.company.name) {
            Some(name) => {
                Some(upsert_company(&mut tx, name, posting.company.website.as_deref()).await?)
            }
            None => None,
        };
        let location_id = match posting.location.as_ref() {
            Some(location) => upsert_optional(&mut tx, Dimension::Location, &location.region).await?,
            None => None,
        };
        let category_id = upsert_optional(&mut tx, Dimension::Category, &posting.category_name).await?;
        let industry_id = match posting.industry.as_deref() {
            Some(industry) => upsert_optional(&mut tx, Dimension::Industry, industry).await?,
            None => None,
        };

        let salary = posting.salary.as_ref();
        let inserted = sqlx::query_as::<_, StoredJob>(INSERT_JOB)
            .bind(&posting.external_id)
            .bind(&posting.source)
            .bind(&posting.title)
            .bind(&posting.text)
            .bind(&posting.url)
            .bind(company_id)
            .bind(location_id)
            .bind(category_id)
            .bind(industry_id)
            .bind(&posting.employment_type)
            .bind(posting.experience_months)
            .bind(salary.and_then(|s| s.min))
            .bind(salary.and_then(|s| s.max))
            .bind(salary.map(|s| s.currency.as_str()))
            .bind(posting.location.as_ref().is_some_and(|l| l.is_remote))
            .bind(job.is_relevant)
            .bind(job.is_filtered)
            .bind(Json(&job.must_have_skills))
            .bind(Json(&job.nice_to_have_skills))
            .bind(posting.date_posted)
            .bind(posting.valid_through)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, job))?;

        match inserted {
            Some(stored) => {
                tx.commit().await?;
                debug!(job_id = stored.id, external_id = %stored.external_id, "Job stored");
                Ok(stored)
            }
            None => {
                tx.rollback().await?;
                Err(StoreError::already_exists(&posting.external_id, &posting.source))
            }
        }
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        source: &str,
    ) -> Result<Option<StoredJob>, StoreError> {
        let job = sqlx::query_as::<_, StoredJob>(
            "SELECT * FROM jobs.jobs WHERE external_id = $1 AND source = $2",
        )
        .bind(external_id)
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn get_or_create_company(
        &self,
        name: &str,
        website: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_company(&mut conn, name.trim(), website).await
    }

    async fn get_or_create_location(&self, region: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_dimension(&mut conn, Dimension::Location, region.trim()).await
    }

    async fn get_or_create_category(&self, name: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_dimension(&mut conn, Dimension::Category, name.trim()).await
    }

    async fn get_or_create_industry(&self, name: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_dimension(&mut conn, Dimension::Industry, name.trim()).await
    }

    async fn existing_urls_by_source(
        &self,
        source: &str,
        lookback: Option<Duration>,
    ) -> Result<Vec<String>, StoreError> {
        let since = lookback.map(|window| Utc::now() - window);
        let urls = sqlx::query_scalar::<_, String>(
            r#"
            SELECT source_url FROM jobs.jobs
            WHERE source = $1
              AND source_url IS NOT NULL
              AND ($2::timestamptz IS NULL OR posted_at >= $2)
            "#,
        )
        .bind(source)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(urls)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dimension upserts
// ────────────────────────────────────────────────────────────────────────────

async fn upsert_company(
    conn: &mut PgConnection,
    name: &str,
    website: Option<&str>,
) -> Result<i64, StoreError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO jobs.companies (name, website) VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE
            SET website = COALESCE(jobs.companies.website, EXCLUDED.website)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(website)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// `DO UPDATE` rather than `DO NOTHING` so the existing row's id is returned.
async fn upsert_dimension(
    conn: &mut PgConnection,
    dimension: Dimension,
    name: &str,
) -> Result<i64, StoreError> {
    let sql = format!(
        "INSERT INTO {table} ({col}) VALUES ($1) \
         ON CONFLICT ({col}) DO UPDATE SET {col} = EXCLUDED.{col} \
         RETURNING id",
        table = dimension.table(),
        col = dimension.key_column(),
    );
    let id = sqlx::query_scalar::<_, i64>(&sql)
        .bind(name)
        .fetch_one(conn)
        .await?;
    Ok(id)
}

async fn upsert_optional(
    conn: &mut PgConnection,
    dimension: Dimension,
    name: &str,
) -> Result<Option<i64>, StoreError> {
    match dimension_name(name) {
        Some(name) => Ok(Some(upsert_dimension(conn, dimension, name).await?)),
        None => Ok(None),
    }
}

fn map_unique_violation(err: sqlx::Error, job: &NewJob) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::already_exists(&job.posting.external_id, &job.posting.source);
        }
    }
    StoreError::Database(err)
}
