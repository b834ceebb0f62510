//! Postgres access for resumes.
//!
//! Writes that touch `version` or `is_primary` take a per-user transaction-scoped
//! advisory lock first, so they apply one at a time for a given user.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::resume::{ResumeRow, StructuredResume};
use crate::resumes::ats::AtsReport;

/// Parameters for inserting a freshly uploaded resume.
pub struct NewResume<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: &'a str,
    pub file_key: &'a str,
    pub content_type: &'a str,
    pub raw_text: &'a str,
    pub structured: &'a StructuredResume,
    pub report: &'a AtsReport,
}

/// Serializes resume writes for `user_id` until the surrounding transaction ends.
async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::TEXT))")
        .bind(user_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn list_resumes(pool: &PgPool, user_id: Uuid) -> Result<Vec<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_resume(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Looks a resume up by id alone, for callers that hold a resume id but no user.
pub async fn get_resume_by_id(pool: &PgPool, resume_id: Uuid) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_primary_resume(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 AND is_primary LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Inserts a resume. Its version is one past the highest version the user
/// has for the same name, and it becomes primary when the user has none.
pub async fn insert_resume(pool: &PgPool, new: NewResume<'_>) -> Result<ResumeRow, sqlx::Error> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, new.user_id).await?;

    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (id, user_id, name, version, is_primary, file_key, content_type, raw_text,
             structured_data, ats_score, score_breakdown, suggestions)
        VALUES (
            $1, $2, $3,
            (SELECT COALESCE(MAX(version), 0) + 1 FROM resumes WHERE user_id = $2 AND name = $3),
            NOT EXISTS (SELECT 1 FROM resumes WHERE user_id = $2 AND is_primary),
            $4, $5, $6, $7, $8, $9, $10
        )
        RETURNING *
        "#,
    )
    .bind(new.id)
    .bind(new.user_id)
    .bind(new.name)
    .bind(new.file_key)
    .bind(new.content_type)
    .bind(new.raw_text)
    .bind(Json(new.structured))
    .bind(new.report.ats_score as i32)
    .bind(Json(new.report.breakdown))
    .bind(&new.report.suggestions)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Inserted resume {} v{} for user {} (primary: {})",
        row.id, row.version, row.user_id, row.is_primary
    );
    Ok(row)
}

pub async fn update_score(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
    report: &AtsReport,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes
        SET ats_score = $3, score_breakdown = $4, suggestions = $5
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(user_id)
    .bind(report.ats_score as i32)
    .bind(Json(report.breakdown))
    .bind(&report.suggestions)
    .fetch_optional(pool)
    .await
}

/// Deletes a resume. When it was primary, the newest remaining resume is promoted.
pub async fn delete_resume(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;

    let deleted = sqlx::query_as::<_, ResumeRow>(
        "DELETE FROM resumes WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(resume_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(row) = &deleted {
        if row.is_primary {
            let promoted: Option<Uuid> = sqlx::query_scalar(
                r#"
                UPDATE resumes SET is_primary = TRUE
                WHERE id = (
                    SELECT id FROM resumes WHERE user_id = $1
                    ORDER BY created_at DESC, version DESC LIMIT 1
                )
                RETURNING id
                "#,
            )
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(id) = promoted {
                info!("Promoted resume {id} to primary for user {user_id}");
            }
        }
    }

    tx.commit().await?;
    Ok(deleted)
}

/// Marks one resume primary and clears the flag on the user's others, atomically.
pub async fn set_primary(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;

    let exists: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM resumes WHERE id = $1 AND user_id = $2",
    )
    .bind(resume_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if exists.is_none() {
        return Ok(None);
    }

    sqlx::query("UPDATE resumes SET is_primary = FALSE WHERE user_id = $1 AND is_primary AND id <> $2")
        .bind(user_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query_as::<_, ResumeRow>(
        "UPDATE resumes SET is_primary = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(resume_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ScoreBreakdown;

    fn report() -> AtsReport {
        AtsReport {
            ats_score: 64,
            breakdown: ScoreBreakdown::default(),
            suggestions: vec!["Quantify more bullets".to_string()],
        }
    }

    async fn upload(pool: &PgPool, user_id: Uuid, name: &str) -> Result<ResumeRow, sqlx::Error> {
        let id = Uuid::new_v4();
        let file_key = format!("resumes/{user_id}/{id}.txt");
        insert_resume(
            pool,
            NewResume {
                id,
                user_id,
                name,
                file_key: &file_key,
                content_type: "text/plain",
                raw_text: "Jane Doe\nSkills\nRust",
                structured: &StructuredResume::default(),
                report: &report(),
            },
        )
        .await
    }

    async fn primary_ids(pool: &PgPool, user_id: Uuid) -> Vec<Uuid> {
        sqlx::query_scalar("SELECT id FROM resumes WHERE user_id = $1 AND is_primary")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_first_upload_is_primary(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let first = upload(&pool, user, "cv").await?;
        let second = upload(&pool, user, "cv").await?;

        assert!(first.is_primary);
        assert!(!second.is_primary);
        assert_eq!(primary_ids(&pool, user).await, vec![first.id]);
        assert_eq!(first.ats_score, Some(64));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_versions_count_per_name_and_are_never_reused(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let a1 = upload(&pool, user, "backend").await?;
        let a2 = upload(&pool, user, "backend").await?;
        let b1 = upload(&pool, user, "frontend").await?;
        assert_eq!((a1.version, a2.version, b1.version), (1, 2, 1));

        delete_resume(&pool, user, a2.id).await?;
        let a3 = upload(&pool, user, "backend").await?;
        assert_eq!(a3.version, 3);

        let other_user = upload(&pool, Uuid::new_v4(), "backend").await?;
        assert_eq!(other_user.version, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deleting_primary_promotes_newest(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let first = upload(&pool, user, "cv").await?;
        let middle = upload(&pool, user, "cv").await?;
        let newest = upload(&pool, user, "cv").await?;

        let deleted = delete_resume(&pool, user, first.id).await?.unwrap();
        assert!(deleted.is_primary);
        assert_eq!(primary_ids(&pool, user).await, vec![newest.id]);

        let non_primary = delete_resume(&pool, user, middle.id).await?.unwrap();
        assert!(!non_primary.is_primary);
        assert_eq!(primary_ids(&pool, user).await, vec![newest.id]);

        delete_resume(&pool, user, newest.id).await?;
        assert!(primary_ids(&pool, user).await.is_empty());
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_is_scoped_to_owner(pool: PgPool) -> sqlx::Result<()> {
        let owner = Uuid::new_v4();
        let resume = upload(&pool, owner, "cv").await?;

        assert!(delete_resume(&pool, Uuid::new_v4(), resume.id).await?.is_none());
        assert!(get_resume(&pool, owner, resume.id).await?.is_some());
        assert!(get_resume_by_id(&pool, resume.id).await?.is_some());
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_set_primary_moves_the_flag(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let first = upload(&pool, user, "cv").await?;
        let second = upload(&pool, user, "cv-alt").await?;

        let updated = set_primary(&pool, user, second.id).await?.unwrap();
        assert!(updated.is_primary);
        assert_eq!(primary_ids(&pool, user).await, vec![second.id]);

        // Setting the current primary again is a no-op.
        set_primary(&pool, user, second.id).await?;
        assert_eq!(primary_ids(&pool, user).await, vec![second.id]);

        assert!(set_primary(&pool, Uuid::new_v4(), first.id).await?.is_none());
        assert_eq!(primary_ids(&pool, user).await, vec![second.id]);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_first_uploads_yield_one_primary(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let (a, b) = tokio::join!(upload(&pool, user, "cv"), upload(&pool, user, "cv"));
        let (a, b) = (a?, b?);

        assert_eq!(primary_ids(&pool, user).await.len(), 1);
        let mut versions = vec![a.version, b.version];
        versions.sort();
        assert_eq!(versions, vec![1, 2]);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_set_primary_leaves_one_primary(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let _first = upload(&pool, user, "a").await?;
        let second = upload(&pool, user, "b").await?;
        let third = upload(&pool, user, "c").await?;

        let (x, y) = tokio::join!(
            set_primary(&pool, user, second.id),
            set_primary(&pool, user, third.id)
        );
        x?;
        y?;

        let primaries = primary_ids(&pool, user).await;
        assert_eq!(primaries.len(), 1);
        assert!(primaries[0] == second.id || primaries[0] == third.id);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_upload_racing_primary_delete_keeps_a_primary(pool: PgPool) -> sqlx::Result<()> {
        let user = Uuid::new_v4();
        let only = upload(&pool, user, "cv").await?;

        let (deleted, uploaded) =
            tokio::join!(delete_resume(&pool, user, only.id), upload(&pool, user, "cv"));
        deleted?;
        let uploaded = uploaded?;

        assert_eq!(primary_ids(&pool, user).await, vec![uploaded.id]);
        Ok(())
    }
}
