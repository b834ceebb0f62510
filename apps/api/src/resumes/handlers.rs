//! Axum route handlers for the Resume API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::activity::{Activity, ActivityKind};
use crate::models::resume::{Resume, ResumeRow};
use crate::resumes::ats::score_resume;
use crate::resumes::extract::{extract_text, ResumeFormat};
use crate::resumes::parser::parse_resume;
use crate::resumes::store::{self, NewResume};
use crate::routes::UserQuery;
use crate::state::AppState;
use crate::storage::{delete_resume_file, put_resume_file, resume_key};
use crate::users::activity;

/// Multipart field carrying the resume document.
const FILE_FIELD: &str = "file";
/// Optional multipart text field overriding the resume name.
const NAME_FIELD: &str = "name";

struct Upload {
    bytes: Bytes,
    file_name: Option<String>,
    content_type: Option<String>,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Resume file exceeds the upload limit".to_string())
    } else {
        AppError::Validation(format!("Malformed multipart body: {err}"))
    }
}

/// Display name for an upload: the explicit name, else the file stem, else "resume".
fn resume_name(explicit: Option<&str>, file_name: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| {
            file_name.map(|f| {
                let base = f.rsplit(['/', '\\']).next().unwrap_or(f);
                base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base).trim().to_string()
            })
        })
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "resume".to_string())
}

async fn ensure_found(
    state: &AppState,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<ResumeRow, AppError> {
    store::get_resume(&state.db, user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<Resume>>, AppError> {
    let rows = store::list_resumes(&state.db, params.user_id).await?;
    Ok(Json(rows.into_iter().map(Resume::from).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Resume>, AppError> {
    let row = ensure_found(&state, params.user_id, resume_id).await?;
    Ok(Json(row.into()))
}

/// POST /api/v1/resumes (multipart)
///
/// Extract → parse → ATS score → store file → insert row.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let user_id = params.user_id;
    let mut upload: Option<Upload> = None;
    let mut explicit_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(Upload {
                    bytes,
                    file_name,
                    content_type,
                });
            }
            Some(NAME_FIELD) => {
                explicit_name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        AppError::Validation(format!("Missing multipart field '{FILE_FIELD}'"))
    })?;

    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Resume file is empty".to_string()));
    }
    if upload.bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Resume file is {} bytes; the limit is {}",
            upload.bytes.len(),
            state.config.max_upload_bytes
        )));
    }

    let format = ResumeFormat::detect(upload.content_type.as_deref(), upload.file_name.as_deref())?;

    let document = upload.bytes.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&document, format))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    let structured = parse_resume(&text)?;
    let report = score_resume(&structured, &text);
    let name = resume_name(explicit_name.as_deref(), upload.file_name.as_deref());

    let resume_id = Uuid::new_v4();
    let file_key = resume_key(user_id, resume_id, format.extension());
    put_resume_file(
        &state.s3,
        &state.config.s3_bucket,
        &file_key,
        format.content_type(),
        upload.bytes,
    )
    .await?;

    let inserted = store::insert_resume(
        &state.db,
        NewResume {
            id: resume_id,
            user_id,
            name: &name,
            file_key: &file_key,
            content_type: format.content_type(),
            raw_text: &text,
            structured: &structured,
            report: &report,
        },
    )
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            if let Err(cleanup) =
                delete_resume_file(&state.s3, &state.config.s3_bucket, &file_key).await
            {
                warn!("Orphaned resume file {file_key}: {cleanup}");
            }
            return Err(e.into());
        }
    };

    info!(
        "Resume {} scored {} for user {user_id}",
        row.id, report.ats_score
    );
    activity::record(
        &state.redis,
        user_id,
        Activity::now(
            ActivityKind::ResumeUploaded,
            format!("Uploaded resume '{}' (v{}), ATS score {}", row.name, row.version, report.ats_score),
            Some(row.id),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(row.into())))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserQuery>,
) -> Result<StatusCode, AppError> {
    let deleted = store::delete_resume(&state.db, params.user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    if let Err(e) = delete_resume_file(&state.s3, &state.config.s3_bucket, &deleted.file_key).await {
        warn!("Resume {resume_id} deleted but its file was not: {e}");
    }

    activity::record(
        &state.redis,
        params.user_id,
        Activity::now(
            ActivityKind::ResumeDeleted,
            format!("Deleted resume '{}' (v{})", deleted.name, deleted.version),
            Some(resume_id),
        ),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/:id/primary
pub async fn handle_set_primary(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Resume>, AppError> {
    let row = store::set_primary(&state.db, params.user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    activity::record(
        &state.redis,
        params.user_id,
        Activity::now(
            ActivityKind::PrimaryChanged,
            format!("Set '{}' (v{}) as primary resume", row.name, row.version),
            Some(row.id),
        ),
    )
    .await;

    Ok(Json(row.into()))
}

/// POST /api/v1/resumes/:id/rescore
///
/// Recomputes the ATS report from the stored structured data and text.
pub async fn handle_rescore(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Resume>, AppError> {
    let existing = ensure_found(&state, params.user_id, resume_id).await?;
    let report = score_resume(&existing.structured_data.0, &existing.raw_text);

    let row = store::update_score(&state.db, params.user_id, resume_id, &report)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    activity::record(
        &state.redis,
        params.user_id,
        Activity::now(
            ActivityKind::ResumeRescored,
            format!("Rescored '{}' (v{}): ATS score {}", row.name, row.version, report.ats_score),
            Some(row.id),
        ),
    )
    .await;

    Ok(Json(row.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_name_prefers_explicit_value() {
        assert_eq!(resume_name(Some(" Backend CV "), Some("cv.pdf")), "Backend CV");
    }

    #[test]
    fn test_resume_name_falls_back_to_file_stem() {
        assert_eq!(resume_name(None, Some("jane_doe.resume.pdf")), "jane_doe.resume");
        assert_eq!(resume_name(Some("   "), Some("C:\\docs\\cv.pdf")), "cv");
    }

    #[test]
    fn test_resume_name_default() {
        assert_eq!(resume_name(None, None), "resume");
        assert_eq!(resume_name(None, Some(".pdf")), "resume");
    }
}
