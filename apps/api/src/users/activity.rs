//! Recent-activity feed, kept as a capped Redis list per user (newest first).

use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::activity::Activity;

/// Entries kept per user; older ones are trimmed on write.
const FEED_RETAIN: isize = 100;

fn feed_key(user_id: Uuid) -> String {
    format!("activity:{user_id}")
}

pub async fn push_activity(
    redis: &redis::Client,
    user_id: Uuid,
    activity: &Activity,
) -> Result<(), AppError> {
    let payload = serde_json::to_string(activity).map_err(|e| AppError::Internal(e.into()))?;
    let key = feed_key(user_id);
    let mut conn = redis.get_multiplexed_async_connection().await?;

    let _: () = redis::pipe()
        .atomic()
        .lpush(&key, payload)
        .ignore()
        .ltrim(&key, 0, FEED_RETAIN - 1)
        .ignore()
        .query_async(&mut conn)
        .await?;
    Ok(())
}

/// Records activity without failing the caller; Redis trouble is only logged.
pub async fn record(redis: &redis::Client, user_id: Uuid, activity: Activity) {
    if let Err(e) = push_activity(redis, user_id, &activity).await {
        warn!("Failed to record {:?} activity for user {user_id}: {e}", activity.kind);
    }
}

pub async fn recent_activity(
    redis: &redis::Client,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<Activity>, AppError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let stop = isize::try_from(limit).unwrap_or(FEED_RETAIN).min(FEED_RETAIN) - 1;
    let raw: Vec<String> = conn.lrange(feed_key(user_id), 0, stop).await?;
    Ok(decode_feed(raw))
}

/// Decodes stored entries, skipping any that no longer parse.
fn decode_feed(raw: Vec<String>) -> Vec<Activity> {
    raw.into_iter()
        .filter_map(|entry| match serde_json::from_str::<Activity>(&entry) {
            Ok(activity) => Some(activity),
            Err(e) => {
                warn!("Skipping malformed activity entry: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityKind;

    #[test]
    fn test_feed_key_is_per_user() {
        let user = Uuid::from_u128(7);
        assert_eq!(feed_key(user), format!("activity:{user}"));
    }

    #[test]
    fn test_decode_feed_keeps_order_and_skips_garbage() {
        let first = Activity::now(ActivityKind::ResumeUploaded, "Uploaded cv.pdf", None);
        let second = Activity::now(ActivityKind::JobMatched, "Matched Backend Engineer", None);
        let raw = vec![
            serde_json::to_string(&first).unwrap(),
            "{not json".to_string(),
            serde_json::to_string(&second).unwrap(),
        ];
        let decoded = decode_feed(raw);
        assert_eq!(decoded, vec![first, second]);
    }
}
