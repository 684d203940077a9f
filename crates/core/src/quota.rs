use std::future::Future;

use log::{info, warn};

use crate::{
    error::{PlotlineError, Result},
    keys::KeyPool,
};

pub(crate) fn mentions_quota(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("quota") || lower.contains("exceeded")
}

/// Runs `op` with the active key, rotating through the pool on quota errors.
///
/// At most one attempt per key is made. Any non-quota error is returned as-is
/// without retrying. Rotations are left in place, so later calls sharing the
/// pool start from the key that last worked.
pub async fn with_quota_rotation<T, F, Fut>(keys: &mut KeyPool, mut op: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = keys.len();
    if attempts == 0 {
        return Err(PlotlineError::EmptyPool);
    }

    for attempt in 1..=attempts {
        let key = keys.active_key()?.to_string();
        match op(key).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_quota_signal() => {
                warn!("Quota exceeded on API key #{}: {e}", keys.cursor() + 1);
                if attempt < attempts {
                    let next = keys.rotate()?;
                    info!(
                        "Switched to API key #{} (attempt {}/{attempts})",
                        next + 1,
                        attempt + 1
                    );
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(PlotlineError::QuotaExhausted { attempts })
}
