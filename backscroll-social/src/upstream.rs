use backscroll_engine::SourceError;
use backscroll_http::HttpError;

use crate::credentials::{CredentialError, CredentialProvider};

/// Translate a client failure into the tag the paginator understands.
pub(crate) fn source_error(err: HttpError) -> SourceError {
    match err {
        HttpError::RateLimited { retry_after, .. } => SourceError::RateLimited { retry_after },
        HttpError::Decode(reason, snippet) => {
            SourceError::Malformed(format!("{reason}, body_snippet: {snippet}"))
        }
        other => SourceError::Transport(other.to_string()),
    }
}

pub(crate) fn credential_error(err: CredentialError) -> SourceError {
    SourceError::Transport(format!("credentials unavailable: {err}"))
}

/// After a 429: rotate credentials, then report the throttle. A failed refresh
/// is logged; the paginator still gets its single retry with the old key.
pub(crate) async fn throttled(
    source: &str,
    credentials: &dyn CredentialProvider,
    err: HttpError,
) -> SourceError {
    if err.is_rate_limited() {
        if let Err(refresh_err) = credentials.refresh().await {
            tracing::warn!(source, error=%refresh_err, "credentials.refresh_failed");
        } else {
            tracing::info!(source, "credentials.rotated_after_throttle");
        }
    }
    source_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn http_errors_map_to_source_tags() {
        let limited = HttpError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
            request_id: "-".into(),
        };
        assert_eq!(
            source_error(limited),
            SourceError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert!(matches!(
            source_error(HttpError::Decode("eof".into(), "<html>".into())),
            SourceError::Malformed(_)
        ));
        assert!(matches!(
            source_error(HttpError::Network("reset".into())),
            SourceError::Transport(_)
        ));
    }
}
