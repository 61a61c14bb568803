//! Try-in-order combinator for encoder initialization.

use std::fmt::Display;
use std::future::Future;

/// Run `attempt` against each source in order and return the first success.
///
/// Every failure is logged and recorded as `"<source>: <error>"`. If all
/// sources fail (or there are none) the result is
/// [`sp_core::Error::Initialization`] listing each attempt.
pub async fn first_success<S, T, F, Fut>(sources: &[S], mut attempt: F) -> sp_core::Result<T>
where
    S: Display,
    F: FnMut(&S) -> Fut,
    Fut: Future<Output = sp_core::Result<T>>,
{
    let mut failures = Vec::with_capacity(sources.len());

    for source in sources {
        match attempt(source).await {
            Ok(value) => {
                if !failures.is_empty() {
                    tracing::info!("initialized from fallback source {source}");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!("initialization via {source} failed: {e}");
                failures.push(format!("{source}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        failures.push("no sources configured".into());
    }
    Err(sp_core::Error::initialization(failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_first_success_in_order() {
        let calls = AtomicUsize::new(0);
        let result = first_success(&["a", "b", "c"], |s| {
            calls.fetch_add(1, Ordering::SeqCst);
            let s = s.to_string();
            async move {
                if s == "a" {
                    Err(sp_core::Error::tool("x", "missing"))
                } else {
                    Ok(s)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_failures_listed() {
        let err = first_success(&["primary", "mirror"], |_| async {
            Err::<(), _>(sp_core::Error::tool("x", "down"))
        })
        .await
        .unwrap_err();
        match err {
            sp_core::Error::Initialization { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("primary:"));
                assert!(attempts[1].starts_with("mirror:"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_sources_is_initialization_error() {
        let sources: [&str; 0] = [];
        let err = first_success(&sources, |_| async { Ok::<_, sp_core::Error>(()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sp_core::ErrorKind::Initialization);
    }
}
