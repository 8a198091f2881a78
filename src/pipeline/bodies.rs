//! Reusable body providers

use futures::future::{Ready, ready};
use serde_json::Value;

use super::context::RequestContext;
use super::error::StageError;

/// Forward the inbound JSON body; an empty inbound body sends no body
pub async fn json_body(ctx: RequestContext) -> Result<Option<Value>, StageError> {
    if ctx.body_bytes().is_empty() {
        return Ok(None);
    }
    ctx.json().map(Some)
}

/// Always send the same body
pub fn static_body(body: Value) -> impl Fn(RequestContext) -> Ready<Result<Value, StageError>> + Send + Sync + 'static {
    move |_ctx| ready(Ok(body.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_body_empty_is_none() {
        assert_eq!(json_body(RequestContext::default()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_body_forwards() {
        let ctx = RequestContext::builder().body(r#"{"a":1}"#).build();
        assert_eq!(json_body(ctx).await.unwrap(), Some(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn test_static_body() {
        let provider = static_body(json!({ "fixed": true }));
        assert_eq!(provider(RequestContext::default()).await.unwrap(), json!({ "fixed": true }));
    }
}
