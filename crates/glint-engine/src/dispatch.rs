//! Concurrent fan-out of prompt variants to the transport collaborator.

use std::sync::Arc;
use tracing::warn;

use crate::transport::{LlmReply, Transport};

/// Issue every prompt as its own task and gather the replies in
/// submission order. The returned vector always has exactly
/// `prompts.len()` slots; a slot whose request failed (transport error or
/// task panic) is `None`. There is no cancellation: the call resolves only
/// once every task has finished.
pub async fn dispatch_all(
    transport: Arc<dyn Transport>,
    prompts: &[String],
) -> Vec<Option<LlmReply>> {
    let handles: Vec<_> = prompts
        .iter()
        .map(|prompt| {
            let transport = Arc::clone(&transport);
            let prompt = prompt.clone();
            tokio::spawn(async move { transport.send(&prompt).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (slot, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(reply)) => results.push(Some(reply)),
            Ok(Err(error)) => {
                warn!(slot, %error, "model request failed; recording empty slot");
                results.push(None);
            }
            Err(error) => {
                warn!(slot, %error, "request task failed to complete; recording empty slot");
                results.push(None);
            }
        }
    }
    results
}
