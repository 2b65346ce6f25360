use std::future::Future;

tokio::task_local! {
    static CONTROLLER_CALL: ();
}

/// Run a client call issued by the controller itself
///
/// Lifecycle hooks re-entered from inside `call` see [`is_controller_call`]
/// and do nothing.
pub(crate) async fn controller_call<F>(call: F) -> F::Output
where
    F: Future,
{
    CONTROLLER_CALL.scope((), call).await
}

/// Whether the current task is inside a client call made by the controller
pub fn is_controller_call() -> bool {
    CONTROLLER_CALL.try_with(|_| ()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_is_visible_only_inside_call() {
        assert!(!is_controller_call());
        let inside = controller_call(async { is_controller_call() }).await;
        assert!(inside);
        assert!(!is_controller_call());
    }

    #[tokio::test]
    async fn test_scope_does_not_leak_into_spawned_tasks() {
        let spawned = controller_call(async {
            tokio::spawn(async { is_controller_call() }).await.unwrap()
        })
        .await;
        assert!(!spawned);
    }
}
