use std::collections::HashSet;

/// Run-scoped record of accepted action targets.
///
/// The orchestrator owns one store per run, queries it when filtering
/// candidates and validating invariants, and records into it only after
/// validation passes. Stores are torn down when the run ends; nothing
/// here needs to be durable.
pub trait ActionHistoryStore: Send {
    fn has_liked(&self, run_id: &str, agent_handle: &str, post_id: &str) -> bool;
    fn has_commented(&self, run_id: &str, agent_handle: &str, post_id: &str) -> bool;
    fn has_followed(&self, run_id: &str, agent_handle: &str, user_id: &str) -> bool;

    fn record_like(&mut self, run_id: &str, agent_handle: &str, post_id: &str);
    fn record_comment(&mut self, run_id: &str, agent_handle: &str, post_id: &str);
    fn record_follow(&mut self, run_id: &str, agent_handle: &str, user_id: &str);

    /// Drop everything recorded for a run
    fn clear_run(&mut self, run_id: &str);
}

type TargetKey = (String, String, String);

fn key(run_id: &str, agent_handle: &str, target: &str) -> TargetKey {
    (
        run_id.to_string(),
        agent_handle.to_string(),
        target.to_string(),
    )
}

/// Default in-memory store; one run mutates it from a single thread
#[derive(Debug, Default)]
pub struct InMemoryActionHistoryStore {
    liked: HashSet<TargetKey>,
    commented: HashSet<TargetKey>,
    followed: HashSet<TargetKey>,
}

impl InMemoryActionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionHistoryStore for InMemoryActionHistoryStore {
    fn has_liked(&self, run_id: &str, agent_handle: &str, post_id: &str) -> bool {
        self.liked.contains(&key(run_id, agent_handle, post_id))
    }

    fn has_commented(&self, run_id: &str, agent_handle: &str, post_id: &str) -> bool {
        self.commented.contains(&key(run_id, agent_handle, post_id))
    }

    fn has_followed(&self, run_id: &str, agent_handle: &str, user_id: &str) -> bool {
        self.followed.contains(&key(run_id, agent_handle, user_id))
    }

    fn record_like(&mut self, run_id: &str, agent_handle: &str, post_id: &str) {
        self.liked.insert(key(run_id, agent_handle, post_id));
    }

    fn record_comment(&mut self, run_id: &str, agent_handle: &str, post_id: &str) {
        self.commented.insert(key(run_id, agent_handle, post_id));
    }

    fn record_follow(&mut self, run_id: &str, agent_handle: &str, user_id: &str) {
        self.followed.insert(key(run_id, agent_handle, user_id));
    }

    fn clear_run(&mut self, run_id: &str) {
        self.liked.retain(|(r, _, _)| r != run_id);
        self.commented.retain(|(r, _, _)| r != run_id);
        self.followed.retain(|(r, _, _)| r != run_id);
    }
}
