use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use socialsim_types::{
    ActionRepository, Error, FeedPostRepository, GeneratedAction, GeneratedFeedRepository, Post,
    Result, Run, RunRepository, TurnData, TurnMetadata,
};

fn validate_run_id(run_id: &str) -> Result<()> {
    if run_id.trim().is_empty() {
        return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
    }
    Ok(())
}

/// Read-only surface over persisted runs, turns, feeds, and actions
pub struct SimulationQueryService {
    run_repo: Arc<dyn RunRepository>,
    feed_post_repo: Arc<dyn FeedPostRepository>,
    generated_feed_repo: Arc<dyn GeneratedFeedRepository>,
    action_repo: Arc<dyn ActionRepository>,
}

impl SimulationQueryService {
    pub fn new(
        run_repo: Arc<dyn RunRepository>,
        feed_post_repo: Arc<dyn FeedPostRepository>,
        generated_feed_repo: Arc<dyn GeneratedFeedRepository>,
        action_repo: Arc<dyn ActionRepository>,
    ) -> Self {
        Self {
            run_repo,
            feed_post_repo,
            generated_feed_repo,
            action_repo,
        }
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        validate_run_id(run_id)?;
        self.run_repo.get_run(run_id)
    }

    /// All runs, newest first
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        self.run_repo.list_runs()
    }

    pub fn get_turn_metadata(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Option<TurnMetadata>> {
        validate_run_id(run_id)?;
        self.run_repo.get_turn_metadata(run_id, turn_number)
    }

    /// Turn metadata ascending by turn number
    pub fn list_turn_metadata(&self, run_id: &str) -> Result<Vec<TurnMetadata>> {
        validate_run_id(run_id)?;
        let mut metadata = self.run_repo.list_turn_metadata(run_id)?;
        metadata.sort_by_key(|m| m.turn_number);
        Ok(metadata)
    }

    /// Full turn view: per-agent hydrated feeds plus per-agent generated
    /// actions.
    ///
    /// Returns `None` when no feeds exist for the turn; `RunNotFound`
    /// when the run itself is absent. Posts deleted since feed
    /// generation are skipped silently.
    pub fn get_turn_data(&self, run_id: &str, turn_number: u32) -> Result<Option<TurnData>> {
        validate_run_id(run_id)?;

        if self.run_repo.get_run(run_id)?.is_none() {
            return Err(Error::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let feeds = self
            .generated_feed_repo
            .read_feeds_for_turn(run_id, turn_number)?;
        if feeds.is_empty() {
            return Ok(None);
        }

        let all_ids: BTreeSet<&String> = feeds.iter().flat_map(|f| f.post_ids.iter()).collect();
        let id_list: Vec<String> = all_ids.into_iter().cloned().collect();
        let posts = self.feed_post_repo.read_posts_by_ids(&id_list)?;
        let by_id: HashMap<&str, &Post> = posts.iter().map(|p| (p.post_id.as_str(), p)).collect();

        let mut hydrated_feeds: BTreeMap<String, Vec<Post>> = BTreeMap::new();
        for feed in &feeds {
            let hydrated = feed
                .post_ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|p| (*p).clone()))
                .collect();
            hydrated_feeds.insert(feed.agent_handle.clone(), hydrated);
        }

        Ok(Some(TurnData {
            turn_number,
            feeds: hydrated_feeds,
            actions: self.hydrate_actions(run_id, turn_number)?,
        }))
    }

    // Likes, then comments, then follows per agent, matching recording
    // order
    fn hydrate_actions(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<BTreeMap<String, Vec<GeneratedAction>>> {
        let mut actions: BTreeMap<String, Vec<GeneratedAction>> = BTreeMap::new();

        for like in self.action_repo.read_likes_for_turn(run_id, turn_number)? {
            actions
                .entry(like.agent_handle.clone())
                .or_default()
                .push(GeneratedAction::Like(like.to_generated()?));
        }
        for comment in self
            .action_repo
            .read_comments_for_turn(run_id, turn_number)?
        {
            actions
                .entry(comment.agent_handle.clone())
                .or_default()
                .push(GeneratedAction::Comment(comment.to_generated()?));
        }
        for follow in self.action_repo.read_follows_for_turn(run_id, turn_number)? {
            actions
                .entry(follow.agent_handle.clone())
                .or_default()
                .push(GeneratedAction::Follow(follow.to_generated()?));
        }

        Ok(actions)
    }
}
