use rusqlite::{Connection, Row, params};

use socialsim_types::{
    ActionRepository, Error, GeneratedComment, GeneratedFollow, GeneratedLike, PersistedComment,
    PersistedFollow, PersistedLike, Result,
};

use crate::db::Database;

fn insert_like(conn: &Connection, like: &PersistedLike) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO likes
        (like_id, run_id, turn_number, agent_handle, post_id, created_at,
         explanation, model_used, generation_metadata_json, generation_created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            &like.like_id,
            &like.run_id,
            like.turn_number,
            &like.agent_handle,
            &like.post_id,
            &like.created_at,
            &like.explanation,
            &like.model_used,
            &like.generation_metadata_json,
            &like.generation_created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

fn insert_comment(conn: &Connection, comment: &PersistedComment) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO comments
        (comment_id, run_id, turn_number, agent_handle, post_id, text, created_at,
         explanation, model_used, generation_metadata_json, generation_created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            &comment.comment_id,
            &comment.run_id,
            comment.turn_number,
            &comment.agent_handle,
            &comment.post_id,
            &comment.text,
            &comment.created_at,
            &comment.explanation,
            &comment.model_used,
            &comment.generation_metadata_json,
            &comment.generation_created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

fn insert_follow(conn: &Connection, follow: &PersistedFollow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO follows
        (follow_id, run_id, turn_number, agent_handle, user_id, created_at,
         explanation, model_used, generation_metadata_json, generation_created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            &follow.follow_id,
            &follow.run_id,
            follow.turn_number,
            &follow.agent_handle,
            &follow.user_id,
            &follow.created_at,
            &follow.explanation,
            &follow.model_used,
            &follow.generation_metadata_json,
            &follow.generation_created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

fn like_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedLike> {
    Ok(PersistedLike {
        like_id: row.get(0)?,
        run_id: row.get(1)?,
        turn_number: row.get(2)?,
        agent_handle: row.get(3)?,
        post_id: row.get(4)?,
        created_at: row.get(5)?,
        explanation: row.get(6)?,
        model_used: row.get(7)?,
        generation_metadata_json: row.get(8)?,
        generation_created_at: row.get(9)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedComment> {
    Ok(PersistedComment {
        comment_id: row.get(0)?,
        run_id: row.get(1)?,
        turn_number: row.get(2)?,
        agent_handle: row.get(3)?,
        post_id: row.get(4)?,
        text: row.get(5)?,
        created_at: row.get(6)?,
        explanation: row.get(7)?,
        model_used: row.get(8)?,
        generation_metadata_json: row.get(9)?,
        generation_created_at: row.get(10)?,
    })
}

fn follow_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedFollow> {
    Ok(PersistedFollow {
        follow_id: row.get(0)?,
        run_id: row.get(1)?,
        turn_number: row.get(2)?,
        agent_handle: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
        explanation: row.get(6)?,
        model_used: row.get(7)?,
        generation_metadata_json: row.get(8)?,
        generation_created_at: row.get(9)?,
    })
}

impl ActionRepository for Database {
    fn write_likes(&self, run_id: &str, turn_number: u32, likes: &[GeneratedLike]) -> Result<()> {
        if likes.is_empty() {
            return Ok(());
        }
        self.with_transaction(|tx| {
            for like in likes {
                insert_like(tx, &PersistedLike::from_generated(run_id, turn_number, like))?;
            }
            Ok(())
        })
    }

    fn write_comments(
        &self,
        run_id: &str,
        turn_number: u32,
        comments: &[GeneratedComment],
    ) -> Result<()> {
        if comments.is_empty() {
            return Ok(());
        }
        self.with_transaction(|tx| {
            for comment in comments {
                insert_comment(
                    tx,
                    &PersistedComment::from_generated(run_id, turn_number, comment),
                )?;
            }
            Ok(())
        })
    }

    fn write_follows(
        &self,
        run_id: &str,
        turn_number: u32,
        follows: &[GeneratedFollow],
    ) -> Result<()> {
        if follows.is_empty() {
            return Ok(());
        }
        self.with_transaction(|tx| {
            for follow in follows {
                insert_follow(
                    tx,
                    &PersistedFollow::from_generated(run_id, turn_number, follow),
                )?;
            }
            Ok(())
        })
    }

    fn read_likes_for_turn(&self, run_id: &str, turn_number: u32) -> Result<Vec<PersistedLike>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT like_id, run_id, turn_number, agent_handle, post_id, created_at, \
                     explanation, model_used, generation_metadata_json, generation_created_at \
                     FROM likes WHERE run_id = ?1 AND turn_number = ?2 \
                     ORDER BY agent_handle, like_id",
                )
                .map_err(Error::storage)?;
            let likes = stmt
                .query_map(params![run_id, turn_number], like_from_row)
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::storage)?;
            Ok(likes)
        })
    }

    fn read_comments_for_turn(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Vec<PersistedComment>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT comment_id, run_id, turn_number, agent_handle, post_id, text, \
                     created_at, explanation, model_used, generation_metadata_json, \
                     generation_created_at \
                     FROM comments WHERE run_id = ?1 AND turn_number = ?2 \
                     ORDER BY agent_handle, comment_id",
                )
                .map_err(Error::storage)?;
            let comments = stmt
                .query_map(params![run_id, turn_number], comment_from_row)
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::storage)?;
            Ok(comments)
        })
    }

    fn read_follows_for_turn(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Vec<PersistedFollow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT follow_id, run_id, turn_number, agent_handle, user_id, created_at, \
                     explanation, model_used, generation_metadata_json, generation_created_at \
                     FROM follows WHERE run_id = ?1 AND turn_number = ?2 \
                     ORDER BY agent_handle, follow_id",
                )
                .map_err(Error::storage)?;
            let follows = stmt
                .query_map(params![run_id, turn_number], follow_from_row)
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::storage)?;
            Ok(follows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use socialsim_types::{
        Comment, Follow, GenerationMetadata, Like, RunConfig, RunRepository, now_timestamp,
    };

    fn store_with_run() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let run = db.create_run(&RunConfig::new(1, 2, "chronological")).unwrap();
        (db, run.run_id)
    }

    fn generated_like(agent: &str, post_id: &str) -> GeneratedLike {
        GeneratedLike {
            like: Like {
                like_id: format!("like_{}_{}", agent, post_id),
                agent_id: agent.to_string(),
                post_id: post_id.to_string(),
                created_at: now_timestamp(),
            },
            explanation: "Deterministic: recency and social proof".to_string(),
            metadata: GenerationMetadata {
                model_used: None,
                generation_metadata: Some(json!({"policy": "deterministic"})),
                created_at: now_timestamp(),
            },
        }
    }

    #[test]
    fn likes_round_trip_through_storage() {
        let (db, run_id) = store_with_run();
        let like = generated_like("@a", "bluesky:p1");
        db.write_likes(&run_id, 0, std::slice::from_ref(&like)).unwrap();

        let rows = db.read_likes_for_turn(&run_id, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].agent_handle, "@a");
        assert_eq!(rows[0].run_id, run_id);

        let back = rows[0].to_generated().unwrap();
        assert_eq!(back, like);
    }

    #[test]
    fn comments_and_follows_round_trip() {
        let (db, run_id) = store_with_run();
        let comment = GeneratedComment {
            comment: Comment {
                comment_id: "c1".to_string(),
                agent_id: "@a".to_string(),
                post_id: "bluesky:p1".to_string(),
                text: "nice".to_string(),
                created_at: now_timestamp(),
            },
            explanation: "Simple: recency/social proof with random probability".to_string(),
            metadata: GenerationMetadata {
                model_used: None,
                generation_metadata: None,
                created_at: now_timestamp(),
            },
        };
        let follow = GeneratedFollow {
            follow: Follow {
                follow_id: "f1".to_string(),
                agent_id: "@a".to_string(),
                user_id: "@b".to_string(),
                created_at: now_timestamp(),
            },
            explanation: "LLM prediction (naive_llm)".to_string(),
            metadata: GenerationMetadata {
                model_used: Some("test-model".to_string()),
                generation_metadata: Some(json!({"policy": "naive_llm"})),
                created_at: now_timestamp(),
            },
        };

        db.write_comments(&run_id, 1, std::slice::from_ref(&comment))
            .unwrap();
        db.write_follows(&run_id, 1, std::slice::from_ref(&follow))
            .unwrap();

        let comments = db.read_comments_for_turn(&run_id, 1).unwrap();
        assert_eq!(comments[0].to_generated().unwrap(), comment);

        let follows = db.read_follows_for_turn(&run_id, 1).unwrap();
        assert_eq!(follows[0].to_generated().unwrap(), follow);
        assert_eq!(follows[0].model_used.as_deref(), Some("test-model"));
    }

    #[test]
    fn reads_are_scoped_to_the_turn() {
        let (db, run_id) = store_with_run();
        db.write_likes(&run_id, 0, &[generated_like("@a", "bluesky:p1")])
            .unwrap();
        db.write_likes(&run_id, 1, &[generated_like("@a", "bluesky:p2")])
            .unwrap();

        assert_eq!(db.read_likes_for_turn(&run_id, 0).unwrap().len(), 1);
        assert_eq!(db.read_likes_for_turn(&run_id, 1).unwrap().len(), 1);
        assert!(db.read_likes_for_turn(&run_id, 2).unwrap().is_empty());
    }
}
