use std::collections::HashMap;

use rusqlite::{Connection, Row, params};

use socialsim_types::{Error, FeedPostRepository, Post, PostSource, Result};

use crate::db::Database;

const POST_COLUMNS: &str = "post_id, source, uri, author_handle, author_display_name, text, \
     bookmark_count, like_count, quote_count, reply_count, repost_count, created_at";

// Keeps IN (...) clauses well under SQLite's bind-parameter limit
const BATCH_SIZE: usize = 500;

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let source_raw: String = row.get(1)?;
    let source = PostSource::parse(&source_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Post {
        post_id: row.get(0)?,
        source,
        uri: row.get(2)?,
        author_handle: row.get(3)?,
        author_display_name: row.get(4)?,
        text: row.get(5)?,
        bookmark_count: row.get::<_, i64>(6)? as u64,
        like_count: row.get::<_, i64>(7)? as u64,
        quote_count: row.get::<_, i64>(8)? as u64,
        reply_count: row.get::<_, i64>(9)? as u64,
        repost_count: row.get::<_, i64>(10)? as u64,
        created_at: row.get(11)?,
    })
}

pub(crate) fn insert_post(conn: &Connection, post: &Post) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO feed_posts
        (post_id, source, uri, author_handle, author_display_name, text,
         bookmark_count, like_count, quote_count, reply_count, repost_count, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(post_id) DO UPDATE SET
            author_display_name = ?5,
            text = ?6,
            bookmark_count = ?7,
            like_count = ?8,
            quote_count = ?9,
            reply_count = ?10,
            repost_count = ?11,
            created_at = ?12
        "#,
        params![
            &post.post_id,
            post.source.as_str(),
            &post.uri,
            &post.author_handle,
            &post.author_display_name,
            &post.text,
            post.bookmark_count as i64,
            post.like_count as i64,
            post.quote_count as i64,
            post.reply_count as i64,
            post.repost_count as i64,
            &post.created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

impl FeedPostRepository for Database {
    fn write_posts(&self, posts: &[Post]) -> Result<()> {
        self.with_transaction(|tx| {
            for post in posts {
                insert_post(tx, post)?;
            }
            Ok(())
        })
    }

    fn list_all_posts(&self) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM feed_posts ORDER BY post_id",
                    POST_COLUMNS
                ))
                .map_err(Error::storage)?;
            let posts = stmt
                .query_map([], post_from_row)
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::storage)?;
            Ok(posts)
        })
    }

    fn read_posts_by_ids(&self, post_ids: &[String]) -> Result<Vec<Post>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let mut by_id: HashMap<String, Post> = HashMap::with_capacity(post_ids.len());
            for chunk in post_ids.chunks(BATCH_SIZE) {
                let placeholders = vec!["?"; chunk.len()].join(", ");
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM feed_posts WHERE post_id IN ({})",
                        POST_COLUMNS, placeholders
                    ))
                    .map_err(Error::storage)?;
                let posts = stmt
                    .query_map(rusqlite::params_from_iter(chunk.iter()), post_from_row)
                    .map_err(Error::storage)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(Error::storage)?;
                for post in posts {
                    by_id.insert(post.post_id.clone(), post);
                }
            }

            // Input order; ids without a row are silently omitted
            Ok(post_ids
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect())
        })
    }
}
