use rusqlite::{OptionalExtension, Row, params};

use socialsim_types::{
    Agent, AgentBio, AgentRepository, BioSource, Error, PersonaSource, Result,
};

use crate::db::Database;

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let source_raw: String = row.get(3)?;
    let persona_source = PersonaSource::parse(&source_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Agent {
        agent_id: row.get(0)?,
        handle: row.get(1)?,
        display_name: row.get(2)?,
        persona_source,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn bio_from_row(row: &Row<'_>) -> rusqlite::Result<AgentBio> {
    let source_raw: String = row.get(3)?;
    let source = BioSource::parse(&source_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AgentBio {
        bio_id: row.get(0)?,
        agent_id: row.get(1)?,
        persona_bio: row.get(2)?,
        source,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl AgentRepository for Database {
    fn write_agent(&self, agent: &Agent) -> Result<()> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO agents \
                 (agent_id, handle, display_name, persona_source, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &agent.agent_id,
                    &agent.handle,
                    &agent.display_name,
                    agent.persona_source.as_str(),
                    &agent.created_at,
                    &agent.updated_at,
                ],
            ) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(Error::HandleAlreadyExists {
                        handle: agent.handle.clone(),
                    })
                }
                Err(e) => Err(Error::storage(e)),
            }
        })
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT agent_id, handle, display_name, persona_source, created_at, \
                     updated_at FROM agents ORDER BY handle",
                )
                .map_err(Error::storage)?;
            let agents = stmt
                .query_map([], agent_from_row)
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::storage)?;
            Ok(agents)
        })
    }

    fn write_agent_bio(&self, bio: &AgentBio) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO agent_bios \
                 (bio_id, agent_id, persona_bio, source, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &bio.bio_id,
                    &bio.agent_id,
                    &bio.persona_bio,
                    bio.source.as_str(),
                    &bio.created_at,
                    &bio.updated_at,
                ],
            )
            .map_err(Error::storage)?;
            Ok(())
        })
    }

    fn latest_bio(&self, agent_id: &str) -> Result<Option<AgentBio>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT bio_id, agent_id, persona_bio, source, created_at, updated_at \
                 FROM agent_bios WHERE agent_id = ?1 \
                 ORDER BY created_at DESC, bio_id DESC LIMIT 1",
                [agent_id],
                bio_from_row,
            )
            .optional()
            .map_err(Error::storage)
        })
    }
}
