use crate::models::Provider;
use rusqlite::{params, Connection};

pub struct ProviderDao;

impl ProviderDao {
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Provider>, rusqlite::Error> {
        let mut stmt = conn.prepare("SELECT id, name, is_active FROM providers WHERE id = ?")?;

        let result = stmt.query_row([id], |row| {
            Ok(Provider {
                id: row.get(0)?,
                name: row.get(1)?,
                is_active: row.get(2)?,
            })
        });

        match result {
            Ok(provider) => Ok(Some(provider)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn insert(conn: &Connection, provider: &Provider) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO providers (id, name, is_active) VALUES (?1, ?2, ?3)",
            params![provider.id, provider.name, provider.is_active],
        )?;
        Ok(())
    }

    pub fn set_active(conn: &Connection, id: &str, is_active: bool) -> Result<(), rusqlite::Error> {
        conn.execute(
            "UPDATE providers SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;
        Ok(())
    }
}
