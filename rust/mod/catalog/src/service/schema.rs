use vidcat_sql::SQLStore;

use crate::service::CatalogError;

/// Tables owned by [`GrantStore`](crate::service::grants::GrantStore).
///
/// Plain columns rather than JSON blobs: grants are only ever replaced
/// wholesale and read back per user.
pub fn init_grant_schema(sql: &dyn SQLStore) -> Result<(), CatalogError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS classification_grants (
            user_id TEXT NOT NULL,
            classification_id INTEGER NOT NULL,
            layer INTEGER NOT NULL CHECK (layer BETWEEN 0 AND 4),
            PRIMARY KEY (user_id, classification_id)
        )",
        "CREATE TABLE IF NOT EXISTS privilege_grants (
            user_id TEXT NOT NULL,
            privilege_id INTEGER NOT NULL,
            pp_type TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (user_id, privilege_id)
        )",
    ];
    run(sql, &statements)
}

/// Tables for catalog resources: sources, privileges, videos, views.
pub fn init_catalog_schema(sql: &dyn SQLStore) -> Result<(), CatalogError> {
    let statements = [
        // Classification sources: what a video points at to declare its layer
        "CREATE TABLE IF NOT EXISTS classification_sources (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            classification_id INTEGER NOT NULL,
            layer INTEGER NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sources_classification ON classification_sources(classification_id)",
        "CREATE INDEX IF NOT EXISTS idx_sources_name ON classification_sources(name)",

        // Privilege points: id space shared with the authority
        "CREATE TABLE IF NOT EXISTS privileges (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            pp_type TEXT NOT NULL DEFAULT '',
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",

        // Videos: metadata plus the two optional gates
        "CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            classification_source TEXT,
            privilege_id INTEGER,
            created_by TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_videos_source ON videos(classification_source)",
        "CREATE INDEX IF NOT EXISTS idx_videos_privilege ON videos(privilege_id)",

        // Views: one counter per (video, user)
        "CREATE TABLE IF NOT EXISTS video_views (
            video_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            last_viewed_at TEXT NOT NULL,
            PRIMARY KEY (video_id, user_id)
        )",
    ];
    run(sql, &statements)
}

fn run(sql: &dyn SQLStore, statements: &[&str]) -> Result<(), CatalogError> {
    for stmt in statements {
        sql.exec(stmt, &[])
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
    }
    Ok(())
}
