pub const SCHEMA: &str = r#"
-- Project records, keyed by lowercased name
CREATE TABLE IF NOT EXISTS projects (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    git_url TEXT NOT NULL,
    branch TEXT NOT NULL,
    registered_at TEXT DEFAULT (datetime('now'))
);

-- Full dependency list of the most recent registration, as a JSON array
CREATE TABLE IF NOT EXISTS project_dependencies (
    project_key TEXT PRIMARY KEY,
    dependencies TEXT NOT NULL
);

-- Reverse index: dependency name -> projects that declare it.
-- Clustered on (dependency, project_key) so a seek on dependency is ordered.
CREATE TABLE IF NOT EXISTS dependency_projects (
    dependency TEXT NOT NULL,
    project_key TEXT NOT NULL,
    PRIMARY KEY (dependency, project_key)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_dependency_projects_project ON dependency_projects(project_key);
"#;
