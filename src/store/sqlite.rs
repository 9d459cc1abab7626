use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::Index;
use super::key::{dependency_key_matches, project_key};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::{Dependency, Project};

pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

impl Index for SqliteIndex {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn register_project(&self, project: &Project, dependencies: &[Dependency]) -> Result<()> {
        let key = project_key(&project.name);
        let encoded = serde_json::to_string(dependencies)?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO projects (key, name, git_url, branch, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                git_url = excluded.git_url,
                branch = excluded.branch,
                registered_at = excluded.registered_at",
            params![
                key,
                project.name,
                project.git_url,
                project.branch,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.execute(
            "INSERT INTO project_dependencies (project_key, dependencies) VALUES (?1, ?2)
             ON CONFLICT(project_key) DO UPDATE SET dependencies = excluded.dependencies",
            params![key, encoded],
        )?;

        // Drop whatever the previous registration contributed before re-adding.
        tx.execute(
            "DELETE FROM dependency_projects WHERE project_key = ?1",
            params![key],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO dependency_projects (dependency, project_key) VALUES (?1, ?2)",
            )?;
            for dep in dependencies {
                stmt.execute(params![project_key(&dep.name), key])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn project(&self, name: &str) -> Result<(Project, Vec<Dependency>)> {
        let key = project_key(name);

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let project = tx
            .query_row(
                "SELECT name, git_url, branch FROM projects WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Project {
                        name: row.get(0)?,
                        git_url: row.get(1)?,
                        branch: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let encoded: String = tx
            .query_row(
                "SELECT dependencies FROM project_dependencies WHERE project_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::Integrity(format!("project {key:?} has no dependency list")))?;

        tx.commit()?;

        let dependencies = serde_json::from_str(&encoded)?;
        Ok((project, dependencies))
    }

    fn projects_for_dependency(&self, dependency: &str) -> Result<Vec<String>> {
        let query = project_key(dependency);

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let found: Option<String> = tx
            .query_row(
                "SELECT dependency FROM dependency_projects
                 WHERE dependency >= ?1 ORDER BY dependency LIMIT 1",
                params![query],
                |row| row.get(0),
            )
            .optional()?;

        let Some(found) = found.filter(|k| dependency_key_matches(&query, k)) else {
            return Ok(Vec::new());
        };

        let keys = {
            let mut stmt = tx.prepare(
                "SELECT project_key FROM dependency_projects
                 WHERE dependency = ?1 ORDER BY project_key",
            )?;
            let rows = stmt.query_map(params![found], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<String>, _>>()?
        };

        tx.commit()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> SqliteIndex {
        let index = SqliteIndex::new(temp.path().join("test.db")).unwrap();
        index.initialize().unwrap();
        index
    }

    fn project(name: &str) -> Project {
        Project {
            name: name.to_string(),
            git_url: format!("https://{}.git", name.to_lowercase()),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let conn = index.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"project_dependencies".to_string()));
        assert!(tables.contains(&"dependency_projects".to_string()));
    }

    #[test]
    fn test_register_project_round_trip() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let expected = Project {
            name: "example.com/Foo/Bar".to_string(),
            git_url: "https://example.com/foo/bar.git".to_string(),
            branch: "branch".to_string(),
        };
        let deps = vec![
            Dependency::new("dep1", "abcdef"),
            Dependency::new("dep2", "ghijkl").with_source("github.com/fork/dep2"),
        ];

        index.register_project(&expected, &deps).unwrap();

        let (actual, actual_deps) = index.project("example.com/Foo/Bar").unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual_deps, deps);
    }

    #[test]
    fn test_project_lookup_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let expected = project("Example.com/Foo/Bar");
        index.register_project(&expected, &[]).unwrap();

        let (actual, deps) = index.project("example.com/foo/bar").unwrap();
        assert_eq!(actual, expected);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_unknown_project_is_not_found() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let result = index.project("nope");
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_missing_dependency_list_is_integrity_fault() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        index
            .conn()
            .execute(
                "INSERT INTO projects (key, name, git_url, branch) VALUES ('a/b', 'a/b', 'u', 'main')",
                [],
            )
            .unwrap();

        let result = index.project("a/b");
        assert!(matches!(result, Err(Error::Integrity(_))));
    }

    #[test]
    fn test_projects_for_dependency_prefix_matching() {
        let cases: Vec<(&str, &str, Vec<&str>)> = vec![
            ("org1/dep1", "org1/dep1", vec!["org2/proj1"]),
            ("Org1/Dep1", "org1/dep1", vec!["org2/proj1"]),
            ("org1/dep1", "org1/dep1/subdep1", vec!["org2/proj1"]),
            ("org1/dep1", "org1/dep1foo", vec![]),
            ("org1/dep1", "fooorg1/dep1", vec![]),
        ];

        for (query, stored, expected) in cases {
            let temp = TempDir::new().unwrap();
            let index = open(&temp);

            index
                .register_project(&project("org2/proj1"), &[Dependency::new(stored, "rev")])
                .unwrap();

            let actual = index.projects_for_dependency(query).unwrap();
            assert_eq!(actual, expected, "query {query:?} against {stored:?}");
        }
    }

    #[test]
    fn test_sub_package_query_matches_registered_root() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        index
            .register_project(&project("proj1"), &[Dependency::new("org/dep1/sub", "rev")])
            .unwrap();

        assert_eq!(index.projects_for_dependency("org/dep1").unwrap(), vec!["proj1"]);
        assert_eq!(
            index.projects_for_dependency("org/dep1/sub").unwrap(),
            vec!["proj1"]
        );
    }

    #[test]
    fn test_projects_for_dependency_collects_all_projects() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let dep = Dependency::new("github.com/foo/bar", "abc");
        index.register_project(&project("Acme/Widgets"), &[dep.clone()]).unwrap();
        index.register_project(&project("acme/gadgets"), &[dep]).unwrap();
        index
            .register_project(&project("acme/other"), &[Dependency::new("github.com/baz/qux", "def")])
            .unwrap();

        let keys = index.projects_for_dependency("github.com/foo/bar").unwrap();
        assert_eq!(keys, vec!["acme/gadgets", "acme/widgets"]);
    }

    #[test]
    fn test_unknown_dependency_is_empty() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        assert!(index.projects_for_dependency("github.com/none").unwrap().is_empty());
    }

    #[test]
    fn test_reregistration_prunes_stale_entries() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let p = project("acme/widgets");
        index
            .register_project(
                &p,
                &[Dependency::new("github.com/old/dep", "1"), Dependency::new("github.com/kept/dep", "1")],
            )
            .unwrap();
        index
            .register_project(
                &p,
                &[Dependency::new("github.com/kept/dep", "2"), Dependency::new("github.com/new/dep", "1")],
            )
            .unwrap();

        assert!(index.projects_for_dependency("github.com/old/dep").unwrap().is_empty());
        assert_eq!(
            index.projects_for_dependency("github.com/kept/dep").unwrap(),
            vec!["acme/widgets"]
        );
        assert_eq!(
            index.projects_for_dependency("github.com/new/dep").unwrap(),
            vec!["acme/widgets"]
        );

        let (_, deps) = index.project("acme/widgets").unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].revision, "2");
    }

    #[test]
    fn test_reregistration_leaves_other_projects_alone() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp);

        let dep = Dependency::new("github.com/foo/bar", "abc");
        index.register_project(&project("a/one"), &[dep.clone()]).unwrap();
        index.register_project(&project("a/two"), &[dep]).unwrap();
        index.register_project(&project("a/one"), &[]).unwrap();

        assert_eq!(
            index.projects_for_dependency("github.com/foo/bar").unwrap(),
            vec!["a/two"]
        );
    }

    #[test]
    fn test_duplicate_dependencies_in_one_list() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.initialize().unwrap();

        let deps = vec![
            Dependency::new("github.com/foo/bar/a", "abc"),
            Dependency::new("GitHub.com/foo/bar/a", "abc"),
        ];
        index.register_project(&project("a/one"), &deps).unwrap();

        assert_eq!(
            index.projects_for_dependency("github.com/foo/bar").unwrap(),
            vec!["a/one"]
        );
    }
}
