//! Case repository backed by a YAML suite file

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::case::{Suite, TestCase};
use crate::common::{Error, Result};

/// Source of ordered case definitions, accepting upserts and deletes
pub trait CaseRepository {
    /// All suites ordered by `sort`
    fn suites(&self) -> Vec<Suite>;

    /// Look up a suite by id
    fn suite(&self, id: u64) -> Result<Suite>;

    /// Active cases of a suite in execution order (`sort`, then `id`)
    fn cases(&self, suite_id: u64) -> Result<Vec<TestCase>>;

    /// Look up a case by id
    fn case(&self, id: u64) -> Result<TestCase>;

    /// Insert or replace a case, returning the stored version
    fn upsert(&mut self, case: TestCase) -> Result<TestCase>;

    /// Remove a case; returns whether anything was removed
    fn delete(&mut self, id: u64) -> Result<bool>;
}

/// On-disk layout of a suite file
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct SuiteFile {
    #[serde(default)]
    pub suites: Vec<Suite>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl SuiteFile {
    /// Suite ids and case ids must each be unique within the file
    fn check_ids(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.suites.iter().find(|s| !seen.insert(s.id)) {
            return Err(format!("duplicate suite id {}", dup.id));
        }
        seen.clear();
        if let Some(dup) = self.cases.iter().find(|c| !seen.insert(c.id)) {
            return Err(format!("duplicate test case id {} ('{}')", dup.id, dup.name));
        }
        Ok(())
    }
}

/// Repository over one YAML suite file
#[derive(Debug)]
pub struct YamlRepository {
    path: Option<PathBuf>,
    file: SuiteFile,
}

impl YamlRepository {
    /// Load a suite file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let file: SuiteFile =
            serde_yaml::from_str(&content).map_err(|e| Error::suite_parse(path, e))?;
        file.check_ids().map_err(|e| Error::suite_parse(path, e))?;
        tracing::debug!(
            path = %path.display(),
            suites = file.suites.len(),
            cases = file.cases.len(),
            "Loaded suite file"
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            file,
        })
    }

    /// Build an in-memory repository that is never written to disk
    pub fn in_memory(file: SuiteFile) -> Result<Self> {
        file.check_ids()
            .map_err(|e| Error::suite_parse(Path::new("<memory>"), e))?;
        Ok(Self { path: None, file })
    }

    /// Write the current contents back to the file it was loaded from
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_yaml::to_string(&self.file)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn file(&self) -> &SuiteFile {
        &self.file
    }
}

impl CaseRepository for YamlRepository {
    fn suites(&self) -> Vec<Suite> {
        let mut suites = self.file.suites.clone();
        suites.sort_by_key(|s| (s.sort, s.id));
        suites
    }

    fn suite(&self, id: u64) -> Result<Suite> {
        self.file
            .suites
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(Error::SuiteNotFound(id))
    }

    fn cases(&self, suite_id: u64) -> Result<Vec<TestCase>> {
        self.suite(suite_id)?;
        let mut cases: Vec<TestCase> = self
            .file
            .cases
            .iter()
            .filter(|c| c.suite == suite_id && c.active)
            .cloned()
            .collect();
        cases.sort_by_key(|c| (c.sort, c.id));
        Ok(cases)
    }

    fn case(&self, id: u64) -> Result<TestCase> {
        self.file
            .cases
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::CaseNotFound(id))
    }

    fn upsert(&mut self, mut case: TestCase) -> Result<TestCase> {
        self.suite(case.suite)?;

        if case.id == 0 {
            case.id = self.file.cases.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            if case.sort == 0 {
                let max_sort = self
                    .file
                    .cases
                    .iter()
                    .filter(|c| c.suite == case.suite)
                    .map(|c| c.sort)
                    .max()
                    .unwrap_or(0);
                case.sort = max_sort.max(0) + 10;
            }
        }

        match self.file.cases.iter_mut().find(|c| c.id == case.id) {
            Some(existing) => *existing = case.clone(),
            None => self.file.cases.push(case.clone()),
        }
        tracing::debug!(case_id = case.id, suite = case.suite, "Stored test case");
        Ok(case)
    }

    fn delete(&mut self, id: u64) -> Result<bool> {
        let before = self.file.cases.len();
        self.file.cases.retain(|c| c.id != id);
        Ok(self.file.cases.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE_YAML: &str = r#"
suites:
  - id: 2
    name: Second
    sort: 20
  - id: 1
    name: Booking
    sort: 10
cases:
  - id: 5
    suite: 1
    name: Cancel
    sort: 30
    url: /booking/<b_id>/cancel
  - id: 4
    suite: 1
    name: Create
    sort: 10
    method: POST
    url: /booking
  - id: 6
    suite: 1
    name: Disabled
    sort: 20
    url: /x
    active: false
  - id: 7
    suite: 2
    name: Other
    url: /other
"#;

    fn repo() -> YamlRepository {
        YamlRepository::in_memory(serde_yaml::from_str(SUITE_YAML).unwrap()).unwrap()
    }

    #[test]
    fn test_suites_and_cases_are_ordered() {
        let repo = repo();
        let names: Vec<_> = repo.suites().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Booking", "Second"]);

        let cases: Vec<_> = repo.cases(1).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(cases, vec![4, 5]);
    }

    #[test]
    fn test_unknown_suite_is_an_error() {
        assert!(matches!(repo().cases(99), Err(Error::SuiteNotFound(99))));
    }

    #[test]
    fn test_upsert_assigns_id_and_sort_for_new_case() {
        let mut repo = repo();
        let stored = repo
            .upsert(TestCase::new(1, "New test", "POST", "/new"))
            .unwrap();
        assert_eq!(stored.id, 8);
        assert_eq!(stored.sort, 40);
        assert_eq!(repo.case(8).unwrap().name, "New test");
    }

    #[test]
    fn test_upsert_replaces_existing_case() {
        let mut repo = repo();
        let mut case = repo.case(5).unwrap();
        case.url = "/booking/<b_id>".to_string();
        repo.upsert(case).unwrap();
        assert_eq!(repo.case(5).unwrap().url, "/booking/<b_id>");
        assert_eq!(repo.file().cases.len(), 4);
    }

    #[test]
    fn test_upsert_into_unknown_suite_fails() {
        let mut repo = repo();
        let err = repo.upsert(TestCase::new(42, "x", "GET", "/x")).unwrap_err();
        assert!(matches!(err, Error::SuiteNotFound(42)));
    }

    #[test]
    fn test_delete_reports_removal() {
        let mut repo = repo();
        assert!(repo.delete(5).unwrap());
        assert!(!repo.delete(5).unwrap());
        assert!(matches!(repo.case(5), Err(Error::CaseNotFound(5))));
    }

    #[test]
    fn test_save_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, SUITE_YAML).unwrap();

        let mut repo = YamlRepository::load(&path).unwrap();
        repo.delete(7).unwrap();
        repo.save().unwrap();

        let reloaded = YamlRepository::load(&path).unwrap();
        assert!(reloaded.cases(2).unwrap().is_empty());
        assert_eq!(reloaded.cases(1).unwrap().len(), 2);
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "cases: [ {").unwrap();
        let err = YamlRepository::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_duplicate_case_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dupes.yaml");
        std::fs::write(
            &path,
            r#"
suites:
  - id: 1
    name: Booking
cases:
  - id: 1
    suite: 1
    name: Create
    url: /booking
  - id: 1
    suite: 1
    name: Cancel
    url: /booking/cancel
"#,
        )
        .unwrap();

        let err = YamlRepository::load(&path).unwrap_err();
        assert!(matches!(err, Error::SuiteParse { .. }));
        assert!(err.to_string().contains("duplicate test case id 1"), "{}", err);
    }

    #[test]
    fn test_duplicate_suite_ids_are_rejected() {
        let file = SuiteFile {
            suites: vec![
                Suite {
                    id: 3,
                    name: "A".to_string(),
                    description: String::new(),
                    domain: String::new(),
                    base_url: None,
                    sort: 0,
                },
                Suite {
                    id: 3,
                    name: "B".to_string(),
                    description: String::new(),
                    domain: String::new(),
                    base_url: None,
                    sort: 0,
                },
            ],
            cases: Vec::new(),
        };
        let err = YamlRepository::in_memory(file).unwrap_err();
        assert!(err.to_string().contains("duplicate suite id 3"), "{}", err);
    }
}
