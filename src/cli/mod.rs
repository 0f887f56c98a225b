//! CLI command handling
//!
//! Loads configuration and suite files, drives the run controller and
//! formats output.

mod console;

use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{Commands, ConnectionArgs};
use crate::common::config::Config;
use crate::common::paths;
use crate::common::{Error, Result};
use crate::engine::{coerce_string, RunController, RunMode, RunSummary, U_ID_KEY};
use crate::suite::{CaseRepository, Suite, TestCase, YamlRepository};
use crate::transport::HttpTransport;

pub use console::ConsoleReporter;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, conn: ConnectionArgs) -> Result<()> {
    match command {
        Commands::Run {
            file,
            suite,
            mode,
            case,
            json,
        } => {
            let repo = YamlRepository::load(&file)?;

            if let Some(case_id) = case {
                let case = single_case(&repo, case_id, suite)?;
                let suite = repo.suite(case.suite)?;
                let mut controller = controller(&conn)?;
                if !json {
                    controller.set_observer(Box::new(ConsoleReporter::new(conn.verbose)));
                }
                let result = controller
                    .run_single(&case, suite.base_url.as_deref())
                    .await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                return if result.passed() {
                    Ok(())
                } else {
                    Err(Error::CasesFailed {
                        failed: 1,
                        total: 1,
                    })
                };
            }

            let suite = pick_suite(&repo, suite)?;
            let mut controller = controller(&conn)?;
            if !json {
                controller.set_observer(Box::new(ConsoleReporter::new(conn.verbose)));
            }

            let queue = repo.cases(suite.id)?;
            if !json {
                println!(
                    "\n{} {} {}",
                    "Running Suite:".blue().bold(),
                    suite.name.white().bold(),
                    format!("({} cases, {:?} mode)", queue.len(), mode).dimmed()
                );
                if !suite.description.is_empty() {
                    println!("  {}", suite.description.dimmed());
                }
            }

            match mode {
                RunMode::Auto => run_auto(&mut controller, queue, &suite).await?,
                RunMode::Step => run_steps(&mut controller, queue, &suite).await?,
            }

            let Some(run) = controller.run() else {
                return Ok(());
            };
            let summary = run.summary();
            if json {
                let report = serde_json::json!({
                    "suite": suite.name,
                    "summary": summary,
                    "results": run.results,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            check_summary(&summary)
        }

        Commands::List { file, suite } => {
            let repo = YamlRepository::load(&file)?;
            let suites: Vec<Suite> = match suite {
                Some(id) => vec![repo.suite(id)?],
                None => repo.suites(),
            };

            if suites.is_empty() {
                println!("No suites defined in {}", file.display());
                return Ok(());
            }

            for suite in suites {
                let cases = repo.cases(suite.id)?;
                println!(
                    "{} {} {}",
                    format!("[{}]", suite.id).dimmed(),
                    suite.name.bold(),
                    format!("({} cases)", cases.len()).dimmed()
                );
                for case in cases {
                    let mut line = format!(
                        "  {:>4}  {:<6} {:<32} {}",
                        case.id,
                        case.method.to_uppercase(),
                        case.url,
                        case.name
                    );
                    if !case.group.is_empty() {
                        line.push_str(&format!(" [{}]", case.group));
                    }
                    if case.depends_on != 0 {
                        line.push_str(&format!(" <- {}", case.depends_on));
                    }
                    println!("{}", line);
                }
            }
            Ok(())
        }

        Commands::Delete { file, case_id } => {
            let mut repo = YamlRepository::load(&file)?;
            if !repo.delete(case_id)? {
                return Err(Error::CaseNotFound(case_id));
            }
            repo.save()?;
            println!("Test case {} deleted from {}", case_id, file.display());
            Ok(())
        }

        Commands::Login => {
            let mut controller = controller(&conn)?;
            controller.login(None).await?;
            let user = match controller.session().get(U_ID_KEY) {
                Some(value) => coerce_string(Some(value)),
                None => "unknown".to_string(),
            };
            println!("{} Authenticated (u_id: {})", "✓".green(), user);
            Ok(())
        }

        Commands::Config => {
            match conn.config.clone().or_else(paths::config_path) {
                Some(path) if path.exists() => println!("{}", path.display()),
                Some(path) => println!("{} (not found, using defaults)", path.display()),
                None => println!("No configuration directory available, using defaults"),
            }
            Ok(())
        }
    }
}

/// Load configuration and apply command-line overrides
pub fn load_config(conn: &ConnectionArgs) -> Result<Config> {
    let mut config = match &conn.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = &conn.base_url {
        config.set_base_url(base_url);
    }
    if let Some(login) = &conn.login {
        config.auth.login = login.clone();
    }
    if let Some(password) = &conn.password {
        config.auth.password = password.clone();
    }
    Ok(config)
}

fn controller(conn: &ConnectionArgs) -> Result<RunController> {
    let config = load_config(conn)?;
    let transport = HttpTransport::new(&config.server)?;
    Ok(RunController::new(config, Arc::new(transport)))
}

fn pick_suite(repo: &YamlRepository, id: Option<u64>) -> Result<Suite> {
    match id {
        Some(id) => repo.suite(id),
        None => repo.suites().into_iter().next().ok_or(Error::NoCasesSelected),
    }
}

/// Look up a case for a single run, checking it against an explicit suite
fn single_case(repo: &YamlRepository, case_id: u64, suite: Option<u64>) -> Result<TestCase> {
    let case = repo.case(case_id)?;
    if let Some(requested) = suite {
        if requested != case.suite {
            return Err(Error::CaseSuiteMismatch {
                case: case_id,
                requested,
                actual: case.suite,
            });
        }
    }
    if !case.active {
        return Err(Error::CaseInactive(case_id));
    }
    Ok(case)
}

/// Run the whole queue, stopping early on Ctrl-C
async fn run_auto(
    controller: &mut RunController,
    queue: Vec<TestCase>,
    suite: &Suite,
) -> Result<()> {
    let handle = controller.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    let started = controller
        .start(RunMode::Auto, queue, suite.base_url.as_deref())
        .await;
    interrupt.abort();
    started.map(|_| ())
}

/// Run the queue one case per Enter; `q` or end of input stops
async fn run_steps(
    controller: &mut RunController,
    queue: Vec<TestCase>,
    suite: &Suite,
) -> Result<()> {
    controller
        .start(RunMode::Step, queue, suite.base_url.as_deref())
        .await?;
    println!(
        "{}",
        "Step mode: press Enter for the next case, q to stop".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while controller.is_active() {
        match lines.next_line().await? {
            Some(line) if line.trim().eq_ignore_ascii_case("q") => {
                controller.stop();
            }
            Some(_) => {
                controller.step_next().await;
            }
            None => {
                controller.stop();
            }
        }
    }
    Ok(())
}

fn check_summary(summary: &RunSummary) -> Result<()> {
    if summary.failed > 0 {
        Err(Error::CasesFailed {
            failed: summary.failed,
            total: summary.executed,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> YamlRepository {
        let file = serde_yaml::from_str(
            r#"
suites:
  - id: 1
    name: First
  - id: 2
    name: Second
    base_url: http://second.test
cases:
  - id: 4
    suite: 2
    name: Items
    url: /items
  - id: 5
    suite: 2
    name: Parked
    url: /parked
    active: false
"#,
        )
        .unwrap();
        YamlRepository::in_memory(file).unwrap()
    }

    #[test]
    fn test_single_case_keeps_its_own_suite() {
        let repo = repo();
        let case = single_case(&repo, 4, None).unwrap();
        let suite = repo.suite(case.suite).unwrap();
        assert_eq!(suite.base_url.as_deref(), Some("http://second.test"));
        assert!(single_case(&repo, 4, Some(2)).is_ok());
    }

    #[test]
    fn test_single_case_rejects_other_suite_and_inactive() {
        let repo = repo();
        assert!(matches!(
            single_case(&repo, 4, Some(1)),
            Err(Error::CaseSuiteMismatch {
                case: 4,
                requested: 1,
                actual: 2
            })
        ));
        assert!(matches!(
            single_case(&repo, 5, None),
            Err(Error::CaseInactive(5))
        ));
        assert!(matches!(
            single_case(&repo, 9, None),
            Err(Error::CaseNotFound(9))
        ));
    }
}
