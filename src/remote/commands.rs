//! Remote command templates and duplicate-row queries
//!
//! Templates contain `{name}` placeholders filled from the run
//! configuration. Known names: `database`, `tables`, `app_dir`, `port`,
//! `workers`, `environment`, `pg_host`. Anything else is left as written.

use crate::config::BenchConfig;
use crate::models::DuplicateCount;
use crate::{KvBenchError, Result};

/// Rendered-on-demand command lines for the remote hosts
#[derive(Debug, Clone)]
pub struct CommandTemplates {
    reset_database: String,
    start_server: String,
    psql: String,
    database: String,
    tables: String,
    app_dir: String,
    port: String,
    environment: String,
    pg_host: String,
}

impl CommandTemplates {
    pub fn from_config(config: &BenchConfig) -> Self {
        let remote = &config.remote;
        let tables = config
            .models
            .iter()
            .map(|m| table_name(m))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            reset_database: remote.reset_database_command.clone(),
            start_server: remote.start_server_command.clone(),
            psql: remote.psql_command.clone(),
            database: remote.database.clone(),
            tables,
            app_dir: remote.app_dir.clone(),
            port: config.hosts.app_port.to_string(),
            environment: remote.environment.clone(),
            pg_host: config.hosts.pg_host.clone(),
        }
    }

    fn vars<'a>(&'a self, workers: &'a str) -> [(&'static str, &'a str); 7] {
        [
            ("database", self.database.as_str()),
            ("tables", self.tables.as_str()),
            ("app_dir", self.app_dir.as_str()),
            ("port", self.port.as_str()),
            ("environment", self.environment.as_str()),
            ("pg_host", self.pg_host.as_str()),
            ("workers", workers),
        ]
    }

    /// Command resetting persisted state on the database host
    pub fn reset_database(&self) -> String {
        render(&self.reset_database, &self.vars(""))
    }

    /// Command (re)starting the application server with `workers` processes
    pub fn start_server(&self, workers: usize) -> String {
        let workers = workers.to_string();
        render(&self.start_server, &self.vars(&workers))
    }

    /// Command printing the duplicate summary for `model` as `keys|rows`
    pub fn count_duplicates(&self, model: &str) -> String {
        format!(
            "{} {}",
            render(&self.psql, &self.vars("")),
            shell_quote(&duplicate_query(model))
        )
    }
}

/// Rails table name for a model label
pub fn table_name(model: &str) -> String {
    format!("{}s", model)
}

/// SQL returning `<duplicated keys>|<surplus rows>` for a model table
pub fn duplicate_query(model: &str) -> String {
    format!(
        "SELECT COUNT(*), COALESCE(SUM(n - 1), 0) FROM \
         (SELECT COUNT(*) AS n FROM {} GROUP BY key HAVING COUNT(*) > 1) AS d",
        table_name(model)
    )
}

/// Parse `psql -At` output of [`duplicate_query`]
pub fn parse_duplicate_count(output: &str) -> Result<DuplicateCount> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| KvBenchError::ParseError("empty duplicate count output".to_string()))?;

    let (keys, rows) = line.split_once('|').ok_or_else(|| {
        KvBenchError::ParseError(format!("unexpected duplicate count output: {}", line))
    })?;

    let parse = |field: &str| {
        field.trim().parse::<u64>().map_err(|e| {
            KvBenchError::ParseError(format!("bad duplicate count field '{}': {}", field, e))
        })
    };

    Ok(DuplicateCount {
        duplicated_keys: parse(keys)?,
        surplus_rows: parse(rows)?,
    })
}

/// Substitute `{name}` placeholders in one pass
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Quote `s` as a single POSIX shell word
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_known_and_unknown() {
        let out = render(
            "cd {app_dir} && start --port {port} {unknown}",
            &[("app_dir", "/srv/app"), ("port", "3000")],
        );
        assert_eq!(out, "cd /srv/app && start --port 3000 {unknown}");
    }

    #[test]
    fn test_render_does_not_recurse() {
        let out = render("{a}{b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "{b}x");
    }

    #[test]
    fn test_render_unclosed_brace() {
        assert_eq!(render("awk '{print $1", &[("print $1", "x")]), "awk '{print $1");
    }

    #[test]
    fn test_default_templates() {
        let config = BenchConfig::default();
        let templates = CommandTemplates::from_config(&config);

        let reset = templates.reset_database();
        assert!(reset.contains(
            "TRUNCATE indexed_key_values, simple_key_values, unique_key_values RESTART IDENTITY"
        ));
        assert!(reset.contains("-d kvbench_production"));

        let start = templates.start_server(10);
        assert!(start.contains("--max-pool-size 10 --min-instances 10"));
        assert!(start.contains("--port 3000"));
        assert!(!start.contains('{'));
    }

    #[test]
    fn test_count_duplicates_command_quotes_sql() {
        let templates = CommandTemplates::from_config(&BenchConfig::default());
        let cmd = templates.count_duplicates("simple_key_value");
        assert!(cmd.starts_with("psql -At -h localhost -d kvbench_production -c 'SELECT COUNT(*)"));
        assert!(cmd.contains("FROM simple_key_values GROUP BY key"));
        assert!(cmd.ends_with("AS d'"));
    }

    #[test]
    fn test_count_duplicates_targets_database_host() {
        let config = BenchConfig::default()
            .with_pg_host("db.internal")
            .with_rails_host("app.internal");
        let cmd = CommandTemplates::from_config(&config).count_duplicates("simple_key_value");
        assert!(cmd.contains("-h db.internal"));
        assert!(!cmd.contains("app.internal"));
    }

    #[test]
    fn test_parse_duplicate_count() {
        assert_eq!(
            parse_duplicate_count("3|7\n").unwrap(),
            DuplicateCount {
                duplicated_keys: 3,
                surplus_rows: 7
            }
        );
        assert!(parse_duplicate_count("\n0|0").unwrap().is_clean());
        assert!(parse_duplicate_count("").is_err());
        assert!(parse_duplicate_count("ERROR: relation does not exist").is_err());
        assert!(parse_duplicate_count("a|b").is_err());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("abc"), "'abc'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
