//! Hand-rolled argv parsing for the mutually-exclusive CLI modes in the
//! external interface table.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Command {
    /// `-init`: create the bookkeeping tables.
    Init,
    /// `-force <paths...>`.
    Force(Vec<PathBuf>),
    /// `-fake <paths...>`.
    Fake(Vec<PathBuf>),
    /// `-check [paths...]` (empty means "use the configured migration dir").
    Check(Vec<PathBuf>),
    /// `-check-apply [paths...]`.
    CheckApply(Vec<PathBuf>),
    /// `-final-sql <service>`.
    FinalSql(String),
    /// No mode flag: apply everything, then serve HTTP unless `apply_only`.
    ApplyAll { apply_only: bool },
    Help,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1).map(|s| s.as_str());

    let Some(first) = it.next() else {
        return Ok(Command::ApplyAll { apply_only: false });
    };

    match first {
        "-h" | "--help" => Ok(Command::Help),
        "-init" => {
            ensure_no_more(it, "-init")?;
            Ok(Command::Init)
        }
        "-force" => Ok(Command::Force(collect_paths(it, "-force")?)),
        "-fake" => Ok(Command::Fake(collect_paths(it, "-fake")?)),
        "-check" => Ok(Command::Check(it.map(PathBuf::from).collect())),
        "-check-apply" => Ok(Command::CheckApply(it.map(PathBuf::from).collect())),
        "-final-sql" => {
            let Some(service) = it.next() else {
                anyhow::bail!("-final-sql requires a service name");
            };
            ensure_no_more(it, "-final-sql <service>")?;
            Ok(Command::FinalSql(service.to_string()))
        }
        "-apply-only" => {
            ensure_no_more(it, "-apply-only")?;
            Ok(Command::ApplyAll { apply_only: true })
        }
        other => anyhow::bail!("unknown flag: {other} (run with -h for usage)"),
    }
}

fn collect_paths<'a>(it: impl Iterator<Item = &'a str>, flag: &str) -> anyhow::Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = it.map(PathBuf::from).collect();
    if paths.is_empty() {
        anyhow::bail!("{flag} requires at least one file or directory argument");
    }
    Ok(paths)
}

fn ensure_no_more<'a>(mut it: impl Iterator<Item = &'a str>, flag: &str) -> anyhow::Result<()> {
    if it.next().is_some() {
        anyhow::bail!("{flag} takes no arguments");
    }
    Ok(())
}

pub fn print_help() {
    println!(
        "\
fleetmig - schema migration orchestrator

USAGE:
  fleetmig [FLAG] [ARGS...]

FLAGS:
  (none)                   Apply all pending migrations, then serve HTTP
  -init                    Create the bookkeeping tables
  -force <paths...>        Apply regardless of recorded version (never downgrades it)
  -fake <paths...>         Advance recorded version without executing SQL
  -check [paths...]        Compare recorded hashes against disk (defaults to MIGRATION_DIR)
  -check-apply [paths...]  Check, then force-apply whatever differs
  -final-sql <service>     Print concatenated pending SQL for a service, without applying
  -apply-only              Apply all pending migrations, then exit (skip the HTTP server)
  -h, --help               Print this help"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_means_apply_all() {
        let args = vec!["fleetmig".to_string()];
        assert!(matches!(
            parse_args(&args).unwrap(),
            Command::ApplyAll { apply_only: false }
        ));
    }

    #[test]
    fn apply_only_sets_the_flag() {
        let args = vec!["fleetmig".to_string(), "-apply-only".to_string()];
        assert!(matches!(
            parse_args(&args).unwrap(),
            Command::ApplyAll { apply_only: true }
        ));
    }

    #[test]
    fn force_requires_at_least_one_path() {
        let args = vec!["fleetmig".to_string(), "-force".to_string()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn force_collects_positional_paths() {
        let args = vec![
            "fleetmig".to_string(),
            "-force".to_string(),
            "a".to_string(),
            "b".to_string(),
        ];
        let Command::Force(paths) = parse_args(&args).unwrap() else {
            panic!("expected Force");
        };
        assert_eq!(paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn check_defaults_to_empty_paths() {
        let args = vec!["fleetmig".to_string(), "-check".to_string()];
        let Command::Check(paths) = parse_args(&args).unwrap() else {
            panic!("expected Check");
        };
        assert!(paths.is_empty());
    }

    #[test]
    fn final_sql_requires_a_service_name() {
        let args = vec!["fleetmig".to_string(), "-final-sql".to_string()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn final_sql_parses_service_name() {
        let args = vec![
            "fleetmig".to_string(),
            "-final-sql".to_string(),
            "user".to_string(),
        ];
        let Command::FinalSql(service) = parse_args(&args).unwrap() else {
            panic!("expected FinalSql");
        };
        assert_eq!(service, "user");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let args = vec!["fleetmig".to_string(), "--bogus".to_string()];
        assert!(parse_args(&args).is_err());
    }
}
