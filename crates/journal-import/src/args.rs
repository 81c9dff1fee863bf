use anyhow::{anyhow, bail, Context, Result};
use std::str::FromStr;

/// Value following `--name`, if present.
pub fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .filter(|v| !v.starts_with("--"))
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

pub fn required<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    flag_value(args, name).ok_or_else(|| anyhow!("missing required option {}", name))
}

pub fn parsed<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match flag_value(args, name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid value for {}: {}", name, e)),
        None => Ok(None),
    }
}

pub fn required_parsed<T>(args: &[String], name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parsed(args, name)?.with_context(|| format!("missing required option {}", name))
}

/// First positional word after the program name.
pub fn command(args: &[String]) -> Result<&str> {
    match args.get(1) {
        Some(cmd) if !cmd.starts_with("--") => Ok(cmd.as_str()),
        _ => bail!("no command given\n\n{}", USAGE),
    }
}

pub const USAGE: &str = "\
Usage:
  journal-import create-journal --name NAME [--description TEXT] [--broker NAME]
                                [--prop-firm NAME] [--account-size AMOUNT]
  journal-import list-journals
  journal-import import --journal ID --file PATH [--offline] [--json]
  journal-import sessions --journal ID
  journal-import metrics --journal ID [--json]
  journal-import options list --user ID --kind strategy|tag
  journal-import options add --user ID --kind strategy|tag --value TEXT
  journal-import options remove --user ID --kind strategy|tag --value TEXT

Global:
  --db URL    database url (default: $DATABASE_URL or sqlite:journal.db)";

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_flag_parsing() {
        let a = args("journal-import import --journal 3 --file trades.csv --offline");
        assert_eq!(command(&a).unwrap(), "import");
        assert_eq!(required_parsed::<i64>(&a, "--journal").unwrap(), 3);
        assert_eq!(flag_value(&a, "--file"), Some("trades.csv"));
        assert!(has_flag(&a, "--offline"));
        assert!(!has_flag(&a, "--json"));
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let a = args("journal-import metrics --journal --json");
        assert!(required(&a, "--journal").is_err());

        let a = args("journal-import metrics --journal abc");
        assert!(parsed::<i64>(&a, "--journal").is_err());
        assert!(parsed::<f64>(&a, "--account-size").unwrap().is_none());

        assert!(command(&args("journal-import")).is_err());
        assert!(command(&args("journal-import --db x")).is_err());
    }
}
