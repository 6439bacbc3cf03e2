//! CLI definitions for topicron.

use std::path::PathBuf;

use chrono::{NaiveTime, Weekday};
use clap::{Parser, Subcommand};

use topicron_protocols::Day;

/// topicron CLI.
#[derive(Parser)]
#[command(name = "topicron")]
#[command(about = "Topic-broadcasting schedule dispatcher")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.topicron/config.toml)
    #[arg(short, long, env = "TOPICRON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in foreground (default)
    Run,

    /// Validate the configuration file
    Check,

    /// Print the cron expression built for a recurrence
    Cron {
        #[command(subcommand)]
        recurrence: CronRecurrence,
    },
}

#[derive(Subcommand)]
pub(crate) enum CronRecurrence {
    /// Every day
    Daily {
        /// Time of day (HH:MM)
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,
    },

    /// Monday through Friday
    Weekdays {
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,
    },

    /// Saturday and Sunday
    Weekend {
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,
    },

    /// A comma-separated set of days, e.g. `mon,wed`
    Days {
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,

        #[arg(long, value_delimiter = ',', value_parser = parse_day, required = true)]
        days: Vec<Day>,
    },

    /// One day of every month
    Monthly {
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,

        /// Day of month (1-31)
        #[arg(long)]
        day: u32,
    },

    /// One calendar day of every year
    Yearly {
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,

        #[arg(long)]
        month: u32,

        #[arg(long)]
        day: u32,
    },
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| format!("invalid time '{}': {}", value, e))
}

fn parse_day(value: &str) -> Result<Day, String> {
    value
        .trim()
        .parse::<Weekday>()
        .map(Day::from)
        .map_err(|_| format!("invalid day '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(
            parse_time("23:59:10").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 10).unwrap()
        );
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("mon").unwrap(), Day::Monday);
        assert_eq!(parse_day("Sunday").unwrap(), Day::Sunday);
        assert!(parse_day("someday").is_err());
    }

    #[test]
    fn test_cron_days_command() {
        let cli = Cli::try_parse_from(["topicron", "cron", "days", "--at", "09:30", "--days", "mon,wed"])
            .unwrap();
        match cli.command {
            Some(Commands::Cron {
                recurrence: CronRecurrence::Days { at, days },
            }) => {
                assert_eq!(at, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
                assert_eq!(days, vec![Day::Monday, Day::Wednesday]);
            }
            _ => panic!("expected cron days command"),
        }
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["topicron", "--config", "/tmp/topicron.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/topicron.toml")));
    }
}
