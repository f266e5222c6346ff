//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Extreme, Field};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RateBot - peer ratings for community chat servers
///
/// Submit content, rate it on instrumentals, vocals, lyrics and
/// emotion, and query the running averages. Ratings live in one JSON file.
///
/// Examples:
///   ratebot --user alice new "Song A" https://example.com/song-a
///   ratebot --user bob submit "Song A" 5 4 N/A 3 --comment "nice"
///   ratebot stats highest overall
///   ratebot --user bob pending
///   ratebot --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ratebot.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ratings JSON file
    #[arg(long, value_name = "FILE", env = "RATEBOT_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Identity of the caller (rater or submitter)
    #[arg(short, long, value_name = "NAME", env = "RATEBOT_USER", global = true)]
    pub user: Option<String>,

    /// Webhook URL of the announcement channel
    #[arg(long, value_name = "URL", env = "RATEBOT_WEBHOOK_URL", global = true)]
    pub webhook_url: Option<String>,

    /// Channel new submissions are announced in
    #[arg(long, value_name = "CHANNEL", global = true)]
    pub channel: Option<String>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .ratebot.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Rating commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit a new piece of content to be rated by your peers
    New {
        /// Unique name of the submission
        name: String,
        /// Link or description of the content
        content: String,
    },
    /// Rate a piece of content from your peers
    ///
    /// Each score is 1 to 5; anything that is not a number is recorded as N/A.
    Submit {
        /// Name of the submission
        name: String,
        #[arg(allow_hyphen_values = true)]
        instrumentals: String,
        #[arg(allow_hyphen_values = true)]
        vocals: String,
        #[arg(allow_hyphen_values = true)]
        lyrics: String,
        #[arg(allow_hyphen_values = true)]
        emotion: String,
        /// Optional comment
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Show the submission with the highest or lowest average
    Stats {
        extreme: Extreme,
        field: Field,
    },
    /// Show what people are saying about a submission
    Comments {
        name: String,
    },
    /// List submissions you have not rated yet
    Pending,
    /// Show the averages of one submission
    Show {
        name: String,
    },
    /// Chart one average across all submissions
    Chart {
        field: Field,
        /// Wrap labels at this many columns
        #[arg(long, default_value = "12")]
        width: usize,
    },
    /// Remove a submission and all its ratings
    Drop {
        name: String,
    },
    /// Save and export the ratings document
    Download {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Suggest submission names matching a partial name
    Suggest {
        #[arg(default_value = "")]
        current: String,
    },
}

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A command is required (see --help)".to_string());
        };

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if command.needs_identity() && self.identity().is_none() {
            return Err("This command needs --user (or RATEBOT_USER)".to_string());
        }

        if let Command::Chart { width, .. } = command {
            if *width == 0 {
                return Err("Chart width must be at least 1".to_string());
            }
        }

        if let Some(ref url) = self.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Webhook URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// The caller identity, if a non-blank one was given.
    pub fn identity(&self) -> Option<&str> {
        self.user.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` comes from the config file; `--quiet` overrides it.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl Command {
    /// Whether the command acts on behalf of a specific user.
    pub fn needs_identity(&self) -> bool {
        matches!(
            self,
            Command::New { .. } | Command::Submit { .. } | Command::Pending | Command::Drop { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("ratebot").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_submit() {
        let args = parse(&[
            "-u", "bob", "submit", "Song A", "5", "4", "N/A", "3", "--comment", "nice",
        ]);
        match args.command {
            Some(Command::Submit {
                ref name,
                ref lyrics,
                ref comment,
                ..
            }) => {
                assert_eq!(name, "Song A");
                assert_eq!(lyrics, "N/A");
                assert_eq!(comment, "nice");
            }
            ref other => panic!("unexpected command: {:?}", other),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_stats() {
        let args = parse(&["stats", "lowest", "emotion"]);
        assert!(matches!(
            args.command,
            Some(Command::Stats {
                extreme: Extreme::Lowest,
                field: Field::Emotion
            })
        ));
    }

    #[test]
    fn test_validation_requires_identity() {
        let mut args = parse(&["pending"]);
        args.user = None;
        assert!(args.validate().is_err());

        args.user = Some("  ".to_string());
        assert!(args.validate().is_err());

        args.user = Some("alice".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = parse(&["stats", "highest", "overall"]);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = parse(&[]);
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["pending"]);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
