//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use zencoder_models::{JobState, ListJobsQuery};

/// Submit, inspect and watch Zencoder encode jobs.
///
/// Credentials and endpoints come from the environment (`ZENCODER_API_KEY`,
/// `ZENCODER_HOST`, ...), optionally loaded from a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "zencoder", version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a job from a JSON file and wait for it to finish.
    Create {
        /// Job payload (`input`, `outputs`, other settings)
        #[arg(value_name = "SPEC_JSON")]
        spec: PathBuf,

        /// Print the new job ID and exit without watching.
        #[arg(long)]
        no_wait: bool,
    },

    /// Wait for existing jobs to reach a terminal state.
    Watch {
        #[arg(value_name = "JOB_ID", required = true)]
        ids: Vec<String>,
    },

    /// Show a job's current progress.
    Progress {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },

    /// Show the full job resource.
    Details {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },

    /// List jobs.
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,

        /// Only jobs in this state (pending, waiting, processing, finished,
        /// failed, cancelled)
        #[arg(long)]
        state: Option<JobState>,
    },

    /// Cancel a job.
    Cancel {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },

    /// Resubmit a failed or cancelled job.
    Resubmit {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
}

/// Build the list filter from `list` flags.
pub fn list_query(page: Option<u32>, per_page: Option<u32>, state: Option<JobState>) -> ListJobsQuery {
    ListJobsQuery {
        page,
        per_page,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("zencoder").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_create_defaults_to_waiting() {
        let args = parse(&["create", "job.json"]);
        match &args.command {
            Command::Create { spec, no_wait } => {
                assert_eq!(spec, &PathBuf::from("job.json"));
                assert!(!no_wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = parse(&["create", "job.json", "--no-wait"]);
        assert!(matches!(args.command, Command::Create { no_wait: true, .. }));
    }

    #[test]
    fn test_watch_takes_many_ids() {
        let args = parse(&["watch", "1", "2", "3"]);
        match args.command {
            Command::Watch { ids } => assert_eq!(ids, vec!["1", "2", "3"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_watch_requires_an_id() {
        assert!(CliArgs::try_parse_from(["zencoder", "watch"]).is_err());
    }

    #[test]
    fn test_list_filters() {
        let args = parse(&["list", "--page", "2", "--per-page", "10", "--state", "failed"]);
        match args.command {
            Command::List {
                page,
                per_page,
                state,
            } => {
                let query = list_query(page, per_page, state);
                assert_eq!(query.page, Some(2));
                assert_eq!(query.per_page, Some(10));
                assert_eq!(query.state, Some(JobState::Failed));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_rejects_unknown_state() {
        assert!(CliArgs::try_parse_from(["zencoder", "list", "--state", "queued"]).is_err());
    }
}
