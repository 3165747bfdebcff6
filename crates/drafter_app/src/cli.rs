use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use drafter_core::{DraftOptions, Tone, DEFAULT_LENGTH};

/// Generate, edit and send AI reply drafts for mailbox threads.
#[derive(Parser, Debug)]
#[command(name = "drafter", version)]
pub struct Cli {
    /// Config file (RON). Falls back to ./drafter.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity; repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List recent threads for the configured project.
    Threads,
    /// Generate a reply for one thread, then edit and optionally send it.
    Draft {
        thread_id: String,
        #[command(flatten)]
        options: OptionArgs,
        /// Print the draft and exit instead of opening the editor.
        #[arg(long)]
        no_edit: bool,
    },
    /// Generate replies for several threads with shared options.
    Batch {
        #[arg(required = true, num_args = 2..)]
        thread_ids: Vec<String>,
        #[command(flatten)]
        options: OptionArgs,
        /// Jobs in flight at once (1 to 3). Overrides the config file.
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Show whether the mail account is connected.
    Auth {
        /// Where the provider should send the user after connecting.
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Send a final draft as a reply on a thread.
    Send { thread_id: String, text: String },
}

#[derive(Args, Debug, Clone)]
pub struct OptionArgs {
    /// friendly, formal or brief.
    #[arg(long, default_value_t = Tone::Friendly)]
    pub tone: Tone,

    /// Target length in words.
    #[arg(long, default_value_t = DEFAULT_LENGTH)]
    pub length: u32,

    /// Ask for a bulleted reply.
    #[arg(long)]
    pub bullets: bool,

    /// Extra instruction for the model, e.g. "confirm Tuesday 3pm".
    #[arg(long, default_value = "")]
    pub input: String,
}

impl From<OptionArgs> for DraftOptions {
    fn from(args: OptionArgs) -> Self {
        DraftOptions {
            tone: args.tone,
            length: args.length,
            use_bullets: args.bullets,
            input: args.input,
        }
    }
}
