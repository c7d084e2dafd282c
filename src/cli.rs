//! Command-line interface.
//!
//! Argument parsing with clap derive macros; flags override the loaded
//! configuration file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live speech translation streaming
#[derive(Parser, Debug)]
#[command(name = "dolmetsch", version, about = "Live speech translation streaming")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the transcription server
    Serve {
        /// Bind address override
        #[arg(long, value_name = "ADDR")]
        host: Option<String>,

        /// Port override
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Stream microphone audio and print translated captions
    Stream {
        /// Server endpoint as host:port (schemes are stripped)
        #[arg(long, value_name = "HOST:PORT")]
        endpoint: Option<String>,

        /// Audio input device name
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Upload a recording for one-shot transcription
    TranscribeFile {
        /// WAV or raw 16-bit LE PCM file to upload
        file: PathBuf,

        /// Server endpoint as host:port (schemes are stripped)
        #[arg(long, value_name = "HOST:PORT")]
        endpoint: Option<String>,
    },

    /// List audio input devices
    Devices,
}
