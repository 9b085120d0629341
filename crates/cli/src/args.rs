use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bluefang")]
#[command(version = "0.1.0")]
#[command(about = "Bluetooth Classic security testing toolkit", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines instead of the compact format
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Local adapter to use
    #[arg(short = 'i', long, default_value = "hci0", global = true)]
    pub adapter: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover nearby devices
    Scan {
        /// Length of one discovery pass in seconds (overrides the preset)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Keep scanning until interrupted
        #[arg(short, long)]
        continuous: bool,

        /// Preset: fast (addresses and names only), default, thorough
        #[arg(long, default_value = "default", value_parser = ["fast", "default", "thorough"])]
        preset: String,

        /// Skip the service browse for each new device
        #[arg(long)]
        no_services: bool,

        /// Skip the info lookup for each new device
        #[arg(long)]
        no_info: bool,

        /// Output format: text, json, tsv
        #[arg(short, long, default_value = "text")]
        output_format: String,

        /// Write the device list to a file (.tsv/.txt for tab-separated, JSON otherwise)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Run one attack module against a target
    Attack {
        /// Attack id or classic name (see list-attacks)
        attack: String,

        /// Target address, e.g. AA:BB:CC:DD:EE:FF
        target: String,

        /// Module option as key=value; repeatable. Example: -o attempts=20 -o stealth=true
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,

        /// Output format for the final outcome: text, json
        #[arg(short = 'f', long, default_value = "text")]
        output_format: String,
    },

    /// Record link-level traffic from the adapter's trace
    Capture {
        /// Stop after this many seconds; runs until interrupted when omitted
        #[arg(short, long)]
        duration: Option<u64>,

        /// Capture option as key=value; repeatable. Example: -o maxPackets=500 -o 'filterTypes=["RFCOMM"]'
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,

        /// Export the buffered packets as a PCAP file
        #[arg(long)]
        pcap: Option<PathBuf>,

        /// Save the buffered raw trace lines as text
        #[arg(long)]
        save_text: Option<PathBuf>,

        /// Output format for live packets: text, json
        #[arg(short = 'f', long, default_value = "text")]
        output_format: String,
    },

    /// Show the attack catalog
    ListAttacks {
        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        output_format: String,
    },
}
