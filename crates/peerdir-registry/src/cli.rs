//! Command line interface for the registry daemon

use std::net::Ipv4Addr;

use clap::Parser;

use peerdir_core::Limits;

/// peerdir registry daemon: peers JOIN, PUBLISH file lists, and SEARCH for
/// which peer hosts a name
#[derive(Debug, Parser)]
#[command(name = "peerdird", version)]
pub struct Cli {
    /// TCP port to listen on
    pub port: u16,

    /// Address to bind the listener to
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub bind: Ipv4Addr,

    /// Maximum number of simultaneously connected peers
    #[arg(long)]
    pub max_peers: Option<usize>,

    /// Maximum number of files a single PUBLISH may carry
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Registry limits with any command line overrides applied
    pub fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        if let Some(max_peers) = self.max_peers {
            limits.max_peers = max_peers;
        }
        if let Some(max_files) = self.max_files {
            limits.max_files = max_files;
        }
        limits
    }
}
