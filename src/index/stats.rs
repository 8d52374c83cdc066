use serde::{Deserialize, Serialize};
use std::time::{Duration, UNIX_EPOCH};

/// Size and identity of the live snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Generation of the installed snapshot (0 until the first upload)
    pub generation: u64,
    /// Platforms indexed
    pub platforms: usize,
    /// Distinct canonical locations
    pub locations: usize,
    /// Unix timestamp of the build
    pub built_at: u64,
}

/// Print index statistics
pub fn print_stats(stats: &IndexStats) {
    println!("Index Statistics");
    println!("================");
    println!();
    println!("Generation:       {}", stats.generation);
    println!("Platforms:        {}", stats.platforms);
    println!("Locations:        {}", stats.locations);
    if stats.generation > 0 {
        println!("Built:            {}", format_timestamp(stats.built_at));
    } else {
        println!("Built:            never (no data uploaded)");
    }
}

/// Format unix timestamp
fn format_timestamp(ts: u64) -> String {
    let datetime = UNIX_EPOCH + Duration::from_secs(ts);
    format!("{:?}", datetime)
}
