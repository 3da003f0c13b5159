use std::io;
use std::path::Path;
use tokio::fs::read_to_string;

use dns_types::zones::types::Zone;

/// Read a zone from its master file.  The outer error is I/O, the
/// inner one a parse failure.
pub async fn zone_from_file<P: AsRef<Path>>(
    path: P,
) -> io::Result<Result<Zone, dns_types::zones::deserialise::Error>> {
    let data = read_to_string(path).await?;
    Ok(Zone::deserialise(&data))
}
