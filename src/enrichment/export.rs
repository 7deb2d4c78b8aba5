//! CSV export of enrichment results.

use std::io::Write;
use std::path::Path;

use crate::enrichment::types::{ArtistRecord, EnrichmentError, EnrichmentResult};

const HEADERS: [&str; 5] = ["name", "followers", "popularity", "genres", "tracks"];

/// Write artists as CSV; `genres` and `tracks` are JSON-encoded cells.
pub fn write_csv<W: Write>(artists: &[ArtistRecord], writer: W) -> EnrichmentResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADERS)?;

    for artist in artists {
        let genres = serde_json::to_string(&artist.genres).map_err(json_error)?;
        let tracks = serde_json::to_string(&artist.tracks).map_err(json_error)?;
        let followers = artist.followers.to_string();
        let popularity = artist.popularity.to_string();
        out.write_record([
            artist.name.as_str(),
            followers.as_str(),
            popularity.as_str(),
            genres.as_str(),
            tracks.as_str(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Write artists to a CSV file at `path`.
pub fn export_to_path(artists: &[ArtistRecord], path: &Path) -> EnrichmentResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(artists, std::io::BufWriter::new(file))?;
    tracing::info!(path = %path.display(), rows = artists.len(), "CSV exported");
    Ok(())
}

fn json_error(e: serde_json::Error) -> EnrichmentError {
    EnrichmentError::MalformedResponse {
        endpoint: "export",
        detail: e.to_string(),
    }
}
