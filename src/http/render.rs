//! HTML views: the upload form and the results table.

use std::fmt::Write;

use crate::enrichment::ArtistRecord;
use crate::http::flash::Flash;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Artist Enricher</title>
<style>
body { font-family: sans-serif; margin: 2rem auto; max-width: 60rem; }
.flash { padding: .5rem 1rem; border-radius: 4px; }
.flash.error { background: #fde2e1; color: #8a1c17; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: .25rem .5rem; text-align: left; vertical-align: top; }
</style>
</head>
<body>
"#;
const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Escape text for HTML element and attribute contexts.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn index_page(flash: Option<&Flash>) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str("<h1>Artist Enricher</h1>\n");
    if let Some(flash) = flash {
        let _ = writeln!(
            html,
            r#"<p class="flash {}">{}</p>"#,
            escape_html(&flash.category),
            escape_html(&flash.message)
        );
    }
    html.push_str(concat!(
        r#"<form method="post" action="/" enctype="multipart/form-data">"#,
        "\n",
        r#"<input type="file" name="file" accept=".csv">"#,
        "\n",
        r#"<button type="submit">Upload</button>"#,
        "\n</form>\n"
    ));
    html.push_str(PAGE_TAIL);
    html
}

pub fn results_page(artists: &[ArtistRecord]) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str("<h1>Results</h1>\n");

    if artists.is_empty() {
        html.push_str("<p>No artist data found.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>Artist</th><th>Followers</th><th>Popularity</th><th>Genres</th><th>Top tracks</th></tr>\n",
        );
        for artist in artists {
            let genres: Vec<String> = artist.genres.iter().map(|g| escape_html(g)).collect();
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><ol>",
                escape_html(&artist.name),
                artist.followers,
                artist.popularity,
                genres.join(", ")
            );
            for track in &artist.tracks {
                let _ = write!(
                    html,
                    "<li>{} (popularity {}, plays {}, danceability {:.2}, energy {:.2}, acousticness {:.2})</li>",
                    escape_html(track.track_name.as_deref().unwrap_or("Unknown")),
                    track.popularity,
                    escape_html(track.play_count.as_deref().unwrap_or("n/a")),
                    track.danceability,
                    track.energy,
                    track.acousticness
                );
            }
            html.push_str("</ol></td></tr>\n");
        }
        html.push_str("</table>\n");
    }

    html.push_str("<p><a href=\"/\">Upload another file</a></p>\n");
    html.push_str(PAGE_TAIL);
    html
}
