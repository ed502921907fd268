use anyhow::Context;

use crate::domain::MovieId;
use crate::models::MovieDetail;
use crate::services::DetailView;
use crate::state::SharedState;

pub async fn cmd_movie_info(state: &SharedState, id_str: &str) -> anyhow::Result<()> {
    let Ok(id) = id_str.parse::<MovieId>() else {
        println!("Invalid movie ID: {id_str}");
        return Ok(());
    };

    let view = state.detail_service.use_movie_detail(id).await;
    print_detail_view(id, &view)
}

pub(super) fn print_detail_view(id: MovieId, view: &DetailView) -> anyhow::Result<()> {
    if let Some(err) = &view.error {
        if err.is_not_found() {
            println!("Movie with ID {id} not found.");
            return Ok(());
        }
        return Err(err.clone()).with_context(|| format!("Failed to load movie {id}"));
    }

    match &view.data {
        Some(detail) => display_detail(detail),
        None if view.is_loading => println!("Movie {id} is still loading..."),
        None => println!("No data for movie {id}."),
    }
    Ok(())
}

fn display_detail(detail: &MovieDetail) {
    println!("Movie Info");
    println!("{:-<60}", "");
    println!("Title:    {}", detail.title);
    if let Some(tagline) = detail.tagline.as_deref().filter(|t| !t.is_empty()) {
        println!("Tagline:  {tagline}");
    }
    println!("ID:       {}", detail.id);
    println!(
        "Released: {}",
        detail.release_date.as_deref().unwrap_or("unknown")
    );
    println!(
        "Runtime:  {}",
        detail
            .known_runtime()
            .map_or_else(|| "?".to_string(), |m| format!("{}h {:02}m", m / 60, m % 60))
    );
    println!(
        "Rating:   {:.1} ({} votes)",
        detail.vote_average, detail.vote_count
    );
    if let Some(status) = &detail.status {
        println!("Status:   {status}");
    }

    if !detail.genres.is_empty() {
        let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        println!("Genres:   {}", genres.join(", "));
    }

    if !detail.production_companies.is_empty() {
        println!();
        println!("Production:");
        for company in &detail.production_companies {
            match &company.origin_country {
                Some(country) if !country.is_empty() => {
                    println!("  • {} ({country})", company.name);
                }
                _ => println!("  • {}", company.name),
            }
        }
    }

    if let Some(overview) = detail.overview.as_deref().filter(|o| !o.is_empty()) {
        println!();
        println!("{overview}");
    }

    if let Some(imdb) = &detail.imdb_id {
        println!();
        println!("IMDb:     https://www.imdb.com/title/{imdb}/");
    }
    if let Some(homepage) = detail.homepage.as_deref().filter(|h| !h.is_empty()) {
        println!("Homepage: {homepage}");
    }
}
