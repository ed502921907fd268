use anyhow::Context;

use crate::constants::limits::MAX_CLI_PAGES;
use crate::domain::SearchQuery;
use crate::models::Movie;
use crate::services::FetchOutcome;
use crate::state::SharedState;

pub async fn cmd_search(state: &SharedState, query: &str, pages: u32) -> anyhow::Result<()> {
    let query = SearchQuery::new(query);
    if query.is_empty() {
        println!("Nothing to search for.");
        return Ok(());
    }
    let normalized = query.normalized();
    let pages = pages.clamp(1, MAX_CLI_PAGES);

    println!("Searching for: {normalized}");
    state.pagination.reset(normalized);

    for _ in 0..pages {
        let page = state.pagination.next_page(normalized);
        if state.pagination.load_more(normalized).await == FetchOutcome::Skipped {
            break;
        }

        if let Some(err) = state
            .search_service
            .entry(normalized, page)
            .and_then(|e| e.current_error().cloned())
        {
            return Err(err).with_context(|| format!("Search for '{normalized}' failed"));
        }
    }

    let Some(results) = state.pagination.results(normalized) else {
        return Ok(());
    };

    if results.movies().is_empty() {
        println!("No movies found matching '{normalized}'");
        return Ok(());
    }

    println!();
    println!(
        "Search Results ({} of {}):",
        results.movies().len(),
        results.total_results()
    );
    println!("{:-<60}", "");

    for (i, movie) in results.movies().iter().enumerate() {
        print_movie(i, movie);
    }

    if results.has_more() {
        println!(
            "More results available: cinesearch search \"{normalized}\" --pages {}",
            results.next_page()
        );
    }
    println!("To see a movie: cinesearch info <id>");

    Ok(())
}

pub(super) fn print_movie(index: usize, movie: &Movie) {
    let year = movie
        .release_year()
        .map_or_else(|| "????".to_string(), |y| y.to_string());

    println!("{:>3}. {} ({year})", index + 1, movie.title);
    println!(
        "     ID: {} | Rating: {:.1} ({} votes)",
        movie.id, movie.vote_average, movie.vote_count
    );
}
