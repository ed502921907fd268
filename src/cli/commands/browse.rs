use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::info::print_detail_view;
use super::search::print_movie;
use crate::domain::MovieId;
use crate::services::SearchView;
use crate::state::SharedState;

enum BrowseInput<'a> {
    Quit,
    More,
    Info(&'a str),
    Text(&'a str),
}

fn parse_input(line: &str) -> BrowseInput<'_> {
    let trimmed = line.trim();
    if let Some(id) = trimmed.strip_prefix(":info ") {
        return BrowseInput::Info(id.trim());
    }
    match trimmed {
        ":quit" | ":q" => BrowseInput::Quit,
        ":more" | ":m" => BrowseInput::More,
        _ => BrowseInput::Text(line),
    }
}

pub async fn cmd_browse(state: &SharedState) -> anyhow::Result<()> {
    let store = state.search_store();
    let mut views = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type to search. Commands: :more, :info <id>, :quit");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    store.flush();
                    break;
                };
                match parse_input(&line) {
                    BrowseInput::Quit => return Ok(()),
                    BrowseInput::More => {
                        store.load_more();
                    }
                    BrowseInput::Info(id_str) => show_detail(state, id_str).await,
                    BrowseInput::Text(raw) => store.on_input_change(raw),
                }
            }
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = views.borrow_and_update().clone();
                print_view(&view);
            }
        }
    }

    // Input ended: show the outcome of the last committed query.
    let target = store.latest_commit();
    let timeout = state.config.catalog.request_timeout();
    let settle = async {
        loop {
            let view = views.borrow_and_update().clone();
            if view.query == target && !view.is_loading {
                print_view(&view);
                return;
            }
            if views.changed().await.is_err() {
                return;
            }
        }
    };
    if tokio::time::timeout(timeout, settle).await.is_err() {
        println!("⚠ Timed out waiting for results");
    }

    Ok(())
}

async fn show_detail(state: &SharedState, id_str: &str) {
    let Ok(id) = id_str.parse::<MovieId>() else {
        println!("Invalid movie ID: {id_str}");
        return;
    };

    let view = state.detail_service.use_movie_detail(id).await;
    if let Err(e) = print_detail_view(id, &view) {
        println!("⚠ {e:#}");
    }
}

fn print_view(view: &SearchView) {
    if view.query.is_empty() {
        println!("(search cleared)");
        return;
    }

    if view.is_loading {
        println!("Searching for: {} ...", view.query);
    }
    if let Some(err) = &view.error {
        println!("⚠ {err}");
    }
    if view.is_loading && view.results.is_empty() {
        return;
    }

    println!();
    println!(
        "Results for '{}' ({} of {}):",
        view.query,
        view.results.len(),
        view.total_results
    );
    println!("{:-<60}", "");
    for (i, movie) in view.results.iter().enumerate() {
        print_movie(i, movie);
    }
    if view.has_more && !view.is_loading {
        println!("(:more for the next page)");
    }
}
