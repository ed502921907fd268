pub mod search {
    use std::time::Duration;

    pub const DEBOUNCE_DELAY_MS: u64 = 400;

    pub const MAX_DEBOUNCE_DELAY: Duration = Duration::from_secs(10);
}

pub mod fetch {
    use std::time::Duration;

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}

pub mod env {
    pub const API_KEY: &str = "TMDB_API_KEY";

    pub const ACCESS_TOKEN: &str = "TMDB_ACCESS_TOKEN";
}

pub mod limits {
    pub const MAX_CLI_PAGES: u32 = 20;

    pub const ERROR_BODY_PREVIEW: usize = 200;
}
