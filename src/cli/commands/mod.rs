mod browse;
mod info;
mod init;
mod search;

pub use browse::cmd_browse;
pub use info::cmd_movie_info;
pub use init::cmd_init;
pub use search::cmd_search;
