pub mod movie;

pub use movie::{Genre, Movie, MovieDetail, ProductionCompany, ResultPage};
