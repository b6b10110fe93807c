//! Well-known topic descriptors and their typed registration helpers.

pub mod movie;

pub use movie::{MovieReleaseMessage, MOVIE_RELEASE};
