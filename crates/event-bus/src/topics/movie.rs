//! Movie release events.

use std::future::Future;

use bus_driver::{BusError, TopicDescriptor};
use serde::{Deserialize, Serialize};

use crate::bus::Bus;

/// Published whenever a movie is released, on the `movie` exchange.
pub static MOVIE_RELEASE: TopicDescriptor<MovieReleaseMessage> =
    TopicDescriptor::new("movie.release.*", "movie");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieReleaseMessage {
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub revenue: String,
    pub rating: i32,
}

impl Bus {
    /// Register a typed consumer for [`MOVIE_RELEASE`].
    pub fn register_movie_release_consumer<F, Fut>(&mut self, consumer: F) -> Result<(), BusError>
    where
        F: Fn(MovieReleaseMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_consumer(MOVIE_RELEASE.with_consumer(consumer))
    }
}
