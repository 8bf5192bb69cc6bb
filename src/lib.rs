// Read-only client for the Goodreads book cataloging service

pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod model;
pub mod transport;
pub mod xml_response;

// Re-export key types for convenience
pub use client::{ClientStats, GoodreadsClient, REVIEWS_PER_PAGE};
pub use config::ClientConfig;
pub use date::{parse_timestamp, relative_label, relative_label_at, short_date};
pub use error::{ClientError, GoodreadsError, Result};
pub use model::{
    Actor, Author, Book, ReadStatus, Review, Shelf, Update, UpdateObject, User, UserStatus,
};
pub use transport::{HttpTransport, Transport};
