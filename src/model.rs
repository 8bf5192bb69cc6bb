// Domain entities assembled from service responses, plus their display accessors
use serde::Serialize;
use tracing::warn;

use crate::date::{relative_label, short_date};
use crate::error::{GoodreadsError, Result};

pub const READ_SHELF: &str = "read";
pub const TO_READ_SHELF: &str = "to-read";
pub const CURRENTLY_READING_SHELF: &str = "currently-reading";

pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub about: String,
    pub link: String,
    pub image_url: String,
    pub small_image_url: String,
    pub location: String,
    pub last_active: String,
    pub review_count: u32,
    pub statuses: Vec<UserStatus>,
    pub shelves: Vec<Shelf>,
    // Only filled by fetch_user when the statuses fall short of the limit
    pub last_read: Vec<Review>,
}

impl User {
    /// Returns the first shelf called `name`, or an empty shelf when the user has none.
    pub fn shelf_named(&self, name: &str) -> Shelf {
        self.shelves
            .iter()
            .find(|shelf| shelf.name == name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn read_shelf(&self) -> Shelf {
        self.shelf_named(READ_SHELF)
    }

    pub fn to_read_shelf(&self) -> Shelf {
        self.shelf_named(TO_READ_SHELF)
    }

    pub fn reading_shelf(&self) -> Shelf {
        self.shelf_named(CURRENTLY_READING_SHELF)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Shelf {
    pub id: String,
    pub name: String,
    pub book_count: u32,
}

/// Reading progress for one book.
///
/// The book decoded from the profile response only carries its id; the
/// orchestrator swaps in the fully fetched book with [`UserStatus::with_book`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UserStatus {
    pub page: u32,
    pub percent: u32,
    pub updated: String,
    pub book: Book,
}

impl UserStatus {
    pub fn with_book(self, book: Book) -> Self {
        Self { book, ..self }
    }

    pub fn updated_relative(&self) -> String {
        relative_label(&self.updated)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub link: String,
    pub image_url: String,
    pub num_pages: u32,
    pub format: String,
    pub isbn: String,
    pub authors: Vec<Author>,
}

impl Book {
    /// The book's primary author, by convention the first one listed.
    pub fn author(&self) -> Result<&Author> {
        self.authors.first().ok_or_else(|| {
            GoodreadsError::MissingData(format!("book {:?} has no authors", self.id))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub link: String,
    pub fans_count: u32,
    pub author_followers_count: u32,
    pub large_image_url: String,
    pub image_url: String,
    pub small_image_url: String,
    pub works_count: u32,
    pub gender: String,
    pub hometown: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Review {
    pub book: Book,
    pub rating: i32,
    pub read_at: String,
    pub link: String,
}

impl Review {
    /// Full and empty star markers on a five point scale.
    ///
    /// Ratings outside 0..=5 are clamped.
    pub fn star_rating(&self) -> (Vec<bool>, Vec<bool>) {
        let rating = self.clamped_rating() as usize;
        let empty = (MAX_RATING as usize) - rating;
        (vec![true; rating], vec![false; empty])
    }

    pub fn full_stars(&self) -> Vec<bool> {
        self.star_rating().0
    }

    pub fn empty_stars(&self) -> Vec<bool> {
        self.star_rating().1
    }

    pub fn read_at_short(&self) -> String {
        short_date(&self.read_at)
    }

    pub fn read_at_relative(&self) -> String {
        relative_label(&self.read_at)
    }

    fn clamped_rating(&self) -> i32 {
        if !(0..=MAX_RATING).contains(&self.rating) {
            warn!(
                "Rating {} out of range for book {:?}, clamping",
                self.rating, self.book.id
            );
        }
        self.rating.clamp(0, MAX_RATING)
    }
}

// Activity feed entries

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Update {
    pub update_type: String,
    pub action_text: String,
    pub actor: Actor,
    pub object: UpdateObject,
    pub updated: String,
}

impl Update {
    pub fn updated_relative(&self) -> String {
        relative_label(&self.updated)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UpdateObject {
    pub read_status: ReadStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReadStatus {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub status: String,
    pub updated: String,
    pub review: Review,
}
