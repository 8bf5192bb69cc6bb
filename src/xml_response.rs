// Wire structures mirroring the service's XML documents, and their conversion
// into the domain model
use quick_xml::de::from_str;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{GoodreadsError, Result};
use crate::model::{
    Actor, Author, Book, ReadStatus, Review, Shelf, Update, UpdateObject, User, UserStatus,
};

// A decoded document that may carry an <error> payload instead of data
pub trait Envelope: DeserializeOwned {
    fn service_error(&self) -> Option<&str>;
}

/// Decodes a response body, turning an `<error>` payload into an API error.
pub fn decode<E: Envelope>(body: &[u8]) -> Result<E> {
    let xml = std::str::from_utf8(body)
        .map_err(|e| GoodreadsError::DecodeError(format!("body is not UTF-8: {}", e)))?;
    let envelope: E = from_str(xml)?;

    match envelope.service_error().map(str::trim) {
        Some(message) if !message.is_empty() => Err(GoodreadsError::ApiResponseError {
            status_code: 200,
            message: message.to_string(),
        }),
        _ => Ok(envelope),
    }
}

// The service emits empty or nil="true" tags for unknown counts
fn count(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlResponse {
    pub user: XmlUser,
    pub book: XmlBook,
    pub reviews: XmlReviews,
    pub updates: XmlUpdates,
    pub error: Option<String>,
}

impl Envelope for XmlResponse {
    fn service_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlAuthorResponse {
    pub author: XmlAuthor,
    pub error: Option<String>,
}

impl Envelope for XmlAuthorResponse {
    fn service_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUser {
    pub id: String,
    pub name: String,
    pub about: String,
    pub link: String,
    pub image_url: String,
    pub small_image_url: String,
    pub location: String,
    pub last_active: String,
    pub reviews_count: String,
    pub user_statuses: XmlUserStatuses,
    pub user_shelves: XmlUserShelves,
    pub updates: XmlUpdates,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUserStatuses {
    #[serde(rename = "user_status")]
    pub statuses: Vec<XmlUserStatus>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUserShelves {
    #[serde(rename = "user_shelf")]
    pub shelves: Vec<XmlShelf>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUserStatus {
    pub page: String,
    pub percent: String,
    pub updated_at: String,
    pub book: XmlBook,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlShelf {
    pub id: String,
    pub name: String,
    pub book_count: String,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlBook {
    pub id: String,
    pub title: String,
    pub link: String,
    pub image_url: String,
    pub num_pages: String,
    pub format: String,
    pub isbn: String,
    pub authors: XmlAuthors,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlAuthors {
    #[serde(rename = "author")]
    pub authors: Vec<XmlAuthor>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlAuthor {
    pub id: String,
    pub name: String,
    pub link: String,
    pub fans_count: String,
    pub author_followers_count: String,
    pub large_image_url: String,
    pub image_url: String,
    pub small_image_url: String,
    pub works_count: String,
    pub gender: String,
    pub hometown: String,
}

// <reviews start="1" end="20" total="450">
#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlReviews {
    #[serde(rename = "@start")]
    pub start: String,
    #[serde(rename = "@end")]
    pub end: String,
    #[serde(rename = "@total")]
    pub total: String,
    #[serde(rename = "review")]
    pub reviews: Vec<XmlReview>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlReview {
    pub book: XmlBook,
    pub rating: String,
    pub read_at: String,
    pub link: String,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUpdates {
    #[serde(rename = "update")]
    pub updates: Vec<XmlUpdate>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUpdate {
    #[serde(rename = "@type")]
    pub update_type: String,
    pub action_text: String,
    pub actor: XmlActor,
    pub object: XmlUpdateObject,
    pub updated_at: String,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlActor {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub link: String,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlUpdateObject {
    pub read_status: XmlReadStatus,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct XmlReadStatus {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub status: String,
    pub updated_at: String,
    pub review: XmlReview,
}

/// Everything a user, book or review-list document can carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub user: User,
    pub book: Book,
    pub reviews: Vec<Review>,
    pub updates: Vec<Update>,
}

impl From<XmlResponse> for Response {
    fn from(item: XmlResponse) -> Self {
        let mut user = item.user;

        // Activity may be listed at the document root or inside <user>
        let updates = item
            .updates
            .updates
            .into_iter()
            .chain(std::mem::take(&mut user.updates.updates))
            .map(Update::from)
            .collect();

        Response {
            user: user.into(),
            book: item.book.into(),
            reviews: item.reviews.reviews.into_iter().map(Review::from).collect(),
            updates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthorResponse {
    pub author: Author,
}

impl From<XmlAuthorResponse> for AuthorResponse {
    fn from(item: XmlAuthorResponse) -> Self {
        AuthorResponse {
            author: item.author.into(),
        }
    }
}

impl From<XmlUser> for User {
    fn from(item: XmlUser) -> Self {
        User {
            id: item.id,
            name: item.name,
            about: item.about,
            link: item.link,
            image_url: item.image_url,
            small_image_url: item.small_image_url,
            location: item.location,
            last_active: item.last_active,
            review_count: count(&item.reviews_count),
            statuses: item
                .user_statuses
                .statuses
                .into_iter()
                .map(UserStatus::from)
                .collect(),
            shelves: item
                .user_shelves
                .shelves
                .into_iter()
                .map(Shelf::from)
                .collect(),
            last_read: Vec::new(),
        }
    }
}

impl From<XmlUserStatus> for UserStatus {
    fn from(item: XmlUserStatus) -> Self {
        UserStatus {
            page: count(&item.page),
            percent: count(&item.percent),
            updated: item.updated_at,
            book: item.book.into(),
        }
    }
}

impl From<XmlShelf> for Shelf {
    fn from(item: XmlShelf) -> Self {
        Shelf {
            id: item.id,
            name: item.name,
            book_count: count(&item.book_count),
        }
    }
}

impl From<XmlBook> for Book {
    fn from(item: XmlBook) -> Self {
        Book {
            id: item.id,
            title: item.title,
            link: item.link,
            image_url: item.image_url,
            num_pages: count(&item.num_pages),
            format: item.format,
            isbn: item.isbn,
            authors: item.authors.authors.into_iter().map(Author::from).collect(),
        }
    }
}

impl From<XmlAuthor> for Author {
    fn from(item: XmlAuthor) -> Self {
        Author {
            id: item.id,
            name: item.name,
            link: item.link,
            fans_count: count(&item.fans_count),
            author_followers_count: count(&item.author_followers_count),
            large_image_url: item.large_image_url,
            image_url: item.image_url,
            small_image_url: item.small_image_url,
            works_count: count(&item.works_count),
            gender: item.gender,
            hometown: item.hometown,
        }
    }
}

impl From<XmlReview> for Review {
    fn from(item: XmlReview) -> Self {
        Review {
            book: item.book.into(),
            rating: item.rating.trim().parse().unwrap_or(0),
            read_at: item.read_at,
            link: item.link,
        }
    }
}

impl From<XmlUpdate> for Update {
    fn from(item: XmlUpdate) -> Self {
        Update {
            update_type: item.update_type,
            action_text: item.action_text,
            actor: Actor {
                id: item.actor.id,
                name: item.actor.name,
                image_url: item.actor.image_url,
                link: item.actor.link,
            },
            object: UpdateObject {
                read_status: item.object.read_status.into(),
            },
            updated: item.updated_at,
        }
    }
}

impl From<XmlReadStatus> for ReadStatus {
    fn from(item: XmlReadStatus) -> Self {
        ReadStatus {
            id: item.id,
            review_id: item.review_id,
            user_id: item.user_id,
            status: item.status,
            updated: item.updated_at,
            review: item.review.into(),
        }
    }
}

// A small user profile document for inline testing
#[cfg(test)]
pub(crate) const SMALL_USER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GoodreadsResponse>
  <Request>
    <authentication>true</authentication>
    <key><![CDATA[secret]]></key>
    <method><![CDATA[user_show]]></method>
  </Request>
  <user>
    <id>42</id>
    <name>Ada Reader</name>
    <link><![CDATA[https://www.goodreads.com/user/show/42-ada]]></link>
    <image_url><![CDATA[https://images.example/42.jpg]]></image_url>
    <about></about>
    <location>London, UK</location>
    <last_active>Wed Jan 01 00:00:00 +0000 2020</last_active>
    <reviews_count type="integer">450</reviews_count>
    <user_shelves type="array">
      <user_shelf>
        <id type="integer">1</id>
        <name>read</name>
        <book_count type="integer">400</book_count>
      </user_shelf>
      <user_shelf>
        <id type="integer">2</id>
        <name>currently-reading</name>
        <book_count type="integer">2</book_count>
      </user_shelf>
      <user_shelf>
        <id type="integer">3</id>
        <name>to-read</name>
        <book_count type="integer"></book_count>
      </user_shelf>
    </user_shelves>
    <user_statuses>
      <user_status>
        <page type="integer">120</page>
        <percent type="integer">40</percent>
        <updated_at>Wed Jan 01 00:00:00 +0000 2020</updated_at>
        <book>
          <id type="integer">101</id>
        </book>
      </user_status>
      <user_status>
        <page type="integer">7</page>
        <percent nil="true"/>
        <updated_at>2019-12-30T08:00:00Z</updated_at>
        <book>
          <id type="integer">102</id>
        </book>
      </user_status>
    </user_statuses>
    <updates type="array">
      <update type="readstatus">
        <action_text>is currently reading</action_text>
        <updated_at>Wed Jan 01 00:00:00 +0000 2020</updated_at>
        <actor>
          <id>42</id>
          <name>Ada Reader</name>
          <image_url>https://images.example/42.jpg</image_url>
          <link>https://www.goodreads.com/user/show/42-ada</link>
        </actor>
        <object>
          <read_status>
            <id>9001</id>
            <review_id>77</review_id>
            <user_id>42</user_id>
            <status>currently-reading</status>
            <updated_at>Wed Jan 01 00:00:00 +0000 2020</updated_at>
            <review>
              <rating>0</rating>
              <book>
                <id>101</id>
                <title>The Dispossessed</title>
              </book>
            </review>
          </read_status>
        </object>
      </update>
    </updates>
  </user>
</GoodreadsResponse>
"#;
