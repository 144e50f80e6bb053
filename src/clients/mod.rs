//! Clients for the upstream web APIs.
//!
//! Each client builds a query string, performs a single GET through a
//! [`FetchJson`](crate::fetch::FetchJson) implementation and maps the JSON
//! body into its result type.
//!
//! | API | Module | Result |
//! |-----|--------|--------|
//! | Publish2 link search | [`publish2`] | [`Feed`](crate::models::Feed) |
//! | bit.ly shorten | [`bitly`] | short URL `String` |
//! | Google AJAX news search | [`google_news`] | raw result records |
//!
//! None of them cache, retry or paginate.

pub mod bitly;
pub mod google_news;
pub mod publish2;
