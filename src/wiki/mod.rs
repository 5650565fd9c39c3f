//! MediaWiki API access.
//!
//! - [`client`] - HTTP GET with a fixed `User-Agent`, size-limited bodies and a
//!   pause after every call
//! - [`api`] - `action=query` request builders and the continuation-following fetcher
//! - [`types`] - serde views over query responses

mod api;
mod client;
mod types;

pub use api::{
    continuation, QueryParams, WikiApi, CONTINUE_KEY, IMAGE_CONTINUE_KEY, PAGE_CONTINUE_KEYS,
};
pub use client::{HttpClient, HttpError};
pub use types::{
    parse_responses, CategoryMember, QueryBody, QueryResponse, RawCoordinate, RawImageInfo,
    RawPage,
};
