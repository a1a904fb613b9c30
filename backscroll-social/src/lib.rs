//! Provider adapters that plug into the backscroll fetch engine.
//!
//! Each adapter implements [`backscroll_engine::DataSource`] over
//! `backscroll-http`, maps 429 to a rate-limit tag after rotating its
//! credentials, and treats payloads it cannot turn into a page as malformed.
//! [`extract`] is the standalone text parser for alert-style posts.
pub mod credentials;
pub mod extract;
pub mod reddit;
pub mod tiingo;
pub mod twitter;

mod upstream;

pub use credentials::{
    CredentialError, CredentialProvider, EnvCredentials, Secret, StaticCredentials,
};
pub use reddit::RedditSource;
pub use tiingo::TiingoNewsSource;
pub use twitter::Twitter154Source;
