pub mod feed;
pub mod http;

pub use feed::WsFeed;
pub use http::HttpBackend;
