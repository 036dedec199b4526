pub mod csstats;
pub mod error;
pub mod html;
pub mod provider;

pub use csstats::CsStatsFetcher;
pub use provider::StatsFetcher;
