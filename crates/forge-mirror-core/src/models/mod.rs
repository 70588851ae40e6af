//! Data types shared by the release sync and the LFS backfill.

mod release;
mod repository;
mod tag;

pub use release::{FindReleasesOptions, NewRelease, ReleaseRecord, NUM_COMMITS_NOT_COMPUTED};
pub use repository::{NewRepository, Repository};
pub use tag::Tag;
