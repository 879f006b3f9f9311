pub(crate) mod meta;
pub(crate) mod mirror;
pub(crate) mod prune;
pub(crate) mod report;
pub(crate) mod shared;
