pub(crate) mod crawl;
pub(crate) mod migrate;
