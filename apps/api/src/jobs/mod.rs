// Stored job API: listing, lookup, status tracking, statistics and retention.

pub mod handlers;
