mod client;
mod point_writer;
mod query_repository;

pub use client::ClickHouseClient;
pub use point_writer::ClickHousePointWriter;
pub use query_repository::ClickHouseQueryRepository;
