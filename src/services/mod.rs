pub mod bucket;
#[cfg(test)]
pub mod memory_bucket;
pub mod object_storage;
pub mod s3_bucket;
