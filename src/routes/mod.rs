pub mod routes;

#[cfg(test)]
pub use routes::test_server;
