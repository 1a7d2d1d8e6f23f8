pub mod benchmark_client;
pub mod benchmark_report;
pub mod test_cases;
