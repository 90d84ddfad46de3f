pub mod compare;
pub mod report;
pub mod workload;
