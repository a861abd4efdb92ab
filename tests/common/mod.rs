// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use frontpipe_test_utils::{
    init_tracing, with_timeout, ConfigFileBuilder, ExecEvent, FakeExecutor, TestProject,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
